use std::io;

use actix_web::{middleware::Logger, web::Data, App, HttpServer};
use blogapi::{app::AppState, config::AppConfig, database::db_utils::psql_connect_to_db, routes};
use env_logger::Env;
use log::info;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().map_err(io::Error::other)?;
    let postgres_pool = psql_connect_to_db(&config.database_url, config.pool_size)
        .map_err(io::Error::other)?;

    let app_state = AppState::new(postgres_pool);

    info!("Server running on {}:{}", config.bind_address, config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(app_state.clone()))
            .wrap(Logger::default())
            .configure(routes::configure)
    })
    .bind((config.bind_address.as_str(), config.port))?
    .run()
    .await?;

    info!("Server stopped, connection pool closed");
    Ok(())
}
