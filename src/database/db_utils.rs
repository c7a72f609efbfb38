use std::time::Duration;

use diesel::prelude::*;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use log::{debug, info};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// How long a request waits for a free pooled connection
pub const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds the connection pool shared by every request handler.
/// Fails if no connection can be established within the checkout timeout.
///
/// # Example
/// ```ignore
/// let pool = psql_connect_to_db(&config.database_url, config.pool_size)?;
/// ```
pub fn psql_connect_to_db(database_url: &str, max_size: u32) -> Result<PgPool, PoolError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(max_size)
        .connection_timeout(CHECKOUT_TIMEOUT)
        .build(manager)?;

    info!("Connection pool ready ({} connections max)", max_size);
    Ok(pool)
}

/// Return a single connection that is not managed by any pool.
/// The migration tool runs once and exits, so it never keeps one around.
pub fn establish_unpooled(database_url: &str) -> ConnectionResult<PgConnection> {
    debug!("Opening unpooled connection");
    PgConnection::establish(database_url)
}
