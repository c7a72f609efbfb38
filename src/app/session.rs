use std::ops::Deref;

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use futures::future::LocalBoxFuture;
use log::trace;

use super::{AppError, AppState};

/// A pooled database connection scoped to one request.
///
/// Taking `DbSession` as a handler argument checks a connection out of the
/// pool before the handler runs. The connection goes back to the pool when
/// the session is dropped, whether the handler returns normally, returns an
/// error or panics.
///
/// # Example
/// ```ignore
/// #[get("/users/{id}")]
/// async fn show(db: DbSession, id: web::Path<i32>) -> Result<HttpResponse, AppError> {
///     let user = User::find_by_id(&db, *id)?.ok_or(AppError::NotFound)?;
///     Ok(HttpResponse::Ok().json(user))
/// }
/// ```
///
/// # Errors
/// - Service unavailable, no connection could be checked out in time
/// - Internal server error, the app was built without an `AppState`
pub struct DbSession {
    conn: PooledConnection<ConnectionManager<PgConnection>>,
}

impl Deref for DbSession {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        &self.conn
    }
}

impl Drop for DbSession {
    fn drop(&mut self) {
        trace!("Database session released");
    }
}

impl FromRequest for DbSession {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let pool = req
            .app_data::<web::Data<AppState>>()
            .map(|state| state.pool.clone());

        Box::pin(async move {
            let pool = pool.ok_or(AppError::InternalServerError)?;
            // checkout blocks for up to the pool's connection timeout
            let conn = web::block(move || pool.get()).await??;
            trace!("Database session acquired");

            Ok(DbSession { conn })
        })
    }
}
