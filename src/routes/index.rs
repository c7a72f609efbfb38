use actix_web::{get, HttpResponse, Responder};
use serde_json::json;

/// Placeholder root route
/// - url: `{domain}/`
///
/// # Example
/// ```ignore
/// let request = actix_web::test::TestRequest::get()
///     .uri("/")
///     .to_request();
/// ```
///
/// # Response
/// ## Ok
/// - `{"Hello": "World"}` as json
#[get("/")]
pub async fn read_root() -> impl Responder {
    HttpResponse::Ok().json(json!({ "Hello": "World" }))
}
