pub mod index;

use actix_web::web::ServiceConfig;

/// Registers every route the service exposes
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(index::read_root);
}
