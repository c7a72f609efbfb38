#[macro_use]
extern crate diesel;
extern crate dotenv;

pub mod app;
pub mod config;
pub mod database;
pub mod migrations;
pub mod routes;
pub mod schema;
