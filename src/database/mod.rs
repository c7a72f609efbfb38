pub mod db_utils;
pub mod metadata;
pub mod models;
