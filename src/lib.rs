pub mod category;
pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod model;
pub mod persist;
pub mod source;
pub mod store;
pub mod validate;
