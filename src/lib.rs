pub mod api;
pub mod config;
pub mod error;
pub mod observability;
pub mod persistence;
pub mod prices;
pub mod types;
pub mod utils;
