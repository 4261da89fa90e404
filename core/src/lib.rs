pub mod api;
pub mod config;
pub mod error;
pub mod events_out;
pub mod executor;
