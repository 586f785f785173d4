pub mod api_router;
pub mod clients;
pub mod config;
pub mod interactions;
pub mod pipeline;
pub mod reports;
pub mod shared;
