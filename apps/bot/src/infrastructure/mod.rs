// Infrastructure layer module
// Contains database adapters and external service integrations

pub mod browser;
pub mod database;
pub mod error_reporter;
pub mod repositories;
pub mod telegram;
