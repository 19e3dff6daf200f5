pub mod access_log;
pub mod cache;
pub mod config;
pub mod lyrics;
pub mod orchestrator;
pub mod server;
pub mod spotify;
pub mod translate;
