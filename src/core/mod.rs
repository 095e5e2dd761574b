pub mod alerts;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod sink;
pub mod sources;
