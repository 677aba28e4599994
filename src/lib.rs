pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod server;

// Application layer: use cases and the ports they call out through
pub mod app;

// Infrastructure adapters behind the application ports
pub mod infra;
