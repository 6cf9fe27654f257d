pub mod config;
mod http_layers;
mod import_routes;
pub mod metrics;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use http_layers::*;
pub(self) use import_routes::make_import_routes;
pub use server::{make_app, run_server};
