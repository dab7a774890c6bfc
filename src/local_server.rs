//! Loopback HTTP server that receives the provider's redirect during a
//! desktop or command-line sign-in.

mod config;
mod http;
mod server;
mod target;

pub use config::LocalServerConfig;
pub use server::LocalServer;
