mod config;
mod error;
mod extract;
mod routes;
mod server;

pub use config::{Args, DEFAULT_DATABASE_URL};
pub use error::ApiError;
pub use server::*;
