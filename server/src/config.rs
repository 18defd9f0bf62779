use std::net::SocketAddr;

use clap::Parser;

pub const DEFAULT_DATABASE_URL: &str = "postgres://postgres@localhost:5432/project_manager";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Project management service")]
pub struct Args {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,
    /// TCP listener for HTTP clients
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:9090")]
    pub listen: SocketAddr,
    /// Allowed CORS origins (repeatable, or comma separated in the environment)
    #[arg(long, env = "ALLOW_ORIGINS", value_delimiter = ',', default_value = "http://localhost:4200")]
    pub allow_origin: Vec<String>,
    /// Maximum number of pooled database connections
    #[arg(long, env = "POOL_SIZE", default_value_t = 16)]
    pub pool_size: u32,
}
