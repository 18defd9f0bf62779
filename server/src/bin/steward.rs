use anyhow::Result;
use clap::Parser;
use steward_server::{Args, Server, DEFAULT_DATABASE_URL};
use steward_storage_postgres::Postgres;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // .env has to be loaded before the arguments read their environment fallbacks
    let dotenv = dotenv::dotenv();
    let args = Args::parse();

    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    match dotenv {
        Ok(path) => info!("loaded environment from {}", path.display()),
        Err(_) => info!("no .env file found, using the process environment"),
    }
    if args.database_url == DEFAULT_DATABASE_URL {
        warn!("DATABASE_URL not set, falling back to {}", DEFAULT_DATABASE_URL);
    }

    let store = Postgres::connect(&args.database_url, args.pool_size).await?;
    if let Err(err) = store.ping().await {
        error!("could not reach the database: {}", err);
        return Err(err.into());
    }
    info!("connected to the database");

    let server = Server::builder().bind_address(args.listen.to_string()).allow_origins(args.allow_origin).with_store(store).build()?;
    server.run().await
}
