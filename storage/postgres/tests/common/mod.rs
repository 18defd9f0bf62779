//! Common utilities for Postgres store tests

use std::str::FromStr;

use anyhow::Result;
use bb8_postgres::PostgresConnectionManager;
use chrono::{TimeZone, Utc};
use steward_core::model::{NewProject, UserId};
use steward_storage_postgres::Postgres;
use testcontainers::ContainerAsync;
use testcontainers_modules::{postgres, testcontainers::runners::AsyncRunner};
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() {
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        tracing_subscriber::fmt().with_max_level(Level::from_str(&level).unwrap()).with_test_writer().init();
    } else {
        tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init();
    }
}

/// A fresh database with the schema and the seed rows from `seed.sql` (users 1..=4, roles 1..=3,
/// trackers and activities 1..=2, priorities and states 1..=3).
pub async fn create_postgres_container() -> Result<(ContainerAsync<postgres::Postgres>, Postgres)> {
    let container: ContainerAsync<postgres::Postgres> = postgres::Postgres::default()
        .with_db_name("project_manager")
        .with_user("postgres")
        .with_password("postgres")
        .with_init_sql(include_str!("../../schema.sql").to_string().into_bytes())
        .with_init_sql(include_str!("../seed.sql").to_string().into_bytes())
        .start()
        .await?;

    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5432).await?;
    let manager = PostgresConnectionManager::new_from_stringlike(
        format!("host={host} port={port} user=postgres password=postgres dbname=project_manager"),
        tokio_postgres::NoTls,
    )?;
    let pool = bb8::Pool::builder().build(manager).await?;

    Ok((container, Postgres::new(pool)))
}

pub fn new_project(name: &str) -> NewProject {
    NewProject {
        name: name.to_owned(),
        description: Some(format!("{name} description")),
        created_by: UserId(1),
        start_date: Some(Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap()),
        target_date: Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap(),
        pic_id: UserId(2),
    }
}
