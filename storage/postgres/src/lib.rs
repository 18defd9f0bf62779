use std::collections::BTreeSet;

use async_trait::async_trait;
use bb8_postgres::{tokio_postgres::NoTls, PostgresConnectionManager};
use steward_core::error::{Missing, StoreError};
use steward_core::model::{
    Backlog, BacklogId, Credentials, EntityRef, NewBacklog, NewProject, NewWork, Project, ProjectId, RelationKey, UserId, Work, WorkId,
};
use steward_core::{FieldMask, Listing, RawJson, Store};
use tokio_postgres::{
    error::SqlState,
    types::{FromSql, ToSql},
    Row,
};
use tracing::{debug, error, info, warn};

/// Store over the `project_manager` schema (see `schema.sql`).
#[derive(Clone)]
pub struct Postgres {
    pool: bb8::Pool<PostgresConnectionManager<NoTls>>,
}

impl Postgres {
    pub fn new(pool: bb8::Pool<PostgresConnectionManager<NoTls>>) -> Self { Self { pool } }

    pub async fn connect(database_url: &str, max_size: u32) -> anyhow::Result<Self> {
        let manager = PostgresConnectionManager::new_from_stringlike(database_url, NoTls)?;
        let pool = bb8::Pool::builder().max_size(max_size).build(manager).await?;
        Ok(Self::new(pool))
    }

    /// Round trip to the database; used once at startup.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let client = self.pool.get().await.map_err(pool_error)?;
        client.query_one("SELECT 1", &[]).await.map_err(|err| store_error(err, None))?;
        info!("Postgres.ping: ok");
        Ok(())
    }
}

#[async_trait]
impl Store for Postgres {
    async fn lookup_credentials(&self, credentials: &Credentials) -> Result<RawJson, StoreError> {
        let query = "SELECT project_manager.get_user_id_by_credentials($1, $2)::text";
        let client = self.pool.get().await.map_err(pool_error)?;

        debug!("Postgres.lookup_credentials({}): {}", credentials.user_name, query);
        let row = client
            .query_one(query, &[&credentials.user_name, &credentials.password])
            .await
            .map_err(|err| store_error(err, Some(Missing::Credentials)))?;
        let user: String = column(&row, 0)?;
        Ok(RawJson::new(user))
    }

    async fn insert_project(&self, project: &NewProject) -> Result<ProjectId, StoreError> {
        let query = r#"INSERT INTO project_manager.project (name, description, created_by, start_date, target_date, pic_id)
            VALUES ($1, $2, $3, coalesce($4, now()), $5, $6) RETURNING id"#;
        let client = self.pool.get().await.map_err(pool_error)?;

        debug!("Postgres.insert_project: {}", query);
        let row = client
            .query_one(
                query,
                &[&project.name, &project.description, &project.created_by, &project.start_date, &project.target_date, &project.pic_id],
            )
            .await
            .map_err(|err| store_error(err, None))?;
        column(&row, "id")
    }

    async fn insert_backlog(&self, backlog: &NewBacklog) -> Result<BacklogId, StoreError> {
        let query = r#"INSERT INTO project_manager.backlog (project_id, name, description, start_date, target_date, created_by, pic_id, priority_id)
            VALUES ($1, $2, $3, coalesce($4, now()), $5, $6, $7, $8) RETURNING id"#;
        let client = self.pool.get().await.map_err(pool_error)?;

        debug!("Postgres.insert_backlog: {}", query);
        let row = client
            .query_one(
                query,
                &[
                    &backlog.project_id,
                    &backlog.name,
                    &backlog.description,
                    &backlog.start_date,
                    &backlog.target_date,
                    &backlog.created_by,
                    &backlog.pic_id,
                    &backlog.priority_id,
                ],
            )
            .await
            .map_err(|err| store_error(err, None))?;
        column(&row, "id")
    }

    async fn insert_work(&self, work: &NewWork) -> Result<WorkId, StoreError> {
        let query = r#"INSERT INTO project_manager.work (backlog_id, name, description, start_date, target_date, pic_id, current_state,
                created_by, priority_id, estimated_hours, tracker_id, activity_id)
            VALUES ($1, $2, $3, coalesce($4, now()), $5, $6, $7, $8, $9, $10, $11, $12) RETURNING id"#;
        let client = self.pool.get().await.map_err(pool_error)?;

        debug!("Postgres.insert_work: {}", query);
        let row = client
            .query_one(
                query,
                &[
                    &work.backlog_id,
                    &work.name,
                    &work.description,
                    &work.start_date,
                    &work.target_date,
                    &work.pic_id,
                    &work.current_state,
                    &work.created_by,
                    &work.priority_id,
                    &work.estimated_hours,
                    &work.tracker_id,
                    &work.activity_id,
                ],
            )
            .await
            .map_err(|err| store_error(err, None))?;
        column(&row, "id")
    }

    async fn update(&self, target: EntityRef, mask: &FieldMask) -> Result<(), StoreError> {
        if mask.is_empty() {
            return Ok(());
        }

        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(mask.len() + 1);
        let mut assignments = Vec::with_capacity(mask.len());
        for (column, value) in mask {
            params.push(value);
            assignments.push(format!("\"{}\" = ${}", column.as_str(), params.len()));
        }
        let id = target.id();
        params.push(&id);

        // Table and column names come from closed enums, never from input.
        let query = format!("UPDATE project_manager.{} SET {} WHERE id = ${}", table(target), assignments.join(", "), params.len());
        let client = self.pool.get().await.map_err(pool_error)?;

        debug!("Postgres.update({}): {}", target, query);
        let affected = client.execute(&query, params.as_slice()).await.map_err(|err| store_error(err, Some(target.into())))?;
        if affected == 0 {
            return Err(StoreError::NotFound(target.into()));
        }
        Ok(())
    }

    async fn reconcile(&self, key: RelationKey, removed: &[UserId], added: &[UserId]) -> Result<(), StoreError> {
        let statements = Relation::of(key);
        let mut key_params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(2);
        match &key {
            RelationKey::ProjectRole { project, role } => {
                key_params.push(project);
                key_params.push(role);
            }
            RelationKey::Work { work } => key_params.push(work),
        }
        let missing = Missing::from(key);

        let mut client = self.pool.get().await.map_err(pool_error)?;
        let transaction = client.transaction().await.map_err(|err| store_error(err, None))?;

        debug!("Postgres.reconcile({}): {}", key, statements.lock);
        if transaction.query_opt(statements.lock, &key_params[..1]).await.map_err(|err| store_error(err, None))?.is_none() {
            return Err(StoreError::NotFound(missing));
        }

        if !removed.is_empty() {
            let mut params = key_params.clone();
            params.push(&removed);
            debug!("Postgres.reconcile({}): {}", key, statements.delete);
            let affected = transaction.execute(statements.delete, params.as_slice()).await.map_err(|err| store_error(err, Some(missing)))?;
            debug!("Postgres.reconcile({}): removed {} row(s)", key, affected);
        }

        if !added.is_empty() {
            let mut params = key_params.clone();
            params.push(&added);
            debug!("Postgres.reconcile({}): {}", key, statements.insert);
            let affected = transaction.execute(statements.insert, params.as_slice()).await.map_err(|err| store_error(err, Some(missing)))?;
            debug!("Postgres.reconcile({}): added {} row(s)", key, affected);
        }

        transaction.commit().await.map_err(|err| store_error(err, None))?;
        Ok(())
    }

    async fn project(&self, id: ProjectId) -> Result<Project, StoreError> {
        let query = r#"SELECT id, name, description, created_by, start_date, target_date, pic_id FROM project_manager.project WHERE id = $1"#;
        let row = self.fetch_one(query, &[&id], Missing::Project(id)).await?;
        Ok(Project {
            id: column(&row, "id")?,
            name: column(&row, "name")?,
            description: column(&row, "description")?,
            created_by: column(&row, "created_by")?,
            start_date: column(&row, "start_date")?,
            target_date: column(&row, "target_date")?,
            pic_id: column(&row, "pic_id")?,
        })
    }

    async fn backlog(&self, id: BacklogId) -> Result<Backlog, StoreError> {
        let query = r#"SELECT id, project_id, name, description, start_date, target_date, created_by, pic_id, priority_id
            FROM project_manager.backlog WHERE id = $1"#;
        let row = self.fetch_one(query, &[&id], Missing::Backlog(id)).await?;
        Ok(Backlog {
            id: column(&row, "id")?,
            project_id: column(&row, "project_id")?,
            name: column(&row, "name")?,
            description: column(&row, "description")?,
            start_date: column(&row, "start_date")?,
            target_date: column(&row, "target_date")?,
            created_by: column(&row, "created_by")?,
            pic_id: column(&row, "pic_id")?,
            priority_id: column(&row, "priority_id")?,
        })
    }

    async fn work(&self, id: WorkId) -> Result<Work, StoreError> {
        let query = r#"SELECT id, backlog_id, name, description, start_date, target_date, pic_id, current_state, created_by, priority_id,
                estimated_hours, tracker_id, activity_id
            FROM project_manager.work WHERE id = $1"#;
        let row = self.fetch_one(query, &[&id], Missing::Work(id)).await?;
        Ok(Work {
            id: column(&row, "id")?,
            backlog_id: column(&row, "backlog_id")?,
            name: column(&row, "name")?,
            description: column(&row, "description")?,
            start_date: column(&row, "start_date")?,
            target_date: column(&row, "target_date")?,
            pic_id: column(&row, "pic_id")?,
            current_state: column(&row, "current_state")?,
            created_by: column(&row, "created_by")?,
            priority_id: column(&row, "priority_id")?,
            estimated_hours: column(&row, "estimated_hours")?,
            tracker_id: column(&row, "tracker_id")?,
            activity_id: column(&row, "activity_id")?,
        })
    }

    async fn members(&self, key: RelationKey) -> Result<BTreeSet<UserId>, StoreError> {
        let client = self.pool.get().await.map_err(pool_error)?;
        let rows = match &key {
            RelationKey::ProjectRole { project, role } => {
                let query = "SELECT user_id FROM project_manager.project_user_role WHERE project_id = $1 AND role_id = $2";
                debug!("Postgres.members({}): {}", key, query);
                client.query(query, &[project, role]).await
            }
            RelationKey::Work { work } => {
                let query = "SELECT user_id FROM project_manager.work_user WHERE work_id = $1";
                debug!("Postgres.members({}): {}", key, query);
                client.query(query, &[work]).await
            }
        }
        .map_err(|err| store_error(err, None))?;

        rows.iter().map(|row| column(row, "user_id")).collect()
    }

    async fn list(&self, listing: Listing) -> Result<RawJson, StoreError> {
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(2);
        let query = match &listing {
            Listing::Projects => "SELECT project_manager.get_projects()::text",
            Listing::UserRoles(project) => {
                params.push(project);
                "SELECT project_manager.get_user_roles($1)::text"
            }
            Listing::Backlogs(project) => {
                params.push(project);
                "SELECT project_manager.get_backlogs($1)::text"
            }
            Listing::Works(backlog) => {
                params.push(backlog);
                "SELECT project_manager.get_works($1)::text"
            }
            Listing::UserTodos(user) => {
                params.push(user);
                "SELECT project_manager.get_user_todos($1)::text"
            }
            Listing::WorkAssignees(work) => {
                params.push(work);
                "SELECT project_manager.get_work_assignees($1)::text"
            }
            Listing::Usernames => "SELECT project_manager.get_usernames()::text",
            Listing::ProjectAssignees { project, role } => {
                params.push(project);
                params.push(role);
                "SELECT project_manager.get_project_assignees($1, $2)::text"
            }
            Listing::ReferenceData => "SELECT project_manager.get_reference_data()::text",
        };

        let client = self.pool.get().await.map_err(pool_error)?;
        debug!("Postgres.list({}): {}", listing, query);
        let row = client.query_one(query, params.as_slice()).await.map_err(|err| store_error(err, None))?;
        let document: String = column(&row, 0)?;
        Ok(RawJson::new(document))
    }
}

impl Postgres {
    async fn fetch_one(&self, query: &str, params: &[&(dyn ToSql + Sync)], missing: Missing) -> Result<Row, StoreError> {
        let client = self.pool.get().await.map_err(pool_error)?;
        debug!("Postgres.fetch_one({}): {}", missing, query);
        match client.query_opt(query, params).await {
            Ok(Some(row)) => Ok(row),
            Ok(None) => Err(StoreError::NotFound(missing)),
            Err(err) => Err(store_error(err, Some(missing))),
        }
    }
}

fn table(target: EntityRef) -> &'static str {
    match target {
        EntityRef::Project(_) => "project",
        EntityRef::Backlog(_) => "backlog",
        EntityRef::Work(_) => "work",
    }
}

/// Statements for one membership relation. The key columns are always the leading parameters and the
/// user id array the last.
struct Relation {
    lock: &'static str,
    delete: &'static str,
    insert: &'static str,
}

impl Relation {
    fn of(key: RelationKey) -> Self {
        match key {
            RelationKey::ProjectRole { .. } => Relation {
                lock: "SELECT id FROM project_manager.project WHERE id = $1 FOR SHARE",
                delete: "DELETE FROM project_manager.project_user_role WHERE project_id = $1 AND role_id = $2 AND user_id = ANY($3)",
                insert: r#"INSERT INTO project_manager.project_user_role (project_id, role_id, user_id)
                    SELECT $1::int4, $2::int4, unnest($3::int4[]) ON CONFLICT DO NOTHING"#,
            },
            RelationKey::Work { .. } => Relation {
                lock: "SELECT id FROM project_manager.work WHERE id = $1 FOR SHARE",
                delete: "DELETE FROM project_manager.work_user WHERE work_id = $1 AND user_id = ANY($2)",
                insert: r#"INSERT INTO project_manager.work_user (work_id, user_id)
                    SELECT $1::int4, unnest($2::int4[]) ON CONFLICT DO NOTHING"#,
            },
        }
    }
}

fn column<'a, T: FromSql<'a>>(row: &'a Row, index: impl tokio_postgres::row::RowIndex + std::fmt::Display) -> Result<T, StoreError> {
    row.try_get(index).map_err(|err| {
        error!("Postgres: unexpected row shape: {}", err);
        StoreError::backend(err)
    })
}

fn pool_error(err: bb8::RunError<tokio_postgres::Error>) -> StoreError {
    error!("Postgres: could not get a connection: {}", err);
    StoreError::backend(err)
}

/// Maps a driver error onto the store taxonomy. `missing` is what a "no data" condition refers to;
/// without it such a condition is unexpected and reported as a backend failure.
fn store_error(err: tokio_postgres::Error, missing: Option<Missing>) -> StoreError {
    match (error_kind(&err), missing) {
        (ErrorKind::RowCount | ErrorKind::NoData, Some(missing)) => StoreError::NotFound(missing),
        (ErrorKind::Constraint { constraint }, _) => {
            let message = err.as_db_error().map(|db| db.message().to_owned()).unwrap_or_else(|| err.to_string());
            warn!("Postgres: constraint {:?} violated: {}", constraint, message);
            StoreError::Constraint(message)
        }
        (kind, _) => {
            error!("Postgres: {:?}: {:?}", kind, err);
            StoreError::backend(err)
        }
    }
}

// rust-postgres doesn't expose a structured kind for everything we care about, so classify from the
// SQLSTATE code and, for the row count case, the message.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    RowCount,
    /// Raised by the store functions (`P0002`) when nothing matches.
    NoData,
    Constraint {
        constraint: Option<String>,
    },
    Unknown,
}

pub fn error_kind(err: &tokio_postgres::Error) -> ErrorKind {
    let string = err.to_string().trim().to_owned();
    if string == "query returned an unexpected number of rows" {
        return ErrorKind::RowCount;
    }

    let constraint = || err.as_db_error().and_then(|db| db.constraint()).map(str::to_owned);
    match err.code().cloned() {
        Some(SqlState::NO_DATA_FOUND) => ErrorKind::NoData,
        Some(SqlState::FOREIGN_KEY_VIOLATION)
        | Some(SqlState::UNIQUE_VIOLATION)
        | Some(SqlState::NOT_NULL_VIOLATION)
        | Some(SqlState::CHECK_VIOLATION) => ErrorKind::Constraint { constraint: constraint() },
        _ => ErrorKind::Unknown,
    }
}
