use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use steward_core::model::{
    AlterBacklog, AlterProject, AlterWork, BacklogId, Credentials, NewBacklog, NewProject, NewWork, ProjectId, RoleDelta, RoleId, UserId,
    UserRoleChange, UserWorkChange, WorkId,
};
use steward_core::{ErrorKind, RawJson, Steward};
use tracing::info;

use crate::error::ApiError;
use crate::extract::{Params, Payload};

/// Routes, relative to `/api`.
pub fn api() -> Router<Steward> {
    Router::new()
        .route("/login", post(login))
        .route("/postNewProject", post(post_new_project))
        .route("/getProjects", get(get_projects))
        .route("/putAlterProject", put(put_alter_project))
        .route("/getUserRoles", get(get_user_roles))
        .route("/putUserRole", put(put_user_role))
        .route("/getProjectAssignees", get(get_project_assignees))
        .route("/getBacklogs", get(get_backlogs))
        .route("/postNewBacklog", post(post_new_backlog))
        .route("/putAlterBacklog", put(put_alter_backlog))
        .route("/postNewWork", post(post_new_work))
        .route("/getWorks", get(get_works))
        .route("/putAlterWork", put(put_alter_work))
        .route("/getUserTodos", get(get_user_todos))
        .route("/getWorkAssignees", get(get_work_assignees))
        .route("/putUserWork", put(put_user_work))
        .route("/getUsernames", get(get_usernames))
        .route("/getReferenceData", get(get_reference_data))
}

/// Store-produced JSON, passed through untouched.
pub struct Relayed(RawJson);

impl IntoResponse for Relayed {
    fn into_response(self) -> Response { ([(header::CONTENT_TYPE, "application/json")], self.0.into_string()).into_response() }
}

fn ok() -> Json<&'static str> { Json("ok") }

// Request shapes that exist only on the wire

#[derive(Deserialize)]
struct NewProjectRequest {
    #[serde(flatten)]
    project: NewProject,
    #[serde(default)]
    roles: Vec<RoleDelta>,
}

#[derive(Deserialize)]
struct AlterProjectRequest {
    #[serde(flatten)]
    alter: AlterProject,
    #[serde(default)]
    roles: Vec<RoleDelta>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectQuery {
    project_id: ProjectId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssigneesQuery {
    project_id: ProjectId,
    #[serde(default)]
    role_id: Option<RoleId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BacklogQuery {
    backlog_id: BacklogId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserQuery {
    user_id: UserId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkQuery {
    work_id: WorkId,
}

// Handlers

async fn login(State(steward): State<Steward>, Payload(credentials): Payload<Credentials>) -> Result<Relayed, ApiError> {
    match steward.login(&credentials).await {
        Ok(user) => Ok(Relayed(user)),
        Err(err) => {
            let err = ApiError::from(err);
            match err.kind() {
                ErrorKind::NotFound => Err(err.with_status(StatusCode::UNAUTHORIZED)),
                _ => Err(err),
            }
        }
    }
}

async fn post_new_project(State(steward): State<Steward>, Payload(request): Payload<NewProjectRequest>) -> Result<impl IntoResponse, ApiError> {
    let project_id = steward.create_project_with_roles(&request.project, &request.roles).await?;
    info!("postNewProject: {}", project_id);
    Ok(Json(json!({ "projectId": project_id })))
}

async fn get_projects(State(steward): State<Steward>) -> Result<Relayed, ApiError> { Ok(Relayed(steward.list_projects().await?)) }

async fn put_alter_project(State(steward): State<Steward>, Payload(request): Payload<AlterProjectRequest>) -> Result<impl IntoResponse, ApiError> {
    if request.roles.is_empty() {
        steward.update_project(&request.alter).await?;
    } else {
        steward.update_project_with_roles(&request.alter, &request.roles).await?;
    }
    Ok(ok())
}

async fn get_user_roles(State(steward): State<Steward>, Params(query): Params<ProjectQuery>) -> Result<Relayed, ApiError> {
    Ok(Relayed(steward.list_user_roles(query.project_id).await?))
}

async fn put_user_role(State(steward): State<Steward>, Payload(change): Payload<UserRoleChange>) -> Result<impl IntoResponse, ApiError> {
    steward.set_user_role(&change).await?;
    Ok(ok())
}

async fn get_project_assignees(State(steward): State<Steward>, Params(query): Params<AssigneesQuery>) -> Result<Relayed, ApiError> {
    Ok(Relayed(steward.list_project_assignees(query.project_id, query.role_id).await?))
}

async fn get_backlogs(State(steward): State<Steward>, Params(query): Params<ProjectQuery>) -> Result<Relayed, ApiError> {
    Ok(Relayed(steward.list_backlogs(query.project_id).await?))
}

async fn post_new_backlog(State(steward): State<Steward>, Payload(backlog): Payload<NewBacklog>) -> Result<impl IntoResponse, ApiError> {
    let backlog_id = steward.create_backlog(&backlog).await?;
    Ok(Json(json!({ "backlogId": backlog_id })))
}

async fn put_alter_backlog(State(steward): State<Steward>, Payload(alter): Payload<AlterBacklog>) -> Result<impl IntoResponse, ApiError> {
    steward.update_backlog(&alter).await?;
    Ok(ok())
}

async fn post_new_work(State(steward): State<Steward>, Payload(work): Payload<NewWork>) -> Result<impl IntoResponse, ApiError> {
    let work_id = steward.create_work(&work).await?;
    Ok(Json(json!({ "workId": work_id })))
}

async fn get_works(State(steward): State<Steward>, Params(query): Params<BacklogQuery>) -> Result<Relayed, ApiError> {
    Ok(Relayed(steward.list_works(query.backlog_id).await?))
}

async fn put_alter_work(State(steward): State<Steward>, Payload(alter): Payload<AlterWork>) -> Result<impl IntoResponse, ApiError> {
    steward.update_work(&alter).await?;
    Ok(ok())
}

async fn get_user_todos(State(steward): State<Steward>, Params(query): Params<UserQuery>) -> Result<Relayed, ApiError> {
    Ok(Relayed(steward.list_user_todos(query.user_id).await?))
}

async fn get_work_assignees(State(steward): State<Steward>, Params(query): Params<WorkQuery>) -> Result<Relayed, ApiError> {
    Ok(Relayed(steward.list_work_assignees(query.work_id).await?))
}

async fn put_user_work(State(steward): State<Steward>, Payload(change): Payload<UserWorkChange>) -> Result<impl IntoResponse, ApiError> {
    steward.set_work_assignment(&change).await?;
    Ok(ok())
}

async fn get_usernames(State(steward): State<Steward>) -> Result<Relayed, ApiError> { Ok(Relayed(steward.list_usernames().await?)) }

async fn get_reference_data(State(steward): State<Steward>) -> Result<Relayed, ApiError> {
    Ok(Relayed(steward.list_reference_data().await?))
}
