use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use steward_core::error::{CompositeError, CreationError, QueryError, ReconcileError, UpdateError, ValidationError};
use steward_core::model::{ProjectId, RoleId};
use steward_core::{Classify, ErrorKind};
use tracing::{debug, error};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_id: Option<ProjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_role_id: Option<RoleId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_role_ids: Option<Vec<RoleId>>,
}

/// A failed request: `{"error": <message>, "kind": <kind>}` with a status derived from the kind.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(kind: ErrorKind, message: String) -> Self {
        let body = ErrorBody { error: message, kind, project_id: None, failed_role_id: None, pending_role_ids: None };
        Self { status: status_of(kind), body }
    }

    fn classified<E: Classify + std::fmt::Display>(err: &E) -> Self {
        match err.kind() {
            ErrorKind::Internal | ErrorKind::PartialCreation => error!("request failed: {}", err),
            _ => debug!("request rejected: {}", err),
        }
        Self::new(err.kind(), err.user_message())
    }

    /// Body or query string that could not be decoded.
    pub fn invalid_input(detail: impl std::fmt::Display) -> Self {
        debug!("request rejected: {}", detail);
        Self::new(ErrorKind::Validation, format!("Invalid input: {detail}"))
    }

    pub fn missing_parameters(detail: impl std::fmt::Display) -> Self {
        debug!("request rejected: {}", detail);
        Self::new(ErrorKind::Validation, format!("Missing query parameters: {detail}"))
    }

    pub fn kind(&self) -> ErrorKind { self.body.kind }

    pub fn status(&self) -> StatusCode { self.status }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

fn status_of(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Constraint | ErrorKind::PartialCreation => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

macro_rules! classified {
    ($($err:ty),*) => {
        $(impl From<$err> for ApiError {
            fn from(err: $err) -> Self { Self::classified(&err) }
        })*
    };
}

classified!(ValidationError, QueryError, ReconcileError, UpdateError, CreationError);

impl From<CompositeError> for ApiError {
    fn from(err: CompositeError) -> Self {
        let mut api = Self::classified(&err);
        if let Some(partial) = err.partial() {
            api.body.project_id = Some(partial.project_id);
            api.body.failed_role_id = Some(partial.failed);
            api.body.pending_role_ids = Some(partial.pending.clone());
        }
        api
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response { (self.status, Json(self.body)).into_response() }
}
