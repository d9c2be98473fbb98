//! REST API types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{ServerError, SessionError};
use crate::import::{ImportSession, RowUpdate};
use crate::models::{ImportRow, ImportSummary, RowStatus, Stage};

/// Row counts per status, for the preview table header.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub valid: usize,
    pub invalid: usize,
    pub duplicate: usize,
    pub success: usize,
    pub error: usize,
}

impl StatusCounts {
    pub fn from_rows(rows: &[ImportRow]) -> Self {
        rows.iter().fold(
            Self {
                total: rows.len(),
                ..Self::default()
            },
            |mut counts, row| {
                match row.status {
                    RowStatus::Pending => counts.pending += 1,
                    RowStatus::Valid => counts.valid += 1,
                    RowStatus::Invalid => counts.invalid += 1,
                    RowStatus::Duplicate => counts.duplicate += 1,
                    RowStatus::Success => counts.success += 1,
                    RowStatus::Error => counts.error += 1,
                }
                counts
            },
        )
    }
}

/// Session snapshot returned by every session endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session: ImportSession,
    pub counts: StatusCounts,
}

impl From<ImportSession> for SessionResponse {
    fn from(session: ImportSession) -> Self {
        let counts = StatusCounts::from_rows(session.rows());
        Self { session, counts }
    }
}

/// Answer of `POST /api/session/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub session_id: Uuid,
    pub stage: Stage,
    /// Rows that will be sent to the directory
    pub total: usize,
}

/// Import events pushed on the SSE stream next to the logs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ImportEvent {
    /// One row was attempted
    #[serde(rename_all = "camelCase")]
    Progress { session_id: Uuid, update: RowUpdate },
    /// The last row was attempted
    #[serde(rename_all = "camelCase")]
    Completed { session_id: Uuid, summary: ImportSummary },
}

/// Create an error response body
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Session(SessionError::Parse(_)) => StatusCode::BAD_REQUEST,
            ServerError::Session(SessionError::RowOutOfRange { .. }) => StatusCode::NOT_FOUND,
            ServerError::Session(_) => StatusCode::CONFLICT,
            ServerError::Directory(_) => StatusCode::BAD_GATEWAY,
            ServerError::RunInProgress => StatusCode::CONFLICT,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(error_response(&self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LinkError, ParseError};
    use crate::validation::Roster;

    #[test]
    fn test_counts_from_session() {
        let mut session = ImportSession::new();
        session
            .load_text("email\na@b.com\nnot-an-email\nA@B.com", &Roster::default())
            .unwrap();

        let response = SessionResponse::from(session);
        assert_eq!(
            response.counts,
            StatusCounts { total: 3, valid: 1, invalid: 1, duplicate: 1, ..StatusCounts::default() }
        );

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["session"]["stage"], "preview");
        assert_eq!(json["session"]["progressPercent"], 0);
        assert_eq!(json["session"]["rows"][2]["message"], "Duplicate entry in file");
    }

    #[test]
    fn test_error_status_codes() {
        let parse: ServerError = SessionError::Parse(ParseError::NoEmailsFound).into();
        assert_eq!(parse.status_code(), StatusCode::BAD_REQUEST);

        let guard: ServerError = SessionError::NoValidRows.into();
        assert_eq!(guard.status_code(), StatusCode::CONFLICT);

        assert_eq!(ServerError::RunInProgress.status_code(), StatusCode::CONFLICT);

        let upstream: ServerError = LinkError::Timeout.into();
        assert_eq!(upstream.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_event_wire_format() {
        let event = ImportEvent::Completed {
            session_id: Uuid::nil(),
            summary: ImportSummary { total: 1, successful: 1, ..ImportSummary::default() },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "completed");
        assert_eq!(json["summary"]["successful"], 1);
        assert!(json.get("sessionId").is_some());
    }
}
