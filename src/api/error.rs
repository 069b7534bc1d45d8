use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::error::FlowError;

/// Every failed request answers with this body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug)]
pub enum ApiError {
    Flow(FlowError),
    BadRequest { message: String, details: Option<Value> },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Flow(FlowError::UnknownModule(_) | FlowError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Flow(FlowError::Validation { .. } | FlowError::InvalidQuery(_)) => StatusCode::BAD_REQUEST,
            ApiError::Flow(FlowError::DuplicateId { .. }) => StatusCode::CONFLICT,
            ApiError::Flow(FlowError::Storage { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        ApiError::Flow(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest {
            message: "Invalid JSON body".into(),
            details: Some(Value::String(rejection.body_text())),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest {
            message: "Invalid query string".into(),
            details: Some(Value::String(rejection.body_text())),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Flow(FlowError::Validation { message, details }) => ErrorBody {
                error: message,
                details: serde_json::to_value(details).ok(),
            },
            ApiError::Flow(err @ FlowError::Storage { .. }) => {
                error!(error = %err, "storage failure");
                ErrorBody {
                    error: "Internal Server Error".into(),
                    details: Some(Value::String(err.to_string())),
                }
            }
            ApiError::Flow(err) => ErrorBody {
                error: err.to_string(),
                details: None,
            },
            ApiError::BadRequest { message, details } => ErrorBody { error: message, details },
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Entity, FieldError};

    #[test]
    fn statuses_follow_the_error_kind() {
        let cases = [
            (FlowError::UnknownModule("x".into()), StatusCode::NOT_FOUND),
            (FlowError::not_found(Entity::Flow, "f"), StatusCode::NOT_FOUND),
            (FlowError::InvalidQuery("short".into()), StatusCode::BAD_REQUEST),
            (
                FlowError::DuplicateId {
                    entity: Entity::Flow,
                    id: "A".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                FlowError::storage("/x.json", std::io::Error::other("disk")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn validation_details_are_field_errors() {
        let err = ApiError::from(FlowError::Validation {
            message: "Invalid flow data".into(),
            details: vec![FieldError {
                path: "/steps".into(),
                message: "required".into(),
            }],
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
