//! API error type with HTTP status mapping.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Json, Response},
};
use permit_core::PermitError;
use permit_verifier::VerifierError;
use serde::Serialize;
use std::fmt;

/// Body of every error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
	#[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
	pub retry_after: Option<u64>,
}

#[derive(Debug)]
pub enum ApiError {
	/// 400
	BadRequest { error_type: String, message: String },
	/// 422: understood but refused, e.g. a rejected permit.
	UnprocessableEntity {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// 503
	ServiceUnavailable {
		error_type: String,
		message: String,
		retry_after: Option<u64>,
	},
	/// 500
	InternalServerError { error_type: String, message: String },
}

impl ApiError {
	pub fn status_code(&self) -> StatusCode {
		match self {
			ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
			ApiError::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
			ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
			ApiError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	pub fn to_error_response(&self) -> ErrorResponse {
		match self {
			ApiError::BadRequest {
				error_type,
				message,
			}
			| ApiError::InternalServerError {
				error_type,
				message,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: None,
				retry_after: None,
			},
			ApiError::UnprocessableEntity {
				error_type,
				message,
				details,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: details.clone(),
				retry_after: None,
			},
			ApiError::ServiceUnavailable {
				error_type,
				message,
				retry_after,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: None,
				retry_after: *retry_after,
			},
		}
	}
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let response = self.to_error_response();
		write!(f, "{} ({}): {}", self.status_code(), response.error, response.message)
	}
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(self.status_code(), Json(self.to_error_response())).into_response()
	}
}

impl From<PermitError> for ApiError {
	fn from(e: PermitError) -> Self {
		let message = e.to_string();
		match e {
			PermitError::IncompleteInput(_) => ApiError::BadRequest {
				error_type: "INCOMPLETE_INPUT".to_string(),
				message,
			},
			PermitError::MalformedArtifact(_) | PermitError::Codec(_) => ApiError::BadRequest {
				error_type: "MALFORMED_ARTIFACT".to_string(),
				message,
			},
			PermitError::SigningDeclined(_) => ApiError::UnprocessableEntity {
				error_type: "SIGNING_DECLINED".to_string(),
				message,
				details: None,
			},
			PermitError::Rejected(reason) => ApiError::UnprocessableEntity {
				error_type: "PERMIT_REJECTED".to_string(),
				message,
				details: serde_json::to_value(&reason).ok(),
			},
			PermitError::ChainMismatch { expected, actual } => ApiError::UnprocessableEntity {
				error_type: "CHAIN_MISMATCH".to_string(),
				message,
				details: Some(serde_json::json!({ "expected": expected, "actual": actual })),
			},
			PermitError::SignerUnavailable(_) => ApiError::ServiceUnavailable {
				error_type: "SIGNER_UNAVAILABLE".to_string(),
				message,
				retry_after: None,
			},
			PermitError::Timeout { .. } | PermitError::Verifier(VerifierError::Network(_)) => {
				ApiError::ServiceUnavailable {
					error_type: "CHAIN_UNAVAILABLE".to_string(),
					message,
					retry_after: Some(5),
				}
			},
			PermitError::Verifier(_) | PermitError::Config(_) => ApiError::InternalServerError {
				error_type: "INTERNAL_ERROR".to_string(),
				message,
			},
		}
	}
}

impl From<VerifierError> for ApiError {
	fn from(e: VerifierError) -> Self {
		PermitError::from(e).into()
	}
}
