//! Errors surfaced to pages by the HTTP client.

use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum ApiError {
	#[error("network error: {0}")]
	Network(String),
	#[error("request failed ({status}): {detail}")]
	Http { status: u16, detail: String },
	#[error("session expired, please sign in again")]
	Unauthorized,
	#[error("unexpected response: {0}")]
	Decode(String),
	#[error("browser window unavailable")]
	NoWindow,
	#[error("token storage unavailable: {0}")]
	Storage(String),
	#[error("{0}")]
	Invalid(String),
}

impl From<serde_json::Error> for ApiError {
	fn from(err: serde_json::Error) -> Self {
		ApiError::Decode(err.to_string())
	}
}

#[derive(Deserialize)]
struct ErrorBody {
	detail: serde_json::Value,
}

impl ApiError {
	/// Error for a non-success response. Uses the backend's `detail` field
	/// when present, else the raw body.
	pub fn from_response(status: u16, body: &str) -> Self {
		let detail = match serde_json::from_str::<ErrorBody>(body) {
			Ok(ErrorBody { detail: serde_json::Value::String(s) }) => s,
			Ok(ErrorBody { detail }) => detail.to_string(),
			Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
			Err(_) => body.trim().to_string(),
		};
		ApiError::Http { status, detail }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn detail_is_taken_from_json_body() {
		let err = ApiError::from_response(400, r#"{"detail":"Email already registered"}"#);
		assert_eq!(err, ApiError::Http { status: 400, detail: "Email already registered".into() });
		assert_eq!(err.to_string(), "request failed (400): Email already registered");
	}

	#[test]
	fn non_json_bodies_fall_back_to_text_or_status() {
		assert_eq!(
			ApiError::from_response(502, "Bad Gateway\n"),
			ApiError::Http { status: 502, detail: "Bad Gateway".into() }
		);
		assert_eq!(
			ApiError::from_response(500, ""),
			ApiError::Http { status: 500, detail: "HTTP 500".into() }
		);
	}

	#[test]
	fn structured_detail_is_kept_as_json() {
		let err = ApiError::from_response(422, r#"{"detail":[{"loc":["body","name"]}]}"#);
		let ApiError::Http { detail, .. } = err else {
			panic!("expected http error");
		};
		assert!(detail.starts_with('['));
	}
}
