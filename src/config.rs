//! Application settings shared through Leptos context.

pub const DEFAULT_API_URL: &str = "http://localhost:8805";

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
	/// Backend origin without a trailing slash.
	pub api_url: String,
	/// Where an expired session is sent.
	pub login_path: String,
	/// Records per `/api/import/execute` call.
	pub import_batch_size: usize,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self::with_api_url(option_env!("INVENTORY_API_URL").unwrap_or(DEFAULT_API_URL))
	}
}

impl AppConfig {
	pub fn with_api_url(url: &str) -> Self {
		Self {
			api_url: url.trim().trim_end_matches('/').to_string(),
			login_path: "/login".to_string(),
			import_batch_size: 50,
		}
	}

	pub fn url(&self, path: &str) -> String {
		format!("{}{}", self.api_url, path)
	}
}
