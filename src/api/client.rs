//! HTTP plumbing: bearer auth, 401 refresh-and-retry, JSON decoding.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::FormData;

use super::session::{Session, TokenPair};
use crate::config::AppConfig;
use crate::error::ApiError;

pub enum Body {
	Empty,
	Json(String),
	/// Multipart upload; the browser sets the boundary header.
	Form(FormData),
}

pub struct HttpRequest {
	pub method: &'static str,
	pub url: String,
	pub bearer: Option<String>,
	pub body: Body,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
	pub status: u16,
	pub text: String,
}

impl HttpResponse {
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Sends one request and reads the whole body.
pub trait Transport {
	fn send(&self, request: &HttpRequest) -> impl Future<Output = Result<HttpResponse, ApiError>>;
}

/// `window.fetch` transport.
#[derive(Clone, Copy, Debug, Default)]
pub struct Fetch;

fn js_err(context: &str) -> impl Fn(JsValue) -> ApiError + '_ {
	move |e| ApiError::Network(format!("{context}: {e:?}"))
}

impl Transport for Fetch {
	async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
		use wasm_bindgen_futures::JsFuture;
		use web_sys::{Headers, Request, RequestInit, RequestMode, Response};

		let headers = Headers::new().map_err(js_err("headers"))?;
		if let Some(token) = &request.bearer {
			headers
				.set("Authorization", &format!("Bearer {token}"))
				.map_err(js_err("headers"))?;
		}

		let opts = RequestInit::new();
		opts.set_method(request.method);
		opts.set_mode(RequestMode::Cors);
		match &request.body {
			Body::Empty => {}
			Body::Json(json) => {
				headers
					.set("Content-Type", "application/json")
					.map_err(js_err("headers"))?;
				opts.set_body(&JsValue::from_str(json));
			}
			Body::Form(form) => opts.set_body(form),
		}
		opts.set_headers(&headers);

		let req = Request::new_with_str_and_init(&request.url, &opts).map_err(js_err("request"))?;
		let window = web_sys::window().ok_or(ApiError::NoWindow)?;
		let resp: Response = JsFuture::from(window.fetch_with_request(&req))
			.await
			.map_err(js_err("fetch"))?
			.dyn_into()
			.map_err(js_err("response"))?;
		let text = JsFuture::from(resp.text().map_err(js_err("body"))?)
			.await
			.map_err(js_err("body"))?
			.as_string()
			.unwrap_or_default();

		Ok(HttpResponse { status: resp.status(), text })
	}
}

fn hard_redirect(path: &str) {
	if let Some(window) = web_sys::window() {
		let _ = window.location().set_href(path);
	}
}

/// Backend client shared through context. Cloning is cheap; clones share
/// the session and its refresh guard.
#[derive(Clone)]
pub struct ApiClient<T = Fetch> {
	transport: T,
	config: AppConfig,
	session: Session,
	on_expired: Arc<dyn Fn(&str) + Send + Sync>,
}

impl ApiClient<Fetch> {
	pub fn new(config: AppConfig, session: Session) -> Self {
		Self::with_transport(Fetch, config, session)
	}
}

impl<T: Transport> ApiClient<T> {
	pub fn with_transport(transport: T, config: AppConfig, session: Session) -> Self {
		Self { transport, config, session, on_expired: Arc::new(hard_redirect) }
	}

	/// Replace the navigation done when the session cannot be refreshed.
	pub fn on_expired(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
		self.on_expired = Arc::new(f);
		self
	}

	pub fn session(&self) -> &Session {
		&self.session
	}

	pub fn config(&self) -> &AppConfig {
		&self.config
	}

	fn request(
		&self,
		method: &'static str,
		path: &str,
		body: Body,
		bearer: Option<String>,
	) -> HttpRequest {
		HttpRequest { method, url: self.config.url(path), bearer, body }
	}

	fn expire(&self) {
		log::warn!("session expired, redirecting to {}", self.config.login_path);
		self.session.clear();
		(self.on_expired)(&self.config.login_path);
	}

	async fn refresh_once(&self) -> Result<String, ApiError> {
		let Some(refresh_token) = self.session.refresh_token() else {
			self.expire();
			return Err(ApiError::Unauthorized);
		};
		let body = serde_json::to_string(&serde_json::json!({ "refresh_token": refresh_token }))?;
		let request = self.request("POST", "/auth/refresh", Body::Json(body), None);
		let tokens = match self.transport.send(&request).await {
			Ok(resp) if resp.is_success() => serde_json::from_str::<TokenPair>(&resp.text).ok(),
			Ok(resp) => {
				log::warn!("token refresh rejected with {}", resp.status);
				None
			}
			Err(err) => {
				log::warn!("token refresh failed: {err}");
				None
			}
		};
		match tokens {
			Some(tokens) => {
				self.session.save(&tokens)?;
				Ok(tokens.access_token)
			}
			None => {
				self.expire();
				Err(ApiError::Unauthorized)
			}
		}
	}

	/// Send with the stored token. A 401 triggers one shared refresh and a
	/// single retry with the new token.
	async fn send_authed(
		&self,
		method: &'static str,
		path: &str,
		body: Body,
	) -> Result<String, ApiError> {
		let first = self.request(method, path, body, self.session.access_token());
		let resp = self.transport.send(&first).await?;
		if resp.status != 401 {
			return read(resp);
		}

		let token = self.session.gate().run(|| self.refresh_once()).await?;
		let retry = HttpRequest { bearer: Some(token), ..first };
		let resp = self.transport.send(&retry).await?;
		if resp.status == 401 {
			return Err(ApiError::Unauthorized);
		}
		read(resp)
	}

	/// Send without credentials, as the auth endpoints expect.
	pub(crate) async fn send_public<B: Serialize, R: DeserializeOwned>(
		&self,
		method: &'static str,
		path: &str,
		body: &B,
	) -> Result<R, ApiError> {
		let request = self.request(method, path, Body::Json(serde_json::to_string(body)?), None);
		let text = read(self.transport.send(&request).await?)?;
		Ok(serde_json::from_str(&text)?)
	}

	pub(crate) async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
		let text = self.send_authed("GET", path, Body::Empty).await?;
		Ok(serde_json::from_str(&text)?)
	}

	pub(crate) async fn send_json<B: Serialize, R: DeserializeOwned>(
		&self,
		method: &'static str,
		path: &str,
		body: &B,
	) -> Result<R, ApiError> {
		let body = Body::Json(serde_json::to_string(body)?);
		let text = self.send_authed(method, path, body).await?;
		Ok(serde_json::from_str(&text)?)
	}

	pub(crate) async fn send_form<R: DeserializeOwned>(
		&self,
		path: &str,
		form: FormData,
	) -> Result<R, ApiError> {
		let text = self.send_authed("POST", path, Body::Form(form)).await?;
		Ok(serde_json::from_str(&text)?)
	}

	/// Request whose success response carries no body, e.g. 204 on delete.
	pub(crate) async fn send_empty(
		&self,
		method: &'static str,
		path: &str,
	) -> Result<(), ApiError> {
		self.send_authed(method, path, Body::Empty).await.map(|_| ())
	}
}

fn read(resp: HttpResponse) -> Result<String, ApiError> {
	if resp.is_success() {
		Ok(resp.text)
	} else {
		Err(ApiError::from_response(resp.status, &resp.text))
	}
}


#[cfg(test)]
mod tests {
	use std::sync::Mutex;

	use futures::executor::block_on;

	use super::testing::Scripted;
	use super::*;
	use crate::api::session::MemoryTokens;

	fn client(transport: Scripted) -> (ApiClient<Scripted>, Arc<Mutex<Vec<String>>>) {
		let session = Session::new(MemoryTokens::default());
		session
			.save(&TokenPair {
				access_token: "old".into(),
				refresh_token: Some("r".into()),
				token_type: None,
			})
			.unwrap();
		let redirects = Arc::new(Mutex::new(Vec::new()));
		let seen = redirects.clone();
		let config = AppConfig::with_api_url("http://api");
		let client = ApiClient::with_transport(transport, config, session)
			.on_expired(move |path| seen.lock().unwrap().push(path.to_string()));
		(client, redirects)
	}

	#[test]
	fn unauthorized_refreshes_then_retries_once() {
		let transport = Scripted::default();
		transport
			.reply(401, "")
			.reply(200, r#"{"access_token":"new","refresh_token":"r2"}"#)
			.reply(200, "[]");
		let (client, redirects) = client(transport.clone());

		let out: Vec<serde_json::Value> = block_on(client.get("/api/relationships/")).unwrap();
		assert!(out.is_empty());

		let log = transport.log();
		assert_eq!(log.len(), 3);
		assert_eq!(log[0].2.as_deref(), Some("old"));
		assert_eq!(log[1].1, "http://api/auth/refresh");
		assert_eq!(log[1].2, None);
		assert_eq!(log[1].3.as_deref(), Some(r#"{"refresh_token":"r"}"#));
		assert_eq!(log[2].2.as_deref(), Some("new"));
		assert_eq!(client.session().refresh_token().as_deref(), Some("r2"));
		assert!(redirects.lock().unwrap().is_empty());
	}

	#[test]
	fn second_unauthorized_is_not_retried_again() {
		let transport = Scripted::default();
		transport
			.reply(401, "")
			.reply(200, r#"{"access_token":"new"}"#)
			.reply(401, "");
		let (client, _) = client(transport.clone());
		let out: Result<serde_json::Value, _> = block_on(client.get("/auth/me"));
		assert_eq!(out, Err(ApiError::Unauthorized));
		assert_eq!(transport.log().len(), 3);
	}

	#[test]
	fn failed_refresh_clears_tokens_and_redirects() {
		let transport = Scripted::default();
		transport.reply(401, "").reply(401, r#"{"detail":"expired"}"#);
		let (client, redirects) = client(transport);
		let out: Result<serde_json::Value, _> = block_on(client.get("/api/resources/"));
		assert_eq!(out, Err(ApiError::Unauthorized));
		assert_eq!(client.session().access_token(), None);
		assert_eq!(client.session().refresh_token(), None);
		assert_eq!(*redirects.lock().unwrap(), vec!["/login".to_string()]);
	}

	#[test]
	fn http_errors_carry_backend_detail() {
		let transport = Scripted::default();
		transport.reply(404, r#"{"detail":"Relationship not found"}"#);
		let (client, _) = client(transport);
		let out = block_on(client.send_empty("DELETE", "/api/relationships/9"));
		assert_eq!(
			out,
			Err(ApiError::Http { status: 404, detail: "Relationship not found".into() })
		);
	}
}
