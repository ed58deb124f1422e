//! Typed calls against the inventory backend.

pub mod ai;
pub mod aws;
mod client;
pub mod import;
mod session;

use serde::{Deserialize, Serialize};

pub use client::{ApiClient, Fetch, Transport};
pub use session::{LocalStorageTokens, Session, TokenPair, TokenStore};

use crate::error::ApiError;
use crate::model::{
	NewRelationship, Relationship, RelationshipUpdate, Resource, ResourceDraft, ResourceId,
};

#[derive(Clone, Debug, Serialize)]
pub struct Credentials {
	pub email: String,
	pub password: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Registration {
	pub email: String,
	pub username: String,
	pub password: String,
}

/// Result of asking the backend to derive relationships from resource data.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Extraction {
	#[serde(default)]
	pub message: String,
	#[serde(default)]
	pub count: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct User {
	pub id: i64,
	#[serde(default)]
	pub email: String,
	#[serde(default)]
	pub username: String,
}

impl<T: Transport> ApiClient<T> {
	/// Log in and keep the returned tokens in the session.
	pub async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError> {
		let tokens: TokenPair = self.send_public("POST", "/auth/login", credentials).await?;
		self.session().save(&tokens)?;
		log::info!("signed in as {}", credentials.email);
		Ok(tokens)
	}

	/// Create an account, then log in with it.
	pub async fn register(&self, registration: &Registration) -> Result<TokenPair, ApiError> {
		let _: User = self.send_public("POST", "/auth/register", registration).await?;
		self.login(&Credentials {
			email: registration.email.clone(),
			password: registration.password.clone(),
		})
		.await
	}

	pub async fn me(&self) -> Result<User, ApiError> {
		self.get("/auth/me").await
	}

	/// Forget both tokens. The backend keeps no session to close.
	pub fn logout(&self) {
		self.session().clear();
		log::info!("signed out");
	}

	pub async fn resources(&self) -> Result<Vec<Resource>, ApiError> {
		let resources: Vec<Resource> = self.get("/api/resources/?limit=10000").await?;
		log::info!("loaded {} resources", resources.len());
		Ok(resources)
	}

	pub async fn resource(&self, id: ResourceId) -> Result<Resource, ApiError> {
		self.get(&format!("/api/resources/{id}")).await
	}

	pub async fn create_resource(&self, draft: &ResourceDraft) -> Result<Resource, ApiError> {
		let created: Resource = self.send_json("POST", "/api/resources/", draft).await?;
		log::info!("created resource {} ({})", created.id, created.name);
		Ok(created)
	}

	pub async fn update_resource(
		&self,
		id: ResourceId,
		draft: &ResourceDraft,
	) -> Result<Resource, ApiError> {
		self.send_json("PUT", &format!("/api/resources/{id}"), draft).await
	}

	pub async fn delete_resource(&self, id: ResourceId) -> Result<(), ApiError> {
		self.send_empty("DELETE", &format!("/api/resources/{id}")).await
	}

	pub async fn relationships(&self) -> Result<Vec<Relationship>, ApiError> {
		let relationships: Vec<Relationship> = self.get("/api/relationships/").await?;
		log::info!("loaded {} relationships", relationships.len());
		Ok(relationships)
	}

	pub async fn create_relationship(
		&self,
		body: &NewRelationship,
	) -> Result<Relationship, ApiError> {
		self.send_json("POST", "/api/relationships/", body).await
	}

	pub async fn update_relationship(
		&self,
		id: i64,
		body: &RelationshipUpdate,
	) -> Result<Relationship, ApiError> {
		self.send_json("PUT", &format!("/api/relationships/{id}"), body).await
	}

	pub async fn delete_relationship(&self, id: i64) -> Result<(), ApiError> {
		self.send_empty("DELETE", &format!("/api/relationships/{id}")).await
	}

	pub async fn extract_relationships(&self) -> Result<Extraction, ApiError> {
		let outcome: Extraction = self
			.send_json("POST", "/api/relationships/extract", &serde_json::json!({}))
			.await?;
		log::info!("backend extracted {} relationships", outcome.count);
		Ok(outcome)
	}

	/// Delete each id in turn. Returns the ids that were deleted and the
	/// first error, if any; deletion stops there.
	pub async fn delete_relationships(&self, ids: &[i64]) -> (Vec<i64>, Option<ApiError>) {
		let mut deleted = Vec::with_capacity(ids.len());
		for &id in ids {
			if let Err(err) = self.delete_relationship(id).await {
				log::warn!("deleting relationship {id} failed: {err}");
				return (deleted, Some(err));
			}
			deleted.push(id);
		}
		(deleted, None)
	}
}

#[cfg(test)]
mod tests {
	use futures::executor::block_on;

	use super::client::testing::Scripted;
	use super::session::MemoryTokens;
	use super::*;
	use crate::config::AppConfig;
	use crate::model::ResourceId;

	fn client(transport: &Scripted) -> ApiClient<Scripted> {
		ApiClient::with_transport(
			transport.clone(),
			AppConfig::with_api_url("http://api"),
			Session::new(MemoryTokens::default()),
		)
	}

	#[test]
	fn login_stores_tokens_and_sends_no_bearer() {
		let transport = Scripted::default();
		transport.reply(200, r#"{"access_token":"a","refresh_token":"r","token_type":"bearer"}"#);
		let api = client(&transport);
		let credentials = Credentials { email: "ops@example.com".into(), password: "pw".into() };
		block_on(api.login(&credentials)).unwrap();

		assert_eq!(api.session().access_token().as_deref(), Some("a"));
		let log = transport.log();
		assert_eq!(log[0].0, "POST");
		assert_eq!(log[0].1, "http://api/auth/login");
		assert_eq!(log[0].2, None);
	}

	#[test]
	fn create_posts_backend_shape() {
		let transport = Scripted::default();
		transport.reply(
			201,
			r#"{"id":7,"source_resource_id":1,"target_resource_id":2,"relationship_type":"uses"}"#,
		);
		let api = client(&transport);
		let created = block_on(api.create_relationship(&NewRelationship::between(
			ResourceId(1),
			ResourceId(2),
			"uses",
		)))
		.unwrap();
		assert_eq!(created.id, 7);

		let sent = transport.log().remove(0).3.unwrap();
		let body: serde_json::Value = serde_json::from_str(&sent).unwrap();
		assert_eq!(body["source_resource_id"], 1);
		assert_eq!(body["target_resource_id"], 2);
		assert_eq!(body["direction"], "outbound");
		assert_eq!(body["auto_detected"], false);
	}

	#[test]
	fn resource_crud_uses_resource_paths() {
		let transport = Scripted::default();
		let web = r#"{"id":4,"name":"web","type":"ec2","region":"us-east-1"}"#;
		transport.reply(201, web).reply(200, web).reply(204, "");
		let api = client(&transport);
		let draft = ResourceDraft { name: "web".into(), ..ResourceDraft::default() };

		let created = block_on(api.create_resource(&draft)).unwrap();
		block_on(api.update_resource(created.id, &draft)).unwrap();
		block_on(api.delete_resource(created.id)).unwrap();

		let calls: Vec<(String, String)> =
			transport.log().into_iter().map(|(m, u, _, _)| (m, u)).collect();
		assert_eq!(
			calls,
			vec![
				("POST".to_string(), "http://api/api/resources/".to_string()),
				("PUT".to_string(), "http://api/api/resources/4".to_string()),
				("DELETE".to_string(), "http://api/api/resources/4".to_string()),
			]
		);
		let sent = transport.log().remove(0).3.unwrap();
		let body: serde_json::Value = serde_json::from_str(&sent).unwrap();
		assert_eq!(body["type"], "ec2");
		assert_eq!(body["name"], "web");
	}

	#[test]
	fn extraction_reports_count() {
		let transport = Scripted::default();
		transport.reply(
			200,
			r#"{"message":"Successfully extracted 3 new relationships","count":3}"#,
		);
		let api = client(&transport);
		let outcome = block_on(api.extract_relationships()).unwrap();
		assert_eq!(outcome.count, 3);
		assert_eq!(transport.log()[0].1, "http://api/api/relationships/extract");
	}

	#[test]
	fn me_sends_bearer_and_logout_forgets_tokens() {
		let transport = Scripted::default();
		transport.reply(200, r#"{"id":1,"email":"ops@example.com","username":"ops"}"#);
		let api = client(&transport);
		api.session()
			.save(&TokenPair {
				access_token: "a".into(),
				refresh_token: Some("r".into()),
				token_type: None,
			})
			.unwrap();

		let user = block_on(api.me()).unwrap();
		assert_eq!(user.username, "ops");
		assert_eq!(transport.log()[0].2.as_deref(), Some("a"));

		api.logout();
		assert!(!api.session().is_authenticated());
		assert_eq!(api.session().refresh_token(), None);
	}

	#[test]
	fn bulk_delete_stops_at_first_failure() {
		let transport = Scripted::default();
		transport
			.reply(204, "")
			.reply(404, r#"{"detail":"Relationship not found"}"#)
			.reply(204, "");
		let api = client(&transport);
		let (deleted, err) = block_on(api.delete_relationships(&[3, 4, 5]));
		assert_eq!(deleted, vec![3]);
		assert!(matches!(err, Some(ApiError::Http { status: 404, .. })));
		assert_eq!(transport.log().len(), 2);
		assert_eq!(transport.log()[1].1, "http://api/api/relationships/4");
	}
}
