pub mod architecture;
pub mod import;
pub mod insights;
pub mod login;
pub mod navigator;
pub mod not_found;
pub mod relationships;
pub mod resources;

use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::components::A;
use leptos_router::hooks::use_navigate;

use crate::api::{ApiClient, User};
use crate::error::ApiError;
use crate::model::{Relationship, Resource};

pub(crate) fn use_api() -> ApiClient {
	expect_context::<ApiClient>()
}

/// Send visitors without a token to the login page. Returns whether the
/// page may load data.
pub(crate) fn require_session(api: &ApiClient) -> bool {
	if api.session().is_authenticated() {
		return true;
	}
	let navigate = use_navigate();
	let login = api.config().login_path.clone();
	request_animation_frame(move || navigate(&login, Default::default()));
	false
}

pub(crate) fn alert(message: &str) {
	if let Some(window) = web_sys::window() {
		let _ = window.alert_with_message(message);
	}
}

pub(crate) fn confirm(message: &str) -> bool {
	web_sys::window()
		.and_then(|w| w.confirm_with_message(message).ok())
		.unwrap_or(false)
}

/// Signals a page keeps for the inventory it draws.
#[derive(Clone, Copy)]
pub(crate) struct Inventory {
	pub resources: RwSignal<Vec<Resource>>,
	pub relationships: RwSignal<Vec<Relationship>>,
	pub loading: RwSignal<bool>,
	pub error: RwSignal<Option<String>>,
}

impl Inventory {
	pub fn new() -> Self {
		Self {
			resources: RwSignal::new(Vec::new()),
			relationships: RwSignal::new(Vec::new()),
			loading: RwSignal::new(false),
			error: RwSignal::new(None),
		}
	}

	/// Fetch resources and relationships together. Responses are applied
	/// whenever they arrive.
	pub fn load(self, api: ApiClient) {
		self.loading.set(true);
		self.error.set(None);
		spawn_local(async move {
			let (resources, relationships) = futures::join!(api.resources(), api.relationships());
			match resources {
				Ok(resources) => self.resources.set(resources),
				Err(err) => {
					log::warn!("loading resources failed: {err}");
					self.error.set(Some(err.to_string()));
				}
			}
			match relationships {
				Ok(relationships) => self.relationships.set(relationships),
				Err(err) => {
					log::warn!("loading relationships failed: {err}");
					self.error.set(Some(err.to_string()));
				}
			}
			self.loading.set(false);
		});
	}
}

/// The signed-in user, looked up with `/auth/me` once a session exists.
#[derive(Clone, Copy)]
pub(crate) struct CurrentUser(pub RwSignal<Option<User>>);

impl CurrentUser {
	pub fn new() -> Self {
		Self(RwSignal::new(None))
	}

	/// Look the user up again. A stale session clears the stored tokens.
	pub fn refresh(self, api: ApiClient) {
		if !api.session().is_authenticated() {
			self.0.set(None);
			return;
		}
		spawn_local(async move {
			match api.me().await {
				Ok(user) => self.0.set(Some(user)),
				Err(ApiError::Unauthorized) => self.0.set(None),
				Err(err) => log::warn!("looking up the signed-in user failed: {err}"),
			}
		});
	}
}

/// Links to every view plus the signed-in user and a sign-out button.
#[component]
pub fn NavBar() -> impl IntoView {
	let api = use_api();
	let user = expect_context::<CurrentUser>();
	let navigate = use_navigate();
	let login = api.config().login_path.clone();

	let sign_out = move |_| {
		api.logout();
		user.0.set(None);
		navigate(&login, Default::default());
	};

	view! {
		<nav class="top-nav">
			<A href="/">"Architecture"</A>
			<A href="/navigator">"Navigator"</A>
			<A href="/relationships">"Relationships"</A>
			<A href="/resources">"Resources"</A>
			<A href="/import">"Import"</A>
			<A href="/insights">"AI Insights"</A>
			<span class="spacer"></span>
			{move || {
				user.0
					.get()
					.map(|u| {
						let name = if u.username.is_empty() { u.email } else { u.username };
						view! { <span class="user">{name}</span> }
					})
			}}
			<button
				class="link"
				style:display=move || if user.0.with(|u| u.is_some()) { "inline" } else { "none" }
				on:click=sign_out
			>
				"Sign out"
			</button>
		</nav>
	}
}

#[component]
pub fn ErrorBanner(#[prop(into)] error: Signal<Option<String>>) -> impl IntoView {
	move || error.get().map(|e| view! { <div class="error-banner">{e}</div> })
}
