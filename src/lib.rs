//! Leptos client-side app for browsing an AWS resource inventory.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info};
// browser tests only build for wasm32
#[cfg(all(test, not(target_arch = "wasm32")))]
use wasm_bindgen_test as _;

// Modules
mod api;
mod components;
mod config;
mod error;
mod layout;
mod model;
mod pages;
mod style;

// Top-Level pages
use crate::api::{ApiClient, Session};
use crate::config::AppConfig;
use crate::pages::architecture::Architecture;
use crate::pages::import::Import;
use crate::pages::insights::Insights;
use crate::pages::login::Login;
use crate::pages::navigator::Navigator;
use crate::pages::not_found::NotFound;
use crate::pages::relationships::Relationships;
use crate::pages::resources::Resources;
use crate::pages::{CurrentUser, NavBar};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}

/// Routes for the inventory views. The backend client and settings are
/// provided once here and read by every page through context.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let config = AppConfig::default();
	info!("using backend at {}", config.api_url);
	let api = ApiClient::new(config.clone(), Session::browser());
	let user = CurrentUser::new();
	user.refresh(api.clone());
	provide_context(api);
	provide_context(user);
	provide_context(config);

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />

		<Title text="Inventory Canvas" />

		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<NavBar />
			<main>
				<Routes fallback=|| view! { <NotFound /> }>
					<Route path=path!("/login") view=Login />
					<Route path=path!("/") view=Architecture />
					<Route path=path!("/navigator") view=Navigator />
					<Route path=path!("/relationships") view=Relationships />
					<Route path=path!("/resources") view=Resources />
					<Route path=path!("/import") view=Import />
					<Route path=path!("/insights") view=Insights />
				</Routes>
			</main>
		</Router>
	}
}
