use leptos::ev::SubmitEvent;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_navigate;

use super::{CurrentUser, ErrorBanner, use_api};
use crate::api::{Credentials, Registration};

/// Sign-in form, with a toggle for creating an account first.
#[component]
pub fn Login() -> impl IntoView {
	let api = use_api();
	let navigate = use_navigate();
	let user = expect_context::<CurrentUser>();

	let email = RwSignal::new(String::new());
	let username = RwSignal::new(String::new());
	let password = RwSignal::new(String::new());
	let registering = RwSignal::new(false);
	let busy = RwSignal::new(false);
	let error = RwSignal::new(None::<String>);

	let on_submit = move |ev: SubmitEvent| {
		ev.prevent_default();
		if busy.get_untracked() {
			return;
		}
		busy.set(true);
		error.set(None);

		let (api, navigate) = (api.clone(), navigate.clone());
		let (email, password) = (email.get_untracked(), password.get_untracked());
		let register = registering.get_untracked().then(|| Registration {
			email: email.clone(),
			username: username.get_untracked(),
			password: password.clone(),
		});
		spawn_local(async move {
			let result = match register {
				Some(registration) => api.register(&registration).await,
				None => api.login(&Credentials { email, password }).await,
			};
			busy.set(false);
			match result {
				Ok(_) => {
					user.refresh(api);
					navigate("/", Default::default());
				}
				Err(err) => error.set(Some(err.to_string())),
			}
		});
	};

	view! {
		<div class="auth-page">
			<form class="auth-form" on:submit=on_submit>
				<h1>{move || if registering.get() { "Create account" } else { "Sign in" }}</h1>
				<ErrorBanner error=error />
				<label>
					"Email"
					<input
						type="email"
						required
						prop:value=move || email.get()
						on:input=move |ev| email.set(event_target_value(&ev))
					/>
				</label>
				<Show when=move || registering.get()>
					<label>
						"Username"
						<input
							type="text"
							minlength="3"
							prop:value=move || username.get()
							on:input=move |ev| username.set(event_target_value(&ev))
						/>
					</label>
				</Show>
				<label>
					"Password"
					<input
						type="password"
						required
						prop:value=move || password.get()
						on:input=move |ev| password.set(event_target_value(&ev))
					/>
				</label>
				<button type="submit" disabled=move || busy.get()>
					{move || match (busy.get(), registering.get()) {
						(true, _) => "Please wait...",
						(false, true) => "Register",
						(false, false) => "Sign in",
					}}
				</button>
				<button
					type="button"
					class="link"
					on:click=move |_| registering.update(|r| *r = !*r)
				>
					{move || {
						if registering.get() {
							"Have an account? Sign in"
						} else {
							"No account? Register"
						}
					}}
				</button>
			</form>
		</div>
	}
}
