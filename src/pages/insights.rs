use leptos::prelude::*;
use leptos::task::spawn_local;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::HtmlAnchorElement;

use super::{ErrorBanner, require_session, use_api};
use crate::api::ai::{self, Analysis, ArchitectureSummary, MAX_PROMPT};
use crate::error::ApiError;

const EXAMPLES: &[&str] = &[
	"Which resources are exposed to the internet?",
	"Where could I cut costs?",
	"Are my databases in private subnets?",
];

/// Message shown for a failed analysis. A 503 means the model host is down.
fn failure_message(err: &ApiError) -> String {
	match err {
		ApiError::Http { status: 503, .. } => {
			"The AI service is unavailable right now. Try again later.".to_string()
		}
		other => other.to_string(),
	}
}

fn save_text(file_name: &str, text: &str) -> Result<(), JsValue> {
	let encoded = String::from(js_sys::encode_uri_component(text));
	let url = format!("data:text/plain;charset=utf-8,{encoded}");
	let document = web_sys::window()
		.and_then(|w| w.document())
		.ok_or_else(|| JsValue::from_str("no document"))?;
	let link: HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
	link.set_href(&url);
	link.set_download(file_name);
	link.click();
	Ok(())
}

fn summary_view(s: ArchitectureSummary) -> impl IntoView {
	let lists = [
		("Cost optimization", s.cost_optimization_tips),
		("Security", s.security_recommendations),
		("Best practices", s.best_practices),
	];
	let breakdown = s
		.resource_breakdown
		.into_iter()
		.map(|(kind, n)| view! { <li>{format!("{kind}: {n}")}</li> });
	let sections = lists.into_iter().filter(|(_, items)| !items.is_empty()).map(|(title, items)| {
		let items = items.into_iter().map(|i| view! { <li>{i}</li> });
		view! {
			<h3>{title}</h3>
			<ol>{items.collect_view()}</ol>
		}
	});
	view! {
		<section class="summary">
			<h2>"Architecture summary"</h2>
			<p>{s.architecture_summary}</p>
			<p>{format!("{} resources across {}", s.total_resources, s.regions_used.join(", "))}</p>
			<ul>{breakdown.collect_view()}</ul>
			{sections.collect_view()}
		</section>
	}
}

/// Free-text questions about the inventory, an architecture summary and a
/// report export.
#[component]
pub fn Insights() -> impl IntoView {
	let api = StoredValue::new(use_api());
	require_session(&api.get_value());

	let prompt = RwSignal::new(String::new());
	let asked = RwSignal::new(String::new());
	let analysis = RwSignal::new(None::<Analysis>);
	let summary = RwSignal::new(None::<ArchitectureSummary>);
	let busy = RwSignal::new(false);
	let error = RwSignal::new(None::<String>);

	let on_analyze = move |_| {
		let question = prompt.get_untracked();
		let api = api.get_value();
		busy.set(true);
		error.set(None);
		spawn_local(async move {
			match api.analyze(&question).await {
				Ok(result) => {
					asked.set(question);
					analysis.set(Some(result));
				}
				Err(err) => error.set(Some(failure_message(&err))),
			}
			busy.set(false);
		});
	};

	let on_summary = move |_| {
		let api = api.get_value();
		busy.set(true);
		error.set(None);
		spawn_local(async move {
			match api.summary().await {
				Ok(result) => summary.set(Some(result)),
				Err(err) => error.set(Some(failure_message(&err))),
			}
			busy.set(false);
		});
	};

	let on_download = move |_| {
		let text = analysis.with_untracked(|a| {
			summary.with_untracked(|s| ai::report(&asked.get_untracked(), a.as_ref(), s.as_ref()))
		});
		if let Err(err) = save_text("architecture-insights.txt", &text) {
			log::error!("saving report failed: {err:?}");
		}
	};

	let on_print = move |_| {
		if let Some(Err(err)) = web_sys::window().map(|w| w.print()) {
			log::error!("print failed: {err:?}");
		}
	};

	let has_output = move || analysis.with(|a| a.is_some()) || summary.with(|s| s.is_some());
	let no_output = move || !has_output();
	let count = move || format!("{} / {MAX_PROMPT}", prompt.with(|p| p.chars().count()));

	view! {
		<div class="page insights">
			<header class="toolbar no-print">
				<h1>"AI Insights"</h1>
				<button disabled=move || busy.get() on:click=on_summary>"Generate summary"</button>
				<button disabled=no_output on:click=on_download>"Download report"</button>
				<button disabled=no_output on:click=on_print>"Print / Save as PDF"</button>
			</header>
			<ErrorBanner error=error />

			<section class="no-print">
				<textarea
					rows="4"
					maxlength=MAX_PROMPT.to_string()
					placeholder="Ask about your architecture"
					prop:value=move || prompt.get()
					on:input=move |ev| prompt.set(event_target_value(&ev))
				></textarea>
				<p class="hint">{count}</p>
				<div class="examples">
					{EXAMPLES
						.iter()
						.map(|&q| {
							let ask = move |_| prompt.set(q.to_string());
							view! { <button class="link" on:click=ask>{q}</button> }
						})
						.collect_view()}
				</div>
				<button
					disabled=move || busy.get() || prompt.with(|p| p.trim().is_empty())
					on:click=on_analyze
				>
					{move || if busy.get() { "Working..." } else { "Analyze" }}
				</button>
			</section>

			{move || summary.get().map(summary_view)}

			{move || {
				analysis
					.get()
					.map(|a| {
						view! {
							<section class="analysis">
								<h2>"Analysis"</h2>
								<p class="question">{asked.get()}</p>
								<pre>{a.analysis}</pre>
								{a.summary.map(|s| view! { <p class="hint">{s}</p> })}
							</section>
						}
					})
			}}
		</div>
	}
}
