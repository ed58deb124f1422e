use inventory_canvas::{App, init_logging};
use leptos::prelude::*;
// used by the library half of the package
use {
	console_error_panic_hook as _, console_log as _, force_graph as _, futures as _, js_sys as _,
	leptos_meta as _, leptos_router as _, log as _, serde as _, serde_json as _, thiserror as _,
	wasm_bindgen as _, wasm_bindgen_futures as _, web_sys as _,
};
#[cfg(test)]
use wasm_bindgen_test as _;

fn main() {
	init_logging();
	mount_to_body(App);
}
