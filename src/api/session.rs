//! Bearer tokens and the single-flight refresh guard.

#[cfg(test)]
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::channel::oneshot;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const ACCESS_KEY: &str = "access_token";
pub const REFRESH_KEY: &str = "refresh_token";

/// Response of `/auth/login` and `/auth/refresh`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenPair {
	pub access_token: String,
	#[serde(default)]
	pub refresh_token: Option<String>,
	#[serde(default)]
	pub token_type: Option<String>,
}

/// Key/value persistence for tokens.
pub trait TokenStore: Send + Sync {
	fn get(&self, key: &str) -> Option<String>;
	fn set(&self, key: &str, value: &str) -> Result<(), ApiError>;
	fn remove(&self, key: &str);
}

/// Browser `localStorage`, looked up on every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorageTokens;

impl LocalStorageTokens {
	fn storage() -> Result<web_sys::Storage, ApiError> {
		let window = web_sys::window().ok_or(ApiError::NoWindow)?;
		window
			.local_storage()
			.map_err(|e| ApiError::Storage(format!("{e:?}")))?
			.ok_or_else(|| ApiError::Storage("localStorage disabled".into()))
	}
}

impl TokenStore for LocalStorageTokens {
	fn get(&self, key: &str) -> Option<String> {
		Self::storage().ok()?.get_item(key).ok().flatten()
	}

	fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
		Self::storage()?
			.set_item(key, value)
			.map_err(|e| ApiError::Storage(format!("{e:?}")))
	}

	fn remove(&self, key: &str) {
		if let Ok(storage) = Self::storage() {
			let _ = storage.remove_item(key);
		}
	}
}

/// In-process store for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryTokens(Mutex<HashMap<String, String>>);

#[cfg(test)]
impl MemoryTokens {
	fn map(&self) -> MutexGuard<'_, HashMap<String, String>> {
		self.0.lock().unwrap_or_else(|e| e.into_inner())
	}
}

#[cfg(test)]
impl TokenStore for MemoryTokens {
	fn get(&self, key: &str) -> Option<String> {
		self.map().get(key).cloned()
	}

	fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
		self.map().insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn remove(&self, key: &str) {
		self.map().remove(key);
	}
}

/// The signed-in user's tokens plus the refresh guard every request shares.
#[derive(Clone)]
pub struct Session {
	store: Arc<dyn TokenStore>,
	gate: RefreshGate,
}

impl Session {
	pub fn new(store: impl TokenStore + 'static) -> Self {
		Self { store: Arc::new(store), gate: RefreshGate::default() }
	}

	pub fn browser() -> Self {
		Self::new(LocalStorageTokens)
	}

	pub fn access_token(&self) -> Option<String> {
		self.store.get(ACCESS_KEY).filter(|t| !t.is_empty())
	}

	pub fn refresh_token(&self) -> Option<String> {
		self.store.get(REFRESH_KEY).filter(|t| !t.is_empty())
	}

	pub fn is_authenticated(&self) -> bool {
		self.access_token().is_some()
	}

	/// Store a login or refresh response. A missing refresh token keeps the
	/// one already stored.
	pub fn save(&self, tokens: &TokenPair) -> Result<(), ApiError> {
		self.store.set(ACCESS_KEY, &tokens.access_token)?;
		if let Some(refresh) = &tokens.refresh_token {
			self.store.set(REFRESH_KEY, refresh)?;
		}
		Ok(())
	}

	pub fn clear(&self) {
		self.store.remove(ACCESS_KEY);
		self.store.remove(REFRESH_KEY);
	}

	pub fn gate(&self) -> &RefreshGate {
		&self.gate
	}
}

type Outcome = Result<String, ApiError>;

#[derive(Default)]
struct GateState {
	in_flight: bool,
	waiters: Vec<oneshot::Sender<Outcome>>,
}

/// Shared in-flight guard: the first caller runs the refresh, callers that
/// arrive while it is pending wait for its outcome instead of starting their own.
#[derive(Clone, Default)]
pub struct RefreshGate {
	state: Arc<Mutex<GateState>>,
}

enum Turn {
	Leader,
	Follower(oneshot::Receiver<Outcome>),
}

impl RefreshGate {
	fn lock(&self) -> MutexGuard<'_, GateState> {
		self.state.lock().unwrap_or_else(|e| e.into_inner())
	}

	fn enter(&self) -> Turn {
		let mut state = self.lock();
		if state.in_flight {
			let (tx, rx) = oneshot::channel();
			state.waiters.push(tx);
			Turn::Follower(rx)
		} else {
			state.in_flight = true;
			Turn::Leader
		}
	}

	fn finish(&self, outcome: &Outcome) {
		let waiters = {
			let mut state = self.lock();
			state.in_flight = false;
			std::mem::take(&mut state.waiters)
		};
		for waiter in waiters {
			let _ = waiter.send(outcome.clone());
		}
	}

	#[cfg(test)]
	fn is_refreshing(&self) -> bool {
		self.lock().in_flight
	}

	/// Run `refresh` unless one is already pending, and return the new access
	/// token either way.
	pub async fn run<F, Fut>(&self, refresh: F) -> Outcome
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Outcome>,
	{
		match self.enter() {
			Turn::Leader => {
				let outcome = refresh().await;
				self.finish(&outcome);
				outcome
			}
			Turn::Follower(rx) => rx.await.unwrap_or(Err(ApiError::Unauthorized)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::Cell;

	use futures::executor::block_on;

	#[test]
	fn store_keeps_refresh_token_when_absent() {
		let session = Session::new(MemoryTokens::default());
		assert!(!session.is_authenticated());
		session
			.save(&TokenPair {
				access_token: "a1".into(),
				refresh_token: Some("r1".into()),
				token_type: None,
			})
			.unwrap();
		session
			.save(&TokenPair { access_token: "a2".into(), refresh_token: None, token_type: None })
			.unwrap();
		assert_eq!(session.access_token().as_deref(), Some("a2"));
		assert_eq!(session.refresh_token().as_deref(), Some("r1"));

		session.clear();
		assert_eq!(session.access_token(), None);
		assert_eq!(session.refresh_token(), None);
	}

	#[test]
	fn concurrent_callers_share_one_refresh() {
		let gate = RefreshGate::default();
		let calls = Cell::new(0);
		let (release, released) = oneshot::channel::<()>();

		let refresh = || async {
			calls.set(calls.get() + 1);
			let _ = released.await;
			Ok("fresh".to_string())
		};
		let waiter = || async { Ok("unused".to_string()) };

		let (a, b, c, ()) = block_on(async {
			futures::join!(gate.run(refresh), gate.run(waiter), gate.run(waiter), async {
				let _ = release.send(());
			})
		});

		assert_eq!(calls.get(), 1);
		for outcome in [a, b, c] {
			assert_eq!(outcome.as_deref(), Ok("fresh"));
		}
		assert!(!gate.is_refreshing());

		// a later burst refreshes again
		let again = block_on(gate.run(|| async { Ok("second".to_string()) }));
		assert_eq!(again.as_deref(), Ok("second"));
	}

	#[test]
	fn refresh_failure_reaches_every_waiter() {
		let gate = RefreshGate::default();
		let (release, released) = oneshot::channel::<()>();
		let failing = || async {
			let _ = released.await;
			Err(ApiError::Unauthorized)
		};

		let (a, b, ()) = block_on(async {
			futures::join!(gate.run(failing), gate.run(|| async { Ok(String::new()) }), async {
				let _ = release.send(());
			})
		});
		assert_eq!(a, Err(ApiError::Unauthorized));
		assert_eq!(b, Err(ApiError::Unauthorized));
	}
}
