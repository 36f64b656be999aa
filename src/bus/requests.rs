use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Duration;

use arcstr::ArcStr;
use thiserror::Error;

use crate::bus::RequestHandler;

/// Why a `request` call produced no result.
///
/// Internal taxonomy only: every variant surfaces to the caller as an
/// empty result, per the bus contract that expected absence and handler
/// failure are sentinels, not errors. The dispatcher logs the variant so
/// the causes stay distinguishable in traces.
#[derive(Error, Debug)]
pub(crate) enum RequestFailure {
	/// No handler is registered for the exact topic
	#[error("No request handler for topic '{topic}'")]
	NoHandler { topic: ArcStr },

	/// The handler did not produce a result within the caller's bound
	#[error("Request to '{topic}' timed out after {waited:?}")]
	Timeout { topic: ArcStr, waited: Duration },

	/// The handler panicked; the panic was caught at the dispatch boundary
	#[error("Request handler for '{topic}' panicked")]
	HandlerPanic { topic: ArcStr },
}

/// One registered request handler and the identity that owns it.
struct RequestEntry {
	owner: ArcStr,
	handler: RequestHandler,
}

/// The request/response handler store: at most one handler per exact
/// topic, patterns not interpreted.
///
/// Like the subscription registry, this is plain state the bus guards
/// with an `RwLock`; handlers run only on cloned `Arc`s after the lock is
/// released.
pub(crate) struct RequestRegistry {
	entries: HashMap<String, RequestEntry>,
}

impl RequestRegistry {
	pub fn new() -> Self {
		Self {
			entries: HashMap::new(),
		}
	}

	/// Binds a handler to an exact topic. Returns false and leaves the
	/// existing entry untouched if the topic is already bound.
	pub fn register(
		&mut self,
		topic: &str,
		owner: ArcStr,
		handler: RequestHandler,
	) -> bool {
		match self.entries.entry(topic.to_string()) {
			| Entry::Occupied(existing) => {
				tracing::debug!(
					topic = %topic,
					owner = %existing.get().owner,
					rejected_owner = %owner,
					"Request handler already registered"
				);
				false
			}
			| Entry::Vacant(slot) => {
				slot.insert(RequestEntry { owner, handler });
				true
			}
		}
	}

	/// Unbinds the topic. False if nothing was bound.
	pub fn unregister(&mut self, topic: &str) -> bool {
		self.entries.remove(topic).is_some()
	}

	/// Unbinds every topic owned by `owner`; returns how many were
	/// removed.
	pub fn unregister_all(&mut self, owner: &str) -> usize {
		let before = self.entries.len();
		self.entries.retain(|_, entry| entry.owner != owner);
		before - self.entries.len()
	}

	/// Clones out the handler bound to the exact topic, if any.
	pub fn get(&self, topic: &str) -> Option<RequestHandler> {
		self.entries.get(topic).map(|entry| entry.handler.clone())
	}

	/// Existence check, no side effect.
	pub fn contains(&self, topic: &str) -> bool {
		self.entries.contains_key(topic)
	}
}
