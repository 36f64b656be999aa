//! Route registration table for host-side page switching
//!
//! A plain key-value collaborator next to the bus: plugins register the
//! location of their main page under a logical route name, the host
//! resolves routes when switching pages. No pattern matching, no
//! dispatcher dependency.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

/// Maps logical route names to page locations and tracks the active
/// route.
///
/// Safe to share across plugin threads; last registration wins for a
/// route name.
#[derive(Default)]
pub struct RouteRegistry {
	routes: RwLock<HashMap<String, String>>,
	current: RwLock<String>,
}

impl RouteRegistry {
	/// Creates an empty registry with no active route.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers (or replaces) the page location for a route.
	pub fn register_route(
		&self,
		route: impl Into<String>,
		location: impl Into<String>,
	) {
		let route = route.into();
		let location = location.into();
		debug!(route = %route, location = %location, "Route registered");
		self.routes.write().unwrap().insert(route, location);
	}

	/// The page location registered for a route, if any.
	pub fn page_url(&self, route: &str) -> Option<String> {
		self.routes.read().unwrap().get(route).cloned()
	}

	/// The currently active route; empty before the first
	/// `set_current_route`.
	pub fn current_route(&self) -> String {
		self.current.read().unwrap().clone()
	}

	/// Records the active route (called by the host on page change).
	pub fn set_current_route(&self, route: impl Into<String>) {
		*self.current.write().unwrap() = route.into();
	}
}
