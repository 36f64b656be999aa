//! Bus construction settings

/// Tuning knobs for [`PluginBus`](crate::PluginBus) construction.
#[derive(Debug, Clone)]
pub struct BusConfig {
	/// Number of background delivery worker threads (clamped to >= 1).
	///
	/// With the default single worker, background deliveries run in the
	/// exact order they were scheduled (priority order within one publish,
	/// publish order across calls). More workers raise throughput but let
	/// background handlers overlap.
	pub delivery_workers: usize,
	/// Capacity of the parsed-pattern cache used by `matches_topic`
	pub pattern_cache_size: usize,
}

impl Default for BusConfig {
	fn default() -> Self {
		Self {
			delivery_workers: 1,
			pattern_cache_size: 128,
		}
	}
}

impl BusConfig {
	/// Config with a given number of delivery workers.
	pub fn with_workers(delivery_workers: usize) -> Self {
		Self {
			delivery_workers,
			..Self::default()
		}
	}
}
