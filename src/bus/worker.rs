#![allow(clippy::missing_docs_in_private_items)]
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tracing::{debug, error};

/// A queued handler invocation, already bound to its event.
pub(crate) type Job = Box<dyn FnOnce() + Send>;

/// Background execution context for deliveries that must not block the
/// publisher.
///
/// Worker threads drain an unbounded job queue; `submit` never blocks.
/// With one worker (the default) jobs execute in exact submission order.
/// Dropping the pool stops the workers; jobs still queued at that point
/// are discarded without being invoked.
pub(crate) struct DeliveryPool {
	sender: Option<Sender<Job>>,
	shutdown: Arc<AtomicBool>,
	workers: Vec<JoinHandle<()>>,
}

impl DeliveryPool {
	/// Starts `workers` delivery threads (at least one).
	pub fn spawn(workers: usize) -> Self {
		let worker_count = workers.max(1);
		let (sender, receiver) = channel::<Job>();
		let receiver = Arc::new(Mutex::new(receiver));
		let shutdown = Arc::new(AtomicBool::new(false));

		let workers = (0 .. worker_count)
			.map(|index| {
				let receiver = Arc::clone(&receiver);
				let shutdown = Arc::clone(&shutdown);
				std::thread::Builder::new()
					.name(format!("plugbus-delivery-{index}"))
					.spawn(move || worker_loop(index, receiver, shutdown))
					.expect("failed to spawn delivery worker thread")
			})
			.collect();

		Self {
			sender: Some(sender),
			shutdown,
			workers,
		}
	}

	/// Enqueues a job. Never blocks; silently drops the job if the pool
	/// is already shutting down.
	pub fn submit(&self, job: Job) {
		if let Some(sender) = &self.sender {
			if sender.send(job).is_err() {
				debug!("Delivery pool closed, job dropped");
			}
		}
	}
}

impl Drop for DeliveryPool {
	fn drop(&mut self) {
		// Flag first so workers skip queued jobs, then close the channel
		// so blocked workers wake up and exit
		self.shutdown.store(true, Ordering::SeqCst);
		drop(self.sender.take());
		for handle in self.workers.drain(..) {
			if handle.join().is_err() {
				error!("Delivery worker panicked during shutdown");
			}
		}
	}
}

fn worker_loop(
	index: usize,
	receiver: Arc<Mutex<Receiver<Job>>>,
	shutdown: Arc<AtomicBool>,
) {
	debug!(worker = index, "Delivery worker started");
	loop {
		let job = match receiver.lock() {
			| Ok(guard) => guard.recv(),
			| Err(_) => {
				error!(worker = index, "Delivery queue lock poisoned");
				break;
			}
		};
		match job {
			| Ok(job) => {
				if shutdown.load(Ordering::SeqCst) {
					// Teardown in progress: drain without invoking
					continue;
				}
				// Jobs carry their own panic isolation; this is the
				// backstop that keeps the worker loop alive regardless
				if catch_unwind(AssertUnwindSafe(job)).is_err() {
					error!(worker = index, "Delivery job panicked");
				}
			}
			| Err(_) => break, // Channel closed, no more jobs
		}
	}
	debug!(worker = index, "Delivery worker exiting");
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::AtomicUsize;
	use std::sync::mpsc;
	use std::time::Duration;

	use super::*;

	#[test]
	fn test_submitted_jobs_run() {
		let pool = DeliveryPool::spawn(1);
		let (tx, rx) = mpsc::channel();
		pool.submit(Box::new(move || {
			tx.send(42).unwrap();
		}));
		assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(42));
	}

	#[test]
	fn test_single_worker_preserves_submission_order() {
		let pool = DeliveryPool::spawn(1);
		let (tx, rx) = mpsc::channel();
		for i in 0 .. 10 {
			let tx = tx.clone();
			pool.submit(Box::new(move || {
				tx.send(i).unwrap();
			}));
		}
		let received: Vec<i32> = (0 .. 10)
			.map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
			.collect();
		assert_eq!(received, (0 .. 10).collect::<Vec<_>>());
	}

	#[test]
	fn test_panicking_job_does_not_kill_the_worker() {
		let pool = DeliveryPool::spawn(1);
		let (tx, rx) = mpsc::channel();
		pool.submit(Box::new(|| panic!("handler blew up")));
		pool.submit(Box::new(move || {
			tx.send("still alive").unwrap();
		}));
		assert_eq!(
			rx.recv_timeout(Duration::from_secs(2)),
			Ok("still alive")
		);
	}

	#[test]
	fn test_drop_joins_workers() {
		let counter = Arc::new(AtomicUsize::new(0));
		let pool = DeliveryPool::spawn(2);
		for _ in 0 .. 4 {
			let counter = Arc::clone(&counter);
			pool.submit(Box::new(move || {
				counter.fetch_add(1, Ordering::SeqCst);
			}));
		}
		drop(pool);
		// Whatever ran, ran to completion; the pool is gone either way
		assert!(counter.load(Ordering::SeqCst) <= 4);
	}
}
