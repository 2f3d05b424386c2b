use std::sync::mpsc;
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A single background thread running jobs in submission order.
pub struct Worker {
	name: String,
	sender: Option<mpsc::Sender<Job>>,
	handle: Option<thread::JoinHandle<()>>,
}

impl std::fmt::Debug for Worker {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Worker").field("name", &self.name).finish()
	}
}

impl Worker {
	pub fn spawn(name: &str) -> std::io::Result<Self> {
		let (sender, receiver) = mpsc::channel::<Job>();
		let handle = thread::Builder::new()
			.name(name.to_owned())
			.spawn(move || {
				for job in receiver {
					job();
				}
			})?;
		tracing::trace!(name, "worker started");
		Ok(Self {
			name: name.to_owned(),
			sender: Some(sender),
			handle: Some(handle),
		})
	}

	/// Queues `job`. Returns `false` if the worker thread is gone.
	pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> bool {
		let Some(sender) = &self.sender else {
			return false;
		};
		let sent = sender.send(Box::new(job)).is_ok();
		if !sent {
			tracing::error!(name = self.name, "worker thread is no longer running");
		}
		sent
	}

	/// Blocks until every job submitted before this call has run.
	pub fn flush(&self) {
		let (done, wait) = mpsc::sync_channel(1);
		if self.submit(move || {
			let _ = done.send(());
		}) {
			let _ = wait.recv();
		}
	}
}

impl Drop for Worker {
	fn drop(&mut self) {
		// Closing the channel ends the thread's loop once queued jobs have run.
		self.sender.take();
		if let Some(handle) = self.handle.take() {
			if handle.join().is_err() {
				tracing::error!(name = self.name, "worker thread panicked");
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::{Arc, Mutex};

	#[test]
	fn runs_jobs_in_order() -> anyhow::Result<()> {
		let worker = Worker::spawn("test-worker")?;
		let log = Arc::new(Mutex::new(Vec::new()));
		for i in 0..5 {
			let log = log.clone();
			assert!(worker.submit(move || log.lock().unwrap().push(i)));
		}
		worker.flush();
		assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
		Ok(())
	}

	#[test]
	fn drop_drains_queue() -> anyhow::Result<()> {
		let counter = Arc::new(Mutex::new(0));
		{
			let worker = Worker::spawn("test-worker")?;
			for _ in 0..3 {
				let counter = counter.clone();
				worker.submit(move || *counter.lock().unwrap() += 1);
			}
		}
		assert_eq!(*counter.lock().unwrap(), 3);
		Ok(())
	}
}
