use std::sync::*;
use std::task::*;

struct PromiseState<Output> {
	result: Option<Output>,
	waker: Option<Waker>,
}

/// A future resolved by a one-shot callback, possibly from another thread.
pub struct Promise<Output> {
	state: Arc<Mutex<PromiseState<Output>>>,
}

impl<Output> Promise<Output> {
	pub fn new() -> (Self, impl FnOnce(Output)) {
		let state = Arc::new(Mutex::new(PromiseState {
			result: Default::default(),
			waker: Default::default(),
		}));
		let callback = {
			let state = state.clone();
			move |result| {
				let mut state = state.lock().unwrap();
				state.result = Some(result);
				state.waker.take().map(&std::task::Waker::wake);
			}
		};
		(Promise { state }, callback)
	}

	/// Takes the result if it has already been delivered.
	pub fn try_take(&mut self) -> Option<Output> {
		self.state.lock().unwrap().result.take()
	}
}

impl<Output> std::future::Future for Promise<Output> {
	type Output = Output;
	fn poll(
		self: std::pin::Pin<&mut Self>,
		cx: &mut std::task::Context<'_>,
	) -> std::task::Poll<Self::Output> {
		let mut state = self.state.lock().unwrap();
		if let Some(result) = state.result.take() {
			std::task::Poll::Ready(result)
		} else {
			state.waker = Some(cx.waker().clone());
			std::task::Poll::Pending
		}
	}
}

/// The resolving side of a [`Promise`] that may be reached from several paths, e.g. a worker
/// finishing and a cancellation racing it. Whichever path calls [`Completion::complete`] first
/// resolves the promise; later calls are ignored and report `false`.
pub struct Completion<Output> {
	callback: Arc<Mutex<Option<Box<dyn FnOnce(Output) + Send>>>>,
}

impl<Output> Clone for Completion<Output> {
	fn clone(&self) -> Self {
		Self {
			callback: self.callback.clone(),
		}
	}
}

impl<Output: Send + 'static> Completion<Output> {
	pub fn new() -> (Promise<Output>, Self) {
		let (promise, resolve) = Promise::new();
		let completion = Self {
			callback: Arc::new(Mutex::new(Some(Box::new(resolve)))),
		};
		(promise, completion)
	}

	pub fn complete(&self, value: Output) -> bool {
		// Take under the lock, call outside it.
		let callback = self.callback.lock().unwrap().take();
		match callback {
			Some(callback) => {
				callback(value);
				true
			}
			None => false,
		}
	}

	pub fn is_completed(&self) -> bool {
		self.callback.lock().unwrap().is_none()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::FutureExt;

	#[test]
	fn promise_resolves_from_callback() {
		let (mut promise, resolve) = Promise::new();
		assert!((&mut promise).now_or_never().is_none());
		resolve(3);
		assert_eq!(promise.now_or_never(), Some(3));
	}

	#[test]
	fn completion_fires_exactly_once_across_threads() {
		let (mut promise, completion) = Completion::new();
		let racers: Vec<_> = (0..8)
			.map(|i| {
				let completion = completion.clone();
				std::thread::spawn(move || completion.complete(i))
			})
			.collect();
		let winners = racers
			.into_iter()
			.map(|handle| handle.join().unwrap())
			.filter(|won| *won)
			.count();
		assert_eq!(winners, 1);
		assert!(completion.is_completed());
		assert!(promise.try_take().is_some());
		assert!(!completion.complete(99));
		assert!(promise.try_take().is_none());
	}
}
