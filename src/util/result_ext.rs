pub trait ResultExt<T, E> {
	/// Discards the error after logging it.
	fn ok_or_log(self) -> Option<T>
	where
		E: std::fmt::Display;

	/// Like [`ResultExt::ok_or_log`], tagging the log record with what was being attempted.
	fn ok_or_log_with(self, operation: &str) -> Option<T>
	where
		E: std::fmt::Display;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
	fn ok_or_log(self) -> Option<T>
	where
		E: std::fmt::Display,
	{
		self.inspect_err(|err| tracing::error!("{}", err)).ok()
	}

	fn ok_or_log_with(self, operation: &str) -> Option<T>
	where
		E: std::fmt::Display,
	{
		self
			.inspect_err(|err| tracing::error!(operation, "{}", err))
			.ok()
	}
}
