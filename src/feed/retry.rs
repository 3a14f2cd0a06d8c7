use std::time::Duration;

/// Exponential backoff between attempts to re-establish a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	/// The delay before the first retry.
	pub base: Duration,
	/// The delay is never longer than this.
	pub max: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			base: Duration::from_millis(500),
			max: Duration::from_secs(30),
		}
	}
}

impl RetryPolicy {
	pub fn new(base: Duration, max: Duration) -> Self {
		Self { base, max }
	}

	/// The delay before retry number `attempt` (1-indexed).
	pub fn delay(&self, attempt: u32) -> Duration {
		let factor = 2u32.saturating_pow(attempt.saturating_sub(1));

		self.base.saturating_mul(factor).min(self.max)
	}
}
