//! Injected time source used for creation descriptions and upload paths.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Zero-argument time source. Tests pass fixed closures.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// A clock that always returns `at`.
pub fn fixed_clock(at: DateTime<Utc>) -> Clock {
    Arc::new(move || at)
}
