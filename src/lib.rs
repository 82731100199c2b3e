//! Ordering and grouping engine for columnar tables.
//!
//! [`order`] computes the stable permutation that sorts a [`Table`] by a [`KeySpec`]
//! together with the [`Groups`] of equal keys in that order. Keys are encoded into
//! order-preserving unsigned codes ([`encode_key`]) and ordered by an MSB radix sort
//! over row indices, whose top level is spread over threads by a [`Scheduler`].
//!
//! ```
//! use forder::{order, Column, KeySpec, Table};
//!
//! let table = Table::new(vec![
//!     Column::Int32(vec![Some(1), Some(1), Some(2)]),
//!     Column::strings([Some("x"), Some("y"), Some("x")]),
//! ]);
//! let result = order(&table, &KeySpec::new().desc(0).asc(1)).unwrap();
//! assert_eq!(result.permutation, vec![2, 0, 1]);
//! assert!(result.all_singleton());
//! ```

use std::time::{Duration, Instant};

/// Profiling scope, a no-op unless the `profile` feature is enabled.
#[macro_export]
#[doc(hidden)]
macro_rules! scope {
    ($name:expr) => {
        #[cfg(feature = "profile")]
        profiling::scope!($name);
    };
}

/// Profiling scope that also logs its duration with the `scope_print` feature.
#[macro_export]
#[doc(hidden)]
macro_rules! scope_print {
    ($name:expr) => {
        $crate::scope!($name);
        #[cfg(feature = "scope_print")]
        let _scope_timer = $crate::ScopeTimer::new($name);
    };
}

/// Like [`scope_print!`], for the few top-level scopes worth timing on every call.
#[macro_export]
#[doc(hidden)]
macro_rules! scope_print_major {
    ($name:expr) => {
        $crate::scope!($name);
        #[cfg(feature = "scope_print_major")]
        let _scope_timer = $crate::ScopeTimer::new($name);
    };
}

mod buffer;
pub mod column;
pub mod config;
pub mod encode;
pub mod error;
pub mod groups;
pub mod key_spec;
pub mod order;
pub mod par;
pub mod radix;

#[cfg(test)]
mod tests;

pub use column::{Column, Complex64, Table, NA_INT64};
pub use config::{
    get_thread_count, scheduler, set_scheduler, set_thread_count, set_throttle, throttle,
    OrderConfig,
};
pub use encode::{encode_key, EncodedKey, KeyField};
pub use error::{OrderError, Result};
pub use groups::{group_lengths, rleid, Groups};
pub use key_spec::{Direction, KeySpec, MissingPlacement, SortKey};
pub use order::{is_sorted, is_sorted_with, order, order_with, OrderOptions, OrderResult};
pub use par::Scheduler;
pub use radix::SortStats;

/// Logs the time between its creation and drop.
#[doc(hidden)]
pub struct ScopeTimer {
    name: &'static str,
    start: Instant,
}

impl ScopeTimer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }
}

impl Drop for ScopeTimer {
    fn drop(&mut self) {
        tracing::info!(
            scope = self.name,
            elapsed = %PrettyDuration(self.start.elapsed()),
            "scope finished"
        );
    }
}

/// A wrapper struct for `std::time::Duration` to provide pretty-printing of durations.
#[doc(hidden)]
pub struct PrettyDuration(pub Duration);

impl std::fmt::Display for PrettyDuration {
    /// Durations are formatted as follows:
    /// - If the duration is greater than or equal to 1 second, it is formatted in seconds (s).
    /// - If the duration is greater than or equal to 1 millisecond but less than 1 second, it is formatted in milliseconds (ms).
    /// - If the duration is less than 1 millisecond, it is formatted in microseconds (µs).
    ///   In the case of seconds & milliseconds, the duration is always printed with a precision of two decimal places.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let duration = self.0;
        if duration.as_secs() > 0 {
            let seconds =
                duration.as_secs() as f64 + f64::from(duration.subsec_nanos()) / 1_000_000_000.0;
            write!(f, "{seconds:.2}s")
        } else if duration.subsec_millis() > 0 {
            let milliseconds =
                duration.as_millis() as f64 + f64::from(duration.subsec_micros() % 1_000) / 1_000.0;
            write!(f, "{milliseconds:.2}ms")
        } else {
            let microseconds = duration.as_micros();
            write!(f, "{microseconds}µs")
        }
    }
}
