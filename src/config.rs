//! Thread configuration.
//!
//! [`OrderConfig`] is what an ordering call actually reads. The process-wide setters
//! below only change what [`OrderConfig::current`] returns, so every call sees one
//! consistent snapshot taken when it starts.
//!
//! Defaults come from the environment, read once:
//!
//! * `FORDER_NUM_THREADS`: absolute thread count.
//! * `FORDER_NUM_PROCS_PERCENT`: share of the available cores (1..=100, default 100),
//!   used when `FORDER_NUM_THREADS` is unset.
//! * `FORDER_THROTTLE`: rows per thread before another thread is engaged (default 1024).
//! * `FORDER_SCHEDULER`: `seq`, `rayon`, `raw` or `chili` (default `rayon`).

use std::{
    env,
    str::FromStr,
    sync::{
        atomic::{AtomicU32, AtomicUsize, Ordering},
        OnceLock,
    },
};

use tracing::warn;

use crate::par::Scheduler;

pub const DEFAULT_THROTTLE: usize = 1024;

const UNSET: usize = 0;

static THREADS: AtomicUsize = AtomicUsize::new(UNSET);
static THROTTLE: AtomicUsize = AtomicUsize::new(UNSET);
static SCHEDULER: AtomicU32 = AtomicU32::new(u32::MAX);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Defaults {
    threads: usize,
    throttle: usize,
    scheduler: Scheduler,
}

fn defaults() -> &'static Defaults {
    static DEFAULTS: OnceLock<Defaults> = OnceLock::new();
    DEFAULTS.get_or_init(|| {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        resolve_defaults(|name| env::var(name).ok(), available)
    })
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparsable environment variable");
            None
        }
    }
}

fn resolve_defaults(lookup: impl Fn(&str) -> Option<String>, available: usize) -> Defaults {
    let threads = match parse_var::<usize>(&lookup, "FORDER_NUM_THREADS") {
        Some(threads) if threads > 0 => threads,
        _ => {
            let percent = match parse_var::<usize>(&lookup, "FORDER_NUM_PROCS_PERCENT") {
                Some(p) if (1..=100).contains(&p) => p,
                Some(p) => {
                    warn!(percent = p, "FORDER_NUM_PROCS_PERCENT must be in 1..=100");
                    100
                }
                None => 100,
            };
            available * percent / 100
        }
    };

    let throttle = match parse_var::<usize>(&lookup, "FORDER_THROTTLE") {
        Some(throttle) if throttle > 0 => throttle,
        _ => DEFAULT_THROTTLE,
    };

    let scheduler = parse_var::<Scheduler>(&lookup, "FORDER_SCHEDULER").unwrap_or_default();

    Defaults {
        threads: threads.max(1),
        throttle,
        scheduler,
    }
}

/// Parallelism settings for one ordering call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderConfig {
    /// Upper bound on worker threads.
    pub threads: usize,
    /// Rows per thread before another thread is engaged.
    pub throttle: usize,
    pub scheduler: Scheduler,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self::current()
    }
}

impl OrderConfig {
    /// Snapshot of the process-wide settings.
    pub fn current() -> Self {
        Self {
            threads: get_thread_count(),
            throttle: throttle(),
            scheduler: scheduler(),
        }
    }

    /// Single-threaded configuration.
    pub fn sequential() -> Self {
        Self {
            threads: 1,
            throttle: DEFAULT_THROTTLE,
            scheduler: Scheduler::Sequential,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_throttle(mut self, throttle: usize) -> Self {
        self.throttle = throttle.max(1);
        self
    }

    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Threads worth engaging for `rows` rows.
    pub fn effective_threads(&self, rows: usize) -> usize {
        let by_rows = (rows / self.throttle.max(1)).max(1);
        self.threads.max(1).min(by_rows)
    }
}

/// Sets the process-wide thread count, returning the previous one. `0` restores the default.
pub fn set_thread_count(threads: usize) -> usize {
    let previous = get_thread_count();
    THREADS.store(threads, Ordering::Relaxed);
    previous
}

pub fn get_thread_count() -> usize {
    match THREADS.load(Ordering::Relaxed) {
        UNSET => defaults().threads,
        threads => threads,
    }
}

/// Sets the process-wide throttle, returning the previous one. `0` restores the default.
pub fn set_throttle(throttle: usize) -> usize {
    let previous = self::throttle();
    THROTTLE.store(throttle, Ordering::Relaxed);
    previous
}

pub fn throttle() -> usize {
    match THROTTLE.load(Ordering::Relaxed) {
        UNSET => defaults().throttle,
        throttle => throttle,
    }
}

pub fn set_scheduler(scheduler: Scheduler) {
    SCHEDULER.store(scheduler as u32, Ordering::Relaxed);
}

pub fn scheduler() -> Scheduler {
    Scheduler::from_u32(SCHEDULER.load(Ordering::Relaxed)).unwrap_or(defaults().scheduler)
}
