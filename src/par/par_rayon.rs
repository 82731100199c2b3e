use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, OnceLock},
};

use rayon::{
    iter::{IndexedParallelIterator, IntoParallelRefMutIterator, ParallelIterator},
    ThreadPool, ThreadPoolBuilder,
};
use tracing::warn;

/// Pools by thread count, built on first use.
static POOLS: OnceLock<Mutex<BTreeMap<usize, Arc<ThreadPool>>>> = OnceLock::new();

fn sized_pool(threads: usize) -> Option<Arc<ThreadPool>> {
    let pools = POOLS.get_or_init(Default::default);
    let mut pools = match pools.lock() {
        Ok(pools) => pools,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Some(pool) = pools.get(&threads) {
        return Some(pool.clone());
    }

    match ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("forder-{i}"))
        .build()
    {
        Ok(pool) => {
            let pool = Arc::new(pool);
            pools.insert(threads, pool.clone());
            Some(pool)
        }
        Err(err) => {
            warn!(threads, %err, "failed to build rayon pool, using the global pool");
            None
        }
    }
}

#[inline(always)]
pub fn par_map<T, F>(data: &mut [T], func: &F, threads: usize)
where
    T: Send + Sync,
    F: Fn(usize, &mut T) + Send + Sync,
{
    let mut run = move || {
        data.par_iter_mut()
            .enumerate()
            .for_each(|(index, item)| func(index, item))
    };

    // Already on a worker of a pool of the right size: stay there
    if rayon::current_thread_index().is_some() && rayon::current_num_threads() == threads {
        return run();
    }

    match sized_pool(threads) {
        Some(pool) => pool.install(run),
        None => run(),
    }
}
