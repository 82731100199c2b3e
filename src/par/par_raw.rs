use std::thread;

/// Scoped threads spawned per available core at most.
pub const MAX_THREADS_PER_CORE: usize = 6;

/// Upper bound on OS threads spawned for one call.
pub fn max_threads() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1) * MAX_THREADS_PER_CORE
}

/// Spawns one scoped thread per chunk, running the last chunk on the calling thread.
#[inline(always)]
pub fn par_map<T, F>(data: &mut [T], func: &F, chunks: usize)
where
    T: Send + Sync,
    F: Fn(usize, &mut T) + Send + Sync,
{
    if data.is_empty() {
        return;
    }

    let chunks = chunks.min(max_threads()).clamp(1, data.len());
    let chunk_size = data.len().div_ceil(chunks);
    let chunk_count = data.len().div_ceil(chunk_size);
    if chunk_count == 1 {
        for (i, output) in data.iter_mut().enumerate() {
            func(i, output);
        }
        return;
    }

    thread::scope(|s| {
        for (chunk_id, chunk) in data.chunks_mut(chunk_size).enumerate() {
            let start = chunk_id * chunk_size;
            let mut run = move || {
                for (i, output) in chunk.iter_mut().enumerate() {
                    func(start + i, output);
                }
            };
            if chunk_id == chunk_count - 1 {
                run(); // Run the last one on this thread
            } else {
                s.spawn(run);
            }
        }
    });
}
