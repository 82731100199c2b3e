/// Recursively halves `data` with `chili` joins until about `chunks` leaves remain.
#[inline(always)]
pub fn par_map<T, F>(data: &mut [T], func: &F, chunks: usize)
where
    T: Send + Sync,
    F: Fn(usize, &mut T) + Send + Sync,
{
    #[inline(always)]
    fn recursive_split<T, F>(
        worker: &mut chili::Scope,
        data: &mut [T],
        func: &F,
        base_id: usize,
        splits_left: u32,
    ) where
        T: Send + Sync,
        F: Fn(usize, &mut T) + Send + Sync,
    {
        if splits_left == 0 || data.len() <= 1 {
            for (index, output) in data.iter_mut().enumerate() {
                func(base_id + index, output);
            }
        } else {
            let split_id = data.len() / 2;
            let (left, right) = data.split_at_mut(split_id);
            worker.join(
                |worker| recursive_split(worker, left, func, base_id, splits_left - 1),
                |worker| recursive_split(worker, right, func, base_id + split_id, splits_left - 1),
            );
        }
    }

    // ceil(log2(chunks))
    let splits = usize::BITS - (chunks.max(1) - 1).leading_zeros();
    let mut scope = chili::Scope::global();
    recursive_split(&mut scope, data, func, 0, splits);
}
