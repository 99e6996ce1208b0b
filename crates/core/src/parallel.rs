//! Data-parallel for-each over buffers
//!
//! Every pipeline stage is one call into this module. Items are split into
//! contiguous chunks, one scoped thread per chunk; the scope join is the
//! barrier between stages. Closures only receive their own slot mutably, so
//! units of work can never write to each other's output.

use std::thread;

/// Below this many items per worker a stage runs on the calling thread
pub const MIN_ITEMS_PER_WORKER: usize = 256;

/// `None` when the stage should run inline, else the chunk length
fn chunk_len(len: usize, workers: usize, min_per_worker: usize) -> Option<usize> {
    let workers = workers.min(len / min_per_worker.max(1));
    if workers <= 1 {
        None
    } else {
        Some(len.div_ceil(workers))
    }
}

/// Run `f(index, &mut item)` for every item, in parallel
pub fn for_each_mut<T, F>(items: &mut [T], workers: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Sync,
{
    for_each_mut_grained(items, workers, MIN_ITEMS_PER_WORKER, f);
}

/// [`for_each_mut`] for items that are each a large unit of work
///
/// A worker is spawned for every `min_per_worker` items, so a grain of 1
/// spreads even two items over two threads.
pub fn for_each_mut_grained<T, F>(items: &mut [T], workers: usize, min_per_worker: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Sync,
{
    let Some(chunk) = chunk_len(items.len(), workers, min_per_worker) else {
        for (i, item) in items.iter_mut().enumerate() {
            f(i, item);
        }
        return;
    };

    let f = &f;
    thread::scope(|s| {
        for (c, slice) in items.chunks_mut(chunk).enumerate() {
            s.spawn(move || {
                let base = c * chunk;
                for (i, item) in slice.iter_mut().enumerate() {
                    f(base + i, item);
                }
            });
        }
    });
}

/// Run `f(index, &item)` for every item, in parallel
///
/// For stages whose only output is shared atomic state.
pub fn for_each<T, F>(items: &[T], workers: usize, f: F)
where
    T: Sync,
    F: Fn(usize, &T) + Sync,
{
    let Some(chunk) = chunk_len(items.len(), workers, MIN_ITEMS_PER_WORKER) else {
        for (i, item) in items.iter().enumerate() {
            f(i, item);
        }
        return;
    };

    let f = &f;
    thread::scope(|s| {
        for (c, slice) in items.chunks(chunk).enumerate() {
            s.spawn(move || {
                let base = c * chunk;
                for (i, item) in slice.iter().enumerate() {
                    f(base + i, item);
                }
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_for_each_mut_visits_every_slot_once() {
        let mut items = vec![0usize; 10_000];
        for_each_mut(&mut items, 8, |i, slot| *slot += i + 1);
        for (i, v) in items.iter().enumerate() {
            assert_eq!(*v, i + 1);
        }
    }

    #[test]
    fn test_for_each_small_input_runs_inline() {
        assert_eq!(chunk_len(10, 8, MIN_ITEMS_PER_WORKER), None);
        assert_eq!(chunk_len(10_000, 1, MIN_ITEMS_PER_WORKER), None);
        assert_eq!(chunk_len(1024, 8, MIN_ITEMS_PER_WORKER), Some(256));
    }

    #[test]
    fn test_unit_grain_spreads_few_items() {
        assert_eq!(chunk_len(2, 8, 1), Some(1));
        assert_eq!(chunk_len(20, 8, 1), Some(3));
        assert_eq!(chunk_len(1, 8, 1), None);
        // a zero grain is treated as 1
        assert_eq!(chunk_len(4, 2, 0), Some(2));
    }

    #[test]
    fn test_grained_for_each_uses_several_threads() {
        let mut items = vec![None; 4];
        for_each_mut_grained(&mut items, 4, 1, |_, slot| {
            *slot = Some(std::thread::current().id());
        });
        let main = std::thread::current().id();
        assert!(items.iter().all(|id| id.is_some() && *id != Some(main)));
    }

    #[test]
    fn test_for_each_shared_sum() {
        let items: Vec<usize> = (0..5000).collect();
        let sum = AtomicUsize::new(0);
        for_each(&items, 4, |i, v| {
            assert_eq!(i, *v);
            sum.fetch_add(*v, Ordering::Relaxed);
        });
        assert_eq!(sum.load(Ordering::Relaxed), 4999 * 5000 / 2);
    }
}
