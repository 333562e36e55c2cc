//! Fork-join helpers over a `rayon` pool.
//!
//! Every call blocks until all of its jobs have finished. Callers of the range and band forms
//! must keep the outputs of different chunks disjoint.

use std::ops::Range;

use rayon::prelude::*;

use crate::error::Result;
use crate::math::IRect;

pub struct ThreadPool {
    pool: rayon::ThreadPool,
}

impl ThreadPool {
    /// A pool with `threads` workers, or one per hardware thread when `threads` is zero.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("quadraster-{i}"))
            .build()?;
        tracing::debug!(threads = pool.current_num_threads(), "thread pool started");
        Ok(ThreadPool { pool })
    }

    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `f` inside the pool, so parallel iterators it creates use these workers.
    pub fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        self.pool.install(f)
    }

    /// Calls `f(i)` for every `i` in `0..count`.
    pub fn for_each_index(&self, count: usize, f: impl Fn(usize) + Sync + Send) {
        self.pool.install(|| (0..count).into_par_iter().for_each(f));
    }

    /// Runs every job to completion.
    pub fn execute_jobs<'s>(&self, jobs: Vec<Box<dyn FnOnce() + Send + 's>>) {
        self.pool.scope(|scope| {
            for job in jobs {
                scope.spawn(move |_| job());
            }
        });
    }

    /// Splits `range` into about `thread_count * jobs_per_thread` chunks of at least `min_size`
    /// elements and calls `f` once per chunk.
    pub fn for_each_range(
        &self,
        range: Range<usize>,
        jobs_per_thread: usize,
        min_size: usize,
        f: impl Fn(Range<usize>) + Sync + Send,
    ) {
        let chunks = chunk_ranges(range, self.thread_count() * jobs_per_thread.max(1), min_size);
        self.pool.install(|| chunks.into_par_iter().for_each(f));
    }

    /// Calls `f` once per horizontal band of `rect`, one band per thread.
    pub fn for_each_band(&self, rect: IRect, f: impl Fn(IRect) + Sync + Send) {
        let bands = rect.split_rows(self.thread_count());
        self.pool.install(|| bands.into_par_iter().for_each(f));
    }
}

/// `range` cut into at most `jobs` consecutive pieces, none shorter than `min_size` except
/// when the whole range is.
pub fn chunk_ranges(range: Range<usize>, jobs: usize, min_size: usize) -> Vec<Range<usize>> {
    let len = range.len();
    if len == 0 {
        return Vec::new();
    }
    let size = len.div_ceil(jobs.max(1)).max(min_size).max(1);
    let end = range.end;
    range.step_by(size).map(|start| start..(start + size).min(end)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn chunks_cover_the_range() {
        assert_eq!(chunk_ranges(0..10, 3, 1), vec![0..4, 4..8, 8..10]);
        assert_eq!(chunk_ranges(5..9, 8, 3), vec![5..8, 8..9]);
        assert_eq!(chunk_ranges(0..2, 4, 16), vec![0..2]);
        assert!(chunk_ranges(3..3, 4, 1).is_empty());
    }

    #[test]
    fn every_form_runs_each_job_once() {
        let pool = ThreadPool::new(3).unwrap();
        assert_eq!(pool.thread_count(), 3);

        let hits: Vec<AtomicUsize> = (0..100).map(|_| AtomicUsize::new(0)).collect();
        pool.for_each_index(100, |i| {
            hits[i].fetch_add(1, Ordering::Relaxed);
        });
        pool.for_each_range(0..100, 2, 7, |range| {
            for i in range {
                hits[i].fetch_add(1, Ordering::Relaxed);
            }
        });
        assert!(hits.iter().all(|h| h.load(Ordering::Relaxed) == 2));

        let rows = Mutex::new(Vec::new());
        pool.for_each_band(IRect::new(0, 1, 4, 9), |band| {
            rows.lock().unwrap().extend(band.y..band.bottom());
        });
        let mut rows = rows.into_inner().unwrap();
        rows.sort();
        assert_eq!(rows, (1..10).collect::<Vec<_>>());

        let total = AtomicUsize::new(0);
        let sum = &total;
        let jobs: Vec<Box<dyn FnOnce() + Send + '_>> = (1..=4)
            .map(|n| Box::new(move || {
                sum.fetch_add(n, Ordering::Relaxed);
            }) as Box<dyn FnOnce() + Send + '_>)
            .collect();
        pool.execute_jobs(jobs);
        assert_eq!(total.load(Ordering::Relaxed), 10);
    }
}
