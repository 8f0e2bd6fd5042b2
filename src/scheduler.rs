//! Parallel evaluation of independent jobs.
//!
//! Small stages run serially on the caller thread. Larger ones fan out
//! over a dedicated rayon pool. Results always come back in job order and
//! reductions break score ties by enumeration order, so the outcome is
//! the same whatever the worker count or completion order.

use std::cmp::Ordering;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::Result;

pub struct Scheduler {
    pool: Option<ThreadPool>,
    threshold: usize,
}

impl Scheduler {
    pub fn new(workers: usize, threshold: usize) -> Result<Self> {
        let pool = if workers > 1 {
            Some(
                ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .thread_name(|i| format!("fill-eval-{i}"))
                    .build()?,
            )
        } else {
            None
        };
        Ok(Self { pool, threshold })
    }

    pub fn serial() -> Self {
        Self {
            pool: None,
            threshold: usize::MAX,
        }
    }

    pub fn workers(&self) -> usize {
        self.pool.as_ref().map_or(1, |p| p.current_num_threads())
    }

    /// Applies `f` to every job, returning results in job order.
    pub fn map<T, R, F>(&self, jobs: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        match &self.pool {
            Some(pool) if jobs.len() >= self.threshold.max(2) => {
                pool.install(|| jobs.par_iter().map(&f).collect())
            }
            // Serial fast path: no dispatch overhead.
            _ => jobs.iter().map(f).collect(),
        }
    }
}

/// A scored item that remembers its enumeration order.
#[derive(Debug, Clone)]
pub struct Scored<T> {
    pub order: usize,
    pub score: f64,
    pub item: T,
}

/// Higher score first, then lower order.
pub fn rank_cmp<T>(a: &Scored<T>, b: &Scored<T>) -> Ordering {
    b.score.total_cmp(&a.score).then(a.order.cmp(&b.order))
}

pub fn rank<T>(items: &mut [Scored<T>]) {
    items.sort_by(rank_cmp);
}

pub fn best<T>(items: Vec<Scored<T>>) -> Option<Scored<T>> {
    items
        .into_iter()
        .min_by(|a, b| rank_cmp(a, b))
}
