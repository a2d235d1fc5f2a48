//! Bounded pool of worker threads
//!
//! A batch of jobs is sent down a channel shared by the workers, each worker
//! pulls jobs until the channel is closed and returns its results when it exits.
//! The call to [`WorkerPool::map`] only returns once every worker has been joined, so
//! results from a batch are never seen partially.
//!
//! Workers are created per batch inside a thread scope, so jobs and the
//! processing function can borrow from the caller.

use std::thread;

use crossbeam_channel::{bounded, Receiver};

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    n_workers: usize,
}

impl WorkerPool {
    pub fn new(n_workers: usize) -> Self {
        Self {
            n_workers: n_workers.max(1),
        }
    }

    pub fn n_workers(&self) -> usize {
        self.n_workers
    }

    /// Apply f to every job using the worker threads.  Results are returned in
    /// the same order as the jobs
    pub fn map<T, R, F>(&self, jobs: Vec<T>, f: F) -> anyhow::Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync,
    {
        let n_jobs = jobs.len();
        if n_jobs == 0 {
            return Ok(Vec::new());
        }
        let nt = self.n_workers.min(n_jobs);
        let f = &f;
        let mut v = Vec::with_capacity(nt);

        thread::scope(|sc| {
            trace!("Spawning {} workers for {} jobs", nt, n_jobs);
            let (snd, rcv) = bounded(nt * 8);
            let handles: Vec<_> = (0..nt)
                .map(|i| {
                    let r = rcv.clone();
                    sc.spawn(move || worker(i + 1, r, f))
                })
                .collect();
            drop(rcv);

            for job in jobs.into_iter().enumerate() {
                if snd.send(job).is_err() {
                    error!("Error sending job to worker threads");
                    break;
                }
            }

            drop(snd);
            for jh in handles {
                v.push(jh.join())
            }
        });

        trace!("Collecting results from worker threads");
        let mut results: Vec<Option<R>> = (0..n_jobs).map(|_| None).collect();
        for (ix, res) in v.drain(..).enumerate() {
            match res {
                Ok(done) => {
                    for (i, r) in done {
                        results[i] = Some(r)
                    }
                }
                Err(_) => return Err(anyhow!("Error joining worker thread {}", ix + 1)),
            }
        }
        results
            .into_iter()
            .enumerate()
            .map(|(i, r)| r.ok_or_else(|| anyhow!("No result returned for job {}", i)))
            .collect()
    }
}

fn worker<T, R, F>(ix: usize, r: Receiver<(usize, T)>, f: &F) -> Vec<(usize, R)>
where
    F: Fn(T) -> R,
{
    trace!("Starting up worker thread {}", ix);
    let mut done = Vec::new();
    while let Ok((i, job)) = r.recv() {
        trace!("Worker {} processing job {}", ix, i);
        done.push((i, f(job)))
    }
    trace!("Closing down worker thread {}", ix);
    done
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn results_keep_job_order() {
        let pool = WorkerPool::new(4);
        let res = pool.map((0..100).collect(), |x: usize| x * x).unwrap();
        assert_eq!(res, (0..100).map(|x| x * x).collect::<Vec<_>>());
    }

    #[test]
    fn empty_batch() {
        let pool = WorkerPool::new(3);
        let res: Vec<usize> = pool.map(Vec::<usize>::new(), |x| x).unwrap();
        assert!(res.is_empty());
    }

    #[test]
    fn every_job_runs_once() {
        let counter = AtomicUsize::new(0);
        let pool = WorkerPool::new(16);
        let res = pool
            .map(vec!["a", "bb", "ccc"], |s| {
                counter.fetch_add(1, Ordering::SeqCst);
                s.len()
            })
            .unwrap();
        assert_eq!(res, vec![1, 2, 3]);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn zero_workers_rounds_up() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.n_workers(), 1);
        assert_eq!(pool.map(vec![1, 2], |x| x + 1).unwrap(), vec![2, 3]);
    }

    #[test]
    fn worker_panic_is_an_error() {
        let pool = WorkerPool::new(2);
        let res = pool.map(vec![1, 2, 3], |x: i32| {
            if x == 2 {
                panic!("boom")
            }
            x
        });
        assert!(res.is_err());
    }
}
