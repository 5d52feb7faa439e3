//! Parallel pairwise distance computation.
//!
//! Pairs are spread over a fixed-size rayon pool. Workers only compute;
//! results travel back over a channel to the calling thread, which is the
//! only writer of the matrix and the only sender of progress events.

use super::matrix::DistanceMatrix;
use super::metric::PairDistance;
use crate::error::ComputeError;
use crate::events::{DistanceEvent, DistanceProgress, Event, EventSender};
use crossbeam_channel::unbounded;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Computes full distance matrices
#[derive(Debug, Clone, Copy)]
pub struct DistanceEngine {
    /// Worker threads (None = host parallelism)
    workers: Option<usize>,
    /// Emit progress every this many collected pairs
    progress_interval: usize,
}

impl DistanceEngine {
    pub fn new(workers: Option<usize>, progress_interval: usize) -> Self {
        Self {
            workers,
            progress_interval: progress_interval.max(1),
        }
    }

    /// Number of threads the pool will use
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Compute every pairwise distance of `source`.
    ///
    /// Fails on the first worker error; no partial matrix is returned.
    pub fn compute(
        &self,
        source: &dyn PairDistance,
        events: &EventSender,
    ) -> Result<DistanceMatrix, ComputeError> {
        let n = source.len();
        let total = n * n.saturating_sub(1) / 2;
        let mut matrix = DistanceMatrix::zeros(n);

        events.send(Event::Distance(DistanceEvent::Started { total_pairs: total }));

        if total == 0 {
            events.send(Event::Distance(DistanceEvent::Completed { total_pairs: 0 }));
            return Ok(matrix);
        }

        let pool = self.build_pool()?;
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();

        tracing::debug!(
            pairs = total,
            workers = pool.current_num_threads(),
            "Dispatching pairwise distances"
        );

        let failed = AtomicBool::new(false);
        let (tx, rx) = unbounded::<(usize, usize, Result<f64, ComputeError>)>();
        let mut first_error: Option<ComputeError> = None;
        let mut completed = 0usize;

        let joined = thread::scope(|scope| {
            let pool = &pool;
            let pairs = &pairs;
            let failed = &failed;

            let dispatcher = scope.spawn(move || {
                pool.install(|| {
                    pairs.par_iter().for_each_with(tx, |tx, &(i, j)| {
                        // stop doing work once any pair has failed
                        if failed.load(Ordering::Relaxed) {
                            return;
                        }
                        let result = source.distance(i, j);
                        if result.is_err() {
                            failed.store(true, Ordering::Relaxed);
                        }
                        let _ = tx.send((i, j, result));
                    });
                });
            });

            for (i, j, result) in rx.iter() {
                match result {
                    Ok(d) => {
                        matrix.set(i, j, d);
                        completed += 1;
                        if completed % self.progress_interval == 0 {
                            events.send(Event::Distance(DistanceEvent::Progress(
                                DistanceProgress {
                                    completed,
                                    total,
                                },
                            )));
                        }
                    }
                    Err(e) => {
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }

            dispatcher.join()
        });

        if joined.is_err() {
            return Err(ComputeError::WorkerPool(
                "a distance worker panicked".to_string(),
            ));
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        if completed != total {
            return Err(ComputeError::WorkerPool(format!(
                "collected {completed} of {total} pairs"
            )));
        }

        events.send(Event::Distance(DistanceEvent::Completed { total_pairs: total }));
        Ok(matrix)
    }

    fn build_pool(&self) -> Result<rayon::ThreadPool, ComputeError> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_count())
            .build()
            .map_err(|e| ComputeError::WorkerPool(format!("failed to build thread pool: {e}")))
    }
}

impl Default for DistanceEngine {
    fn default() -> Self {
        Self::new(None, 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::FrameId;
    use crate::events::EventChannel;

    /// Distance defined by a closure over frame ids
    struct FnDistance<F> {
        n: usize,
        f: F,
    }

    impl<F> PairDistance for FnDistance<F>
    where
        F: Fn(FrameId, FrameId) -> Result<f64, ComputeError> + Send + Sync,
    {
        fn len(&self) -> usize {
            self.n
        }

        fn distance(&self, i: FrameId, j: FrameId) -> Result<f64, ComputeError> {
            (self.f)(i, j)
        }
    }

    fn linear(n: usize) -> FnDistance<impl Fn(FrameId, FrameId) -> Result<f64, ComputeError>> {
        FnDistance {
            n,
            f: move |i: FrameId, j: FrameId| Ok((j as f64 - i as f64).abs() / n as f64),
        }
    }

    fn progress_events(receiver: &crate::events::EventReceiver) -> Vec<DistanceProgress> {
        receiver
            .iter()
            .filter_map(|event| match event {
                Event::Distance(DistanceEvent::Progress(p)) => Some(p),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn matrix_is_symmetric_with_zero_diagonal() {
        let engine = DistanceEngine::new(Some(4), 100);
        let matrix = engine
            .compute(&linear(12), &crate::events::null_sender())
            .unwrap();

        assert_eq!(matrix.len(), 12);
        for i in 0..12 {
            assert_eq!(matrix.get(i, i), 0.0);
            for j in 0..12 {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
                assert!((0.0..=1.0).contains(&matrix.get(i, j)));
            }
        }
        assert_eq!(matrix.get(2, 8), 6.0 / 12.0);
    }

    #[test]
    fn progress_is_reported_every_hundred_pairs() {
        let (sender, receiver) = EventChannel::new();
        // 30 frames -> 435 pairs -> progress at 100, 200, 300, 400
        let engine = DistanceEngine::new(Some(3), 100);
        engine.compute(&linear(30), &sender).unwrap();
        drop(sender);

        let progress = progress_events(&receiver);
        let completed: Vec<_> = progress.iter().map(|p| p.completed).collect();
        assert_eq!(completed, vec![100, 200, 300, 400]);
        assert!(progress.iter().all(|p| p.total == 435));
    }

    #[test]
    fn single_frame_dispatches_no_work() {
        let (sender, receiver) = EventChannel::new();
        let engine = DistanceEngine::default();
        let source = FnDistance {
            n: 1,
            f: |_: FrameId, _: FrameId| -> Result<f64, ComputeError> {
                panic!("no pair should be computed")
            },
        };

        let matrix = engine.compute(&source, &sender).unwrap();
        drop(sender);

        assert_eq!(matrix.len(), 1);
        assert_eq!(matrix.get(0, 0), 0.0);
        assert!(progress_events(&receiver).is_empty());
    }

    #[test]
    fn empty_input_yields_empty_matrix() {
        let matrix = DistanceEngine::default()
            .compute(&linear(0), &crate::events::null_sender())
            .unwrap();
        assert!(matrix.is_empty());
    }

    #[test]
    fn any_worker_failure_fails_the_whole_matrix() {
        let source = FnDistance {
            n: 20,
            f: |i: FrameId, j: FrameId| {
                if (i, j) == (7, 13) {
                    Err(ComputeError::DecodeError {
                        path: "frame_7.png".into(),
                        reason: "corrupt".into(),
                    })
                } else {
                    Ok(0.5)
                }
            },
        };

        let result = DistanceEngine::new(Some(4), 100).compute(&source, &crate::events::null_sender());
        assert!(matches!(result, Err(ComputeError::DecodeError { .. })));
    }

    #[test]
    fn worker_panic_becomes_an_error() {
        let source = FnDistance {
            n: 5,
            f: |i: FrameId, _: FrameId| -> Result<f64, ComputeError> {
                if i == 2 {
                    panic!("worker blew up");
                }
                Ok(0.1)
            },
        };

        let result = DistanceEngine::new(Some(2), 100).compute(&source, &crate::events::null_sender());
        assert!(matches!(result, Err(ComputeError::WorkerPool(_))));
    }

    #[test]
    fn worker_count_defaults_to_host_parallelism() {
        assert!(DistanceEngine::default().worker_count() >= 1);
        assert_eq!(DistanceEngine::new(Some(3), 100).worker_count(), 3);
    }
}
