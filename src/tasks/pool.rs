//! Fixed-size thread pool that decodes thumbnails off the render thread.
//!
//! Workers only see plain data: a job in, a [`JobResult`] out. They never
//! touch GPU state.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, trace, warn};

use crate::events::{JobResult, ThumbnailJob};
use crate::processing::decode::{Constraints, Decode};

pub struct WorkerPool {
    jobs: Option<Sender<ThumbnailJob>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers that push results into `results`.
    pub fn spawn(
        size: usize,
        decoder: Arc<dyn Decode>,
        results: Sender<JobResult>,
    ) -> io::Result<Self> {
        let (jobs_tx, jobs_rx) = crossbeam_channel::unbounded::<ThumbnailJob>();
        let mut workers = Vec::with_capacity(size.max(1));
        for n in 0..size.max(1) {
            let rx = jobs_rx.clone();
            let tx = results.clone();
            let decoder = Arc::clone(&decoder);
            let handle = thread::Builder::new()
                .name(format!("thumb-{n}"))
                .spawn(move || worker_loop(rx, decoder, tx))?;
            workers.push(handle);
        }
        debug!(workers = workers.len(), "thumbnail pool started");
        Ok(Self {
            jobs: Some(jobs_tx),
            workers,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue a job. Returns `false` once the pool has been shut down.
    pub fn submit(&self, job: ThumbnailJob) -> bool {
        match &self.jobs {
            Some(tx) => tx.send(job).is_ok(),
            None => false,
        }
    }

    /// Close the queue and wait for the workers. Cancel outstanding jobs
    /// first or this waits for them to decode.
    pub fn shutdown(&mut self) {
        if self.jobs.take().is_none() {
            return;
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("thumbnail worker panicked");
            }
        }
        debug!("thumbnail pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(jobs: Receiver<ThumbnailJob>, decoder: Arc<dyn Decode>, results: Sender<JobResult>) {
    while let Ok(job) = jobs.recv() {
        // Cancellation only stops jobs that have not started.
        if job.cancel.is_cancelled() {
            trace!(path = %job.path.display(), epoch = job.epoch, "skipping cancelled thumbnail job");
            continue;
        }
        let bound = Constraints::Thumbnail {
            max_width: job.bound.0,
            max_height: job.bound.1,
        };
        let outcome = decoder.decode(&job.path, &bound);
        let result = JobResult {
            key: job.key,
            path: job.path,
            epoch: job.epoch,
            outcome,
        };
        if results.send(result).is_err() {
            break;
        }
    }
}
