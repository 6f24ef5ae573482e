use std::collections::{TryReserveError, VecDeque};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{Builder, JoinHandle};
use tracing::{debug, error, info};

/// Largest number of workers a pool may be created with.
pub const MAX_WORKERS: usize = 200;

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("invalid pool size {requested} (1-{max})")]
    InvalidSize { requested: usize, max: usize },
    #[error("unable to spawn worker: {0}")]
    Spawn(#[source] io::Error),
    #[error("unable to queue job: {0}")]
    Allocation(#[source] TryReserveError),
    #[error("pool is shutting down")]
    Rejected,
}

struct State {
    queue: VecDeque<Job>,
    /// Queued or running jobs; shutdown waits for this to reach zero.
    pending: usize,
    live_workers: usize,
    stop_accepting: bool,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    not_empty: Condvar,
    empty: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct ThreadPool {
    shared: Arc<Shared>,
    threads: Mutex<Vec<Worker>>,
    size: usize,
}

struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>
}

impl ThreadPool {
    pub fn new(num: usize) -> Result<ThreadPool, PoolError> {
        if num == 0 || num > MAX_WORKERS {
            return Err(PoolError::InvalidSize { requested: num, max: MAX_WORKERS });
        }

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                pending: 0,
                live_workers: 0,
                stop_accepting: false,
                shutdown: false,
            }),
            not_empty: Condvar::new(),
            empty: Condvar::new(),
        });

        let pool = ThreadPool {
            shared: shared.clone(),
            threads: Mutex::new(Vec::with_capacity(num)),
            size: num,
        };

        for id in 0..num {
            match Worker::new(id, shared.clone()) {
                Ok(worker) => pool.workers().push(worker),
                Err(e) => {
                    pool.shutdown();
                    return Err(PoolError::Spawn(e));
                }
            }
        }
        Ok(pool)
    }

    /// Number of workers the pool was created with.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Workers that have not yet exited.
    pub fn live_workers(&self) -> usize {
        self.shared.lock().live_workers
    }

    pub fn is_accepting(&self) -> bool {
        !self.shared.lock().stop_accepting
    }

    /// Queues `f` behind every job already submitted and wakes one idle
    /// worker. Once shutdown has begun the job is dropped unexecuted.
    pub fn execute<F>(&self, f: F) -> Result<(), PoolError>
        where F: FnOnce() + Send + 'static {
        let job: Job = Box::new(f);
        {
            let mut state = self.shared.lock();
            if state.stop_accepting {
                debug!("dropping job submitted after shutdown began");
                return Err(PoolError::Rejected);
            }
            state.queue.try_reserve(1).map_err(PoolError::Allocation)?;
            state.queue.push_back(job);
            state.pending += 1;
        }
        self.shared.not_empty.notify_one();
        Ok(())
    }

    /// Stops accepting jobs, waits for every queued job to finish, then
    /// wakes and joins all workers. Calls after the first are no-ops.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.lock();
            if state.stop_accepting {
                return;
            }
            state.stop_accepting = true;
            // idle workers re-check the flag and leave once the queue is empty
            self.shared.not_empty.notify_all();

            while state.pending > 0 {
                state = self.shared.empty.wait(state).unwrap_or_else(PoisonError::into_inner);
            }
            state.shutdown = true;
        }
        self.shared.not_empty.notify_all();

        for worker in self.workers().iter_mut() {
            debug!("Shutting down worker {}", worker.id);
            if let Some(handle) = worker.handle.take() {
                if handle.join().is_err() {
                    error!("worker {} panicked outside a job", worker.id);
                }
            }
        }
        info!("thread pool stopped");
    }

    fn workers(&self) -> MutexGuard<'_, Vec<Worker>> {
        self.threads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Worker {
    fn new(id: usize, shared: Arc<Shared>) -> io::Result<Worker> {
        shared.lock().live_workers += 1;
        let spawned = Builder::new()
            .name(format!("worker-{}", id))
            .spawn({
                let shared = shared.clone();
                move || run(id, &shared)
            });
        match spawned {
            Ok(handle) => Ok(Worker { id, handle: Some(handle) }),
            Err(e) => {
                shared.lock().live_workers -= 1;
                Err(e)
            }
        }
    }
}

fn run(id: usize, shared: &Shared) {
    debug!("worker {} started", id);
    loop {
        let job = {
            let mut state = shared.lock();
            loop {
                if state.shutdown {
                    break None;
                }
                if let Some(job) = state.queue.pop_front() {
                    break Some(job);
                }
                if state.stop_accepting {
                    break None;
                }
                state = shared.not_empty.wait(state).unwrap_or_else(PoisonError::into_inner);
            }
        };

        let job = match job {
            Some(job) => job,
            None => break,
        };

        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!("job panicked on worker {}", id);
        }

        let mut state = shared.lock();
        state.pending -= 1;
        if state.pending == 0 {
            shared.empty.notify_all();
        }
    }

    shared.lock().live_workers -= 1;
    debug!("Terminating worker {}", id);
}
