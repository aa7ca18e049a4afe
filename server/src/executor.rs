use std::{
    future::Future,
    panic::AssertUnwindSafe,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use futures::FutureExt;
use smol::{Executor, Timer, channel};
use tracing::{debug, error};

/// A `smol` executor driven by a fixed number of OS threads, with task
/// tracking so shutdown can wait for spawned sessions.
#[derive(Clone, Debug)]
pub struct WorkerPool {
    executor: Arc<Executor<'static>>,
    threads: usize,
    task_count: Arc<AtomicUsize>,
    accepting_tasks: Arc<AtomicBool>,
}

impl WorkerPool {
    /// `threads` below one is raised to one.
    pub fn new(threads: usize) -> Self {
        Self {
            executor: Arc::new(Executor::new()),
            threads: threads.max(1),
            task_count: Arc::new(AtomicUsize::new(0)),
            accepting_tasks: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Spawns a detached task. A panic inside the task is logged and
    /// contained. Returns `false` once the pool stopped accepting tasks.
    pub fn spawn<F>(&self, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.accepting_tasks.load(Ordering::SeqCst) {
            return false;
        }

        self.task_count.fetch_add(1, Ordering::SeqCst);
        let task_count = Arc::clone(&self.task_count);

        self.executor
            .spawn(async move {
                if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
                    error!(
                        component = "worker_pool",
                        panic = %panic_message(panic.as_ref()),
                        "Task panicked"
                    );
                }
                task_count.fetch_sub(1, Ordering::SeqCst);
            })
            .detach();
        true
    }

    /// Stops accepting tasks and waits until all running tasks complete.
    pub async fn wait(&self) {
        self.accepting_tasks.store(false, Ordering::SeqCst);

        while self.task_count.load(Ordering::SeqCst) > 0 {
            Timer::after(Duration::from_millis(10)).await;
        }
    }

    pub fn active_tasks(&self) -> usize {
        self.task_count.load(Ordering::SeqCst)
    }

    pub fn is_accepting_tasks(&self) -> bool {
        self.accepting_tasks.load(Ordering::SeqCst)
    }

    /// Runs `fut` to completion on the calling thread while `threads - 1`
    /// helper threads drive the same executor.
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        let (stop, stopped) = channel::unbounded::<()>();

        thread::scope(|scope| {
            for worker in 1..self.threads {
                let executor = Arc::clone(&self.executor);
                let stopped = stopped.clone();
                scope.spawn(move || {
                    debug!(component = "worker_pool", worker, status = "started");
                    let _ = smol::block_on(executor.run(stopped.recv()));
                    debug!(component = "worker_pool", worker, status = "stopped");
                });
            }

            let output = smol::block_on(self.executor.run(fut));
            drop(stop);
            output
        })
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(1)
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}
