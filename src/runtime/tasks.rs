//==============================================
// File: runtime/tasks.rs
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Shared worker pool for detached GatoScript work
// Objective: Run spawned tasks and HTTP handlers on blocking threads with large
//            stacks, without ever joining them
//==============================================

use once_cell::sync::OnceCell;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use crate::interpreter::RuntimeError;

/// Tree-walking recursion is stack hungry.
const TASK_STACK_SIZE: usize = 8 * 1024 * 1024;

static POOL: OnceCell<Runtime> = OnceCell::new();

fn pool() -> std::io::Result<&'static Runtime> {
    POOL.get_or_try_init(|| {
        let threads = super::task_threads();
        debug!(threads, "starting task pool");
        Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(threads)
            .thread_name("gato-task")
            .thread_stack_size(TASK_STACK_SIZE)
            .build()
    })
}

/// Queues `job` on the pool and returns immediately. Nothing waits for it;
/// when all pool threads are busy the job queues until one frees up.
pub fn spawn_detached<F>(job: F) -> Result<(), RuntimeError>
where
    F: FnOnce() + Send + 'static,
{
    let pool = pool().map_err(|err| RuntimeError::Spawn(err.to_string()))?;
    // Dropping the handle detaches the task.
    drop(pool.spawn_blocking(job));
    Ok(())
}
