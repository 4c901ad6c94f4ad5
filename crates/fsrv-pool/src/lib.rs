//! # fsrv-pool: work queue and worker pool
//!
//! The acceptor pushes connections into a [`WorkQueue`]; a [`FixedPool`] of
//! OS threads pops them one at a time and runs each to completion on the
//! calling thread. There is no scaling, no stealing and no priority: FIFO
//! in, one job per worker at a time.
//!
//! Shutdown is in-band. The owner enqueues one [`Job::Stop`] per worker
//! after the last real job, so every job enqueued before shutdown is
//! processed before the workers exit.

pub mod queue;
pub mod pool;

pub use queue::{Job, WorkQueue};
pub use pool::{FixedPool, JobHandler};
