//! mirror daemon: recurring sync ticks, event logging and ctrl-c shutdown.

mod error;
mod runtime;

pub use error::DaemonError;
pub use runtime::{
    init_tracing, log_event, run, start_blocking, LogFormat, LoopSummary, SyncLoop,
    LOG_FORMAT_ENV,
};
