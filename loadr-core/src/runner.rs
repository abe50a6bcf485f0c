mod context;
mod gate;
mod progress;
mod run;
mod signal;

pub use context::RunContext;
pub use gate::IterationGate;
pub use progress::{PROGRESS_INTERVAL, ProgressFn, ProgressUpdate};
pub use run::{RunOutput, run, run_units};
pub use signal::StartSignal;
