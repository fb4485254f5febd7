mod breakpoints;
mod process;
mod session;
mod stepping;

pub use breakpoints::{Breakpoint, Breakpoints};
pub use process::DebugProcess;
pub use session::GhciSession;
pub use stepping::StepRequest;
