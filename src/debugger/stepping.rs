use std::fmt;

/// Execution control requests a host may issue against a stopped session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRequest {
    StepOver,
    StepInto,
    StepOut,
    Resume,
    RunToPosition,
}

impl fmt::Display for StepRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepRequest::StepOver => "step over",
            StepRequest::StepInto => "step into",
            StepRequest::StepOut => "step out",
            StepRequest::Resume => "resume",
            StepRequest::RunToPosition => "run to position",
        };
        f.write_str(name)
    }
}
