use crate::parser::{Binding, ParseResult};
use crate::Error;
use std::sync::mpsc::Sender;

/// Receives the parsed answer of a command. Invoked exactly once per command,
/// with `None` when the output could not be parsed or never arrived.
pub trait CommandCallback: Send {
    fn exec_after_parsing(self: Box<Self>, result: Option<ParseResult>);
}

impl<F> CommandCallback for F
where
    F: FnOnce(Option<ParseResult>) + Send,
{
    fn exec_after_parsing(self: Box<Self>, result: Option<ParseResult>) {
        (*self)(result)
    }
}

/// Consumer of an expression evaluation, the debugger value view of a host.
pub trait EvaluationCallback: Send {
    fn evaluated(&mut self, value: Binding);
    fn error_occurred(&mut self, error: Error);
}

impl EvaluationCallback for Sender<Result<Binding, Error>> {
    fn evaluated(&mut self, value: Binding) {
        let _ = self.send(Ok(value));
    }

    fn error_occurred(&mut self, error: Error) {
        let _ = self.send(Err(error));
    }
}
