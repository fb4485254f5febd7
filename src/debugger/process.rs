use super::breakpoints::{Breakpoint, Breakpoints};
use super::session::GhciSession;
use super::stepping::StepRequest;
use crate::config::DebuggerConfig;
use crate::parser::{Binding, HistoryStep, ParseResult, Position, StackFrame};
use crate::protocol::{
    Command, CommandKind, HistoryCursor, HistoryDirection, ShowExpressionCommand,
    StandardShowExpressionCallback,
};
use crate::{Error, Result};
use log::{error, info};
use std::path::PathBuf;
use std::sync::mpsc;

/// Debug session over one ghci process.
///
/// Commands are serialized through `&mut self`: every query sends one command
/// and returns once its answer has been parsed.
pub struct DebugProcess {
    config: DebuggerConfig,
    module: Option<PathBuf>,
    session: Option<GhciSession>,
    breakpoints: Breakpoints,
    history: HistoryCursor,
}

impl DebugProcess {
    pub fn new(config: DebuggerConfig, module: Option<PathBuf>) -> Self {
        Self {
            config,
            module,
            session: None,
            breakpoints: Breakpoints::new(),
            history: HistoryCursor::default(),
        }
    }

    pub fn config(&self) -> &DebuggerConfig {
        &self.config
    }

    pub fn start(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Err(Error::AlreadyRunning);
        }
        self.config.validate()?;
        let session = GhciSession::start(&self.config, self.module.as_deref())?;
        self.session = Some(session);
        self.history = HistoryCursor::default();
        Ok(())
    }

    /// Terminate ghci. Calling it on a stopped session does nothing.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            info!("stopping ghci, pid {}", session.id());
            session.shutdown();
            self.breakpoints.clear();
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    pub fn process_id(&self) -> Option<u32> {
        self.session.as_ref().map(GhciSession::id)
    }

    pub fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    /// Send `command` and run its callback. A desynchronized or dead
    /// interpreter ends the session.
    pub fn execute(&mut self, command: Command) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            command.fail();
            return Err(Error::NotRunning);
        };
        let result = session.protocol_mut().execute(command);
        self.check(result)
    }

    pub fn enqueue(&mut self, command: Command) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            command.fail();
            return Err(Error::NotRunning);
        };
        session.protocol_mut().enqueue(command);
        Ok(())
    }

    pub fn run_pending(&mut self) -> Result<()> {
        let session = self.session.as_mut().ok_or(Error::NotRunning)?;
        let result = session.protocol_mut().run_pending();
        self.check(result)
    }

    fn check(&mut self, result: Result<()>) -> Result<()> {
        if let Err(e) = &result {
            if e.is_fatal() {
                error!("{e}, stopping the debug session");
                self.stop();
            }
        }
        result
    }

    /// Send a command and hand its parsed answer to `extract`.
    fn query<T, F>(&mut self, kind: CommandKind, extract: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Option<ParseResult>) -> Result<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.execute(Command::new(kind, move |result| {
            let _ = tx.send(extract(result));
        }))?;
        rx.recv().map_err(|_| Error::NotRunning)?
    }

    // ------------------------------------ session queries ----------------------------------------

    pub fn set_breakpoint(&mut self, module: &str, line: u32) -> Result<Breakpoint> {
        let kind = CommandKind::SetBreakpoint {
            module: module.to_string(),
            line,
        };
        let text = kind.to_string();
        let breakpoint = self.query(kind, move |result| match result {
            Some(ParseResult::BreakpointHit {
                breakpoint_number,
                position,
            }) => Ok(Breakpoint {
                number: breakpoint_number,
                position,
            }),
            _ => Err(Error::ParseMismatch { command: text }),
        })?;
        self.breakpoints.add(module, line, breakpoint.clone());
        Ok(breakpoint)
    }

    /// Remove a breakpoint set with `set_breakpoint`; `false` if there was none.
    pub fn remove_breakpoint(&mut self, module: &str, line: u32) -> Result<bool> {
        let Some(breakpoint) = self.breakpoints.get(module, line) else {
            return Ok(false);
        };
        let kind = CommandKind::DeleteBreakpoint {
            number: breakpoint.number,
        };
        let text = kind.to_string();
        self.query(kind, move |result| {
            result
                .map(|_| ())
                .ok_or(Error::ParseMismatch { command: text })
        })?;
        self.breakpoints.remove(module, line);
        Ok(true)
    }

    /// Evaluate `expression` with tracing until a breakpoint. `None` if it ran
    /// to completion.
    pub fn trace(&mut self, expression: &str) -> Result<Option<StackFrame>> {
        let frame = self.query(
            CommandKind::Trace {
                expression: expression.to_string(),
            },
            |result| match result {
                Some(ParseResult::Stopped { frame }) => Ok(Some(frame)),
                _ => Ok(None),
            },
        )?;
        self.history = HistoryCursor::default();
        Ok(frame)
    }

    pub fn expression_type(&mut self, expression: &str) -> Result<String> {
        let expr = expression.trim().to_string();
        self.query(
            CommandKind::ExpressionType {
                expression: expr.clone(),
            },
            move |result| match result {
                Some(ParseResult::ExpressionType { type_text, .. }) => Ok(type_text),
                _ => Err(Error::TypeUnavailable { expression: expr }),
            },
        )
    }

    /// Render the value of `expression` with the configured printer.
    pub fn show_expression(
        &mut self,
        expression: &str,
        expression_type: Option<String>,
    ) -> Result<Binding> {
        let (tx, rx) = mpsc::channel::<Result<Binding>>();
        let command = ShowExpressionCommand::new(
            self.config.printer.clone(),
            expression,
            StandardShowExpressionCallback::new(expression.trim(), expression_type, tx),
        );
        self.execute(command)?;
        rx.recv().map_err(|_| Error::NotRunning)?
    }

    pub fn history(&mut self) -> Result<Vec<StackFrame>> {
        let frames = self.query(CommandKind::History, |result| match result {
            Some(ParseResult::History { frames }) => Ok(frames),
            _ => Err(Error::ParseMismatch {
                command: CommandKind::History.to_string(),
            }),
        })?;
        self.history.len = Some(frames.len());
        Ok(frames)
    }

    pub fn bindings(&mut self) -> Result<Vec<Binding>> {
        self.query(CommandKind::ShowBindings, |result| match result {
            Some(ParseResult::BindingList { bindings }) => Ok(bindings),
            _ => Err(Error::ParseMismatch {
                command: CommandKind::ShowBindings.to_string(),
            }),
        })
    }

    /// Force evaluation of `expression` and report the bindings it produced.
    pub fn force(&mut self, expression: &str) -> Result<Vec<Binding>> {
        let expr = expression.trim().to_string();
        self.query(
            CommandKind::Force {
                expression: expr.clone(),
            },
            move |result| match result {
                Some(ParseResult::BindingList { bindings }) => Ok(bindings),
                _ => Err(Error::Evaluation { expression: expr }),
            },
        )
    }

    pub fn back(&mut self) -> Result<HistoryStep> {
        self.move_history(HistoryDirection::Back)
    }

    pub fn forward(&mut self) -> Result<HistoryStep> {
        self.move_history(HistoryDirection::Forward)
    }

    fn move_history(&mut self, direction: HistoryDirection) -> Result<HistoryStep> {
        let kind = CommandKind::MoveHistory {
            direction,
            cursor: Some(self.history),
        };
        let text = kind.to_string();
        let step = self.query(kind, move |result| match result {
            Some(ParseResult::HistoryMove(step)) => Ok(step),
            _ => Err(Error::ParseMismatch { command: text }),
        })?;
        self.history = self.history.moved(direction);
        Ok(step)
    }

    /// Load a module into the running interpreter. Breakpoints do not survive
    /// a reload.
    pub fn load(&mut self, path: &str) -> Result<()> {
        let kind = CommandKind::Load {
            path: path.trim().to_string(),
        };
        let text = kind.to_string();
        self.query(kind, move |result| {
            result
                .map(|_| ())
                .ok_or(Error::ParseMismatch { command: text })
        })?;
        self.breakpoints.clear();
        self.history = HistoryCursor::default();
        Ok(())
    }

    /// Send arbitrary input; the answer is classified or returned as text.
    pub fn raw(&mut self, text: &str) -> Result<ParseResult> {
        let kind = CommandKind::Raw {
            text: text.to_string(),
        };
        let command = kind.to_string();
        self.query(kind, move |result| {
            result.ok_or(Error::ParseMismatch { command })
        })
    }

    // ------------------------------------ execution control --------------------------------------

    pub fn step_over(&mut self) -> Result<()> {
        Err(Error::Unsupported(StepRequest::StepOver))
    }

    pub fn step_into(&mut self) -> Result<()> {
        Err(Error::Unsupported(StepRequest::StepInto))
    }

    pub fn step_out(&mut self) -> Result<()> {
        Err(Error::Unsupported(StepRequest::StepOut))
    }

    pub fn resume(&mut self) -> Result<()> {
        Err(Error::Unsupported(StepRequest::Resume))
    }

    pub fn run_to_position(&mut self, _position: &Position) -> Result<()> {
        Err(Error::Unsupported(StepRequest::RunToPosition))
    }
}

impl Drop for DebugProcess {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process() -> DebugProcess {
        DebugProcess::new(DebuggerConfig::default(), None)
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut process = process();
        process.stop();
        process.stop();
        assert!(!process.is_running());
        assert_eq!(process.process_id(), None);
    }

    #[test]
    fn test_step_operations_are_unsupported() {
        let mut process = process();
        let position = Position::new("A.hs", 1, 1, 1, 1);
        let results = [
            (process.step_over(), StepRequest::StepOver),
            (process.step_into(), StepRequest::StepInto),
            (process.step_out(), StepRequest::StepOut),
            (process.resume(), StepRequest::Resume),
            (process.run_to_position(&position), StepRequest::RunToPosition),
        ];
        for (result, request) in results {
            match result {
                Err(Error::Unsupported(r)) => assert_eq!(r, request),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_execute_without_session_fails_callback() {
        let mut process = process();
        let (tx, rx) = mpsc::channel();
        let err = process
            .execute(Command::new(CommandKind::History, move |result| {
                tx.send(result).unwrap()
            }))
            .unwrap_err();
        assert!(matches!(err, Error::NotRunning));
        assert_eq!(rx.recv().unwrap(), None);
        assert!(matches!(process.bindings(), Err(Error::NotRunning)));
    }

    #[test]
    fn test_invalid_config_refuses_to_start() {
        let mut process = DebugProcess::new(
            DebuggerConfig {
                response_timeout_ms: 0,
                ..DebuggerConfig::default()
            },
            None,
        );
        assert!(matches!(process.start(), Err(Error::Config(_))));
        assert!(!process.is_running());
    }
}
