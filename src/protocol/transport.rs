use super::command::Command;
use super::reader::OutputEvent;
use crate::{Error, Result};
use log::{debug, error, warn};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Request/response exchange with ghci.
///
/// The text protocol has no correlation ids, so exactly one command is in
/// flight at any time: `execute` writes a command and blocks until the prompt
/// that ends its answer. Commands submitted with `enqueue` wait in FIFO order
/// until `run_pending`.
pub struct Protocol<W: Write> {
    input: W,
    events: Receiver<OutputEvent>,
    response_timeout: Duration,
    pending: VecDeque<Command>,
    closed: bool,
}

impl<W: Write> Protocol<W> {
    pub fn new(input: W, events: Receiver<OutputEvent>, response_timeout: Duration) -> Self {
        Self {
            input,
            events,
            response_timeout,
            pending: VecDeque::new(),
            closed: false,
        }
    }

    /// Send `command`, wait for its answer and run its callback.
    ///
    /// The callback runs exactly once, also when an error is returned.
    pub fn execute(&mut self, command: Command) -> Result<()> {
        let text = command.kind().to_string();
        if self.closed {
            command.fail();
            return Err(Error::ProcessExited);
        }
        if !command.is_single_line() {
            warn!("refusing to send multi-line command {text:?}");
            command.fail();
            return Err(Error::MultilineCommand { command: text });
        }

        if let Err(e) = self.write_bytes(&command.bytes()) {
            command.fail();
            return Err(e);
        }

        match self.read_response(&text, self.response_timeout) {
            Ok(mut output) => {
                command.complete(&mut output);
                if !output.is_empty() {
                    warn!("unparsed output of `{text}`: {:?}", output);
                }
                Ok(())
            }
            Err(e) => {
                command.fail();
                Err(e)
            }
        }
    }

    pub fn enqueue(&mut self, command: Command) {
        debug!("queued `{}`", command.kind());
        self.pending.push_back(command);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Execute queued commands in submission order. After a fatal error the
    /// remaining commands are retired without an answer.
    pub fn run_pending(&mut self) -> Result<()> {
        while let Some(command) = self.pending.pop_front() {
            if let Err(e) = self.execute(command) {
                if e.is_fatal() {
                    self.fail_pending();
                }
                return Err(e);
            }
        }
        Ok(())
    }

    pub(crate) fn fail_pending(&mut self) {
        for command in self.pending.drain(..) {
            command.fail();
        }
    }

    /// Write one line of input without waiting for an answer.
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        let line = line.trim();
        if line.contains(['\n', '\r']) {
            return Err(Error::MultilineCommand {
                command: line.to_string(),
            });
        }
        self.write_bytes(format!("{line}\n").as_bytes())
    }

    /// Collect output until the next prompt.
    pub fn wait_for_prompt(&mut self, timeout: Duration) -> Result<VecDeque<String>> {
        self.read_response("<startup>", timeout)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        debug!("-> {}", String::from_utf8_lossy(bytes).trim_end());
        self.input.write_all(bytes)?;
        self.input.flush()?;
        Ok(())
    }

    fn read_response(&mut self, command: &str, timeout: Duration) -> Result<VecDeque<String>> {
        let deadline = Instant::now() + timeout;
        let mut output = VecDeque::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(remaining) {
                Ok(OutputEvent::Line(line)) => {
                    debug!("<- {line}");
                    output.push_back(line);
                }
                Ok(OutputEvent::Prompt) => return Ok(output),
                Ok(OutputEvent::Closed) | Err(RecvTimeoutError::Disconnected) => {
                    self.closed = true;
                    return Err(Error::ProcessExited);
                }
                Err(RecvTimeoutError::Timeout) => {
                    error!("no prompt after `{command}`, output so far: {:?}", output);
                    return Err(Error::ProtocolDesync {
                        command: command.to_string(),
                        waited: timeout,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseResult;
    use crate::protocol::CommandKind;
    use std::sync::mpsc;

    #[test]
    fn test_execute_writes_and_parses() {
        let (tx, rx) = mpsc::channel();
        tx.send(OutputEvent::Line("map :: (a -> b) -> [a] -> [b]".to_string()))
            .unwrap();
        tx.send(OutputEvent::Prompt).unwrap();

        let mut protocol = Protocol::new(Vec::new(), rx, Duration::from_secs(1));
        let (result_tx, result_rx) = mpsc::channel();
        protocol
            .execute(Command::new(
                CommandKind::ExpressionType {
                    expression: "map".to_string(),
                },
                move |result| result_tx.send(result).unwrap(),
            ))
            .unwrap();

        assert_eq!(protocol.input, b":type map\n");
        assert!(matches!(
            result_rx.recv().unwrap(),
            Some(ParseResult::ExpressionType { .. })
        ));
    }

    #[test]
    fn test_timeout_is_desync() {
        let (_tx, rx) = mpsc::channel();
        let mut protocol = Protocol::new(Vec::new(), rx, Duration::from_millis(20));
        let (result_tx, result_rx) = mpsc::channel();

        let err = protocol
            .execute(Command::new(CommandKind::History, move |result| {
                result_tx.send(result).unwrap()
            }))
            .unwrap_err();
        assert!(matches!(err, Error::ProtocolDesync { ref command, .. } if command == ":history"));
        assert_eq!(result_rx.recv().unwrap(), None);
    }

    #[test]
    fn test_closed_stream() {
        let (tx, rx) = mpsc::channel();
        tx.send(OutputEvent::Closed).unwrap();
        let mut protocol = Protocol::new(Vec::new(), rx, Duration::from_secs(1));

        let err = protocol
            .execute(Command::new(CommandKind::ShowBindings, |_| {}))
            .unwrap_err();
        assert!(matches!(err, Error::ProcessExited));

        let (result_tx, result_rx) = mpsc::channel();
        let err = protocol
            .execute(Command::new(CommandKind::ShowBindings, move |result| {
                result_tx.send(result).unwrap()
            }))
            .unwrap_err();
        assert!(matches!(err, Error::ProcessExited));
        assert_eq!(result_rx.recv().unwrap(), None);
        assert!(!protocol.input.is_empty());
    }

    #[test]
    fn test_multiline_command_is_refused() {
        let (tx, rx) = mpsc::channel();
        tx.send(OutputEvent::Line("id :: a -> a".to_string())).unwrap();
        tx.send(OutputEvent::Prompt).unwrap();
        let mut protocol = Protocol::new(Vec::new(), rx, Duration::from_secs(1));

        let (result_tx, result_rx) = mpsc::channel();
        let err = protocol
            .execute(Command::new(
                CommandKind::Raw {
                    text: ":type id\n:type map".to_string(),
                },
                move |result| result_tx.send(result).unwrap(),
            ))
            .unwrap_err();
        assert!(matches!(err, Error::MultilineCommand { .. }));
        assert!(!err.is_fatal());
        assert_eq!(result_rx.recv().unwrap(), None);
        assert!(protocol.input.is_empty());

        let (result_tx, result_rx) = mpsc::channel();
        protocol
            .execute(Command::new(
                CommandKind::ExpressionType {
                    expression: "id".to_string(),
                },
                move |result| result_tx.send(result).unwrap(),
            ))
            .unwrap();
        assert_eq!(protocol.input, b":type id\n");
        assert!(matches!(
            result_rx.recv().unwrap(),
            Some(ParseResult::ExpressionType { ref type_text, .. }) if type_text == "a -> a"
        ));
        assert!(protocol.send_line("a\nb").is_err());
    }

    #[test]
    fn test_fatal_error_retires_queue() {
        let (_tx, rx) = mpsc::channel();
        let mut protocol = Protocol::new(Vec::new(), rx, Duration::from_millis(10));
        let (result_tx, result_rx) = mpsc::channel();

        for _ in 0..3 {
            let result_tx = result_tx.clone();
            protocol.enqueue(Command::new(CommandKind::History, move |result| {
                result_tx.send(result).unwrap()
            }));
        }
        assert_eq!(protocol.pending(), 3);
        assert!(protocol.run_pending().is_err());
        assert_eq!(protocol.pending(), 0);
        drop(result_tx);
        assert_eq!(result_rx.iter().count(), 3);
    }
}
