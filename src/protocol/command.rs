use super::callback::CommandCallback;
use crate::parser::{self, ParseResult};
use log::debug;
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryDirection {
    Back,
    Forward,
}

/// Where the session stands in the evaluation history before a move.
/// `depth` 0 is the current breakpoint, `len` is the history length if a
/// `:history` answer has been seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryCursor {
    pub depth: usize,
    pub len: Option<usize>,
}

impl HistoryCursor {
    /// Depth after a successful move in `direction`.
    pub fn moved(self, direction: HistoryDirection) -> Self {
        let depth = match direction {
            HistoryDirection::Back => self.depth + 1,
            HistoryDirection::Forward => self.depth.saturating_sub(1),
        };
        Self { depth, ..self }
    }
}

/// Everything this crate knows how to ask ghci.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    SetBreakpoint { module: String, line: u32 },
    DeleteBreakpoint { number: i32 },
    Trace { expression: String },
    ExpressionType { expression: String },
    ShowExpression { printer: String, expression: String },
    History,
    ShowBindings,
    Force { expression: String },
    MoveHistory {
        direction: HistoryDirection,
        cursor: Option<HistoryCursor>,
    },
    Load { path: String },
    /// Arbitrary input, the answer goes through the dispatcher and falls back to raw text.
    Raw { text: String },
}

impl CommandKind {
    /// Textual command, before trimming and line termination.
    pub fn payload(&self) -> String {
        match self {
            CommandKind::SetBreakpoint { module, line } => format!(":break {module} {line}"),
            CommandKind::DeleteBreakpoint { number } => format!(":delete {number}"),
            CommandKind::Trace { expression } => format!(":trace {}", expression.trim()),
            CommandKind::ExpressionType { expression } => format!(":type {}", expression.trim()),
            CommandKind::ShowExpression {
                printer,
                expression,
            } => format!("{printer} ({})", expression.trim()),
            CommandKind::History => ":history".to_string(),
            CommandKind::ShowBindings => ":show bindings".to_string(),
            CommandKind::Force { expression } => format!(":force {}", expression.trim()),
            CommandKind::MoveHistory { direction, .. } => match direction {
                HistoryDirection::Back => ":back".to_string(),
                HistoryDirection::Forward => ":forward".to_string(),
            },
            CommandKind::Load { path } => format!(":load {path}"),
            CommandKind::Raw { text } => text.clone(),
        }
    }

    /// Parse the answer to this command out of `output`.
    pub fn parse_output(&self, output: &mut VecDeque<String>) -> Option<ParseResult> {
        match self {
            CommandKind::SetBreakpoint { .. } => parser::parse_set_breakpoint(output),
            CommandKind::DeleteBreakpoint { .. } => parser::parse_plain_output(output),
            CommandKind::Trace { .. } => parser::parse_stopped_at(output),
            CommandKind::ExpressionType { .. } => parser::parse_expression_type(output),
            CommandKind::ShowExpression { .. } => parser::parse_show_output(output),
            CommandKind::History => parser::parse_history(output),
            CommandKind::ShowBindings | CommandKind::Force { .. } => {
                parser::parse_binding_list(output)
            }
            CommandKind::MoveHistory { direction, cursor } => {
                match parser::parse_history_move(output)? {
                    ParseResult::HistoryMove(mut step) => {
                        if let Some(cursor) = cursor {
                            let moved = cursor.moved(*direction);
                            step.at_top |= moved.depth == 0;
                            step.at_bottom = moved.len.is_some_and(|len| moved.depth >= len);
                        }
                        Some(ParseResult::HistoryMove(step))
                    }
                    other => Some(other),
                }
            }
            CommandKind::Load { .. } => {
                let failed = output
                    .iter()
                    .any(|line| line.trim_start().starts_with("Failed,"));
                if failed {
                    return None;
                }
                parser::parse_plain_output(output)
            }
            CommandKind::Raw { .. } => parser::parse_any(output).or_else(|| {
                let text = output.drain(..).collect::<Vec<_>>().join("\n");
                Some(ParseResult::ShowOutput { text })
            }),
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.payload().trim())
    }
}

/// A command together with the callback waiting for its answer.
pub struct Command {
    kind: CommandKind,
    callback: Box<dyn CommandCallback>,
}

impl Command {
    pub fn new<F>(kind: CommandKind, callback: F) -> Self
    where
        F: FnOnce(Option<ParseResult>) + Send + 'static,
    {
        Self::with_callback(kind, callback)
    }

    pub fn with_callback(kind: CommandKind, callback: impl CommandCallback + 'static) -> Self {
        Self {
            kind,
            callback: Box::new(callback),
        }
    }

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    /// Bytes written to ghci stdin: the trimmed payload and a newline.
    pub fn bytes(&self) -> Vec<u8> {
        format!("{}\n", self.kind.payload().trim()).into_bytes()
    }

    /// Ghci reads one command per line, a payload with embedded line breaks
    /// would be answered by several prompts.
    pub fn is_single_line(&self) -> bool {
        !self.kind.payload().trim().contains(['\n', '\r'])
    }

    /// Parse the answer and hand it to the callback.
    pub(crate) fn complete(self, output: &mut VecDeque<String>) {
        let warnings = parser::strip_warnings(output);
        if !warnings.is_empty() {
            debug!("ghci warnings for `{}`: {:?}", self.kind, warnings);
        }
        let result = self.kind.parse_output(output);
        self.callback.exec_after_parsing(result);
    }

    /// Retire the command without an answer.
    pub(crate) fn fail(self) {
        self.callback.exec_after_parsing(None);
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command").field("kind", &self.kind).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Position;

    fn buffer(lines: &[&str]) -> VecDeque<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_payload_encoding() {
        let cmd = Command::new(
            CommandKind::SetBreakpoint {
                module: "Main".to_string(),
                line: 12,
            },
            |_| {},
        );
        assert_eq!(cmd.bytes(), b":break Main 12\n");

        let cmd = Command::new(
            CommandKind::Raw {
                text: "  :info Maybe  ".to_string(),
            },
            |_| {},
        );
        assert_eq!(cmd.bytes(), b":info Maybe\n");

        let kind = CommandKind::Force {
            expression: " xs ".to_string(),
        };
        assert_eq!(kind.to_string(), ":force xs");
    }

    #[test]
    fn test_multiline_payload_detected() {
        let raw = Command::new(
            CommandKind::Raw {
                text: ":type id\n:type map".to_string(),
            },
            |_| {},
        );
        assert!(!raw.is_single_line());

        let force = Command::new(
            CommandKind::Force {
                expression: "let x = 1\r in x".to_string(),
            },
            |_| {},
        );
        assert!(!force.is_single_line());

        let trace = Command::new(
            CommandKind::Trace {
                expression: " main\n".to_string(),
            },
            |_| {},
        );
        assert!(trace.is_single_line());
    }

    #[test]
    fn test_history_cursor_marks_bottom() {
        let kind = CommandKind::MoveHistory {
            direction: HistoryDirection::Back,
            cursor: Some(HistoryCursor {
                depth: 1,
                len: Some(2),
            }),
        };
        let mut output = buffer(&["Logged breakpoint at A.hs:3:12-20", "n :: Integer"]);
        let Some(ParseResult::HistoryMove(step)) = kind.parse_output(&mut output) else {
            panic!("history move expected");
        };
        assert!(step.at_bottom);
        assert!(!step.at_top);
    }

    #[test]
    fn test_history_cursor_marks_top() {
        let kind = CommandKind::MoveHistory {
            direction: HistoryDirection::Forward,
            cursor: Some(HistoryCursor {
                depth: 1,
                len: None,
            }),
        };
        let mut output = buffer(&["Logged breakpoint at A.hs:3:12-20"]);
        let Some(ParseResult::HistoryMove(step)) = kind.parse_output(&mut output) else {
            panic!("history move expected");
        };
        assert!(step.at_top);
        assert!(!step.at_bottom);
    }

    #[test]
    fn test_load_failure() {
        let kind = CommandKind::Load {
            path: "A.hs".to_string(),
        };
        let mut output = buffer(&["[1 of 1] Compiling Main", "Failed, no modules loaded."]);
        assert_eq!(kind.parse_output(&mut output), None);

        let mut output = buffer(&["[1 of 1] Compiling Main", "Ok, one module loaded."]);
        assert!(matches!(
            kind.parse_output(&mut output),
            Some(ParseResult::ShowOutput { .. })
        ));
    }

    #[test]
    fn test_raw_falls_back_to_text() {
        let kind = CommandKind::Raw {
            text: ":info Maybe".to_string(),
        };
        let mut output = buffer(&["data Maybe a = Nothing | Just a", "  \t-- Defined in ‘GHC.Maybe’"]);
        assert_eq!(
            kind.parse_output(&mut output),
            Some(ParseResult::ShowOutput {
                text: "data Maybe a = Nothing | Just a\n  \t-- Defined in ‘GHC.Maybe’".to_string()
            })
        );

        let mut output = buffer(&["Breakpoint 1 activated at A.hs:2:1"]);
        assert_eq!(
            kind.parse_output(&mut output),
            Some(ParseResult::BreakpointHit {
                breakpoint_number: 1,
                position: Position::new("A.hs", 2, 1, 2, 1),
            })
        );
    }

    #[test]
    fn test_warnings_are_not_part_of_the_answer() {
        let (tx, rx) = std::sync::mpsc::channel();
        let cmd = Command::new(
            CommandKind::ExpressionType {
                expression: "1+1".to_string(),
            },
            move |result| {
                tx.send(result).unwrap();
            },
        );
        let mut output = buffer(&[
            "<interactive>:1:1: warning: [-Wtype-defaults]",
            "    • Defaulting the type variable to type ‘Integer’",
            "1+1 :: Integer",
        ]);
        cmd.complete(&mut output);
        assert_eq!(
            rx.recv().unwrap(),
            Some(ParseResult::ExpressionType {
                expression: "1+1".to_string(),
                type_text: "Integer".to_string(),
            })
        );
        assert!(output.is_empty());
    }

    #[test]
    fn test_callback_receives_none_on_failure() {
        let (tx, rx) = std::sync::mpsc::channel();
        let cmd = Command::new(CommandKind::History, move |result| {
            tx.send(result).unwrap();
        });
        cmd.complete(&mut buffer(&["garbage"]));
        assert_eq!(rx.recv().unwrap(), None);
    }
}
