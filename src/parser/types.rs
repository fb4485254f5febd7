use super::position::Position;
use serde::Serialize;
use std::fmt;

/// Local binding reported by ghci. Any part may be missing, e.g. a type is
/// known while the value is still an unevaluated thunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub name: Option<String>,
    pub type_name: Option<String>,
    pub value: Option<String>,
}

impl Binding {
    pub fn new(name: Option<String>, type_name: Option<String>, value: Option<String>) -> Self {
        Self {
            name,
            type_name,
            value,
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(3);
        if let Some(name) = &self.name {
            parts.push(name.clone());
        }
        if let Some(type_name) = &self.type_name {
            parts.push(format!(":: {type_name}"));
        }
        match &self.value {
            Some(value) if parts.is_empty() => parts.push(value.clone()),
            Some(value) => parts.push(format!("= {value}")),
            None => parts.push("= _".to_string()),
        }
        f.write_str(&parts.join(" "))
    }
}

/// Location and (optionally) visible bindings of one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameInfo {
    pub position: Position,
    pub bindings: Option<Vec<Binding>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StackFrame {
    /// Frame the interpreter is currently stopped in.
    Top(FrameInfo),
    /// Entry of the evaluation history, `index` counts from the most recent step (1).
    #[serde(rename_all = "camelCase")]
    Named {
        index: i32,
        function_name: String,
        frame: FrameInfo,
    },
}

impl StackFrame {
    pub fn info(&self) -> &FrameInfo {
        match self {
            StackFrame::Top(info) => info,
            StackFrame::Named { frame, .. } => frame,
        }
    }

    pub fn position(&self) -> &Position {
        &self.info().position
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackFrame::Top(info) => write!(f, "{}", info.position),
            StackFrame::Named {
                index,
                function_name,
                frame,
            } => write!(f, "#{index} {function_name} ({})", frame.position),
        }
    }
}

/// Outcome of a `:back` / `:forward` history move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStep {
    pub position: Position,
    pub bindings: Vec<Binding>,
    pub at_top: bool,
    pub at_bottom: bool,
}

/// Everything a parsing routine can extract from ghci output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ParseResult {
    #[serde(rename_all = "camelCase")]
    BreakpointHit {
        breakpoint_number: i32,
        position: Position,
    },
    Stopped {
        frame: StackFrame,
    },
    #[serde(rename_all = "camelCase")]
    ExpressionType {
        expression: String,
        type_text: String,
    },
    ShowOutput {
        text: String,
    },
    History {
        frames: Vec<StackFrame>,
    },
    BindingList {
        bindings: Vec<Binding>,
    },
    HistoryMove(HistoryStep),
    StructuredPayload {
        data: serde_json::Value,
    },
}

impl fmt::Display for ParseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseResult::BreakpointHit {
                breakpoint_number,
                position,
            } => write!(f, "breakpoint {breakpoint_number} at {position}"),
            ParseResult::Stopped { frame } => {
                writeln!(f, "stopped at {frame}")?;
                for binding in frame.info().bindings.iter().flatten() {
                    writeln!(f, "  {binding}")?;
                }
                Ok(())
            }
            ParseResult::ExpressionType {
                expression,
                type_text,
            } => write!(f, "{expression} :: {type_text}"),
            ParseResult::ShowOutput { text } => f.write_str(text),
            ParseResult::History { frames } => {
                if frames.is_empty() {
                    return f.write_str("<empty history>");
                }
                for frame in frames {
                    writeln!(f, "{frame}")?;
                }
                Ok(())
            }
            ParseResult::BindingList { bindings } => {
                for binding in bindings {
                    writeln!(f, "{binding}")?;
                }
                Ok(())
            }
            ParseResult::HistoryMove(step) => {
                let marker = match (step.at_top, step.at_bottom) {
                    (true, _) => " [top]",
                    (_, true) => " [bottom]",
                    _ => "",
                };
                writeln!(f, "at {}{marker}", step.position)?;
                for binding in &step.bindings {
                    writeln!(f, "  {binding}")?;
                }
                Ok(())
            }
            ParseResult::StructuredPayload { data } => write!(f, "{data}"),
        }
    }
}
