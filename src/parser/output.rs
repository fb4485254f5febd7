//! Parsing routines for ghci responses.
//!
//! Every routine looks at the front of the output buffer and either consumes
//! exactly the lines it recognized and returns a result, or returns `None` and
//! leaves the buffer untouched.

use super::lines::{contains_error, skip_blank, split_type_annotation, take_entry, unescape_haskell_string};
use super::position::Position;
use super::types::{Binding, FrameInfo, HistoryStep, ParseResult, StackFrame};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;

pub type ParseRoutine = fn(&mut VecDeque<String>) -> Option<ParseResult>;

static BREAKPOINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Breakpoint (\d+) (?:activated|was already set) at (.+)$").expect("must compile")
});
static STOPPED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Stopped (?:at|in [^,]+,) (.+)$").expect("must compile")
});
static LOGGED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Logged breakpoint at (.+)$").expect("must compile"));
static HISTORY_ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?\d+)\s*:\s*(\S+)\s+\((.+)\)$").expect("must compile")
});

const END_OF_HISTORY: &str = "<end of history>";
const EMPTY_HISTORY: &str = "Empty history.";
const MORE_HISTORY: &str = "...";

/// `:break Module line` answer: `Breakpoint 0 activated at A.hs:3:12-20`.
pub fn parse_set_breakpoint(output: &mut VecDeque<String>) -> Option<ParseResult> {
    let i = skip_blank(output, 0);
    let (breakpoint_number, position) = {
        let caps = BREAKPOINT_RE.captures(output.get(i)?.trim())?;
        let number = caps.get(1)?.as_str().parse::<i32>().ok()?;
        (number, Position::parse(caps.get(2)?.as_str())?)
    };
    output.drain(..=i);
    Some(ParseResult::BreakpointHit {
        breakpoint_number,
        position,
    })
}

/// `:trace` answer: program output, then `Stopped at <span>` followed by the
/// bindings in scope. Output of a program that ran to completion yields `None`.
pub fn parse_stopped_at(output: &mut VecDeque<String>) -> Option<ParseResult> {
    // the program may print text that looks like a stop report, ghci's own is last
    let (stop_line, position) = output
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, line)| Some((i, stop_position(line)?)))?;
    if stop_line > 0 {
        debug!("program output before stop: {:?}", output.range(..stop_line));
    }

    let (bindings, end) = read_bindings(output, stop_line + 1);
    output.drain(..end);
    Some(ParseResult::Stopped {
        frame: StackFrame::Top(FrameInfo {
            position,
            bindings: Some(bindings),
        }),
    })
}

/// `:type expr` answer: `expr :: Type`, long types continue on indented lines.
pub fn parse_expression_type(output: &mut VecDeque<String>) -> Option<ParseResult> {
    if contains_error(output) {
        return None;
    }
    let i = skip_blank(output, 0);
    let (entry, end) = take_entry(output, i)?;
    let (expression, type_text) = split_type_annotation(&entry)?;
    let result = ParseResult::ExpressionType {
        expression: expression.trim().to_string(),
        type_text: type_text.trim().to_string(),
    };
    output.drain(..end);
    Some(result)
}

/// Answer to `<printer> (expr)`: everything up to the prompt. A single string
/// literal (what ghci prints for a `String` result) is decoded.
pub fn parse_show_output(output: &mut VecDeque<String>) -> Option<ParseResult> {
    if output.is_empty() || contains_error(output) {
        return None;
    }
    let lines: Vec<String> = output.drain(..).collect();
    let text = match lines.as_slice() {
        [single] => {
            let single = single.trim();
            unescape_haskell_string(single).unwrap_or_else(|| single.to_string())
        }
        _ => lines.join("\n"),
    };
    Some(ParseResult::ShowOutput { text })
}

/// Output of commands without a structured answer (`:delete`, `:load`).
pub fn parse_plain_output(output: &mut VecDeque<String>) -> Option<ParseResult> {
    if contains_error(output) {
        return None;
    }
    let text = output.drain(..).collect::<Vec<_>>().join("\n");
    Some(ParseResult::ShowOutput { text })
}

/// `:history` answer:
/// ```text
/// -1  : fact (A.hs:3:12-20)
/// -2  : fact (A.hs:(3,1)-(4,20))
/// <end of history>
/// ```
pub fn parse_history(output: &mut VecDeque<String>) -> Option<ParseResult> {
    let start = skip_blank(output, 0);
    if output.get(start)?.trim().starts_with(EMPTY_HISTORY) {
        output.drain(..=start);
        return Some(ParseResult::History { frames: vec![] });
    }

    let mut frames = Vec::new();
    let mut i = start;
    while let Some(line) = output.get(i) {
        let line = line.trim();
        if line == END_OF_HISTORY {
            i += 1;
            break;
        }
        if line == MORE_HISTORY {
            i += 1;
            continue;
        }
        match parse_history_entry(line) {
            Some(frame) => frames.push(frame),
            None => break,
        }
        i += 1;
    }

    if frames.is_empty() {
        return None;
    }
    output.drain(..i);
    Some(ParseResult::History { frames })
}

/// `:show bindings`, `:print` and `:force` answers, one binding per entry.
/// An empty answer is an empty list.
pub fn parse_binding_list(output: &mut VecDeque<String>) -> Option<ParseResult> {
    if contains_error(output) {
        return None;
    }
    let start = skip_blank(output, 0);
    let (bindings, end) = read_bindings(output, start);
    if end < output.len() && bindings.is_empty() {
        return None;
    }
    output.drain(..end);
    Some(ParseResult::BindingList { bindings })
}

/// `:back` / `:forward` answer: `Logged breakpoint at <span>` (or `Stopped at`
/// when the move returned to the current breakpoint), then the names in scope.
pub fn parse_history_move(output: &mut VecDeque<String>) -> Option<ParseResult> {
    let i = skip_blank(output, 0);
    let (position, at_top) = {
        let header = output.get(i)?.trim();
        match LOGGED_RE.captures(header) {
            Some(caps) => (Position::parse(caps.get(1)?.as_str())?, false),
            None => (stop_position(header)?, true),
        }
    };

    let (bindings, end) = read_bindings(output, i + 1);
    output.drain(..end);
    Some(ParseResult::HistoryMove(HistoryStep {
        position,
        bindings,
        at_top,
        at_bottom: false,
    }))
}

/// A line holding a JSON object, as produced by JSON-speaking debugger backends.
pub fn parse_structured(output: &mut VecDeque<String>) -> Option<ParseResult> {
    let i = skip_blank(output, 0);
    let line = output.get(i)?.trim();
    if !line.starts_with('{') {
        return None;
    }
    let data: serde_json::Value = serde_json::from_str(line).ok()?;
    if !data.is_object() {
        return None;
    }
    output.drain(..=i);
    Some(ParseResult::StructuredPayload { data })
}

/// Try every routine whose shape is unambiguous. `:type` answers are left out:
/// `expr :: T` cannot be told apart from a binding line.
pub fn parse_any(output: &mut VecDeque<String>) -> Option<ParseResult> {
    const CANDIDATES: [ParseRoutine; 6] = [
        parse_structured,
        parse_set_breakpoint,
        parse_stopped_at,
        parse_history_move,
        parse_history,
        parse_non_empty_binding_list,
    ];
    CANDIDATES.iter().find_map(|routine| routine(output))
}

fn parse_non_empty_binding_list(output: &mut VecDeque<String>) -> Option<ParseResult> {
    if output.iter().all(|line| line.trim().is_empty()) {
        return None;
    }
    parse_binding_list(output)
}

fn stop_position(line: &str) -> Option<Position> {
    let caps = STOPPED_RE.captures(line.trim())?;
    Position::parse(caps.get(1)?.as_str())
}

fn parse_history_entry(line: &str) -> Option<StackFrame> {
    let caps = HISTORY_ENTRY_RE.captures(line)?;
    let index = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let position = Position::parse(caps.get(3)?.as_str())?;
    Some(StackFrame::Named {
        index: index.saturating_abs(),
        function_name: caps.get(2)?.as_str().to_string(),
        frame: FrameInfo {
            position,
            bindings: None,
        },
    })
}

/// Read consecutive binding entries starting at `start`, blank lines between
/// entries are skipped. Returns the bindings and the index after the last one.
fn read_bindings(output: &VecDeque<String>, start: usize) -> (Vec<Binding>, usize) {
    let mut bindings = Vec::new();
    let mut end = start;
    let mut i = skip_blank(output, start);

    while let Some((entry, next)) = take_entry(output, i) {
        match parse_binding(&entry) {
            Some(binding) => bindings.push(binding),
            None => break,
        }
        end = next;
        i = skip_blank(output, next);
    }
    (bindings, end)
}

/// One of `name :: Type = value`, `name :: Type` or `name = value`.
/// A value of `_` is an unevaluated thunk and is reported as missing.
pub fn parse_binding(entry: &str) -> Option<Binding> {
    let valid_name = |name: &str| !name.is_empty() && !name.contains(char::is_whitespace);
    let value_of = |value: &str| {
        let value = value.trim();
        (value != "_").then(|| value.to_string())
    };

    if let Some((name, rest)) = split_type_annotation(entry) {
        let name = name.trim();
        if !valid_name(name) {
            return None;
        }
        let (type_name, value) = match rest.split_once(" = ") {
            Some((type_name, value)) => (type_name, value_of(value)),
            None => (rest, None),
        };
        return Some(Binding::new(
            Some(name.to_string()),
            Some(type_name.trim().to_string()),
            value,
        ));
    }

    let (name, value) = entry.split_once(" = ")?;
    let name = name.trim();
    if !valid_name(name) {
        return None;
    }
    Some(Binding::new(Some(name.to_string()), None, value_of(value)))
}
