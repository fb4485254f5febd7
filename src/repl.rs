//! Line-oriented console over a [`DebugProcess`].

use crate::debugger::{DebugProcess, StepRequest};
use crate::parser::ParseResult;
use crate::{Error, Result};
use std::io::{BufRead, Write};

const HELP: &str = "Commands: (b)reak <Module> <line>, delete <Module> <line>, breakpoints, \
trace <expr>, (t)ype <expr>, (p)rint <expr>, force <expr>, history, back, forward, \
bindings, load <file>, :<ghci command>, (q)uit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Break { module: String, line: u32 },
    Delete { module: String, line: u32 },
    Breakpoints,
    Trace(String),
    Type(String),
    Print(String),
    Force(String),
    History,
    Back,
    Forward,
    Bindings,
    Load(String),
    Step(StepRequest),
    Raw(String),
    Help,
    Quit,
    Empty,
}

/// Parse one input line. `Err` carries a usage message.
pub fn parse_command(input: &str) -> std::result::Result<ReplCommand, String> {
    let input = input.trim();
    if input.starts_with(':') {
        return Ok(ReplCommand::Raw(input.to_string()));
    }

    let (head, rest) = match input.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (input, ""),
    };
    let expression = |make: fn(String) -> ReplCommand| {
        if rest.is_empty() {
            Err(format!("usage: {head} <expression>"))
        } else {
            Ok(make(rest.to_string()))
        }
    };

    match head {
        "" => Ok(ReplCommand::Empty),
        "b" | "break" => {
            let (module, line) = module_and_line(head, rest)?;
            Ok(ReplCommand::Break { module, line })
        }
        "delete" => {
            let (module, line) = module_and_line(head, rest)?;
            Ok(ReplCommand::Delete { module, line })
        }
        "breakpoints" => Ok(ReplCommand::Breakpoints),
        "trace" => expression(ReplCommand::Trace),
        "t" | "type" => expression(ReplCommand::Type),
        "p" | "print" => expression(ReplCommand::Print),
        "force" => expression(ReplCommand::Force),
        "history" => Ok(ReplCommand::History),
        "back" => Ok(ReplCommand::Back),
        "forward" => Ok(ReplCommand::Forward),
        "bindings" => Ok(ReplCommand::Bindings),
        "load" if rest.is_empty() => Err("usage: load <file>".to_string()),
        "load" => Ok(ReplCommand::Load(rest.to_string())),
        "c" | "continue" => Ok(ReplCommand::Step(StepRequest::Resume)),
        "n" | "next" | "stepOver" => Ok(ReplCommand::Step(StepRequest::StepOver)),
        "s" | "step" | "stepInto" => Ok(ReplCommand::Step(StepRequest::StepInto)),
        "o" | "out" | "stepOut" => Ok(ReplCommand::Step(StepRequest::StepOut)),
        "h" | "help" => Ok(ReplCommand::Help),
        "q" | "quit" => Ok(ReplCommand::Quit),
        other => Err(format!("unknown command: {other}")),
    }
}

fn module_and_line(head: &str, rest: &str) -> std::result::Result<(String, u32), String> {
    let usage = || format!("usage: {head} <Module> <line>");
    let args = shlex::split(rest).ok_or_else(usage)?;
    match args.as_slice() {
        [module, line] => {
            let line = line.parse::<u32>().map_err(|_| usage())?;
            Ok((module.clone(), line))
        }
        _ => Err(usage()),
    }
}

/// Read commands from `input` until `quit` or EOF. Per-command errors are
/// printed; an error that ends the session is returned.
pub fn run<R: BufRead, W: Write>(
    process: &mut DebugProcess,
    mut input: R,
    mut out: W,
    json: bool,
) -> Result<()> {
    writeln!(out, "{HELP}")?;
    loop {
        write!(out, "> ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        let command = match parse_command(&line) {
            Ok(ReplCommand::Quit) => break,
            Ok(command) => command,
            Err(usage) => {
                writeln!(out, "❌ {usage}")?;
                continue;
            }
        };

        match execute(process, command, json) {
            Ok(Some(text)) => writeln!(out, "{}", text.trim_end())?,
            Ok(None) => {}
            Err(e) if e.is_fatal() => {
                writeln!(out, "❌ {e}")?;
                return Err(e);
            }
            Err(e) => writeln!(out, "❌ {e}")?,
        }
    }
    Ok(())
}

fn execute(process: &mut DebugProcess, command: ReplCommand, json: bool) -> Result<Option<String>> {
    let result = match command {
        ReplCommand::Empty | ReplCommand::Quit => return Ok(None),
        ReplCommand::Help => return Ok(Some(HELP.to_string())),
        ReplCommand::Step(request) => {
            match request {
                StepRequest::StepOver => process.step_over(),
                StepRequest::StepInto => process.step_into(),
                StepRequest::StepOut => process.step_out(),
                StepRequest::Resume => process.resume(),
                StepRequest::RunToPosition => Err(Error::Unsupported(request)),
            }?;
            return Ok(None);
        }
        ReplCommand::Break { module, line } => {
            let bp = process.set_breakpoint(&module, line)?;
            ParseResult::BreakpointHit {
                breakpoint_number: bp.number,
                position: bp.position,
            }
        }
        ReplCommand::Delete { module, line } => {
            let removed = process.remove_breakpoint(&module, line)?;
            let text = if removed {
                format!("breakpoint at {module}:{line} removed")
            } else {
                format!("no breakpoint at {module}:{line}")
            };
            ParseResult::ShowOutput { text }
        }
        ReplCommand::Breakpoints => {
            let text = process
                .breakpoints()
                .list()
                .iter()
                .map(|bp| format!("{}: {}", bp.number, bp.position))
                .collect::<Vec<_>>()
                .join("\n");
            ParseResult::ShowOutput { text }
        }
        ReplCommand::Trace(expression) => match process.trace(&expression)? {
            Some(frame) => ParseResult::Stopped { frame },
            None => ParseResult::ShowOutput {
                text: format!("{expression} finished without stopping"),
            },
        },
        ReplCommand::Type(expression) => {
            let type_text = process.expression_type(&expression)?;
            ParseResult::ExpressionType {
                expression,
                type_text,
            }
        }
        ReplCommand::Print(expression) => {
            let type_name = match process.expression_type(&expression) {
                Ok(type_name) => Some(type_name),
                Err(e) if e.is_fatal() => return Err(e),
                Err(_) => None,
            };
            let binding = process.show_expression(&expression, type_name)?;
            ParseResult::BindingList {
                bindings: vec![binding],
            }
        }
        ReplCommand::Force(expression) => ParseResult::BindingList {
            bindings: process.force(&expression)?,
        },
        ReplCommand::History => ParseResult::History {
            frames: process.history()?,
        },
        ReplCommand::Back => ParseResult::HistoryMove(process.back()?),
        ReplCommand::Forward => ParseResult::HistoryMove(process.forward()?),
        ReplCommand::Bindings => ParseResult::BindingList {
            bindings: process.bindings()?,
        },
        ReplCommand::Load(path) => {
            process.load(&path)?;
            ParseResult::ShowOutput {
                text: format!("loaded {path}"),
            }
        }
        ReplCommand::Raw(text) => process.raw(&text)?,
    };

    if json {
        Ok(Some(serde_json::to_string(&result)?))
    } else {
        Ok(Some(result.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DebuggerConfig;
    use std::io::Cursor;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("b Main 12"),
            Ok(ReplCommand::Break {
                module: "Main".to_string(),
                line: 12
            })
        );
        assert_eq!(
            parse_command("  type  map fst  "),
            Ok(ReplCommand::Type("map fst".to_string()))
        );
        assert_eq!(
            parse_command(":info Maybe"),
            Ok(ReplCommand::Raw(":info Maybe".to_string()))
        );
        assert_eq!(
            parse_command("next"),
            Ok(ReplCommand::Step(StepRequest::StepOver))
        );
        assert_eq!(
            parse_command("load src/A.hs"),
            Ok(ReplCommand::Load("src/A.hs".to_string()))
        );
        assert_eq!(parse_command(""), Ok(ReplCommand::Empty));
        assert_eq!(parse_command("q"), Ok(ReplCommand::Quit));
    }

    #[test]
    fn test_parse_command_usage_errors() {
        assert!(parse_command("break Main").is_err());
        assert!(parse_command("break Main twelve").is_err());
        assert!(parse_command("print").is_err());
        assert!(parse_command("load").is_err());
        assert!(parse_command("frobnicate").is_err());
    }

    #[test]
    fn test_run_reports_errors_and_continues() {
        let mut process = DebugProcess::new(DebuggerConfig::default(), None);
        let input = Cursor::new("type x\nstep\nbogus\nquit\nhistory\n");
        let mut out = Vec::new();

        run(&mut process, input, &mut out, false).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("debug session is not running"));
        assert!(out.contains("step into is not supported by the ghci debugger"));
        assert!(out.contains("unknown command: bogus"));
        assert_eq!(out.matches("❌").count(), 3);
    }
}
