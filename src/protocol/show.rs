use super::callback::{CommandCallback, EvaluationCallback};
use super::command::{Command, CommandKind};
use crate::parser::{Binding, ParseResult};
use crate::Error;

pub const DEFAULT_PRINTER: &str = "Prelude.show";

/// Evaluates an expression through a printer function (`Prelude.show` unless
/// configured otherwise, the plain name may be hidden by user code).
pub struct ShowExpressionCommand;

impl ShowExpressionCommand {
    pub fn new(
        printer: impl Into<String>,
        expression: impl Into<String>,
        callback: impl CommandCallback + 'static,
    ) -> Command {
        Command::with_callback(
            CommandKind::ShowExpression {
                printer: printer.into(),
                expression: expression.into(),
            },
            callback,
        )
    }
}

/// Turns show output into an anonymous binding of the declared type.
pub struct StandardShowExpressionCallback<C> {
    expression: String,
    expression_type: Option<String>,
    callback: C,
}

impl<C: EvaluationCallback> StandardShowExpressionCallback<C> {
    pub fn new(expression: impl Into<String>, expression_type: Option<String>, callback: C) -> Self {
        Self {
            expression: expression.into(),
            expression_type,
            callback,
        }
    }
}

impl<C: EvaluationCallback> CommandCallback for StandardShowExpressionCallback<C> {
    fn exec_after_parsing(self: Box<Self>, result: Option<ParseResult>) {
        let Self {
            expression,
            expression_type,
            mut callback,
        } = *self;
        match result {
            Some(ParseResult::ShowOutput { text }) => {
                callback.evaluated(Binding::new(None, expression_type, Some(text)))
            }
            _ => callback.error_occurred(Error::Evaluation { expression }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::mpsc;

    #[test]
    fn test_show_expression_bytes() {
        let (tx, _rx) = mpsc::channel::<Result<Binding, Error>>();
        let cmd = ShowExpressionCommand::new(
            DEFAULT_PRINTER,
            "1+1",
            StandardShowExpressionCallback::new("1+1", None, tx),
        );
        assert_eq!(cmd.bytes(), b"Prelude.show (1+1)\n");

        let (tx, _rx) = mpsc::channel::<Result<Binding, Error>>();
        let cmd = ShowExpressionCommand::new(
            "Text.Show.show",
            "  length xs ",
            StandardShowExpressionCallback::new("length xs", None, tx),
        );
        assert_eq!(cmd.bytes(), b"Text.Show.show (length xs)\n");
    }

    #[test]
    fn test_show_expression_success() {
        let (tx, rx) = mpsc::channel::<Result<Binding, Error>>();
        let cmd = ShowExpressionCommand::new(
            DEFAULT_PRINTER,
            "1+1",
            StandardShowExpressionCallback::new("1+1", Some("Integer".to_string()), tx),
        );
        let mut output: VecDeque<String> = VecDeque::from(vec!["2".to_string()]);
        cmd.complete(&mut output);

        let binding = rx.recv().unwrap().unwrap();
        assert_eq!(
            binding,
            Binding::new(None, Some("Integer".to_string()), Some("2".to_string()))
        );
    }

    #[test]
    fn test_show_expression_failure_names_expression() {
        let (tx, rx) = mpsc::channel::<Result<Binding, Error>>();
        let cmd = ShowExpressionCommand::new(
            DEFAULT_PRINTER,
            "foo",
            StandardShowExpressionCallback::new("foo", None, tx),
        );
        let mut output = VecDeque::from(vec![
            "<interactive>:1:15: error: Variable not in scope: foo".to_string(),
        ]);
        cmd.complete(&mut output);

        match rx.recv().unwrap() {
            Err(Error::Evaluation { expression }) => assert_eq!(expression, "foo"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
