mod callback;
mod command;
mod reader;
mod show;
mod transport;

pub use callback::{CommandCallback, EvaluationCallback};
pub use command::{Command, CommandKind, HistoryCursor, HistoryDirection};
pub use reader::{classify_line, spawn_reader, OutputEvent};
pub use show::{ShowExpressionCommand, StandardShowExpressionCallback, DEFAULT_PRINTER};
pub use transport::Protocol;
