mod lines;
mod output;
mod position;
mod types;

pub use lines::{is_error_line, normalize_whitespace, strip_warnings, unescape_haskell_string};
pub use output::{
    parse_any, parse_binding, parse_binding_list, parse_expression_type, parse_history,
    parse_history_move, parse_plain_output, parse_set_breakpoint, parse_show_output,
    parse_stopped_at, parse_structured, ParseRoutine,
};
pub use position::Position;
pub use types::{Binding, FrameInfo, HistoryStep, ParseResult, StackFrame};
