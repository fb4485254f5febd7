pub mod config;
pub mod debugger;
pub mod error;
pub mod parser;
pub mod protocol;
pub mod repl;

pub use error::{Error, Result};
