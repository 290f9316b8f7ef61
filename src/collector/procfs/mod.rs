//! Parsers for the Linux `/proc` and `/sys` network files.

pub mod parser;

pub use parser::{NetDevStats, OperState, ParseError};
