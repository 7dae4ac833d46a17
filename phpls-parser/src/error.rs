#[non_exhaustive]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("syntax error at line {line}, column {column}: expected {expected}")]
    Parse {
        line: usize,
        column: usize,
        offset: usize,
        expected: String,
    },
}

impl From<peg::error::ParseError<peg::str::LineCol>> for Error {
    fn from(error: peg::error::ParseError<peg::str::LineCol>) -> Self {
        Self::Parse {
            line: error.location.line,
            column: error.location.column,
            offset: error.location.offset,
            expected: error.expected.to_string(),
        }
    }
}
