use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("Syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Unbound variable `{name}` at line {line}")]
    UnboundVariable { name: String, line: usize },

    #[error("Unsupported construct at line {line}: {construct}")]
    UnsupportedConstruct { construct: String, line: usize },

    #[error("Invalid argument vector: {0}")]
    InvalidArguments(String),
}

impl Error {
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Error::Syntax {
            line,
            message: message.into(),
        }
    }

    pub fn unsupported(line: usize, construct: impl Into<String>) -> Self {
        Error::UnsupportedConstruct {
            construct: construct.into(),
            line,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
