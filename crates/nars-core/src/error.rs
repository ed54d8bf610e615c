use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum NarsError {
    /// Budget components outside their ranges (priority > 1 or durability ≥ 1).
    InvalidBudget(String),
    InvalidConfig(String),
    Parse(String),
}

impl fmt::Display for NarsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NarsError::InvalidBudget(msg) => write!(f, "invalid budget: {msg}"),
            NarsError::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            NarsError::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for NarsError {}

pub type Result<T> = std::result::Result<T, NarsError>;
