use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum LoopmatchError {
    String(String),
    Io(std::io::Error),
    Serde(serde_json::Error),
}

impl Error for LoopmatchError {}

impl fmt::Display for LoopmatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LoopmatchError::String(e) => write!(f, "{e}"),
            LoopmatchError::Io(e) => write!(f, "{e}"),
            LoopmatchError::Serde(e) => write!(f, "{e}"),
        }
    }
}

impl From<String> for LoopmatchError {
    fn from(err: String) -> Self {
        LoopmatchError::String(err)
    }
}

impl From<std::io::Error> for LoopmatchError {
    fn from(err: std::io::Error) -> Self {
        LoopmatchError::Io(err)
    }
}

impl From<serde_json::Error> for LoopmatchError {
    fn from(err: serde_json::Error) -> Self {
        LoopmatchError::Serde(err)
    }
}
