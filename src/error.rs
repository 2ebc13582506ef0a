//! The top-level error type the binary surfaces to its caller. Every phase
//! exposes its own `Error` enum (`object`, `resolve`, `reach`, `rewrite`);
//! this one unifies them so `main` has a single thing to match on.

use std::{error, fmt, io};

#[derive(Debug)]
pub enum Error {
    Config(crate::config::Error),
    Resolve(crate::resolve::Error),
    Reach(crate::reach::Error),
    Rewrite(crate::rewrite::Error),
    Io { path: std::path::PathBuf, source: io::Error },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{e}"),
            Self::Resolve(e) => write!(f, "{e}"),
            Self::Reach(e) => write!(f, "{e}"),
            Self::Rewrite(e) => write!(f, "{e}"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Resolve(e) => Some(e),
            Self::Reach(e) => Some(e),
            Self::Rewrite(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<crate::config::Error> for Error {
    fn from(e: crate::config::Error) -> Self {
        Self::Config(e)
    }
}

impl From<crate::resolve::Error> for Error {
    fn from(e: crate::resolve::Error) -> Self {
        Self::Resolve(e)
    }
}

impl From<crate::reach::Error> for Error {
    fn from(e: crate::reach::Error) -> Self {
        Self::Reach(e)
    }
}

impl From<crate::rewrite::Error> for Error {
    fn from(e: crate::rewrite::Error) -> Self {
        Self::Rewrite(e)
    }
}
