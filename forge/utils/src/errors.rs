//! Errors generated by the compiler.

/// Convenience wrapper to represent success or a meaningful compiler error.
pub type ForgeResult<T> = std::result::Result<T, Error>;

/// Errors generated by the compiler. Every fault raised by the core is fatal
/// to the compilation that produced it; the error carries enough context to
/// name the offending component, port or dependency.
#[derive(Clone)]
pub struct Error {
    kind: Box<ErrorKind>,
    post_msg: Option<String>,
}

/// Standard error type for Forge errors.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ErrorKind {
    /// The dependency graph is malformed.
    #[error("Malformed Structure: {0}")]
    MalformedStructure(String),
    /// The graph has a shape that a transformation did not expect.
    #[error("Unexpected Structure: {0}")]
    UnexpectedStructure(String),
    /// A latency interval could not be constructed.
    #[error("Invalid Latency: {0}")]
    InvalidLatency(String),
    /// A value category that the core cannot represent.
    #[error("Unknown Type: {0}")]
    UnknownType(String),
    /// The assumption of a pass was violated.
    #[error("[{0}] Assumption violated: {1}")]
    PassAssumption(String, String),
    /// Miscellaneous error message
    #[error("{0}")]
    Misc(String),
}

impl Error {
    pub fn malformed_structure<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::MalformedStructure(msg.to_string()))
    }

    pub fn unexpected_structure<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::UnexpectedStructure(msg.to_string()))
    }

    pub fn invalid_latency<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::InvalidLatency(msg.to_string()))
    }

    pub fn unknown_type<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::UnknownType(msg.to_string()))
    }

    pub fn pass_assumption<S: ToString, M: ToString>(pass: S, msg: M) -> Self {
        Self::new(ErrorKind::PassAssumption(pass.to_string(), msg.to_string()))
    }

    pub fn misc<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Misc(msg.to_string()))
    }

    fn new(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
            post_msg: None,
        }
    }

    /// Attach extra context that is printed after the main message.
    pub fn with_post_msg<S: ToString>(mut self, msg: S) -> Self {
        self.post_msg = Some(msg.to_string());
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The message of the error without any trailing context.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(post) = &self.post_msg {
            write!(f, "\n{post}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Error::misc(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind};

    #[test]
    fn post_message_follows_kind() {
        let err = Error::malformed_structure("port `a.in` has no source")
            .with_post_msg("while validating component `a`");
        assert!(matches!(err.kind(), ErrorKind::MalformedStructure(_)));
        assert_eq!(
            err.to_string(),
            "Malformed Structure: port `a.in` has no source\n\
             while validating component `a`"
        );
        assert_eq!(
            err.message(),
            "Malformed Structure: port `a.in` has no source"
        );
    }
}
