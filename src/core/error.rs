use std::fmt;

type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Attribute map could not be serialized
    Encode,
    /// Persisted unit is unreadable or corrupt
    Decode,
    Write,
    Read,
    Remove,
    InvalidArgument,
    InvalidState,
    Internal,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
    source: Option<Cause>,
}

impl Error {
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        Error { kind, context: context.into(), source: None }
    }

    pub fn with_source(
        kind: ErrorKind,
        context: impl Into<String>,
        source: impl Into<Cause>,
    ) -> Self {
        Error { kind, context: context.into(), source: Some(source.into()) }
    }

    pub fn encode(context: impl Into<String>, source: impl Into<Cause>) -> Self {
        Self::with_source(ErrorKind::Encode, context, source)
    }

    pub fn decode(context: impl Into<String>, source: impl Into<Cause>) -> Self {
        Self::with_source(ErrorKind::Decode, context, source)
    }

    pub fn write(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Write, context, source)
    }

    pub fn read(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Read, context, source)
    }

    pub fn remove(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Remove, context, source)
    }

    pub fn invalid_argument(context: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, context)
    }

    pub fn internal(context: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, context)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The underlying I/O error, if the failure came from the storage medium.
    pub fn io_cause(&self) -> Option<&std::io::Error> {
        self.source.as_ref()?.downcast_ref::<std::io::Error>()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|cause| cause.as_ref() as &(dyn std::error::Error + 'static))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn test_display_includes_kind_and_context() {
        let err = Error::invalid_argument("collection name is empty");
        assert_eq!(err.to_string(), "InvalidArgument: collection name is empty");
    }

    #[test]
    fn test_io_cause_is_attached() {
        let err = Error::write(
            "write users/abc.json",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), ErrorKind::Write);
        assert_eq!(err.io_cause().map(|e| e.kind()), Some(io::ErrorKind::PermissionDenied));
        assert!(err.source().is_some());
    }
}
