use serde::Serialize;

/// Broad failure classes. `Remote` is the single sync failure kind for
/// transport errors, timeouts and server rejections; the HTTP status, when
/// there is one, travels in the message as `[http_status=N]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Usage,
    Remote,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Usage = 2,
    Remote = 4,
    Io = 6,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, thiserror::Error, Serialize)]
#[error("{message}")]
pub struct NoteError {
    pub kind: ErrorKind,
    pub message: String,
}

impl NoteError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Usage, message)
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Remote, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn is_remote(&self) -> bool {
        self.kind == ErrorKind::Remote
    }

    pub fn exit_code(&self) -> ExitCode {
        match self.kind {
            ErrorKind::Usage => ExitCode::Usage,
            ErrorKind::Remote => ExitCode::Remote,
            ErrorKind::Io => ExitCode::Io,
        }
    }
}

impl From<std::io::Error> for NoteError {
    fn from(value: std::io::Error) -> Self {
        Self::io(value.to_string())
    }
}

pub type NoteResult<T> = Result<T, NoteError>;
