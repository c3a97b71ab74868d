mod error;
mod note;
mod policy;

pub use error::{ErrorKind, ExitCode, NoteError, NoteResult};
pub use note::{Note, sort_by_recent};
pub use policy::LoadPolicy;
