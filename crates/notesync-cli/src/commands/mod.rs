pub(crate) mod edit;
pub(crate) mod note;
pub(crate) mod sync;
pub(crate) mod workspace;
