/// The error kinds produced by this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Propagated from the underlying chunked container.
    #[error(transparent)]
    Container(#[from] chunkpak::Error),

    /// A mutating operation named an entry that is not present in the archive.
    #[error("no entry named {0:?}")]
    AbsentEntry(String),

    /// [`crate::Archive::new_entry`] named an entry that already exists.
    #[error("an entry named {0:?} already exists")]
    DuplicateEntry(String),
}

/// A specialized [`Result`] type for operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;
