/// The error kinds produced by this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Propagated from the underlying archive engine.
    #[error(transparent)]
    Archive(#[from] chunkpak_archive::Error),
}

/// A specialized [`Result`] type for operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;
