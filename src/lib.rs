//! Content-addressable object storage in the style of git plumbing.
//!
//! Objects (blobs, trees, commits) are encoded as `"<type> <len>\0<payload>"`,
//! identified by the SHA-1 of that encoding, and stored zlib-compressed under
//! `<gitdir>/objects/xx/yyyy...`. [`TreeBuilder`] snapshots a directory into
//! that store bottom-up.

pub mod builder;
pub mod compress;
pub mod error;
pub mod hash;
pub mod kvlm;
pub mod object;
pub mod repository;
pub mod store;

pub use builder::TreeBuilder;
pub use error::{Error, Result};
pub use hash::ObjectId;
pub use object::{Blob, Commit, FileMode, GitObject, Object, ObjectType, Signature, Tree, TreeEntry};
pub use repository::Repository;
pub use store::ObjectStore;
