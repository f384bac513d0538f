// Definitions and methods for the object kinds tracked by gitplumb

mod blob;
mod commit;
mod tree;

use std::{fmt, str::FromStr};

pub use blob::Blob;
pub use commit::{Commit, Signature};
pub use tree::{FileMode, Tree, TreeEntry};

use crate::error::{Error, Result};
use crate::hash::ObjectId;

/// Canonical payload codec shared by every object kind.
///
/// `serialize` produces the payload only. `encode` prepends the
/// `"<type> <len>\0"` header; those bytes are what gets hashed and stored.
pub trait Object: Sized {
    const TYPE: ObjectType;

    fn serialize(&self) -> Vec<u8>;
    fn deserialize(data: &[u8]) -> Result<Self>;

    fn encode(&self) -> Vec<u8> {
        encode(Self::TYPE, &self.serialize())
    }

    fn id(&self) -> ObjectId {
        ObjectId::hash(&self.encode())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Tree => "tree",
            ObjectType::Commit => "commit",
        }
    }
}

impl FromStr for ObjectType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "blob" => Ok(ObjectType::Blob),
            "tree" => Ok(ObjectType::Tree),
            "commit" => Ok(ObjectType::Commit),
            other => Err(Error::malformed(format!("unrecognized object type: {other}"))),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitObject {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
}

impl GitObject {
    pub fn object_type(&self) -> ObjectType {
        match self {
            GitObject::Blob(_) => ObjectType::Blob,
            GitObject::Tree(_) => ObjectType::Tree,
            GitObject::Commit(_) => ObjectType::Commit,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            GitObject::Blob(blob) => blob.serialize(),
            GitObject::Tree(tree) => tree.serialize(),
            GitObject::Commit(commit) => commit.serialize(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        encode(self.object_type(), &self.serialize())
    }

    pub fn id(&self) -> ObjectId {
        ObjectId::hash(&self.encode())
    }

    pub fn from_payload(object_type: ObjectType, payload: &[u8]) -> Result<Self> {
        Ok(match object_type {
            ObjectType::Blob => GitObject::Blob(Blob::deserialize(payload)?),
            ObjectType::Tree => GitObject::Tree(Tree::deserialize(payload)?),
            ObjectType::Commit => GitObject::Commit(Commit::deserialize(payload)?),
        })
    }

    /// Decodes a full `"<type> <len>\0<payload>"` buffer.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let (object_type, payload) = split_header(data)?;
        Self::from_payload(object_type, payload)
    }
}

impl From<Blob> for GitObject {
    fn from(blob: Blob) -> Self {
        GitObject::Blob(blob)
    }
}

impl From<Tree> for GitObject {
    fn from(tree: Tree) -> Self {
        GitObject::Tree(tree)
    }
}

impl From<Commit> for GitObject {
    fn from(commit: Commit) -> Self {
        GitObject::Commit(commit)
    }
}

pub fn encode(object_type: ObjectType, payload: &[u8]) -> Vec<u8> {
    let header = format!("{} {}\0", object_type, payload.len());
    let mut output = Vec::with_capacity(header.len() + payload.len());
    output.extend_from_slice(header.as_bytes());
    output.extend_from_slice(payload);
    output
}

/// Splits encoded bytes into the object type and its payload, checking the
/// declared length against the bytes actually present.
pub fn split_header(data: &[u8]) -> Result<(ObjectType, &[u8])> {
    let null_idx = data
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::malformed("missing null byte in header"))?;
    let header = &data[..null_idx];
    let payload = &data[null_idx + 1..];

    let space_idx = header
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| Error::malformed("missing space in header"))?;

    let object_type = std::str::from_utf8(&header[..space_idx])
        .map_err(|_| Error::malformed("object type is not ASCII"))?
        .parse::<ObjectType>()?;

    let size_field = &header[space_idx + 1..];
    if size_field.is_empty() || !size_field.iter().all(u8::is_ascii_digit) {
        return Err(Error::malformed(format!(
            "bad size field: {:?}",
            String::from_utf8_lossy(size_field)
        )));
    }
    // all-digit ASCII, so from_utf8 cannot fail; parse can still overflow
    let declared: usize = std::str::from_utf8(size_field)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::malformed("size field out of range"))?;

    if declared != payload.len() {
        return Err(Error::malformed(format!(
            "bad length: header says {declared}, payload has {}",
            payload.len()
        )));
    }

    Ok((object_type, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_header_is_exact() {
        let encoded = Blob::new(b"hello".to_vec()).encode();
        assert_eq!(encoded, b"blob 5\0hello");

        let empty = Blob::new(Vec::new()).encode();
        assert_eq!(empty, b"blob 0\0");
    }

    #[test]
    fn ids_match_git() {
        assert_eq!(
            Blob::new(b"hi".to_vec()).id().to_string(),
            "32f95c0d1244a78b2be1bab8de17906fabb2c4a8"
        );
        assert_eq!(
            Blob::new(Vec::new()).id().to_string(),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
        assert_eq!(
            Tree::empty().id().to_string(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
    }

    #[test]
    fn decode_dispatches_on_type() {
        let blob = GitObject::from(Blob::new(b"payload".to_vec()));
        let decoded = GitObject::decode(&blob.encode()).unwrap();
        assert_eq!(decoded, blob);
        assert_eq!(decoded.object_type(), ObjectType::Blob);
    }

    #[test]
    fn missing_null_byte_is_malformed() {
        let err = GitObject::decode(b"blob 5hello").unwrap_err();
        assert!(matches!(err, Error::MalformedObject(_)));
    }

    #[test]
    fn length_mismatch_is_malformed() {
        assert!(matches!(
            GitObject::decode(b"blob 4\0hello"),
            Err(Error::MalformedObject(_))
        ));
        assert!(matches!(
            GitObject::decode(b"blob 6\0hello"),
            Err(Error::MalformedObject(_))
        ));
        assert!(matches!(
            GitObject::decode(b"blob -5\0hello"),
            Err(Error::MalformedObject(_))
        ));
    }

    #[test]
    fn unknown_type_is_malformed() {
        assert!(matches!(
            GitObject::decode(b"tag 5\0hello"),
            Err(Error::MalformedObject(_))
        ));
        assert!(matches!(
            GitObject::decode(b"blob5\0hello"),
            Err(Error::MalformedObject(_))
        ));
    }

    #[test]
    fn blob_payload_may_contain_nul() {
        let blob = Blob::new(vec![0, 1, 0, 2]);
        let decoded = GitObject::decode(&blob.encode()).unwrap();
        assert_eq!(decoded, GitObject::Blob(blob));
    }
}
