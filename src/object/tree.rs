use std::fmt;

use crate::error::{Error, Result};
use crate::hash::{DIGEST_LEN, ObjectId};
use crate::object::{Object, ObjectType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    Regular,
    Executable,
    Symlink,
    Directory,
}

impl FileMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Regular => "100644",
            FileMode::Executable => "100755",
            FileMode::Symlink => "120000",
            FileMode::Directory => "40000",
        }
    }

    pub fn parse(raw: &[u8]) -> Result<Self> {
        match raw {
            b"100644" => Ok(FileMode::Regular),
            b"100755" => Ok(FileMode::Executable),
            b"120000" => Ok(FileMode::Symlink),
            // Some writers zero-pad directory modes to six digits
            b"40000" | b"040000" => Ok(FileMode::Directory),
            other => Err(Error::malformed(format!(
                "unknown tree entry mode: {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            FileMode::Directory => ObjectType::Tree,
            _ => ObjectType::Blob,
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: FileMode,
    pub name: String,
    pub id: ObjectId,
}

impl TreeEntry {
    pub fn new(mode: FileMode, name: impl Into<String>, id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            id,
        }
    }

    // Parses one `<mode> <name>\0<20 bytes>` record starting at `pos`, returning
    // the entry and the offset just past it.
    fn parse(data: &[u8], pos: usize) -> Result<(Self, usize)> {
        let space_idx = data[pos..]
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| Error::malformed("tree entry: missing space after mode"))?
            + pos;
        let mode = FileMode::parse(&data[pos..space_idx])?;

        let null_idx = data[space_idx..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::malformed("tree entry: missing null byte after name"))?
            + space_idx;
        let name = std::str::from_utf8(&data[space_idx + 1..null_idx])
            .map_err(|_| Error::malformed("tree entry: name is not valid UTF-8"))?;

        let hash_start = null_idx + 1;
        let hash_end = hash_start + DIGEST_LEN;
        if hash_end > data.len() {
            return Err(Error::malformed(format!(
                "tree entry {name:?}: truncated digest"
            )));
        }
        let id = ObjectId::from_raw(&data[hash_start..hash_end])?;

        Ok((Self::new(mode, name, id), hash_end))
    }
}

/// A directory snapshot. Entries are always held sorted by name with no
/// duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn new(mut entries: Vec<TreeEntry>) -> Result<Self> {
        for entry in &entries {
            validate_name(&entry.name)?;
        }

        // Plain byte order on the name; directories get no trailing-slash treatment
        entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));

        if let Some(pair) = entries.windows(2).find(|pair| pair[0].name == pair[1].name) {
            return Err(Error::malformed(format!(
                "duplicate tree entry: {}",
                pair[0].name
            )));
        }

        Ok(Self { entries })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .binary_search_by(|entry| entry.name.as_bytes().cmp(name.as_bytes()))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Object for Tree {
    const TYPE: ObjectType = ObjectType::Tree;

    fn serialize(&self) -> Vec<u8> {
        let mut output = Vec::new();
        for entry in &self.entries {
            output.extend_from_slice(entry.mode.as_str().as_bytes());
            output.push(b' ');
            output.extend_from_slice(entry.name.as_bytes());
            output.push(0);
            output.extend_from_slice(entry.id.as_bytes());
        }
        output
    }

    fn deserialize(data: &[u8]) -> Result<Self> {
        let mut records = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            let (entry, next) = TreeEntry::parse(data, pos)?;
            records.push(entry);
            pos = next;
        }

        Self::new(records)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
        return Err(Error::malformed(format!("invalid tree entry name: {name:?}")));
    }
    Ok(())
}
