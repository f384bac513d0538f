// Snapshots a directory into tree and blob objects, bottom-up

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{Error, IoContext, Result};
use crate::hash::ObjectId;
use crate::object::{Blob, FileMode, Tree, TreeEntry};
use crate::store::ObjectStore;

pub struct TreeBuilder<'a> {
    store: &'a ObjectStore,
    excluded: Vec<PathBuf>,
}

impl<'a> TreeBuilder<'a> {
    /// The store's own root is always left out, so a store nested inside
    /// the snapshot target never ends up in its own trees.
    pub fn new(store: &'a ObjectStore) -> Self {
        Self {
            store,
            excluded: vec![store.root().to_path_buf()],
        }
    }

    /// Leaves `path` (and everything below it) out of every snapshot.
    ///
    /// The path need not exist yet; it is resolved when a build starts.
    pub fn exclude(mut self, path: impl AsRef<Path>) -> Self {
        self.excluded.push(path.as_ref().to_path_buf());
        self
    }

    /// Stores every file and directory under `dir` and returns the id of
    /// the root tree. Children are always stored before their parent.
    pub fn build(&self, dir: &Path) -> Result<ObjectId> {
        let root = fs::canonicalize(dir).at(dir)?;
        let excluded: Vec<_> = self.excluded.iter().map(|path| resolve(path)).collect();
        let id = self.build_dir(&root, &excluded)?;
        info!("wrote tree {id} for {}", dir.display());
        Ok(id)
    }

    fn build_dir(&self, dir: &Path, excluded: &[PathBuf]) -> Result<ObjectId> {
        let entries: Vec<_> = fs::read_dir(dir)
            .at(dir)?
            .collect::<io::Result<_>>()
            .at(dir)?;

        let records = entries
            .iter()
            .try_fold(Vec::new(), |mut acc, dir_entry| -> Result<_> {
                let path = dir_entry.path();
                if excluded.contains(&path) {
                    debug!("skipping excluded path {}", path.display());
                    return Ok(acc);
                }

                if let Some(record) = self.build_entry(&path, dir_entry, excluded)? {
                    acc.push(record);
                }
                Ok(acc)
            })?;

        let tree = Tree::new(records)?;
        let id = self.store.write_object(&tree)?;
        debug!("tree {id} <- {} ({} entries)", dir.display(), tree.len());
        Ok(id)
    }

    fn build_entry(
        &self,
        path: &Path,
        dir_entry: &fs::DirEntry,
        excluded: &[PathBuf],
    ) -> Result<Option<TreeEntry>> {
        let name = dir_entry.file_name().into_string().map_err(|raw| Error::Io {
            path: path.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::InvalidData,
                format!("file name {raw:?} is not valid UTF-8"),
            ),
        })?;

        // symlink_metadata so links are recorded, never followed
        let metadata = fs::symlink_metadata(path).at(path)?;
        let file_type = metadata.file_type();

        let (mode, id) = if file_type.is_dir() {
            (FileMode::Directory, self.build_dir(path, excluded)?)
        } else if file_type.is_symlink() {
            let target = fs::read_link(path).at(path)?;
            let blob = Blob::new(link_target_bytes(&target));
            (FileMode::Symlink, self.store.write_object(&blob)?)
        } else if file_type.is_file() {
            let blob = Blob::new(fs::read(path).at(path)?);
            (file_mode(&metadata), self.store.write_object(&blob)?)
        } else {
            debug!("skipping special file {}", path.display());
            return Ok(None);
        };

        Ok(Some(TreeEntry::new(mode, name, id)))
    }
}

// Canonical form of `path` even when it does not exist yet: the deepest
// existing ancestor is canonicalized and the missing tail re-appended.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }

    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut tail = Vec::new();
    let mut current = absolute.as_path();
    while let (Some(parent), Some(name)) = (current.parent(), current.file_name()) {
        tail.push(name);
        if let Ok(base) = fs::canonicalize(parent) {
            return tail.iter().rev().fold(base, |acc, name| acc.join(name));
        }
        current = parent;
    }
    absolute
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> FileMode {
    use std::os::unix::fs::PermissionsExt;

    if metadata.permissions().mode() & 0o111 != 0 {
        FileMode::Executable
    } else {
        FileMode::Regular
    }
}

#[cfg(not(unix))]
fn file_mode(_metadata: &fs::Metadata) -> FileMode {
    FileMode::Regular
}

#[cfg(unix)]
fn link_target_bytes(target: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;

    target.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn link_target_bytes(target: &Path) -> Vec<u8> {
    target.to_string_lossy().replace('\\', "/").into_bytes()
}
