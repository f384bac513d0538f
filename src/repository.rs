use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::builder::TreeBuilder;
use crate::error::{Error, IoContext, Result};
use crate::hash::ObjectId;
use crate::store::ObjectStore;

pub const DEFAULT_GITDIR: &str = ".git";
const DEFAULT_HEAD: &[u8] = b"ref: refs/heads/main\n";

/// A worktree paired with the object database that snapshots it.
///
/// The gitdir is explicit configuration, so several repositories (or a
/// gitdir outside its worktree) can coexist in one process.
#[derive(Debug, Clone)]
pub struct Repository {
    worktree: PathBuf,
    gitdir: PathBuf,
    objects: ObjectStore,
}

impl Repository {
    /// Creates the on-disk layout: `objects/`, `refs/heads/`, `refs/tags/`
    /// and `HEAD`. The gitdir must be absent or empty.
    pub fn init(worktree: &Path, gitdir: &Path) -> Result<Self> {
        if gitdir.exists() {
            if !gitdir.is_dir() {
                return Err(Error::NotARepository(gitdir.to_path_buf()));
            }
            if !is_empty_dir(gitdir)? {
                return Err(Error::Io {
                    path: gitdir.to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "directory exists and is not empty",
                    ),
                });
            }
        }

        let repository = Self::at(worktree, gitdir);

        let layout: [&[&str]; 3] = [&["objects"], &["refs", "heads"], &["refs", "tags"]];
        for dir in layout {
            let path = repository.repo_path(dir);
            fs::create_dir_all(&path).at(&path)?;
        }

        let head = repository.repo_path(&["HEAD"]);
        fs::write(&head, DEFAULT_HEAD).at(&head)?;

        info!("initialized repository in {}", gitdir.display());
        Ok(repository)
    }

    pub fn open(worktree: &Path, gitdir: &Path) -> Result<Self> {
        if !gitdir.join("objects").is_dir() {
            return Err(Error::NotARepository(gitdir.to_path_buf()));
        }
        Ok(Self::at(worktree, gitdir))
    }

    /// Walks up from `start` to the first directory holding a `.git` gitdir.
    pub fn discover(start: &Path) -> Result<Self> {
        let start = fs::canonicalize(start).at(start)?;
        for dir in start.ancestors() {
            let gitdir = dir.join(DEFAULT_GITDIR);
            if gitdir.join("objects").is_dir() {
                debug!("found repository at {}", gitdir.display());
                return Self::open(dir, &gitdir);
            }
        }
        Err(Error::NotARepository(start))
    }

    pub fn worktree(&self) -> &Path {
        &self.worktree
    }

    pub fn gitdir(&self) -> &Path {
        &self.gitdir
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    /// Snapshots the worktree, leaving the gitdir out.
    pub fn write_tree(&self) -> Result<ObjectId> {
        TreeBuilder::new(&self.objects)
            .exclude(&self.gitdir)
            .build(&self.worktree)
    }

    fn at(worktree: &Path, gitdir: &Path) -> Self {
        Self {
            worktree: worktree.to_path_buf(),
            gitdir: gitdir.to_path_buf(),
            objects: ObjectStore::new(gitdir.join("objects")),
        }
    }

    // Computes the path under a repository's gitdir
    fn repo_path(&self, paths: &[&str]) -> PathBuf {
        paths.iter().fold(self.gitdir.clone(), |mut acc, path| {
            acc.push(path);
            acc
        })
    }
}

fn is_empty_dir(path: &Path) -> Result<bool> {
    Ok(fs::read_dir(path).at(path)?.next().is_none())
}
