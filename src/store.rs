// Hash-addressed, zlib-compressed object storage under `<gitdir>/objects`

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::compress;
use crate::error::{Error, IoContext, Result};
use crate::hash::{HEX_LEN, ObjectId};
use crate::object::{GitObject, Object, split_header};

const MIN_PREFIX_LEN: usize = 4;

/// Handle on one object database directory.
///
/// Objects live at `<root>/<first 2 hex chars>/<remaining 38>`, each file
/// holding the zlib-compressed encoded object. Nothing is ever rewritten.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let (dir, file) = id.fan_out();
        self.root.join(dir).join(file)
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.object_path(id).is_file()
    }

    /// Stores already-encoded object bytes and returns their id.
    ///
    /// Writing an object that already exists is a no-op.
    pub fn put(&self, encoded: &[u8]) -> Result<ObjectId> {
        let id = ObjectId::hash(encoded);
        let path = self.object_path(&id);
        if path.is_file() {
            trace!("object {id} already stored");
            return Ok(id);
        }

        let dir = path.parent().unwrap_or(self.root.as_path());
        fs::create_dir_all(dir).at(dir)?;

        let compressed = compress::compress(encoded)?;

        // Write beside the final location and rename, so readers never see a partial object
        let mut staged = tempfile::NamedTempFile::new_in(dir).at(dir)?;
        staged.write_all(&compressed).at(staged.path())?;
        make_read_only(staged.as_file()).at(staged.path())?;
        staged
            .persist(&path)
            .map_err(|e| e.error)
            .at(&path)?;

        debug!("stored object {id} ({} bytes, {} compressed)", encoded.len(), compressed.len());
        Ok(id)
    }

    /// Reads an object back as its full encoded bytes (header and payload).
    pub fn get(&self, id: &ObjectId) -> Result<Vec<u8>> {
        let path = self.object_path(id);
        let compressed = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(id.to_hex()));
            }
            Err(e) => return Err(e).at(&path),
        };

        compress::decompress(&compressed).map_err(|e| match e {
            Error::CorruptData(reason) => Error::CorruptData(format!("object {id}: {reason}")),
            other => other,
        })
    }

    pub fn write_object<O: Object>(&self, object: &O) -> Result<ObjectId> {
        self.put(&object.encode())
    }

    pub fn read_object(&self, id: &ObjectId) -> Result<GitObject> {
        GitObject::decode(&self.get(id)?)
    }

    /// Reads an object and insists it is of kind `O`.
    pub fn read_as<O: Object>(&self, id: &ObjectId) -> Result<O> {
        let data = self.get(id)?;
        let (object_type, payload) = split_header(&data)?;
        if object_type != O::TYPE {
            return Err(Error::malformed(format!(
                "object {id} is a {object_type}, expected a {}",
                O::TYPE
            )));
        }
        O::deserialize(payload)
    }

    /// Resolves a full hex id or a unique abbreviation of at least four
    /// characters to a stored object.
    pub fn resolve(&self, name: &str) -> Result<ObjectId> {
        if name.len() == HEX_LEN {
            let id: ObjectId = name.parse()?;
            return if self.contains(&id) {
                Ok(id)
            } else {
                Err(Error::NotFound(name.to_owned()))
            };
        }

        if name.len() < MIN_PREFIX_LEN
            || name.len() > HEX_LEN
            || !name.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(Error::InvalidObjectId(name.to_owned()));
        }

        let prefix = name.to_ascii_lowercase();
        let (dir, rest) = prefix.split_at(2);
        let fan_out_dir = self.root.join(dir);

        let entries = match fs::read_dir(&fan_out_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(name.to_owned()));
            }
            Err(e) => return Err(e).at(&fan_out_dir),
        };

        let mut matches = Vec::new();
        for entry in entries {
            let file_name = entry.at(&fan_out_dir)?.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if file_name.starts_with(rest) {
                // Skips staging files and anything else that is not an object name
                if let Ok(id) = format!("{dir}{file_name}").parse::<ObjectId>() {
                    matches.push(id);
                }
            }
        }

        match matches.as_slice() {
            [] => Err(Error::NotFound(name.to_owned())),
            [id] => Ok(*id),
            _ => Err(Error::AmbiguousObjectId(name.to_owned())),
        }
    }
}

// Stored objects are immutable, so they land as 0444 like git's
#[cfg(unix)]
fn make_read_only(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(fs::Permissions::from_mode(0o444))
}

#[cfg(not(unix))]
fn make_read_only(file: &fs::File) -> io::Result<()> {
    let mut permissions = file.metadata()?.permissions();
    permissions.set_readonly(true);
    file.set_permissions(permissions)
}
