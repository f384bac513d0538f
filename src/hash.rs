// Object identities: SHA-1 digests of canonical encoded objects

use std::{fmt, str::FromStr};

use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

pub const DIGEST_LEN: usize = 20;
pub const HEX_LEN: usize = DIGEST_LEN * 2;

/// A 160-bit object digest.
///
/// Rendered as 40 lowercase hex characters everywhere except inside tree
/// payloads, which carry the raw 20 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; DIGEST_LEN]);

impl ObjectId {
    pub fn hash(data: &[u8]) -> Self {
        Self(Sha1::digest(data).into())
    }

    pub fn from_raw(raw: &[u8]) -> Result<Self> {
        let bytes: [u8; DIGEST_LEN] = raw.try_into().map_err(|_| {
            Error::malformed(format!(
                "expected a {DIGEST_LEN}-byte digest, got {} bytes",
                raw.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(7);
        hex
    }

    // Split used by the on-disk fan-out: (2 chars, 38 chars)
    pub(crate) fn fan_out(&self) -> (String, String) {
        let hex = self.to_hex();
        let (dir, file) = hex.split_at(2);
        (dir.to_owned(), file.to_owned())
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != HEX_LEN {
            return Err(Error::InvalidObjectId(s.to_owned()));
        }

        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| Error::InvalidObjectId(s.to_owned()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}
