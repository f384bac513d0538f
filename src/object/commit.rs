use std::fmt;

use chrono::{DateTime, FixedOffset, Local, TimeZone};
use typed_builder::TypedBuilder;

use crate::error::{Error, Result};
use crate::hash::ObjectId;
use crate::kvlm::Kvlm;
use crate::object::{Object, ObjectType};

/// Who made a commit and when, as written on `author`/`committer` lines:
/// `Name <email> <unix-seconds> <+hhmm>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub when: DateTime<FixedOffset>,
}

impl Signature {
    /// Angle brackets and newlines cannot survive the `Name <email>` line
    /// layout, so they are dropped from both fields, as git does.
    pub fn new(name: impl AsRef<str>, email: impl AsRef<str>, when: DateTime<FixedOffset>) -> Self {
        Self {
            name: without_crud(name.as_ref()),
            email: without_crud(email.as_ref()),
            when,
        }
    }

    pub fn now(name: impl AsRef<str>, email: impl AsRef<str>) -> Self {
        Self::new(name, email, Local::now().into())
    }

    pub fn parse(line: &str) -> Result<Self> {
        let bad = || Error::malformed(format!("bad signature: {line:?}"));

        let open = line.find('<').ok_or_else(bad)?;
        let close = line[open..].find('>').ok_or_else(bad)? + open;
        let name = line[..open].trim_end();
        let email = &line[open + 1..close];

        let mut stamp = line[close + 1..].split_whitespace();
        let seconds: i64 = stamp.next().and_then(|s| s.parse().ok()).ok_or_else(bad)?;
        let offset = stamp.next().and_then(parse_offset).ok_or_else(bad)?;
        if stamp.next().is_some() {
            return Err(bad());
        }

        let when = offset.timestamp_opt(seconds, 0).single().ok_or_else(bad)?;
        Ok(Self::new(name, email, when))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.when.timestamp(),
            self.when.format("%z")
        )
    }
}

fn without_crud(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '<' | '>' | '\n'))
        .collect::<String>()
        .trim()
        .to_owned()
}

// "+0530" / "-0800"
fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let (sign, digits) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn single_value<'a>(kvlm: &'a Kvlm, key: &str) -> Result<Option<&'a str>> {
    match kvlm.get_key(key) {
        None => Ok(None),
        Some([value]) => Ok(Some(value.as_str())),
        Some(_) => Err(Error::malformed(format!("commit has more than one {key}"))),
    }
}

fn with_trailing_newline(message: &str) -> String {
    let mut message = message.to_owned();
    if !message.ends_with('\n') {
        message.push('\n');
    }
    message
}

/// A snapshot of a tree plus its single optional parent.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct Commit {
    tree: ObjectId,
    #[builder(default)]
    parent: Option<ObjectId>,
    author: Signature,
    committer: Signature,
    #[builder(setter(transform = |message: &str| with_trailing_newline(message)))]
    message: String,
}

impl Commit {
    pub fn tree(&self) -> ObjectId {
        self.tree
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn author(&self) -> &Signature {
        &self.author
    }

    pub fn committer(&self) -> &Signature {
        &self.committer
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Object for Commit {
    const TYPE: ObjectType = ObjectType::Commit;

    fn serialize(&self) -> Vec<u8> {
        let mut kvlm = Kvlm::init();
        kvlm.insert("tree", &self.tree.to_hex());
        if let Some(parent) = &self.parent {
            kvlm.insert("parent", &parent.to_hex());
        }
        kvlm.insert("author", &self.author.to_string());
        kvlm.insert("committer", &self.committer.to_string());
        kvlm.set_message(&self.message);
        kvlm.serialize()
    }

    fn deserialize(data: &[u8]) -> Result<Self> {
        let kvlm = Kvlm::new(data)?;

        let tree = single_value(&kvlm, "tree")?
            .ok_or_else(|| Error::malformed("commit without a tree"))?
            .parse::<ObjectId>()
            .map_err(|e| Error::malformed(format!("commit tree: {e}")))?;
        let parent = single_value(&kvlm, "parent")?
            .map(|raw| raw.parse::<ObjectId>())
            .transpose()
            .map_err(|e| Error::malformed(format!("commit parent: {e}")))?;
        let author = single_value(&kvlm, "author")?
            .ok_or_else(|| Error::malformed("commit without an author"))
            .and_then(Signature::parse)?;
        let committer = match single_value(&kvlm, "committer")? {
            Some(raw) => Signature::parse(raw)?,
            None => author.clone(),
        };

        Ok(Self {
            tree,
            parent,
            author,
            committer,
            message: kvlm.get_message().unwrap_or_default().to_owned(),
        })
    }
}
