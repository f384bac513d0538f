// Key-Value List with Message: the text layout shared by commit payloads
use indexmap::IndexMap;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct Kvlm {
    // Using an IndexMap instead of a regular HashMap to ensure that insertion order is preserved.
    // Reordering keys on serialize would produce a different, equally valid object with another id.
    // WARN: duplicated keys are grouped under their first occurrence, so interleaved duplicates
    // do not survive a parse/serialize cycle byte for byte.
    data: IndexMap<Option<String>, Vec<String>>,
}

impl Kvlm {
    pub fn new(raw_data: &[u8]) -> Result<Self> {
        Ok(Self {
            data: Self::parse(raw_data)?,
        })
    }

    pub fn init() -> Self {
        Self::default()
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut output = Vec::new();

        for (key, values) in &self.data {
            if let Some(field) = key {
                for value in values {
                    output.extend_from_slice(field.as_bytes());
                    output.push(b' ');
                    // Continuation lines are indented by one space
                    output.extend_from_slice(value.replace('\n', "\n ").as_bytes());
                    output.push(b'\n');
                }
            }
        }

        // There is always at most one message
        if let Some(message) = self.get_message() {
            output.push(b'\n');
            output.extend_from_slice(message.as_bytes());
        }

        output
    }

    pub fn get_message(&self) -> Option<&str> {
        self.data
            .get(&None)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    pub fn get_key(&self, key: &str) -> Option<&[String]> {
        self.data
            .get(&Some(key.to_string()))
            .map(Vec::as_slice)
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.data
            .insert(Some(key.to_string()), vec![value.to_string()]);
    }

    pub fn set_message(&mut self, message: &str) {
        self.data.insert(None, vec![message.to_string()]);
    }

    fn parse(raw_data: &[u8]) -> Result<IndexMap<Option<String>, Vec<String>>> {
        let mut pos = 0;
        let mut result: IndexMap<Option<String>, Vec<String>> = IndexMap::new();

        while pos < raw_data.len() {
            // A blank line separates the headers from the message body
            if raw_data[pos] == b'\n' {
                let message = utf8(&raw_data[pos + 1..])?;
                result.insert(None, vec![message.to_owned()]);
                break;
            }

            let space_idx = raw_data[pos..]
                .iter()
                .position(|&b| b == b' ' || b == b'\n')
                .map(|i| i + pos)
                .filter(|&i| raw_data[i] == b' ')
                .ok_or_else(|| Error::malformed("header line without a value"))?;

            let key = utf8(&raw_data[pos..space_idx])?.to_owned();

            // Find the end of the value, following continuation lines
            let mut end = space_idx;
            loop {
                end = raw_data[end + 1..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map(|i| i + end + 1)
                    .ok_or_else(|| Error::malformed(format!("unterminated header: {key}")))?;

                if raw_data.get(end + 1) != Some(&b' ') {
                    break;
                }
            }

            let value = utf8(&raw_data[space_idx + 1..end])?.replace("\n ", "\n");

            result.entry(Some(key)).or_default().push(value);

            pos = end + 1;
        }

        Ok(result)
    }
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|_| Error::malformed("header text is not valid UTF-8"))
}
