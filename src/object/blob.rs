// Represents a blob object type. This is used to store user files being tracked by gitplumb.

use crate::error::Result;
use crate::object::{Object, ObjectType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    data: Vec<u8>,
}

impl Blob {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl Object for Blob {
    const TYPE: ObjectType = ObjectType::Blob;

    fn serialize(&self) -> Vec<u8> {
        self.data.clone()
    }

    fn deserialize(data: &[u8]) -> Result<Self> {
        Ok(Self {
            data: data.to_vec(),
        })
    }
}
