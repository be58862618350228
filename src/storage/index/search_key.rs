use std::fmt;

use bincode::{Decode, Encode};
use xxhash_rust::xxh3::xxh3_64;

use crate::common::config::storage_bincode_config;
use crate::common::exception::PageError;
use crate::common::rid::RID;

/// A key value the hash index can store and look up: one of the indexable
/// column domains.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Encode, Decode)]
pub enum SearchKey {
    Integer(i64),
    Varchar(String),
}

impl SearchKey {
    /// Hash of this key truncated to its low-order `depth` bits, i.e. a value
    /// in `0..2^depth`. Deterministic across runs; `depth` is the index's
    /// fixed directory depth.
    pub fn get_hash(&self, depth: u32) -> u32 {
        debug_assert!(depth <= 32);
        let digest = match self {
            SearchKey::Integer(value) => xxh3_64(&value.to_le_bytes()),
            SearchKey::Varchar(value) => xxh3_64(value.as_bytes()),
        };
        (digest & ((1u64 << depth) - 1)) as u32
    }
}

impl From<i64> for SearchKey {
    fn from(value: i64) -> Self {
        SearchKey::Integer(value)
    }
}

impl From<&str> for SearchKey {
    fn from(value: &str) -> Self {
        SearchKey::Varchar(value.to_owned())
    }
}

impl From<String> for SearchKey {
    fn from(value: String) -> Self {
        SearchKey::Varchar(value)
    }
}

impl fmt::Display for SearchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchKey::Integer(value) => write!(f, "{}", value),
            SearchKey::Varchar(value) => write!(f, "{}", value),
        }
    }
}

/// The unit stored in a bucket page: a key paired with the record id it
/// indexes.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct DataEntry {
    pub key: SearchKey,
    pub rid: RID,
}

impl DataEntry {
    pub fn new(key: SearchKey, rid: RID) -> Self {
        Self { key, rid }
    }

    /// Serializes this entry with the pinned on-disk encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PageError> {
        Ok(bincode::encode_to_vec(self, storage_bincode_config())?)
    }

    /// Decodes an entry previously produced by `to_bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PageError> {
        let (entry, _) = bincode::decode_from_slice(bytes, storage_bincode_config())?;
        Ok(entry)
    }

    /// Length of this entry's serialized form in bytes.
    pub fn encoded_len(&self) -> Result<usize, PageError> {
        Ok(self.to_bytes()?.len())
    }
}

impl fmt::Display for DataEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.key, self.rid)
    }
}
