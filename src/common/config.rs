use bincode::config as bincode_config;

pub type FrameId = usize; // frame id type
pub type PageId = u64; // page id type

pub const INVALID_PAGE_ID: PageId = PageId::MAX; // invalid page id
pub const DB_PAGE_SIZE: usize = 4096; // size of a data page in bytes

pub const BUFFER_POOL_SIZE: usize = 64; // default number of frames in the buffer pool
pub const LRUK_REPLACER_K: usize = 2; // lookback window for lru-k replacer

/// Number of key-hash bits used to select a directory slot. Fixed for the
/// lifetime of an index: 7 bits means 128 buckets.
pub const HASH_INDEX_DEPTH: u32 = 7;

/// Maximum serialized data-entry size (bytes) the hash index accepts.
/// Must stay comfortably below `DB_PAGE_SIZE` so a bucket page always holds
/// several entries on top of its header and slot array.
pub const MAX_ENTRY_SIZE: usize = 1024;

/// Bincode configuration for persisted (on-disk) encodings.
///
/// Keep this centralized so entry and page encodings don't accidentally
/// diverge across call sites.
/// NOTE: Changing this is an on-disk format change.
#[inline]
pub(crate) fn storage_bincode_config() -> impl bincode_config::Config {
    // Pin the on-disk encoding policy explicitly:
    // - little-endian encoding
    // - fixed-width integer encoding
    bincode_config::standard()
        .with_little_endian()
        .with_fixed_int_encoding()
}
