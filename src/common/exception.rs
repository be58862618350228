use thiserror::Error;

use crate::common::config::{FrameId, PageId};

/// Errors surfaced by the buffer pool manager.
#[derive(Error, Debug)]
pub enum BufferError {
    #[error("page {0} not found in page table")]
    PageNotFound(PageId),
    #[error("frame {0} not found in pages array")]
    FrameNotFound(FrameId),
    #[error("no evictable frame available in the buffer pool")]
    NoFreeFrame,
    #[error("page {0} is still pinned")]
    PagePinned(PageId),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised while interpreting one page's contents.
#[derive(Error, Debug)]
pub enum PageError {
    #[error("slot {slot} out of bounds (entry count {entry_count})")]
    SlotOutOfBounds { slot: u16, entry_count: u16 },
    #[error("entry of {data_size} bytes does not fit in {remaining_space} free bytes")]
    DataTooLarge {
        data_size: usize,
        remaining_space: usize,
    },
    #[error("failed to encode entry: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("failed to decode entry: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Errors surfaced by the hash index public API.
///
/// `EntryTooLarge` and `EntryNotFound` are the only errors a well-behaved
/// caller can provoke; the transparent variants carry fatal collaborator
/// failures through unchanged.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("data entry of {size} bytes exceeds the maximum of {max} bytes")]
    EntryTooLarge { size: usize, max: usize },
    #[error("entry not found in the index")]
    EntryNotFound,
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error(transparent)]
    Page(#[from] PageError),
}
