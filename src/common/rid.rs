use std::fmt;

use bincode::{Decode, Encode};

use crate::common::config::{PageId, INVALID_PAGE_ID};

/// Locates one record in the indexed data file: the page it lives on and its
/// slot within that page. Opaque to the index beyond equality comparison.
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash, Encode, Decode)]
pub struct RID {
    page_id: PageId,
    slot_num: u32,
}

impl RID {
    /// Creates a new RID with the given page ID and slot number.
    pub fn new(page_id: PageId, slot_num: u32) -> Self {
        Self { page_id, slot_num }
    }

    /// Returns the page ID of the RID.
    pub fn get_page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the slot number of the RID.
    pub fn get_slot_num(&self) -> u32 {
        self.slot_num
    }
}

impl fmt::Display for RID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page_id: {} slot_num: {}", self.page_id, self.slot_num)
    }
}

impl Default for RID {
    fn default() -> Self {
        Self {
            page_id: INVALID_PAGE_ID,
            slot_num: 0,
        }
    }
}
