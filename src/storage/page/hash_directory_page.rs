use std::mem::size_of;

use crate::common::config::{PageId, DB_PAGE_SIZE, INVALID_PAGE_ID};
use crate::common::exception::PageError;
use crate::storage::page::page::Page;

/// Directory page layout (sizes in bytes):
///
/// ```text
///  -----------------------------------------------------------------
/// | NextPageId (8) | EntryCount (2) | padding (6) | BucketPageIds... |
///  -----------------------------------------------------------------
/// ```
///
/// Slot `i` on this page holds the page id of bucket `i`'s primary page (or
/// `INVALID_PAGE_ID` if that bucket has never been populated). When the
/// configured bucket count exceeds one page's slot capacity, directory pages
/// chain through `NextPageId` and callers subtract `HASH_DIR_CAPACITY` per
/// hop while resolving a global slot.
const OFFSET_NEXT_PAGE: usize = 0;
const OFFSET_ENTRY_COUNT: usize = 8;
const SLOTS_OFFSET: usize = 16;

/// Maximum number of bucket slots one directory page can hold.
pub const HASH_DIR_CAPACITY: usize = (DB_PAGE_SIZE - SLOTS_OFFSET) / size_of::<PageId>();

/// Read-only view of a hash directory page.
pub struct HashDirectoryPage<'a> {
    data: &'a [u8; DB_PAGE_SIZE],
}

impl<'a> HashDirectoryPage<'a> {
    pub fn new(page: &'a Page) -> Self {
        Self {
            data: page.get_data(),
        }
    }

    /// Number of bucket slots in use on this page.
    pub fn entry_count(&self) -> usize {
        u16::from_le_bytes(
            self.data[OFFSET_ENTRY_COUNT..OFFSET_ENTRY_COUNT + 2]
                .try_into()
                .unwrap(),
        ) as usize
    }

    /// Id of the next directory page in the chain, or `INVALID_PAGE_ID`.
    pub fn next_page(&self) -> PageId {
        PageId::from_le_bytes(
            self.data[OFFSET_NEXT_PAGE..OFFSET_NEXT_PAGE + 8]
                .try_into()
                .unwrap(),
        )
    }

    /// Primary page id of the bucket anchored at the given local slot.
    pub fn bucket_page_id(&self, slot: usize) -> Result<PageId, PageError> {
        let count = self.entry_count();
        if slot >= count {
            return Err(PageError::SlotOutOfBounds {
                slot: slot as u16,
                entry_count: count as u16,
            });
        }
        let pos = SLOTS_OFFSET + slot * size_of::<PageId>();
        Ok(PageId::from_le_bytes(
            self.data[pos..pos + 8].try_into().unwrap(),
        ))
    }
}

/// Mutable view of a hash directory page.
pub struct HashDirectoryPageMut<'a> {
    data: &'a mut [u8; DB_PAGE_SIZE],
}

impl<'a> HashDirectoryPageMut<'a> {
    pub fn new(page: &'a mut Page) -> Self {
        Self {
            data: page.get_data_mut(),
        }
    }

    /// Formats a freshly allocated directory page with `entry_count` usable
    /// slots, every slot initialized to `INVALID_PAGE_ID`, and no next page.
    pub fn init(&mut self, entry_count: usize) {
        debug_assert!(entry_count <= HASH_DIR_CAPACITY);
        self.set_next_page(INVALID_PAGE_ID);
        self.data[OFFSET_ENTRY_COUNT..OFFSET_ENTRY_COUNT + 2]
            .copy_from_slice(&(entry_count as u16).to_le_bytes());
        for slot in 0..HASH_DIR_CAPACITY {
            let pos = SLOTS_OFFSET + slot * size_of::<PageId>();
            self.data[pos..pos + 8].copy_from_slice(&INVALID_PAGE_ID.to_le_bytes());
        }
    }

    pub fn entry_count(&self) -> usize {
        self.as_read().entry_count()
    }

    pub fn next_page(&self) -> PageId {
        self.as_read().next_page()
    }

    pub fn bucket_page_id(&self, slot: usize) -> Result<PageId, PageError> {
        self.as_read().bucket_page_id(slot)
    }

    pub fn set_next_page(&mut self, page_id: PageId) {
        self.data[OFFSET_NEXT_PAGE..OFFSET_NEXT_PAGE + 8].copy_from_slice(&page_id.to_le_bytes());
    }

    /// Writes the primary page id for the bucket anchored at the given slot.
    pub fn set_bucket_page_id(&mut self, slot: usize, page_id: PageId) -> Result<(), PageError> {
        let count = self.entry_count();
        if slot >= count {
            return Err(PageError::SlotOutOfBounds {
                slot: slot as u16,
                entry_count: count as u16,
            });
        }
        let pos = SLOTS_OFFSET + slot * size_of::<PageId>();
        self.data[pos..pos + 8].copy_from_slice(&page_id.to_le_bytes());
        Ok(())
    }

    fn as_read(&self) -> HashDirectoryPage<'_> {
        HashDirectoryPage { data: self.data }
    }
}
