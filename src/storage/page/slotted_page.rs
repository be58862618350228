use crate::common::config::{PageId, DB_PAGE_SIZE, INVALID_PAGE_ID};
use crate::common::exception::PageError;
use crate::storage::index::search_key::{DataEntry, SearchKey};
use crate::storage::page::page::Page;

/// Slotted page layout (sizes in bytes):
///
/// ```text
///  ---------------------------------------------------------------------
/// | NextPageId (8) | EntryCount (2) | FreePtr (2) | slot array ... ->   |
/// |                        ... free space ...                           |
/// |                  <- ... entry bytes (bincode DataEntry) ...         |
///  ---------------------------------------------------------------------
/// ```
///
/// Each slot is `(offset: u16, length: u16)`. The slot array grows up from
/// the header; entry bytes grow down from the end of the page. `FreePtr` is
/// the offset of the lowest used entry byte.
const OFFSET_NEXT_PAGE: usize = 0;
const OFFSET_ENTRY_COUNT: usize = 8;
const OFFSET_FREE_PTR: usize = 10;
const SLOT_ARRAY_OFFSET: usize = 12;
const SLOT_SIZE: usize = 4;

/// Result of a bounded insert: the page either took the entry or is full.
/// A full page is an expected outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    PageFull,
}

/// Result of a local delete: the entry was removed from this page, or this
/// page simply does not hold it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Read-only view of a page in slotted format.
pub struct SlottedPage<'a> {
    data: &'a [u8; DB_PAGE_SIZE],
}

impl<'a> SlottedPage<'a> {
    pub fn new(page: &'a Page) -> Self {
        Self {
            data: page.get_data(),
        }
    }

    /// Number of entries stored on this page (this page only, not the chain).
    pub fn entry_count(&self) -> u16 {
        u16::from_le_bytes(
            self.data[OFFSET_ENTRY_COUNT..OFFSET_ENTRY_COUNT + 2]
                .try_into()
                .unwrap(),
        )
    }

    /// Id of the next page in the chain, or `INVALID_PAGE_ID`.
    pub fn next_page(&self) -> PageId {
        PageId::from_le_bytes(
            self.data[OFFSET_NEXT_PAGE..OFFSET_NEXT_PAGE + 8]
                .try_into()
                .unwrap(),
        )
    }

    /// Bytes available for one more entry plus its slot.
    pub fn free_space(&self) -> usize {
        let slot_end = SLOT_ARRAY_OFFSET + SLOT_SIZE * (self.entry_count() as usize + 1);
        (self.free_ptr() as usize).saturating_sub(slot_end)
    }

    /// Decodes the entry stored in the given slot.
    pub fn entry_at(&self, slot: u16) -> Result<DataEntry, PageError> {
        let count = self.entry_count();
        if slot >= count {
            return Err(PageError::SlotOutOfBounds {
                slot,
                entry_count: count,
            });
        }
        let (offset, length) = self.slot(slot);
        DataEntry::from_bytes(&self.data[offset as usize..(offset + length) as usize])
    }

    /// Returns the first slot at or after `from_slot` whose entry's key
    /// equals `key`, or `None` when no further slot matches.
    pub fn next_match(&self, key: &SearchKey, from_slot: u16) -> Result<Option<u16>, PageError> {
        for slot in from_slot..self.entry_count() {
            if self.entry_at(slot)?.key == *key {
                return Ok(Some(slot));
            }
        }
        Ok(None)
    }

    fn free_ptr(&self) -> u16 {
        u16::from_le_bytes(
            self.data[OFFSET_FREE_PTR..OFFSET_FREE_PTR + 2]
                .try_into()
                .unwrap(),
        )
    }

    fn slot(&self, slot: u16) -> (u16, u16) {
        let pos = SLOT_ARRAY_OFFSET + SLOT_SIZE * slot as usize;
        let offset = u16::from_le_bytes(self.data[pos..pos + 2].try_into().unwrap());
        let length = u16::from_le_bytes(self.data[pos + 2..pos + 4].try_into().unwrap());
        (offset, length)
    }
}

/// Mutable view of a page in slotted format.
pub struct SlottedPageMut<'a> {
    data: &'a mut [u8; DB_PAGE_SIZE],
}

impl<'a> SlottedPageMut<'a> {
    pub fn new(page: &'a mut Page) -> Self {
        Self {
            data: page.get_data_mut(),
        }
    }

    /// Formats a freshly allocated page: no entries, no next page.
    pub fn init(&mut self) {
        self.set_next_page(INVALID_PAGE_ID);
        self.set_entry_count(0);
        self.set_free_ptr(DB_PAGE_SIZE as u16);
    }

    pub fn entry_count(&self) -> u16 {
        self.as_read().entry_count()
    }

    pub fn next_page(&self) -> PageId {
        self.as_read().next_page()
    }

    pub fn free_space(&self) -> usize {
        self.as_read().free_space()
    }

    pub fn set_next_page(&mut self, page_id: PageId) {
        self.data[OFFSET_NEXT_PAGE..OFFSET_NEXT_PAGE + 8].copy_from_slice(&page_id.to_le_bytes());
    }

    /// Bounded insert: stores the entry on this page, or reports `PageFull`
    /// without touching anything.
    pub fn try_insert(&mut self, entry: &DataEntry) -> Result<InsertOutcome, PageError> {
        let bytes = entry.to_bytes()?;
        let count = self.entry_count() as usize;
        let slot_end = SLOT_ARRAY_OFFSET + SLOT_SIZE * (count + 1);
        let free_ptr = self.as_read().free_ptr() as usize;

        if free_ptr < slot_end + bytes.len() {
            return Ok(InsertOutcome::PageFull);
        }

        let offset = free_ptr - bytes.len();
        self.data[offset..free_ptr].copy_from_slice(&bytes);
        self.write_slot(count as u16, offset as u16, bytes.len() as u16);
        self.set_entry_count(count as u16 + 1);
        self.set_free_ptr(offset as u16);
        Ok(InsertOutcome::Inserted)
    }

    /// Local delete: removes the entry if this page holds it, compacting the
    /// entry heap and the slot array, or reports `NotFound`.
    pub fn try_delete(&mut self, entry: &DataEntry) -> Result<DeleteOutcome, PageError> {
        let bytes = entry.to_bytes()?;
        let count = self.entry_count();

        let mut slots: Vec<(u16, u16)> = (0..count).map(|s| self.as_read().slot(s)).collect();
        let hit = slots.iter().position(|&(offset, length)| {
            length as usize == bytes.len()
                && &self.data[offset as usize..(offset + length) as usize] == bytes.as_slice()
        });
        let Some(index) = hit else {
            return Ok(DeleteOutcome::NotFound);
        };

        let (offset, length) = slots.remove(index);
        let free_ptr = self.as_read().free_ptr() as usize;

        // Close the hole: slide every entry below the victim up by its length,
        // then rebase the slots that pointed into the moved region.
        self.data
            .copy_within(free_ptr..offset as usize, free_ptr + length as usize);
        for slot in slots.iter_mut() {
            if slot.0 < offset {
                slot.0 += length;
            }
        }

        for (i, &(slot_offset, slot_length)) in slots.iter().enumerate() {
            self.write_slot(i as u16, slot_offset, slot_length);
        }
        self.set_entry_count(count - 1);
        self.set_free_ptr((free_ptr + length as usize) as u16);
        Ok(DeleteOutcome::Deleted)
    }

    fn as_read(&self) -> SlottedPage<'_> {
        SlottedPage { data: self.data }
    }

    fn set_entry_count(&mut self, count: u16) {
        self.data[OFFSET_ENTRY_COUNT..OFFSET_ENTRY_COUNT + 2]
            .copy_from_slice(&count.to_le_bytes());
    }

    fn set_free_ptr(&mut self, free_ptr: u16) {
        self.data[OFFSET_FREE_PTR..OFFSET_FREE_PTR + 2].copy_from_slice(&free_ptr.to_le_bytes());
    }

    fn write_slot(&mut self, slot: u16, offset: u16, length: u16) {
        let pos = SLOT_ARRAY_OFFSET + SLOT_SIZE * slot as usize;
        self.data[pos..pos + 2].copy_from_slice(&offset.to_le_bytes());
        self.data[pos + 2..pos + 4].copy_from_slice(&length.to_le_bytes());
    }
}
