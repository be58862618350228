//! Chain-aware operations over one hash bucket.
//!
//! A bucket is a singly-linked list of slotted pages anchored by the primary
//! page a directory slot points at. Every operation here walks the chain one
//! page at a time: pin, inspect or mutate, unpin with that page's own dirty
//! flag, then follow the next-page link. At most two pages are pinned
//! simultaneously, and only while linking a new overflow page or splicing an
//! emptied one out.

use log::{debug, info};

use crate::buffer::buffer_pool_manager::BufferPoolManager;
use crate::common::config::{PageId, INVALID_PAGE_ID};
use crate::common::exception::{IndexError, PageError};
use crate::storage::index::search_key::DataEntry;
use crate::storage::page::slotted_page::{
    DeleteOutcome, InsertOutcome, SlottedPage, SlottedPageMut,
};

/// Total number of entries stored in the bucket anchored at `primary_id`,
/// summed across the primary page and every overflow page.
pub fn count_entries(bpm: &BufferPoolManager, primary_id: PageId) -> Result<usize, IndexError> {
    let mut count = 0;
    let mut current_id = primary_id;
    while current_id != INVALID_PAGE_ID {
        let frame = bpm.fetch_page(current_id)?;
        let (entries, next_id) = {
            let page = frame.read();
            let view = SlottedPage::new(&page);
            (view.entry_count() as usize, view.next_page())
        };
        bpm.unpin_page(current_id, false);
        count += entries;
        current_id = next_id;
    }
    Ok(count)
}

/// Inserts the entry into the bucket anchored at `primary_id`.
///
/// The entry lands on the first chain page with room. When every page is
/// full, a new overflow page is allocated and linked at the end of the
/// chain; only the page whose contents or link field actually changed is
/// unpinned dirty.
pub fn insert_entry(
    bpm: &BufferPoolManager,
    primary_id: PageId,
    entry: &DataEntry,
) -> Result<(), IndexError> {
    let mut current_id = primary_id;
    loop {
        let frame = bpm.fetch_page(current_id)?;
        let outcome = {
            let mut page = frame.write();
            SlottedPageMut::new(&mut page).try_insert(entry)?
        };

        match outcome {
            InsertOutcome::Inserted => {
                bpm.unpin_page(current_id, true);
                debug!("Inserted entry into bucket page {}", current_id);
                return Ok(());
            }
            InsertOutcome::PageFull => {
                let next_id = {
                    let page = frame.read();
                    SlottedPage::new(&page).next_page()
                };
                if next_id != INVALID_PAGE_ID {
                    // This page is unchanged; keep walking.
                    bpm.unpin_page(current_id, false);
                    current_id = next_id;
                    continue;
                }

                // End of the chain: grow it by one overflow page.
                let overflow = match bpm.new_page() {
                    Ok(frame) => frame,
                    Err(e) => {
                        bpm.unpin_page(current_id, false);
                        return Err(e.into());
                    }
                };
                let overflow_id = overflow.read().get_page_id();
                {
                    let mut page = overflow.write();
                    let mut view = SlottedPageMut::new(&mut page);
                    view.init();
                    if view.try_insert(entry)? == InsertOutcome::PageFull {
                        // An entry within MAX_ENTRY_SIZE always fits on an
                        // empty page; reaching this means the entry is
                        // oversized or the page image is corrupt.
                        let remaining = view.free_space();
                        drop(page);
                        bpm.unpin_page(overflow_id, false);
                        bpm.delete_page(overflow_id)?;
                        bpm.unpin_page(current_id, false);
                        return Err(PageError::DataTooLarge {
                            data_size: entry.encoded_len()?,
                            remaining_space: remaining,
                        }
                        .into());
                    }
                }
                {
                    let mut page = frame.write();
                    SlottedPageMut::new(&mut page).set_next_page(overflow_id);
                }
                bpm.unpin_page(current_id, true);
                bpm.unpin_page(overflow_id, true);
                info!(
                    "Bucket overflow: linked new page {} after page {}",
                    overflow_id, current_id
                );
                return Ok(());
            }
        }
    }
}

/// Deletes the entry from the bucket anchored at `primary_id`.
///
/// An overflow page left empty by the deletion is spliced out of the chain
/// and freed immediately; the primary page stays in place even when empty.
/// Raises `EntryNotFound` when the whole chain has been searched without a
/// hit, leaving every page unchanged.
pub fn delete_entry(
    bpm: &BufferPoolManager,
    primary_id: PageId,
    entry: &DataEntry,
) -> Result<(), IndexError> {
    let mut previous_id = INVALID_PAGE_ID;
    let mut current_id = primary_id;
    loop {
        let frame = bpm.fetch_page(current_id)?;
        let outcome = {
            let mut page = frame.write();
            SlottedPageMut::new(&mut page).try_delete(entry)?
        };

        match outcome {
            DeleteOutcome::Deleted => {
                let (remaining, next_id) = {
                    let page = frame.read();
                    let view = SlottedPage::new(&page);
                    (view.entry_count(), view.next_page())
                };

                if current_id != primary_id && remaining == 0 {
                    // Splice the emptied overflow page out of the chain. The
                    // predecessor is momentarily pinned alongside it.
                    let predecessor = match bpm.fetch_page(previous_id) {
                        Ok(frame) => frame,
                        Err(e) => {
                            bpm.unpin_page(current_id, true);
                            return Err(e.into());
                        }
                    };
                    {
                        let mut page = predecessor.write();
                        SlottedPageMut::new(&mut page).set_next_page(next_id);
                    }
                    bpm.unpin_page(previous_id, true);
                    bpm.unpin_page(current_id, true);
                    bpm.delete_page(current_id)?;
                    debug!(
                        "Freed emptied overflow page {} (chain now skips to {})",
                        current_id, next_id
                    );
                } else {
                    bpm.unpin_page(current_id, true);
                }
                return Ok(());
            }
            DeleteOutcome::NotFound => {
                let next_id = {
                    let page = frame.read();
                    SlottedPage::new(&page).next_page()
                };
                bpm.unpin_page(current_id, false);
                if next_id == INVALID_PAGE_ID {
                    return Err(IndexError::EntryNotFound);
                }
                previous_id = current_id;
                current_id = next_id;
            }
        }
    }
}
