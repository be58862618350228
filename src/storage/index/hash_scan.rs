use std::sync::Arc;

use log::warn;
use parking_lot::RwLock;

use crate::buffer::buffer_pool_manager::BufferPoolManager;
use crate::common::config::{PageId, HASH_INDEX_DEPTH, INVALID_PAGE_ID};
use crate::common::exception::IndexError;
use crate::common::rid::RID;
use crate::storage::index::search_key::SearchKey;
use crate::storage::index::static_hash_index::locate_dir_slot;
use crate::storage::page::hash_directory_page::HashDirectoryPage;
use crate::storage::page::page::Page;
use crate::storage::page::slotted_page::SlottedPage;

/// A forward-only equality scan over one hash bucket: yields the RIDs of
/// every entry whose key equals the probe key, walking the bucket's page
/// chain front to back.
///
/// The scan keeps its current chain page pinned across `get_next` calls —
/// the one pin in this engine that outlives a single operation — and
/// releases it when the chain is exhausted, on `close`, or on drop.
pub struct HashScan {
    bpm: Arc<BufferPoolManager>,
    key: SearchKey,
    current_page_id: PageId,
    current_frame: Option<Arc<RwLock<Page>>>,
    /// Slot to resume searching from within the current page.
    current_slot: u16,
}

impl HashScan {
    /// Constructs an equality scan positioned on the bucket's primary page.
    /// A bucket that was never populated produces an already-exhausted scan.
    pub(crate) fn open(
        bpm: Arc<BufferPoolManager>,
        head_id: PageId,
        key: SearchKey,
    ) -> Result<Self, IndexError> {
        let hash = key.get_hash(HASH_INDEX_DEPTH);
        let (dir_id, slot) = locate_dir_slot(&bpm, head_id, hash)?;

        let dir_frame = bpm.fetch_page(dir_id)?;
        let head = {
            let page = dir_frame.read();
            HashDirectoryPage::new(&page).bucket_page_id(slot)
        };
        bpm.unpin_page(dir_id, false);
        let head = head?;

        let current_frame = if head != INVALID_PAGE_ID {
            Some(bpm.fetch_page(head)?)
        } else {
            None
        };
        Ok(Self {
            bpm,
            key,
            current_page_id: if current_frame.is_some() {
                head
            } else {
                INVALID_PAGE_ID
            },
            current_frame,
            current_slot: 0,
        })
    }

    /// Yields the next matching entry's RID, or `None` once the bucket chain
    /// is exhausted. Exhaustion closes the scan; further calls keep
    /// returning `None`.
    pub fn get_next(&mut self) -> Result<Option<RID>, IndexError> {
        loop {
            let frame = match &self.current_frame {
                Some(frame) => Arc::clone(frame),
                None => return Ok(None),
            };

            let (hit, next_id) = {
                let page = frame.read();
                let view = SlottedPage::new(&page);
                match view.next_match(&self.key, self.current_slot)? {
                    Some(slot) => (Some((slot, view.entry_at(slot)?.rid)), INVALID_PAGE_ID),
                    None => (None, view.next_page()),
                }
            };

            match hit {
                Some((slot, rid)) => {
                    self.current_slot = slot + 1;
                    return Ok(Some(rid));
                }
                None => {
                    // No further match here: release this page before (or
                    // exactly as) the next one is acquired.
                    self.bpm.unpin_page(self.current_page_id, false);
                    self.current_frame = None;
                    self.current_page_id = INVALID_PAGE_ID;

                    if next_id == INVALID_PAGE_ID {
                        return Ok(None);
                    }
                    let next_frame = self.bpm.fetch_page(next_id)?;
                    self.current_frame = Some(next_frame);
                    self.current_page_id = next_id;
                    self.current_slot = 0;
                }
            }
        }
    }

    /// Closes the scan, releasing the pinned page. Idempotent.
    pub fn close(&mut self) {
        if self.current_frame.take().is_some() {
            if !self.bpm.unpin_page(self.current_page_id, false) {
                warn!(
                    "Scan close could not unpin page {}",
                    self.current_page_id
                );
            }
            self.current_page_id = INVALID_PAGE_ID;
        }
    }
}

impl Drop for HashScan {
    fn drop(&mut self) {
        self.close();
    }
}
