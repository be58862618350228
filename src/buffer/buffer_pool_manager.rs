use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};

use crate::buffer::lru_k_replacer::LruKReplacer;
use crate::common::config::{FrameId, PageId, INVALID_PAGE_ID, LRUK_REPLACER_K};
use crate::common::exception::BufferError;
use crate::storage::disk::disk_manager::DiskIO;
use crate::storage::page::page::Page;

/// The `BufferPoolManager` mediates all page access: it keeps a fixed pool of
/// in-memory frames, pins pages into them on demand, writes dirty frames back
/// on eviction, and hands out page ids for newly allocated pages.
///
/// Pinning discipline: `fetch_page`/`new_page` pin, `unpin_page` releases the
/// pin and records whether the caller changed the page's on-disk image. Only
/// unpinned frames are eviction candidates.
pub struct BufferPoolManager {
    pool_size: usize,
    frames: Vec<Arc<RwLock<Page>>>,
    page_table: Mutex<HashMap<PageId, FrameId>>,
    free_list: Mutex<Vec<FrameId>>,
    replacer: LruKReplacer,
    disk: Arc<dyn DiskIO>,
    next_page_id: AtomicU64,
    /// Page ids returned by `delete_page`, reused before minting fresh ids.
    reusable_page_ids: Mutex<Vec<PageId>>,
}

impl BufferPoolManager {
    pub fn new(pool_size: usize, disk: Arc<dyn DiskIO>) -> Self {
        let frames = (0..pool_size)
            .map(|_| Arc::new(RwLock::new(Page::new(INVALID_PAGE_ID))))
            .collect();
        let free_list: Vec<FrameId> = (0..pool_size).rev().collect();
        info!("BufferPoolManager initialized with pool size: {}", pool_size);
        Self {
            pool_size,
            frames,
            page_table: Mutex::new(HashMap::with_capacity(pool_size)),
            free_list: Mutex::new(free_list),
            replacer: LruKReplacer::new(pool_size, LRUK_REPLACER_K),
            disk,
            next_page_id: AtomicU64::new(0),
            reusable_page_ids: Mutex::new(Vec::new()),
        }
    }

    pub fn get_pool_size(&self) -> usize {
        self.pool_size
    }

    /// Pins the page with the given id, reading it from disk if it is not
    /// resident, and returns its frame.
    pub fn fetch_page(&self, page_id: PageId) -> Result<Arc<RwLock<Page>>, BufferError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferError::PageNotFound(page_id));
        }

        let mut page_table = self.page_table.lock();

        if let Some(&frame_id) = page_table.get(&page_id) {
            let frame = Arc::clone(&self.frames[frame_id]);
            frame.write().increment_pin_count();
            self.replacer.record_access(frame_id);
            self.replacer.set_evictable(frame_id, false);
            return Ok(frame);
        }

        debug!("Page {} not resident, loading from disk", page_id);
        let frame_id = self.acquire_frame(&mut page_table)?;
        let frame = Arc::clone(&self.frames[frame_id]);
        {
            let mut page = frame.write();
            page.reset(page_id);
            if let Err(e) = self.disk.read_page(page_id, page.get_data_mut()) {
                drop(page);
                self.free_list.lock().push(frame_id);
                return Err(e.into());
            }
        }
        page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);
        Ok(frame)
    }

    /// Releases one pin on the page. `is_dirty` reports whether this caller
    /// changed the page's on-disk image; the flag is ORed into the frame so a
    /// clean unpin never hides an earlier dirtying one.
    ///
    /// Returns `false` if the page is not resident or was not pinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let page_table = self.page_table.lock();
        let Some(&frame_id) = page_table.get(&page_id) else {
            warn!("Unpin of non-resident page {}", page_id);
            return false;
        };

        let mut page = self.frames[frame_id].write();
        if page.get_pin_count() == 0 {
            warn!("Unpin of unpinned page {}", page_id);
            return false;
        }
        if is_dirty {
            page.set_dirty(true);
        }
        page.decrement_pin_count();
        if page.get_pin_count() == 0 {
            self.replacer.set_evictable(frame_id, true);
        }
        true
    }

    /// Allocates a brand-new page, pinned once, with zeroed contents.
    pub fn new_page(&self) -> Result<Arc<RwLock<Page>>, BufferError> {
        let mut page_table = self.page_table.lock();
        let frame_id = self.acquire_frame(&mut page_table)?;

        let page_id = self.allocate_page_id();
        let frame = Arc::clone(&self.frames[frame_id]);
        frame.write().reset(page_id);
        page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);
        debug!("Allocated page {} in frame {}", page_id, frame_id);
        Ok(frame)
    }

    /// Frees the page: drops its frame (if resident and unpinned) and makes
    /// its id available for reallocation. The on-disk contents are left
    /// behind as garbage.
    pub fn delete_page(&self, page_id: PageId) -> Result<(), BufferError> {
        let mut page_table = self.page_table.lock();
        if let Some(&frame_id) = page_table.get(&page_id) {
            {
                let page = self.frames[frame_id].read();
                if page.get_pin_count() > 0 {
                    return Err(BufferError::PagePinned(page_id));
                }
            }
            page_table.remove(&page_id);
            self.replacer.remove(frame_id);
            self.free_list.lock().push(frame_id);
        }
        self.reusable_page_ids.lock().push(page_id);
        debug!("Deleted page {}", page_id);
        Ok(())
    }

    /// Writes the page through to disk and marks the frame clean.
    pub fn flush_page(&self, page_id: PageId) -> Result<(), BufferError> {
        let page_table = self.page_table.lock();
        let Some(&frame_id) = page_table.get(&page_id) else {
            return Err(BufferError::PageNotFound(page_id));
        };
        let mut page = self.frames[frame_id].write();
        self.disk.write_page(page_id, page.get_data())?;
        page.set_dirty(false);
        Ok(())
    }

    /// Writes every resident dirty page through to disk.
    pub fn flush_all_pages(&self) -> Result<(), BufferError> {
        let page_table = self.page_table.lock();
        for (&page_id, &frame_id) in page_table.iter() {
            let mut page = self.frames[frame_id].write();
            if page.is_dirty() {
                self.disk.write_page(page_id, page.get_data())?;
                page.set_dirty(false);
            }
        }
        Ok(())
    }

    /// Obtains a frame from the free list, or evicts an unpinned victim
    /// (writing it back first if dirty).
    fn acquire_frame(
        &self,
        page_table: &mut HashMap<PageId, FrameId>,
    ) -> Result<FrameId, BufferError> {
        if let Some(frame_id) = self.free_list.lock().pop() {
            return Ok(frame_id);
        }

        let frame_id = self.replacer.evict().ok_or(BufferError::NoFreeFrame)?;
        let victim = page_table
            .iter()
            .find_map(|(&pid, &fid)| (fid == frame_id).then_some(pid));
        if let Some(victim_id) = victim {
            let page = self.frames[frame_id].read();
            if page.is_dirty() {
                self.disk.write_page(victim_id, page.get_data())?;
            }
            drop(page);
            page_table.remove(&victim_id);
            debug!("Evicted page {} from frame {}", victim_id, frame_id);
        }
        Ok(frame_id)
    }

    fn allocate_page_id(&self) -> PageId {
        if let Some(reused) = self.reusable_page_ids.lock().pop() {
            return reused;
        }
        self.next_page_id.fetch_add(1, Ordering::SeqCst)
    }
}
