use std::sync::Arc;

use tempfile::TempDir;

use magnetite::buffer::buffer_pool_manager::BufferPoolManager;
use magnetite::common::config::{PageId, DB_PAGE_SIZE};
use magnetite::common::logger::initialize_logger;
use magnetite::storage::disk::disk_manager::FileDiskManager;

struct TestContext {
    bpm: BufferPoolManager,
    db_path: std::path::PathBuf,
    _temp_dir: TempDir,
}

impl TestContext {
    fn new(name: &str, pool_size: usize) -> Self {
        initialize_logger();
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join(format!("{}.db", name));
        let disk = Arc::new(FileDiskManager::new(&db_path).unwrap());
        Self {
            bpm: BufferPoolManager::new(pool_size, disk),
            db_path,
            _temp_dir: temp_dir,
        }
    }
}

/// Allocates a page, stamps a recognizable pattern into it, and unpins dirty.
fn write_patterned_page(bpm: &BufferPoolManager, pattern: u8) -> PageId {
    let frame = bpm.new_page().unwrap();
    let page_id = {
        let mut page = frame.write();
        page.get_data_mut()[0] = pattern;
        page.get_data_mut()[DB_PAGE_SIZE - 1] = pattern;
        page.get_page_id()
    };
    bpm.unpin_page(page_id, true);
    page_id
}

#[test]
fn pages_survive_eviction_through_disk() {
    let ctx = TestContext::new("pages_survive_eviction", 3);
    let bpm = &ctx.bpm;

    // Ten pages through a three-frame pool forces constant turnover.
    let page_ids: Vec<PageId> = (0..10).map(|i| write_patterned_page(bpm, i as u8)).collect();

    for (i, &page_id) in page_ids.iter().enumerate() {
        let frame = bpm.fetch_page(page_id).unwrap();
        {
            let page = frame.read();
            assert_eq!(page.get_data()[0], i as u8);
            assert_eq!(page.get_data()[DB_PAGE_SIZE - 1], i as u8);
        }
        bpm.unpin_page(page_id, false);
    }
}

#[test]
fn pinned_pages_are_never_evicted() {
    let ctx = TestContext::new("pinned_pages_never_evicted", 2);
    let bpm = &ctx.bpm;

    let pinned = bpm.new_page().unwrap();
    let pinned_id = pinned.read().get_page_id();

    // Turn the other frame over repeatedly; the pinned page must stay put.
    for i in 0..5 {
        let page_id = write_patterned_page(bpm, 100 + i as u8);
        let frame = bpm.fetch_page(page_id).unwrap();
        bpm.unpin_page(page_id, false);
        drop(frame);
    }

    assert_eq!(pinned.read().get_page_id(), pinned_id);
    bpm.unpin_page(pinned_id, false);
}

#[test]
fn flushed_pages_are_durable_across_reopen() {
    let ctx = TestContext::new("flush_durability", 4);
    let page_id = write_patterned_page(&ctx.bpm, 0xEE);
    ctx.bpm.flush_all_pages().unwrap();

    // A second buffer pool over the same file sees the flushed bytes.
    let disk = Arc::new(FileDiskManager::new(&ctx.db_path).unwrap());
    let reopened = BufferPoolManager::new(4, disk);
    let frame = reopened.fetch_page(page_id).unwrap();
    assert_eq!(frame.read().get_data()[0], 0xEE);
    reopened.unpin_page(page_id, false);
}
