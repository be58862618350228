use std::sync::Arc;

use tempfile::TempDir;

use magnetite::buffer::buffer_pool_manager::BufferPoolManager;
use magnetite::catalog::file_catalog::FileCatalog;
use magnetite::common::config::BUFFER_POOL_SIZE;
use magnetite::common::logger::initialize_logger;
use magnetite::storage::disk::disk_manager::{DiskManagerMemory, FileDiskManager};

/// Shared fixture for integration tests: a buffer pool over a private disk
/// manager plus a fresh file catalog.
pub struct TestContext {
    pub bpm: Arc<BufferPoolManager>,
    pub catalog: Arc<FileCatalog>,
    _temp_dir: Option<TempDir>,
}

impl TestContext {
    /// Context backed by a real database file in a temporary directory.
    pub fn on_disk(name: &str) -> Self {
        initialize_logger();
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join(format!("{}.db", name));
        let disk = Arc::new(FileDiskManager::new(&db_path).unwrap());
        Self {
            bpm: Arc::new(BufferPoolManager::new(BUFFER_POOL_SIZE, disk)),
            catalog: Arc::new(FileCatalog::new()),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Context backed by an in-memory disk manager.
    pub fn in_memory() -> Self {
        initialize_logger();
        let disk = Arc::new(DiskManagerMemory::new());
        Self {
            bpm: Arc::new(BufferPoolManager::new(BUFFER_POOL_SIZE, disk)),
            catalog: Arc::new(FileCatalog::new()),
            _temp_dir: None,
        }
    }
}
