use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Result as IoResult;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, error, info, trace, warn};
use parking_lot::{Mutex, RwLock};

use crate::common::config::{PageId, DB_PAGE_SIZE};

/// Synchronous page-granularity disk I/O.
///
/// Every call either completes or returns an I/O error; there is no retry
/// logic at this layer.
pub trait DiskIO: Send + Sync {
    fn write_page(&self, page_id: PageId, page_data: &[u8; DB_PAGE_SIZE]) -> IoResult<()>;
    fn read_page(&self, page_id: PageId, page_data: &mut [u8; DB_PAGE_SIZE]) -> IoResult<()>;
}

/// Disk manager backed by a single database file. Page `n` lives at byte
/// offset `n * DB_PAGE_SIZE`.
pub struct FileDiskManager {
    file_name: String,
    db_io: Mutex<File>,
    num_writes: AtomicU64,
    num_reads: AtomicU64,
}

impl FileDiskManager {
    pub fn new(db_file: impl AsRef<Path>) -> IoResult<Self> {
        let path = db_file.as_ref();
        let db_io = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        info!("Opened database file {}", path.display());

        Ok(Self {
            file_name: path.to_string_lossy().into_owned(),
            db_io: Mutex::new(db_io),
            num_writes: AtomicU64::new(0),
            num_reads: AtomicU64::new(0),
        })
    }

    /// Flushes the database file to durable storage.
    pub fn shut_down(&self) {
        if let Err(e) = self.db_io.lock().sync_all() {
            warn!("Failed to sync {} during shutdown: {}", self.file_name, e);
        }
        info!("Shutdown complete for {}", self.file_name);
    }

    pub fn get_file_name(&self) -> &str {
        &self.file_name
    }

    pub fn get_num_writes(&self) -> u64 {
        self.num_writes.load(Ordering::Relaxed)
    }

    pub fn get_num_reads(&self) -> u64 {
        self.num_reads.load(Ordering::Relaxed)
    }
}

impl DiskIO for FileDiskManager {
    fn write_page(&self, page_id: PageId, page_data: &[u8; DB_PAGE_SIZE]) -> IoResult<()> {
        let offset = page_id * DB_PAGE_SIZE as u64;
        trace!("Writing page {} at offset {}", page_id, offset);

        let mut db_io = self.db_io.lock();
        db_io.seek(SeekFrom::Start(offset))?;
        if let Err(e) = db_io.write_all(page_data) {
            error!("Failed to write data for page {}: {}", page_id, e);
            return Err(e);
        }

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        debug!("Successfully wrote data for page {}", page_id);
        Ok(())
    }

    fn read_page(&self, page_id: PageId, page_data: &mut [u8; DB_PAGE_SIZE]) -> IoResult<()> {
        let offset = page_id * DB_PAGE_SIZE as u64;
        trace!("Reading page {} at offset {}", page_id, offset);

        let mut db_io = self.db_io.lock();
        db_io.seek(SeekFrom::Start(offset))?;
        match db_io.read_exact(page_data) {
            Ok(()) => {
                self.num_reads.fetch_add(1, Ordering::Relaxed);
                debug!("Successfully read data for page {}", page_id);
                Ok(())
            }
            Err(ref e) if e.kind() == ErrorKind::UnexpectedEof => {
                // A page past the end of the file has never been written.
                page_data.fill(0);
                warn!("Page {} read past EOF, filling with zeroes", page_id);
                Ok(())
            }
            Err(e) => {
                error!("Unexpected error reading page {}: {}", page_id, e);
                Err(e)
            }
        }
    }
}

/// DiskManagerMemory replicates the utility of a disk manager on memory.
/// It is primarily used for data structure testing.
pub struct DiskManagerMemory {
    pages: RwLock<HashMap<PageId, Box<[u8; DB_PAGE_SIZE]>>>,
}

impl DiskManagerMemory {
    pub fn new() -> Self {
        Self {
            pages: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for DiskManagerMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskIO for DiskManagerMemory {
    fn write_page(&self, page_id: PageId, page_data: &[u8; DB_PAGE_SIZE]) -> IoResult<()> {
        let mut pages = self.pages.write();
        let slot = pages
            .entry(page_id)
            .or_insert_with(|| Box::new([0; DB_PAGE_SIZE]));
        slot.copy_from_slice(page_data);
        Ok(())
    }

    fn read_page(&self, page_id: PageId, page_data: &mut [u8; DB_PAGE_SIZE]) -> IoResult<()> {
        let pages = self.pages.read();
        match pages.get(&page_id) {
            Some(stored) => page_data.copy_from_slice(&stored[..]),
            // Parity with the file manager: an unwritten page reads as zeroes.
            None => page_data.fill(0),
        }
        Ok(())
    }
}
