use std::fmt;
use std::sync::Arc;

use log::{debug, info};

use crate::buffer::buffer_pool_manager::BufferPoolManager;
use crate::catalog::file_catalog::FileCatalog;
use crate::common::config::{PageId, HASH_INDEX_DEPTH, INVALID_PAGE_ID, MAX_ENTRY_SIZE};
use crate::common::exception::IndexError;
use crate::common::rid::RID;
use crate::storage::index::hash_bucket_chain;
use crate::storage::index::hash_scan::HashScan;
use crate::storage::index::search_key::{DataEntry, SearchKey};
use crate::storage::page::hash_directory_page::{
    HashDirectoryPage, HashDirectoryPageMut, HASH_DIR_CAPACITY,
};
use crate::storage::page::slotted_page::{SlottedPage, SlottedPageMut};

/// An unclustered static-hashing index over a page-structured record store.
///
/// The index owns a directory of `2^HASH_INDEX_DEPTH` bucket slots, created
/// in full when the index is created and fixed for its lifetime. Each slot
/// anchors a chain of slotted bucket pages holding `(key, rid)` entries whose
/// key hashes to that slot.
///
/// A named index registers its directory root in the file catalog and can be
/// reopened by name. An anonymous index (no name) has no catalog entry; its
/// owner must call `delete_file` before discarding the handle, or its pages
/// stay allocated forever.
pub struct StaticHashIndex {
    name: Option<String>,
    head_id: PageId,
    bpm: Arc<BufferPoolManager>,
    catalog: Arc<FileCatalog>,
}

impl StaticHashIndex {
    /// Opens the index registered under `name`, or creates it (registering
    /// the new directory root) when the name is unknown. `None` creates an
    /// anonymous index.
    pub fn open(
        bpm: Arc<BufferPoolManager>,
        catalog: Arc<FileCatalog>,
        name: Option<&str>,
    ) -> Result<Self, IndexError> {
        if let Some(name) = name {
            if let Some(head_id) = catalog.lookup(name) {
                debug!("Opened hash index {} with directory root {}", name, head_id);
                return Ok(Self {
                    name: Some(name.to_owned()),
                    head_id,
                    bpm,
                    catalog,
                });
            }
        }

        // Build a directory chain with one slot per bucket, every slot
        // initially unallocated.
        let mut remaining = 1usize << HASH_INDEX_DEPTH;
        let mut head_id = INVALID_PAGE_ID;
        let mut previous_id = INVALID_PAGE_ID;
        while remaining > 0 {
            let frame = bpm.new_page()?;
            let page_id = frame.read().get_page_id();
            let slots = remaining.min(HASH_DIR_CAPACITY);
            {
                let mut page = frame.write();
                HashDirectoryPageMut::new(&mut page).init(slots);
            }
            bpm.unpin_page(page_id, true);

            if head_id == INVALID_PAGE_ID {
                head_id = page_id;
            } else {
                let predecessor = bpm.fetch_page(previous_id)?;
                {
                    let mut page = predecessor.write();
                    HashDirectoryPageMut::new(&mut page).set_next_page(page_id);
                }
                bpm.unpin_page(previous_id, true);
            }
            previous_id = page_id;
            remaining -= slots;
        }

        if let Some(name) = name {
            catalog.register(name, head_id);
            info!("Created hash index {} with directory root {}", name, head_id);
        } else {
            info!("Created temporary hash index with directory root {}", head_id);
        }
        Ok(Self {
            name: name.map(str::to_owned),
            head_id,
            bpm,
            catalog,
        })
    }

    /// Name of the index file, if it has one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Page id of the first directory page.
    pub fn head_page_id(&self) -> PageId {
        self.head_id
    }

    /// Inserts a new data entry into the index file.
    ///
    /// Fails with `EntryTooLarge` (before touching any page) when the encoded
    /// entry exceeds `MAX_ENTRY_SIZE`.
    pub fn insert_entry(&self, key: &SearchKey, rid: RID) -> Result<(), IndexError> {
        let entry = DataEntry::new(key.clone(), rid);
        let size = entry.encoded_len()?;
        if size > MAX_ENTRY_SIZE {
            return Err(IndexError::EntryTooLarge {
                size,
                max: MAX_ENTRY_SIZE,
            });
        }

        let hash = key.get_hash(HASH_INDEX_DEPTH);
        let (dir_id, slot) = locate_dir_slot(&self.bpm, self.head_id, hash)?;

        let dir_frame = self.bpm.fetch_page(dir_id)?;
        let head = {
            let page = dir_frame.read();
            HashDirectoryPage::new(&page).bucket_page_id(slot)
        };
        let head = match head {
            Ok(head) => head,
            Err(e) => {
                self.bpm.unpin_page(dir_id, false);
                return Err(e.into());
            }
        };

        let head = if head == INVALID_PAGE_ID {
            // First entry for this bucket: allocate its primary page and
            // anchor it in the directory.
            self.bpm.unpin_page(dir_id, false);
            let bucket = self.bpm.new_page()?;
            let bucket_id = bucket.read().get_page_id();
            {
                let mut page = bucket.write();
                SlottedPageMut::new(&mut page).init();
            }
            self.bpm.unpin_page(bucket_id, true);

            let dir_frame = self.bpm.fetch_page(dir_id)?;
            let wrote = {
                let mut page = dir_frame.write();
                HashDirectoryPageMut::new(&mut page).set_bucket_page_id(slot, bucket_id)
            };
            self.bpm.unpin_page(dir_id, wrote.is_ok());
            wrote?;
            debug!("Allocated primary page {} for bucket {}", bucket_id, hash);
            bucket_id
        } else {
            self.bpm.unpin_page(dir_id, false);
            head
        };

        hash_bucket_chain::insert_entry(&self.bpm, head, &entry)
    }

    /// Deletes the specified data entry from the index file.
    ///
    /// Fails with `EntryNotFound` when the `(key, rid)` pair is absent from
    /// the resolved bucket's entire chain (including the case where the
    /// bucket was never populated). The directory slot is never cleared,
    /// even when the deletion leaves the bucket empty.
    pub fn delete_entry(&self, key: &SearchKey, rid: RID) -> Result<(), IndexError> {
        let entry = DataEntry::new(key.clone(), rid);
        let hash = key.get_hash(HASH_INDEX_DEPTH);
        let (dir_id, slot) = locate_dir_slot(&self.bpm, self.head_id, hash)?;

        let dir_frame = self.bpm.fetch_page(dir_id)?;
        let head = {
            let page = dir_frame.read();
            HashDirectoryPage::new(&page).bucket_page_id(slot)
        };
        self.bpm.unpin_page(dir_id, false);
        let head = head?;

        if head == INVALID_PAGE_ID {
            return Err(IndexError::EntryNotFound);
        }
        hash_bucket_chain::delete_entry(&self.bpm, head, &entry)
    }

    /// Deletes the index file from the database, freeing all of its pages:
    /// every bucket chain, then every directory page, then the catalog entry
    /// if the index is named. The handle is consumed; an anonymous index
    /// must be torn down this way before it goes out of scope.
    pub fn delete_file(self) -> Result<(), IndexError> {
        let mut dir_id = self.head_id;
        while dir_id != INVALID_PAGE_ID {
            let dir_frame = self.bpm.fetch_page(dir_id)?;
            let (slots, next_dir) = {
                let page = dir_frame.read();
                let view = HashDirectoryPage::new(&page);
                (view.entry_count(), view.next_page())
            };

            for slot in 0..slots {
                let head = {
                    let page = dir_frame.read();
                    HashDirectoryPage::new(&page).bucket_page_id(slot)
                };
                let head = match head {
                    Ok(head) => head,
                    Err(e) => {
                        self.bpm.unpin_page(dir_id, false);
                        return Err(e.into());
                    }
                };
                let mut data_id = head;
                while data_id != INVALID_PAGE_ID {
                    let frame = self.bpm.fetch_page(data_id)?;
                    let next_id = {
                        let page = frame.read();
                        SlottedPage::new(&page).next_page()
                    };
                    self.bpm.unpin_page(data_id, false);
                    self.bpm.delete_page(data_id)?;
                    data_id = next_id;
                }
            }

            self.bpm.unpin_page(dir_id, false);
            self.bpm.delete_page(dir_id)?;
            dir_id = next_dir;
        }

        if let Some(name) = &self.name {
            self.catalog.unregister(name);
            info!("Deleted hash index {}", name);
        } else {
            info!("Deleted temporary hash index");
        }
        Ok(())
    }

    /// Initiates an equality scan of the index file.
    pub fn open_scan(&self, key: &SearchKey) -> Result<HashScan, IndexError> {
        HashScan::open(Arc::clone(&self.bpm), self.head_id, key.clone())
    }

    /// Renders a high-level view of the directory: which buckets are
    /// allocated and how many entries each one stores. Sample output:
    ///
    /// ```text
    /// IX_Customers
    /// ------------
    /// 0000000 : 35
    /// 0000001 : null
    /// ...
    /// 1111111 : 42
    /// ------------
    /// Total : 1500
    /// ```
    pub fn summary(&self) -> Result<String, IndexError> {
        let name = self.name.as_deref().unwrap_or("temp file");
        let rule = "-".repeat(name.len());
        let width = HASH_INDEX_DEPTH as usize;

        let mut out = String::new();
        out.push_str(name);
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');

        let mut total = 0usize;
        let mut global_slot = 0usize;
        let mut dir_id = self.head_id;
        while dir_id != INVALID_PAGE_ID {
            let dir_frame = self.bpm.fetch_page(dir_id)?;
            let (slots, next_dir) = {
                let page = dir_frame.read();
                let view = HashDirectoryPage::new(&page);
                (view.entry_count(), view.next_page())
            };

            for slot in 0..slots {
                let head = {
                    let page = dir_frame.read();
                    HashDirectoryPage::new(&page).bucket_page_id(slot)
                };
                let head = match head {
                    Ok(head) => head,
                    Err(e) => {
                        self.bpm.unpin_page(dir_id, false);
                        return Err(e.into());
                    }
                };

                out.push_str(&format!("{:0width$b} : ", global_slot, width = width));
                if head != INVALID_PAGE_ID {
                    let count = match hash_bucket_chain::count_entries(&self.bpm, head) {
                        Ok(count) => count,
                        Err(e) => {
                            self.bpm.unpin_page(dir_id, false);
                            return Err(e);
                        }
                    };
                    out.push_str(&count.to_string());
                    total += count;
                } else {
                    out.push_str("null");
                }
                out.push('\n');
                global_slot += 1;
            }

            self.bpm.unpin_page(dir_id, false);
            dir_id = next_dir;
        }

        out.push_str(&rule);
        out.push('\n');
        out.push_str(&format!("Total : {}", total));
        Ok(out)
    }

    /// Prints the directory summary to standard output.
    pub fn print_summary(&self) -> Result<(), IndexError> {
        println!("{}", self.summary()?);
        Ok(())
    }
}

impl fmt::Display for StaticHashIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name.as_deref().unwrap_or("temp file"))
    }
}

/// Resolves a hash value to the directory page owning its slot, hopping
/// through the directory chain and subtracting each page's slot capacity
/// until the local slot index falls within one page.
///
/// Insert, delete, and scan-open all resolve slots through here, so a key
/// always reaches the same bucket.
pub(crate) fn locate_dir_slot(
    bpm: &BufferPoolManager,
    head_id: PageId,
    hash: u32,
) -> Result<(PageId, usize), IndexError> {
    let mut slot = hash as usize;
    let mut dir_id = head_id;
    while slot >= HASH_DIR_CAPACITY {
        let frame = bpm.fetch_page(dir_id)?;
        let next_id = {
            let page = frame.read();
            HashDirectoryPage::new(&page).next_page()
        };
        bpm.unpin_page(dir_id, false);
        // A well-formed directory covers every hash value; fetching the
        // invalid id surfaces the corruption as a buffer error.
        dir_id = next_id;
        slot -= HASH_DIR_CAPACITY;
    }
    Ok((dir_id, slot))
}
