use std::collections::HashMap;

use log::{info, warn};
use parking_lot::RwLock;

use crate::common::config::PageId;

/// Registry of named storage files: maps a file name to the page id of the
/// file's root page (for a hash index, its first directory page).
///
/// Anonymous files never appear here; their owners hold the root id directly.
pub struct FileCatalog {
    entries: RwLock<HashMap<String, PageId>>,
}

impl FileCatalog {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the root page id registered under `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<PageId> {
        self.entries.read().get(name).copied()
    }

    /// Registers `name` -> `root_id`, replacing any stale entry.
    pub fn register(&self, name: &str, root_id: PageId) {
        let previous = self.entries.write().insert(name.to_owned(), root_id);
        match previous {
            Some(old) => warn!(
                "Replaced catalog entry for {}: {} -> {}",
                name, old, root_id
            ),
            None => info!("Registered catalog entry {} -> {}", name, root_id),
        }
    }

    /// Removes the entry for `name`, returning the root id it mapped to.
    pub fn unregister(&self, name: &str) -> Option<PageId> {
        let removed = self.entries.write().remove(name);
        if removed.is_some() {
            info!("Unregistered catalog entry {}", name);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for FileCatalog {
    fn default() -> Self {
        Self::new()
    }
}
