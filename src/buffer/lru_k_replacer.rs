use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::common::config::FrameId;

/// Book-keeping for one frame tracked by the replacer.
#[derive(Clone, Debug)]
struct FrameRecord {
    /// Logical timestamps of the most recent accesses, oldest first.
    history: Vec<u64>,
    /// Whether the frame is eligible for eviction.
    is_evictable: bool,
}

/// An LRU-K page replacement policy.
///
/// Evicts the evictable frame whose K-th most recent access is furthest in
/// the past; frames with fewer than K recorded accesses are preferred
/// victims, ordered by their earliest access.
pub struct LruKReplacer {
    frames: Mutex<HashMap<FrameId, FrameRecord>>,
    replacer_size: usize,
    k: usize,
    /// Logical clock; advanced on every recorded access. Starts at 1 so the
    /// below-k sentinel (`u64::MIN`) sorts strictly before any real access.
    clock: AtomicU64,
}

impl LruKReplacer {
    pub fn new(replacer_size: usize, k: usize) -> Self {
        info!(
            "Initializing LruKReplacer with size {} and k {}",
            replacer_size, k
        );
        Self {
            frames: Mutex::new(HashMap::with_capacity(replacer_size)),
            replacer_size,
            k,
            clock: AtomicU64::new(1),
        }
    }

    /// Selects and removes a victim frame, or returns `None` when every
    /// tracked frame is pinned (non-evictable).
    pub fn evict(&self) -> Option<FrameId> {
        let mut frames = self.frames.lock();
        let mut victim: Option<FrameId> = None;
        let mut victim_k_distance = u64::MAX;
        let mut victim_earliest = u64::MAX;

        for (&fid, record) in frames.iter() {
            if !record.is_evictable {
                continue;
            }

            // Frames with fewer than k accesses are favored for eviction.
            let k_distance = if record.history.len() < self.k {
                u64::MIN
            } else {
                record.history[record.history.len() - self.k]
            };
            let earliest = record.history.first().copied().unwrap_or(0);

            if victim.is_none()
                || k_distance < victim_k_distance
                || (k_distance == victim_k_distance && earliest < victim_earliest)
            {
                victim = Some(fid);
                victim_k_distance = k_distance;
                victim_earliest = earliest;
            }
        }

        match victim {
            Some(fid) => {
                frames.remove(&fid);
                debug!("Evicting frame {}", fid);
                Some(fid)
            }
            None => {
                warn!("No evictable frame available");
                None
            }
        }
    }

    /// Records an access to a frame, creating its record on first sight.
    pub fn record_access(&self, frame_id: FrameId) {
        let now = self.clock.fetch_add(1, Ordering::Relaxed);
        let mut frames = self.frames.lock();

        let record = frames.entry(frame_id).or_insert_with(|| FrameRecord {
            history: Vec::with_capacity(self.k),
            is_evictable: false,
        });
        record.history.push(now);
        if record.history.len() > self.k {
            record.history.remove(0);
        }
    }

    /// Sets whether a frame is eligible for eviction.
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        let mut frames = self.frames.lock();
        if let Some(record) = frames.get_mut(&frame_id) {
            record.is_evictable = evictable;
        } else {
            frames.insert(
                frame_id,
                FrameRecord {
                    history: Vec::with_capacity(self.k),
                    is_evictable: evictable,
                },
            );
        }
    }

    /// Drops a frame's record entirely (used when its page is deleted).
    pub fn remove(&self, frame_id: FrameId) {
        let mut frames = self.frames.lock();
        if let Some(record) = frames.get(&frame_id) {
            if record.is_evictable {
                frames.remove(&frame_id);
            } else {
                warn!("Attempt to remove a non-evictable frame {}", frame_id);
            }
        }
    }

    /// Returns the number of frames currently eligible for eviction.
    pub fn evictable_count(&self) -> usize {
        self.frames
            .lock()
            .values()
            .filter(|record| record.is_evictable)
            .count()
    }

    pub fn get_replacer_size(&self) -> usize {
        self.replacer_size
    }
}
