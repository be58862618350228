use std::collections::HashSet;
use std::sync::Arc;

use magnetite::common::rid::RID;
use magnetite::storage::index::search_key::SearchKey;
use magnetite::storage::index::static_hash_index::StaticHashIndex;

use crate::common::setup::TestContext;

fn open_anonymous(ctx: &TestContext) -> StaticHashIndex {
    StaticHashIndex::open(Arc::clone(&ctx.bpm), Arc::clone(&ctx.catalog), None).unwrap()
}

/// Key sized so a bucket page holds exactly three encoded entries.
fn wide_key() -> SearchKey {
    SearchKey::from("z".repeat(996))
}

#[test]
fn scan_of_an_unallocated_bucket_is_immediately_exhausted() {
    let ctx = TestContext::in_memory();
    let index = open_anonymous(&ctx);

    let mut scan = index.open_scan(&SearchKey::from("nothing here")).unwrap();
    assert_eq!(scan.get_next().unwrap(), None);
    // Exhaustion is sticky.
    assert_eq!(scan.get_next().unwrap(), None);
    scan.close();

    index.delete_file().unwrap();
}

#[test]
fn scan_crosses_overflow_page_boundaries() {
    let ctx = TestContext::in_memory();
    let index = open_anonymous(&ctx);

    // Five entries: three on the primary page, two on an overflow page.
    let key = wide_key();
    let rids: Vec<RID> = (0..5).map(|i| RID::new(6, i)).collect();
    for &rid in &rids {
        index.insert_entry(&key, rid).unwrap();
    }

    let mut scan = index.open_scan(&key).unwrap();
    let mut found = HashSet::new();
    while let Some(rid) = scan.get_next().unwrap() {
        found.insert(rid);
    }
    assert_eq!(found, rids.iter().copied().collect::<HashSet<_>>());
    assert_eq!(scan.get_next().unwrap(), None);
    drop(scan);

    index.delete_file().unwrap();
}

#[test]
fn scan_skips_entries_with_other_keys_in_the_same_bucket() {
    let ctx = TestContext::in_memory();
    let index = open_anonymous(&ctx);

    // Two distinct keys; whether or not they share a bucket, each scan must
    // yield only its own rids.
    let key_a = SearchKey::from("alpha");
    let key_b = SearchKey::from("beta");
    index.insert_entry(&key_a, RID::new(1, 1)).unwrap();
    index.insert_entry(&key_b, RID::new(2, 2)).unwrap();
    index.insert_entry(&key_a, RID::new(1, 3)).unwrap();

    let mut scan = index.open_scan(&key_a).unwrap();
    let mut found = HashSet::new();
    while let Some(rid) = scan.get_next().unwrap() {
        found.insert(rid);
    }
    scan.close();
    assert_eq!(found, HashSet::from([RID::new(1, 1), RID::new(1, 3)]));

    index.delete_file().unwrap();
}

#[test]
fn close_releases_the_pin_and_is_idempotent() {
    let ctx = TestContext::in_memory();
    let index = open_anonymous(&ctx);

    let key = SearchKey::from("pinned");
    index.insert_entry(&key, RID::new(1, 1)).unwrap();

    let mut scan = index.open_scan(&key).unwrap();
    assert_eq!(scan.get_next().unwrap(), Some(RID::new(1, 1)));
    scan.close();
    scan.close();
    drop(scan);

    // delete_file frees every bucket page; it would fail with PagePinned if
    // the scan had leaked its pin.
    index.delete_file().unwrap();
}

#[test]
fn dropping_an_open_scan_releases_the_pin() {
    let ctx = TestContext::in_memory();
    let index = open_anonymous(&ctx);

    let key = wide_key();
    for i in 0..5 {
        index.insert_entry(&key, RID::new(8, i)).unwrap();
    }

    {
        let mut scan = index.open_scan(&key).unwrap();
        // Abandon the scan mid-chain without closing it.
        assert!(scan.get_next().unwrap().is_some());
        assert!(scan.get_next().unwrap().is_some());
    }

    index.delete_file().unwrap();
}

#[test]
fn concurrent_scans_over_the_same_bucket_are_independent() {
    let ctx = TestContext::in_memory();
    let index = open_anonymous(&ctx);

    let key = SearchKey::from("shared bucket");
    let rids: Vec<RID> = (0..4).map(|i| RID::new(3, i)).collect();
    for &rid in &rids {
        index.insert_entry(&key, rid).unwrap();
    }

    let mut first = index.open_scan(&key).unwrap();
    let mut second = index.open_scan(&key).unwrap();

    // Interleave the two cursors.
    let mut seen_first = HashSet::new();
    let mut seen_second = HashSet::new();
    loop {
        let a = first.get_next().unwrap();
        let b = second.get_next().unwrap();
        if let Some(rid) = a {
            seen_first.insert(rid);
        }
        if let Some(rid) = b {
            seen_second.insert(rid);
        }
        if a.is_none() && b.is_none() {
            break;
        }
    }
    first.close();
    second.close();

    let expected: HashSet<RID> = rids.iter().copied().collect();
    assert_eq!(seen_first, expected);
    assert_eq!(seen_second, expected);

    index.delete_file().unwrap();
}
