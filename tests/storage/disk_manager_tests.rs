use tempfile::TempDir;

use magnetite::common::config::DB_PAGE_SIZE;
use magnetite::common::logger::initialize_logger;
use magnetite::storage::disk::disk_manager::{DiskIO, FileDiskManager};

struct TestContext {
    disk: FileDiskManager,
    _temp_dir: TempDir,
}

impl TestContext {
    fn new(name: &str) -> Self {
        initialize_logger();
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join(format!("{}.db", name));
        Self {
            disk: FileDiskManager::new(&db_path).unwrap(),
            _temp_dir: temp_dir,
        }
    }
}

#[test]
fn page_round_trip() {
    let ctx = TestContext::new("page_round_trip");
    let mut data = [0u8; DB_PAGE_SIZE];
    data[0] = 0x10;
    data[DB_PAGE_SIZE - 1] = 0x99;
    ctx.disk.write_page(5, &data).unwrap();

    let mut read_back = [0u8; DB_PAGE_SIZE];
    ctx.disk.read_page(5, &mut read_back).unwrap();
    assert_eq!(read_back[0], 0x10);
    assert_eq!(read_back[DB_PAGE_SIZE - 1], 0x99);
    assert_eq!(ctx.disk.get_num_writes(), 1);
}

#[test]
fn read_past_eof_returns_zeroes() {
    let ctx = TestContext::new("read_past_eof");
    let mut data = [0xFFu8; DB_PAGE_SIZE];
    ctx.disk.read_page(123, &mut data).unwrap();
    assert!(data.iter().all(|&b| b == 0));
}

#[test]
fn pages_do_not_bleed_into_neighbors() {
    let ctx = TestContext::new("pages_do_not_bleed");
    let mut a = [0u8; DB_PAGE_SIZE];
    let mut b = [0u8; DB_PAGE_SIZE];
    a.fill(0xAA);
    b.fill(0xBB);
    ctx.disk.write_page(0, &a).unwrap();
    ctx.disk.write_page(1, &b).unwrap();

    let mut read_back = [0u8; DB_PAGE_SIZE];
    ctx.disk.read_page(0, &mut read_back).unwrap();
    assert!(read_back.iter().all(|&byte| byte == 0xAA));
    ctx.disk.read_page(1, &mut read_back).unwrap();
    assert!(read_back.iter().all(|&byte| byte == 0xBB));
}
