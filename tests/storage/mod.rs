mod disk_manager_tests;
mod hash_scan_tests;
