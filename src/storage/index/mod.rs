pub mod hash_bucket_chain;
pub mod hash_scan;
pub mod search_key;
pub mod static_hash_index;
