pub mod status_cache;
