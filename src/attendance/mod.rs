pub mod memory_store;
pub mod mysql_store;
pub mod service;
pub mod state;
pub mod store;
