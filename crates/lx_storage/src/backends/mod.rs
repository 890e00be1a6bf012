pub mod memory;
pub mod rest;

pub use memory::MemoryRecordStore;
pub use rest::RestRecordStore;
