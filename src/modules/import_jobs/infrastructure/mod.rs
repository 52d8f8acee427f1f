pub mod dto;
pub mod file_store;
pub mod http_client;
pub mod memory_store;

pub use file_store::FileJobHandleStore;
pub use http_client::ImportApiClient;
pub use memory_store::InMemoryJobHandleStore;
