mod config;
mod node;
mod stats;
mod store;

pub use config::MemStoreConfig;
pub use stats::StoreOp;
pub use store::MemStore;
