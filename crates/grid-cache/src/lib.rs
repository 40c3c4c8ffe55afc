pub mod etcd;
pub mod memory;
pub mod types;

pub use etcd::EtcdCacheStore;
pub use memory::MemoryCacheStore;
pub use types::CacheStore;
