//! Store gateway (spec.md §4.A): pooled connections, `LISTEN`/`NOTIFY`,
//! and transactional helpers shared by every component.

pub mod error;
pub mod listen;
pub mod pool;
pub mod store;

#[cfg(feature = "test-support")]
pub mod test_support;

pub use error::StoreError;
pub use listen::{Notification, NotificationListener};
pub use pool::{create_pool, PoolConfig};
pub use store::Store;
