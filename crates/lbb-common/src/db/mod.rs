pub mod memory;
pub mod offices;
pub mod pool;
pub mod util;

pub use memory::InMemoryOfficeStore;
pub use offices::{OfficeStore, PgOfficeStore, StoreError};
pub use pool::{DbPoolError, PgPool, create_pool_from_url, create_pool_from_url_checked};
pub use util::ping;
