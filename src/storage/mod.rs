pub mod cache;
pub mod db;
pub mod filter;
pub mod lock;
pub mod models;
mod photos;
mod queries;
mod schema;

pub use cache::{CacheKey, ViewCache};
pub use db::{Database, DatabaseError};
pub use filter::{Column, Filter};
pub use lock::{LockError, WriteLock};
pub use models::{PhotoId, PhotoRecord, TagAssociation};
