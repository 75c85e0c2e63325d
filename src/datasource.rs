use std::fmt::Debug;

use sqlx::{Pool, Postgres};

pub mod memory;
pub mod repository;

pub use memory::MemoryStore;
pub use repository::{
    CategoryRepository, ContentRepository, PlaylistRepository, SubscriptionRepository,
    TokenRepository, UserRepository, WatchHistoryRepository,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    Conflict,
    #[error("row is still referenced")]
    Referenced,
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return Self::Conflict;
            }
            if db.is_foreign_key_violation() {
                return Self::Referenced;
            }
        }
        Self::Database(err)
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Everything the request handlers need from persistence.
pub trait Store:
    UserRepository
    + CategoryRepository
    + ContentRepository
    + SubscriptionRepository
    + PlaylistRepository
    + WatchHistoryRepository
    + TokenRepository
    + Debug
{
}

impl<T> Store for T where
    T: UserRepository
        + CategoryRepository
        + ContentRepository
        + SubscriptionRepository
        + PlaylistRepository
        + WatchHistoryRepository
        + TokenRepository
        + Debug
{
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}
