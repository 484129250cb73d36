//! # bc-db-sqlite Implementation
//!
//! This crate implements every `bc-core` repository port on top of SQLite.
//!
//! # Developer Note
//! All multi-row writes run inside a single transaction so a failure halfway
//! through leaves no partial state. Every statement goes through
//! [`SqliteClubRepo::run`], the one place transient store errors are retried.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use bc_core::error::UniqueViolation;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{info, warn};

mod rows;
mod members;
mod books;
mod schedules;
mod meetings;
mod content;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// How transient store failures are retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure
    pub attempts: u32,
    /// Sleep before retry `n` is `backoff * n`
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::from_millis(50),
        }
    }
}

pub struct SqliteClubRepo {
    pool: SqlitePool,
    retry: RetryPolicy,
}

impl SqliteClubRepo {
    /// Opens the database with default pool and retry settings.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        Self::connect(url, 5, RetryPolicy::default()).await
    }

    /// Opens (creating if needed) the database and applies pending migrations.
    ///
    /// `sqlite::memory:` databases live as long as their connection, so they
    /// are pinned to a single connection that never expires.
    pub async fn connect(url: &str, max_connections: u32, retry: RetryPolicy) -> anyhow::Result<Self> {
        let in_memory = url.contains(":memory:");
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new();
        pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(max_connections)
        };

        let pool = pool_options.connect_with(options).await?;
        MIGRATOR.run(&pool).await?;
        info!(url, "sqlite store ready");

        Ok(Self { pool, retry })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs one store operation under the retry policy.
    async fn run<T, F, Fut>(&self, op: &'static str, mut attempt_op: F) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let mut attempt = 0;
        loop {
            match attempt_op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.retry.attempts && is_transient(&err) => {
                    attempt += 1;
                    warn!(op, attempt, error = %err, "transient store error, retrying");
                    tokio::time::sleep(self.retry.backoff * attempt).await;
                }
                Err(err) => return Err(classify(err).context(op)),
            }
        }
    }
}

/// Uniqueness failures become [`UniqueViolation`]; the rest pass through.
fn classify(err: sqlx::Error) -> anyhow::Error {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            anyhow::Error::new(UniqueViolation(db.message().to_string()))
        }
        _ => anyhow::Error::new(err),
    }
}

/// Pool exhaustion, I/O, and SQLite BUSY / LOCKED are worth another try.
fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| matches!(code & 0xff, 5 | 6))
            .unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use bc_core::models::{NewBook, NewMember, Role};
    use bc_core::traits::{BookRepo, MemberRepo};
    use uuid::Uuid;

    pub async fn repo() -> SqliteClubRepo {
        SqliteClubRepo::new("sqlite::memory:").await.unwrap()
    }

    pub async fn member(repo: &SqliteClubRepo, name: &str, role: Role) -> Uuid {
        repo.create_member(NewMember {
            email: format!("{}@club.test", name.to_lowercase()),
            name: name.to_string(),
            password_hash: "hash".to_string(),
            role,
        })
        .await
        .unwrap()
        .id
    }

    pub async fn book(repo: &SqliteClubRepo, title: &str, created_by: Uuid) -> Uuid {
        repo.create_book(NewBook {
            title: title.to_string(),
            author: "Author".to_string(),
            created_by,
            ..Default::default()
        })
        .await
        .unwrap()
        .id
    }
}
