//! Shared fixtures for the HTTP-level tests: a full service stack over an
//! in-memory SQLite database, a throwaway media directory and a fixed clock.

use std::path::PathBuf;
use std::sync::Arc;

use actix_web::http::header::{HeaderName, AUTHORIZATION};
use actix_web::web;
use bc_api::AppState;
use bc_auth_simple::SimpleCredentialProvider;
use bc_core::models::Role;
use bc_core::traits::{Clock, MemberRepo};
use bc_db_sqlite::SqliteClubRepo;
use bc_services::accounts::{Credentials, SignUp};
use bc_services::{AppServices, Ports, ServiceLimits};
use bc_storage_local::LocalMediaStore;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use secrecy::SecretString;
use uuid::Uuid;

pub const PASSWORD: &str = "correct horse battery";

pub fn march_10() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

/// Noon UTC of a fixed day.
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn on(date: NaiveDate) -> Self {
        Self(Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).unwrap()))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub struct Club {
    pub state: web::Data<AppState>,
    pub store: Arc<SqliteClubRepo>,
    pub media_root: PathBuf,
}

/// A signed-in account.
pub struct Account {
    pub id: Uuid,
    pub token: String,
}

impl Account {
    pub fn bearer(&self) -> (HeaderName, String) {
        (AUTHORIZATION, format!("Bearer {}", self.token))
    }
}

pub async fn club() -> Club {
    club_with(march_10(), ServiceLimits::default()).await
}

pub async fn club_with(today: NaiveDate, limits: ServiceLimits) -> Club {
    let store = Arc::new(SqliteClubRepo::new("sqlite::memory:").await.unwrap());
    let media_root = std::env::temp_dir().join(format!("bookclub-it-{}", Uuid::now_v7()));

    let ports = Ports::from_store(
        store.clone(),
        Arc::new(LocalMediaStore::new(media_root.clone(), "/static/uploads".to_string())),
        Arc::new(SimpleCredentialProvider::new(SecretString::new("it-pepper".into()))),
        Arc::new(FixedClock::on(today)),
    );
    let state = web::Data::new(AppState::new(AppServices::new(ports, limits)));

    Club {
        state,
        store,
        media_root,
    }
}

impl Club {
    /// Signs up, lets the store set the role, and signs in.
    pub async fn account(&self, name: &str, role: Role) -> Account {
        let accounts = &self.state.services.accounts;
        let email = format!("{}@club.test", name.to_lowercase());

        let member = accounts
            .sign_up(SignUp {
                email: email.clone(),
                password: PASSWORD.to_string(),
                name: name.to_string(),
            })
            .await
            .unwrap();
        if role != Role::Pending {
            self.store.set_role(member.id, role).await.unwrap();
        }

        let signed_in = accounts
            .sign_in(Credentials {
                email,
                password: PASSWORD.to_string(),
            })
            .await
            .unwrap();
        Account {
            id: member.id,
            token: signed_in.token,
        }
    }
}

impl Drop for Club {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.media_root);
    }
}
