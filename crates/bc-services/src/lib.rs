//! # bc-services
//!
//! The book club workflow: date voting, schedule confirmation, book
//! candidates and selection, private submissions and reveal, attendance,
//! plus the catalog, community content, accounts and uploads around it.
//!
//! Services only talk to the `bc-core` ports. Every operation takes the
//! caller's [`Session`] and checks it with [`bc_core::authorize`] before
//! touching anything it is not allowed to.

use std::sync::Arc;

use bc_core::error::{AppError, Result};
use bc_core::traits::*;

pub mod accounts;
pub mod attendance;
pub mod candidates;
pub mod catalog;
pub mod community;
pub mod dates;
pub mod meetings;
pub mod scheduling;
pub mod uploads;
pub mod views;

pub use bc_core::policy::Session;

/// Every port a service may use. Cloning is cheap.
#[derive(Clone)]
pub struct Ports {
    pub members: Arc<dyn MemberRepo>,
    pub books: Arc<dyn BookRepo>,
    pub schedules: Arc<dyn ScheduleRepo>,
    pub meetings: Arc<dyn MeetingRepo>,
    pub content: Arc<dyn ContentRepo>,
    pub media: Arc<dyn MediaStore>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub clock: Arc<dyn Clock>,
}

impl Ports {
    /// Wires one store that implements every repository port.
    pub fn from_store<S>(
        store: Arc<S>,
        media: Arc<dyn MediaStore>,
        credentials: Arc<dyn CredentialProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self
    where
        S: MemberRepo + BookRepo + ScheduleRepo + MeetingRepo + ContentRepo + 'static,
    {
        Self {
            members: store.clone(),
            books: store.clone(),
            schedules: store.clone(),
            meetings: store.clone(),
            content: store,
            media,
            credentials,
            clock,
        }
    }
}

/// Limits that come from configuration.
#[derive(Debug, Clone, Copy)]
pub struct ServiceLimits {
    pub session_ttl_hours: i64,
    pub max_upload_bytes: usize,
}

impl Default for ServiceLimits {
    fn default() -> Self {
        Self {
            session_ttl_hours: 24 * 30,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// All services, as shared by the HTTP layer.
pub struct AppServices {
    pub accounts: accounts::AccountService,
    pub attendance: attendance::AttendanceService,
    pub candidates: candidates::CandidateService,
    pub catalog: catalog::CatalogService,
    pub community: community::CommunityService,
    pub dates: dates::DateVoteService,
    pub meetings: meetings::MeetingService,
    pub scheduling: scheduling::SchedulingService,
    pub uploads: uploads::UploadService,
}

impl AppServices {
    pub fn new(ports: Ports, limits: ServiceLimits) -> Self {
        Self {
            accounts: accounts::AccountService::new(ports.clone(), limits.session_ttl_hours),
            attendance: attendance::AttendanceService::new(ports.clone()),
            candidates: candidates::CandidateService::new(ports.clone()),
            catalog: catalog::CatalogService::new(ports.clone()),
            community: community::CommunityService::new(ports.clone()),
            dates: dates::DateVoteService::new(ports.clone()),
            meetings: meetings::MeetingService::new(ports.clone()),
            scheduling: scheduling::SchedulingService::new(ports.clone()),
            uploads: uploads::UploadService::new(ports, limits.max_upload_bytes),
        }
    }
}

/// Turns a missing row into `NotFound`.
pub(crate) fn found<T>(row: Option<T>, kind: &str, id: impl ToString) -> Result<T> {
    row.ok_or_else(|| AppError::not_found(kind, id))
}

/// Reports a store uniqueness failure as `Conflict` with `message`; other
/// store errors convert as usual.
pub(crate) fn or_conflict(message: String) -> impl FnOnce(anyhow::Error) -> AppError {
    move |err| match AppError::from(err) {
        AppError::Conflict(_) => AppError::Conflict(message),
        other => other,
    }
}

/// Trimmed, non-blank text.
pub(crate) fn required_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Trimmed text; blank becomes `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Display name for an id, or a placeholder for deleted accounts.
pub(crate) fn name_of(names: &std::collections::HashMap<uuid::Uuid, String>, id: uuid::Uuid) -> String {
    names
        .get(&id)
        .cloned()
        .unwrap_or_else(|| "(unknown member)".to_string())
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Services over an in-memory SQLite store.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bc_auth_simple::SimpleCredentialProvider;
    use bc_core::models::{NewBook, NewMember, Role};
    use bc_core::policy::Session;
    use bc_db_sqlite::SqliteClubRepo;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use secrecy::SecretString;
    use uuid::Uuid;

    use super::*;

    /// A clock stuck at noon UTC of a given day.
    pub struct FixedClock(pub DateTime<Utc>);

    impl FixedClock {
        pub fn on(date: NaiveDate) -> Self {
            let noon = date.and_hms_opt(12, 0, 0).unwrap();
            Self(Utc.from_utc_datetime(&noon))
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    /// Keeps uploads in memory.
    #[derive(Default)]
    pub struct MemoryMediaStore {
        pub saved: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl MediaStore for MemoryMediaStore {
        async fn save_upload(&self, owner: Uuid, data: Vec<u8>, _content_type: &str) -> anyhow::Result<String> {
            let mut saved = self.saved.lock().unwrap();
            let id = format!("{owner}/{}", saved.len());
            saved.insert(id.clone(), data);
            Ok(id)
        }

        async fn get_url(&self, media_id: &str) -> String {
            format!("/static/uploads/{media_id}")
        }

        async fn get_thumbnail_url(&self, url: &str) -> Option<String> {
            let media_id = url.strip_prefix("/static/uploads/")?;
            Some(format!("/static/uploads/thumb/{media_id}"))
        }
    }

    pub struct Harness {
        pub store: Arc<SqliteClubRepo>,
        pub ports: Ports,
        pub services: AppServices,
    }

    pub fn march_10() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    /// Services whose clock reads `today`.
    pub async fn harness_on(today: NaiveDate) -> Harness {
        let store = Arc::new(SqliteClubRepo::new("sqlite::memory:").await.unwrap());
        let ports = Ports::from_store(
            store.clone(),
            Arc::new(MemoryMediaStore::default()),
            Arc::new(SimpleCredentialProvider::new(SecretString::new("test-pepper".into()))),
            Arc::new(FixedClock::on(today)),
        );
        let services = AppServices::new(ports.clone(), ServiceLimits::default());
        Harness {
            store,
            ports,
            services,
        }
    }

    pub async fn harness() -> Harness {
        harness_on(march_10()).await
    }

    impl Harness {
        pub async fn member(&self, name: &str, role: Role) -> Session {
            let member = self
                .ports
                .members
                .create_member(NewMember {
                    email: format!("{}@club.test", name.to_lowercase()),
                    name: name.to_string(),
                    password_hash: "unused".to_string(),
                    role,
                })
                .await
                .unwrap();
            Session {
                member_id: member.id,
                name: member.name,
                role,
            }
        }

        pub async fn book(&self, title: &str, by: &Session) -> Uuid {
            self.ports
                .books
                .create_book(NewBook {
                    title: title.to_string(),
                    author: "Author".to_string(),
                    created_by: by.member_id,
                    ..Default::default()
                })
                .await
                .unwrap()
                .id
        }
    }
}
