//! Sign-up, sessions, profiles and the admin console.
//!
//! New accounts start `pending` and can sign in straight away, but until an
//! admin approves them they can only look at and edit their own profile.
//! Session tokens are handed to the client once; the store only keeps a
//! peppered digest.

use bc_core::error::{AppError, Result};
use bc_core::models::{Member, NewMember, Role};
use bc_core::policy::{authorize, Action, Resource, Session};
use chrono::Duration;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::views::{AdminCounts, AdminOverview, HealthReport, SignedIn};
use crate::{found, optional_text, or_conflict, required_text, Ports};

const MIN_PASSWORD_CHARS: usize = 8;
const DECOY_PASSWORD: &str = "bookclub-decoy-password";

#[derive(Debug, Clone, Deserialize)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

pub struct AccountService {
    ports: Ports,
    session_ttl: Duration,
    /// Verified against when the e-mail is unknown, so both sign-in
    /// failures cost one password check.
    decoy_hash: String,
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AppError::invalid("a valid email address is required"));
    }
    Ok(email)
}

impl AccountService {
    pub fn new(ports: Ports, session_ttl_hours: i64) -> Self {
        let decoy_hash = ports
            .credentials
            .hash_password(DECOY_PASSWORD)
            .unwrap_or_else(|err| {
                warn!(error = %err, "could not prepare the sign-in decoy hash");
                String::new()
            });
        Self {
            ports,
            session_ttl: Duration::hours(session_ttl_hours),
            decoy_hash,
        }
    }

    pub async fn sign_up(&self, input: SignUp) -> Result<Member> {
        let email = normalize_email(&input.email)?;
        let name = required_text("name", &input.name)?;
        if input.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AppError::invalid(format!(
                "password must be at least {MIN_PASSWORD_CHARS} characters"
            )));
        }

        if self.ports.members.get_credentials(&email).await?.is_some() {
            return Err(AppError::Conflict(format!("{email} is already registered")));
        }

        let password_hash = self.ports.credentials.hash_password(&input.password)?;
        let conflict = format!("{email} is already registered");
        let member = self
            .ports
            .members
            .create_member(NewMember {
                email,
                name,
                password_hash,
                role: Role::Pending,
            })
            .await
            .map_err(or_conflict(conflict))?;
        info!(member_id = %member.id, "member signed up, awaiting approval");
        Ok(member)
    }

    pub async fn sign_in(&self, input: Credentials) -> Result<SignedIn> {
        let email = input.email.trim().to_lowercase();
        let rejected = || AppError::Unauthorized("invalid email or password".to_string());

        let Some(stored) = self.ports.members.get_credentials(&email).await? else {
            self.ports
                .credentials
                .verify_password(&input.password, &self.decoy_hash)
                .await;
            debug!("sign-in for unknown email");
            return Err(rejected());
        };
        if !self
            .ports
            .credentials
            .verify_password(&input.password, &stored.password_hash)
            .await
        {
            warn!(member_id = %stored.member.id, "sign-in with wrong password");
            return Err(rejected());
        }

        let token = self.ports.credentials.issue_token()?;
        let digest = self.ports.credentials.token_digest(&token);
        let expires_at = self.ports.clock.now() + self.session_ttl;
        self.ports
            .members
            .create_session(&digest, stored.member.id, expires_at)
            .await?;

        info!(member_id = %stored.member.id, "signed in");
        Ok(SignedIn {
            token,
            member: stored.member,
        })
    }

    pub async fn sign_out(&self, token: &str) -> Result<()> {
        let digest = self.ports.credentials.token_digest(token);
        self.ports.members.delete_session(&digest).await?;
        Ok(())
    }

    /// The caller behind a token, if the session exists and has not expired.
    pub async fn resolve_session(&self, token: &str) -> Result<Option<Session>> {
        let digest = self.ports.credentials.token_digest(token);
        let Some(record) = self.ports.members.find_session(&digest).await? else {
            return Ok(None);
        };

        if record.expires_at <= self.ports.clock.now() {
            debug!(member_id = %record.member_id, "session expired");
            self.ports.members.delete_session(&digest).await?;
            return Ok(None);
        }

        Ok(self
            .ports
            .members
            .get_member(record.member_id)
            .await?
            .map(|member| Session {
                member_id: member.id,
                name: member.name,
                role: member.role,
            }))
    }

    pub async fn profile(&self, actor: &Session) -> Result<Member> {
        authorize(actor, Action::EditProfile, Resource::Member(actor.member_id))?;
        found(
            self.ports.members.get_member(actor.member_id).await?,
            "Member",
            actor.member_id,
        )
    }

    pub async fn update_profile(&self, actor: &Session, update: ProfileUpdate) -> Result<Member> {
        authorize(actor, Action::EditProfile, Resource::Member(actor.member_id))?;
        let name = match update.name {
            Some(name) => Some(required_text("name", &name)?),
            None => None,
        };

        let member = self
            .ports
            .members
            .update_profile(actor.member_id, name, optional_text(update.avatar_url))
            .await?;
        found(member, "Member", actor.member_id)
    }

    pub async fn admin_overview(&self, actor: &Session) -> Result<AdminOverview> {
        authorize(actor, Action::ManageMembers, Resource::Club)?;

        let members = self.ports.members.list_members().await?;
        let content = self.ports.content.content_counts().await?;
        let counts = AdminCounts {
            approved_members: self.ports.members.count_approved_members().await?,
            books: self.ports.books.count_books().await?,
            schedules: self.ports.schedules.count_schedules().await?,
            discussions: content.discussions,
            reviews: content.reviews,
            recaps: content.recaps,
        };
        Ok(AdminOverview { members, counts })
    }

    /// Approves, promotes or demotes a member.
    pub async fn set_role(&self, actor: &Session, member_id: Uuid, role: Role) -> Result<Member> {
        authorize(actor, Action::ManageMembers, Resource::Club)?;

        if role == Role::Pending {
            return Err(AppError::invalid("a member cannot be moved back to pending"));
        }
        if member_id == actor.member_id && role != Role::Admin {
            return Err(AppError::invalid("admins cannot demote themselves"));
        }

        let member = found(
            self.ports.members.set_role(member_id, role).await?,
            "Member",
            member_id,
        )?;
        info!(%member_id, role = role.as_str(), by = %actor.member_id, "role changed");
        Ok(member)
    }

    /// Deletes a pending sign-up together with its sessions.
    pub async fn reject(&self, actor: &Session, member_id: Uuid) -> Result<()> {
        authorize(actor, Action::ManageMembers, Resource::Club)?;

        let member = found(self.ports.members.get_member(member_id).await?, "Member", member_id)?;
        if member.role != Role::Pending {
            return Err(AppError::invalid("only pending sign-ups can be rejected"));
        }

        self.ports.members.delete_member(member_id).await?;
        info!(%member_id, by = %actor.member_id, "sign-up rejected");
        Ok(())
    }

    pub async fn health(&self) -> Result<HealthReport> {
        let members = self.ports.members.count_approved_members().await?;
        Ok(HealthReport {
            ok: true,
            members,
            timestamp: self.ports.clock.now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{harness, march_10, Harness};

    fn sign_up(email: &str, password: &str) -> SignUp {
        SignUp {
            email: email.to_string(),
            password: password.to_string(),
            name: "Ann".to_string(),
        }
    }

    async fn signed_in(h: &Harness, email: &str) -> SignedIn {
        h.services
            .accounts
            .sign_up(sign_up(email, "correct horse"))
            .await
            .unwrap();
        h.services
            .accounts
            .sign_in(Credentials {
                email: email.to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_sign_up_validation() {
        let h = harness().await;
        let accounts = &h.services.accounts;

        assert!(matches!(
            accounts.sign_up(sign_up("not-an-email", "long enough")).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            accounts.sign_up(sign_up("ann@club.test", "short")).await,
            Err(AppError::ValidationError(_))
        ));

        let member = accounts
            .sign_up(sign_up(" Ann@Club.TEST ", "long enough"))
            .await
            .unwrap();
        assert_eq!(member.email, "ann@club.test");
        assert_eq!(member.role, Role::Pending);

        assert!(matches!(
            accounts.sign_up(sign_up("ANN@club.test", "long enough")).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let h = harness().await;
        signed_in(&h, "ann@club.test").await;

        let err = h
            .services
            .accounts
            .sign_in(Credentials {
                email: "ann@club.test".to_string(),
                password: "wrong horse".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_pending_signs_in_reads_profile_but_cannot_vote() {
        let h = harness().await;
        let signed = signed_in(&h, "pat@club.test").await;

        let session = h
            .services
            .accounts
            .resolve_session(&signed.token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.role, Role::Pending);

        let profile = h.services.accounts.profile(&session).await.unwrap();
        assert_eq!(profile.email, "pat@club.test");

        let err = h.services.dates.cast(&session, march_10()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_sign_out_ends_session() {
        let h = harness().await;
        let signed = signed_in(&h, "ann@club.test").await;

        h.services.accounts.sign_out(&signed.token).await.unwrap();
        assert!(h
            .services
            .accounts
            .resolve_session(&signed.token)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_dropped() {
        let h = harness().await;
        let accounts = AccountService::new(h.ports.clone(), 0);
        accounts
            .sign_up(sign_up("ann@club.test", "correct horse"))
            .await
            .unwrap();
        let signed = accounts
            .sign_in(Credentials {
                email: "ann@club.test".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();

        assert!(accounts.resolve_session(&signed.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_admin_approves_and_rejects() {
        let h = harness().await;
        let admin = h.member("Ada", Role::Admin).await;
        let pat = h.member("Pat", Role::Pending).await;
        let pia = h.member("Pia", Role::Pending).await;

        let approved = h
            .services
            .accounts
            .set_role(&admin, pat.member_id, Role::Member)
            .await
            .unwrap();
        assert_eq!(approved.role, Role::Member);

        assert!(matches!(
            h.services.accounts.reject(&admin, pat.member_id).await,
            Err(AppError::ValidationError(_))
        ));
        h.services.accounts.reject(&admin, pia.member_id).await.unwrap();

        let overview = h.services.accounts.admin_overview(&admin).await.unwrap();
        assert_eq!(overview.members.len(), 2);
        assert_eq!(overview.counts.approved_members, 2);
    }

    #[tokio::test]
    async fn test_admin_cannot_demote_self() {
        let h = harness().await;
        let admin = h.member("Ada", Role::Admin).await;
        let err = h
            .services
            .accounts
            .set_role(&admin, admin.member_id, Role::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let member = h.member("Max", Role::Member).await;
        assert!(matches!(
            h.services.accounts.admin_overview(&member).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_profile_update_trims() {
        let h = harness().await;
        let ann = h.member("Ann", Role::Member).await;

        let updated = h
            .services
            .accounts
            .update_profile(
                &ann,
                ProfileUpdate {
                    name: Some(" Annie ".to_string()),
                    avatar_url: Some(" ".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Annie");
        assert_eq!(updated.avatar_url, None);

        let err = h
            .services
            .accounts
            .update_profile(
                &ann,
                ProfileUpdate {
                    name: Some("".to_string()),
                    avatar_url: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    /// Counts password checks on top of the real provider.
    struct CountingCredentials {
        inner: bc_auth_simple::SimpleCredentialProvider,
        verifications: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl bc_core::traits::CredentialProvider for CountingCredentials {
        fn hash_password(&self, password: &str) -> anyhow::Result<String> {
            self.inner.hash_password(password)
        }

        async fn verify_password(&self, password: &str, hash: &str) -> bool {
            self.verifications
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.verify_password(password, hash).await
        }

        fn issue_token(&self) -> anyhow::Result<String> {
            self.inner.issue_token()
        }

        fn token_digest(&self, token: &str) -> String {
            self.inner.token_digest(token)
        }
    }

    #[tokio::test]
    async fn test_unknown_email_still_checks_a_password() {
        let h = harness().await;
        let counting = std::sync::Arc::new(CountingCredentials {
            inner: bc_auth_simple::SimpleCredentialProvider::new(secrecy::SecretString::new(
                "test-pepper".into(),
            )),
            verifications: Default::default(),
        });
        let mut ports = h.ports.clone();
        ports.credentials = counting.clone();
        let accounts = AccountService::new(ports, 1);

        let err = accounts
            .sign_in(Credentials {
                email: "nobody@club.test".to_string(),
                password: "whatever123".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert_eq!(
            counting
                .verifications
                .load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn test_duplicate_email_racing_past_the_check_is_a_conflict() {
        let mut members = bc_core::traits::MockMemberRepo::new();
        members.expect_get_credentials().returning(|_| Ok(None));
        members.expect_create_member().returning(|_| {
            Err(anyhow::Error::new(bc_core::error::UniqueViolation(
                "members.email".to_string(),
            ))
            .context("create_member"))
        });

        let h = harness().await;
        let mut ports = h.ports.clone();
        ports.members = std::sync::Arc::new(members);
        let accounts = AccountService::new(ports, 1);

        let err = accounts
            .sign_up(sign_up("ann@club.test", "correct horse"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg.contains("ann@club.test")));
    }
}
