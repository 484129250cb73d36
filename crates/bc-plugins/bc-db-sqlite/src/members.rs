use std::collections::HashMap;

use async_trait::async_trait;
use bc_core::models::{Member, NewMember, Role, SessionRecord, StoredCredentials};
use bc_core::traits::MemberRepo;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use crate::rows::{self, MEMBER_COLUMNS};
use crate::SqliteClubRepo;

#[async_trait]
impl MemberRepo for SqliteClubRepo {
    async fn create_member(&self, member: NewMember) -> anyhow::Result<Member> {
        let member = &member;
        let id = Uuid::now_v7();
        let now = Utc::now();

        self.run("create_member", || async move {
            sqlx::query(
                "INSERT INTO members (id, email, name, avatar_url, role, password_hash, created_at, updated_at) \
                 VALUES (?, ?, ?, NULL, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(&member.email)
            .bind(&member.name)
            .bind(member.role.as_str())
            .bind(&member.password_hash)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await
        })
        .await?;

        Ok(Member {
            id,
            email: member.email.clone(),
            name: member.name.clone(),
            avatar_url: None,
            role: member.role,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_member(&self, id: Uuid) -> anyhow::Result<Option<Member>> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id = ?");
        let sql = sql.as_str();
        let row = self
            .run("get_member", || async move {
                sqlx::query(sql).bind(id).fetch_optional(&self.pool).await
            })
            .await?;

        Ok(row.as_ref().map(rows::member).transpose()?)
    }

    async fn get_credentials(&self, email: &str) -> anyhow::Result<Option<StoredCredentials>> {
        let sql = format!("SELECT {MEMBER_COLUMNS}, password_hash FROM members WHERE email = ?");
        let sql = sql.as_str();
        let row = self
            .run("get_credentials", || async move {
                sqlx::query(sql).bind(email).fetch_optional(&self.pool).await
            })
            .await?;

        match row {
            Some(row) => Ok(Some(StoredCredentials {
                member: rows::member(&row)?,
                password_hash: row.try_get("password_hash")?,
            })),
            None => Ok(None),
        }
    }

    async fn list_members(&self) -> anyhow::Result<Vec<Member>> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members ORDER BY created_at DESC, id DESC");
        let sql = sql.as_str();
        let rows = self
            .run("list_members", || async move {
                sqlx::query(sql).fetch_all(&self.pool).await
            })
            .await?;

        Ok(rows.iter().map(rows::member).collect::<Result<_, _>>()?)
    }

    async fn list_members_with_roles(&self, roles: &[Role]) -> anyhow::Result<Vec<Member>> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .run("list_members_with_roles", || async move {
                let mut query: QueryBuilder<Sqlite> =
                    QueryBuilder::new(format!("SELECT {MEMBER_COLUMNS} FROM members WHERE role IN ("));
                let mut list = query.separated(", ");
                for role in roles {
                    list.push_bind(role.as_str());
                }
                list.push_unseparated(") ORDER BY name ASC");
                query.build().fetch_all(&self.pool).await
            })
            .await?;

        Ok(rows.iter().map(rows::member).collect::<Result<_, _>>()?)
    }

    async fn member_names(&self, ids: &[Uuid]) -> anyhow::Result<HashMap<Uuid, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = self
            .run("member_names", || async move {
                let mut query: QueryBuilder<Sqlite> =
                    QueryBuilder::new("SELECT id, name FROM members WHERE id IN (");
                let mut list = query.separated(", ");
                for id in ids {
                    list.push_bind(*id);
                }
                list.push_unseparated(")");
                query.build().fetch_all(&self.pool).await
            })
            .await?;

        let mut names = HashMap::with_capacity(rows.len());
        for row in rows {
            names.insert(row.try_get::<Uuid, _>("id")?, row.try_get::<String, _>("name")?);
        }
        Ok(names)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        avatar_url: Option<String>,
    ) -> anyhow::Result<Option<Member>> {
        let name = name.as_deref();
        let avatar_url = avatar_url.as_deref();
        let now = Utc::now();

        let updated = self
            .run("update_profile", || async move {
                sqlx::query(
                    "UPDATE members SET name = COALESCE(?, name), avatar_url = COALESCE(?, avatar_url), \
                     updated_at = ? WHERE id = ?",
                )
                .bind(name)
                .bind(avatar_url)
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await
            })
            .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_member(id).await
    }

    async fn set_role(&self, id: Uuid, role: Role) -> anyhow::Result<Option<Member>> {
        let now = Utc::now();
        let updated = self
            .run("set_role", || async move {
                sqlx::query("UPDATE members SET role = ?, updated_at = ? WHERE id = ?")
                    .bind(role.as_str())
                    .bind(now)
                    .bind(id)
                    .execute(&self.pool)
                    .await
            })
            .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_member(id).await
    }

    async fn delete_member(&self, id: Uuid) -> anyhow::Result<bool> {
        self.run("delete_member", || async move {
            let mut tx = self.pool.begin().await?;

            sqlx::query("DELETE FROM sessions WHERE member_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            let deleted = sqlx::query("DELETE FROM members WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(deleted.rows_affected() > 0)
        })
        .await
    }

    async fn count_approved_members(&self) -> anyhow::Result<i64> {
        self.run("count_approved_members", || async move {
            sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE role <> 'pending'")
                .fetch_one(&self.pool)
                .await
        })
        .await
    }

    async fn create_session(
        &self,
        token_digest: &str,
        member_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.run("create_session", || async move {
            sqlx::query("INSERT INTO sessions (token_digest, member_id, expires_at) VALUES (?, ?, ?)")
                .bind(token_digest)
                .bind(member_id)
                .bind(expires_at)
                .execute(&self.pool)
                .await
        })
        .await?;
        Ok(())
    }

    async fn find_session(&self, token_digest: &str) -> anyhow::Result<Option<SessionRecord>> {
        let row = self
            .run("find_session", || async move {
                sqlx::query("SELECT member_id, expires_at FROM sessions WHERE token_digest = ?")
                    .bind(token_digest)
                    .fetch_optional(&self.pool)
                    .await
            })
            .await?;

        match row {
            Some(row) => Ok(Some(SessionRecord {
                member_id: row.try_get("member_id")?,
                expires_at: row.try_get("expires_at")?,
            })),
            None => Ok(None),
        }
    }

    async fn delete_session(&self, token_digest: &str) -> anyhow::Result<()> {
        self.run("delete_session", || async move {
            sqlx::query("DELETE FROM sessions WHERE token_digest = ?")
                .bind(token_digest)
                .execute(&self.pool)
                .await
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support;
    use bc_core::models::Role;
    use bc_core::traits::MemberRepo;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_member_names_resolves_known_ids() {
        let repo = test_support::repo().await;
        let ann = test_support::member(&repo, "Ann", Role::Member).await;
        let bob = test_support::member(&repo, "Bob", Role::Admin).await;

        let names = repo.member_names(&[ann, bob, uuid::Uuid::now_v7()]).await.unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names[&ann], "Ann");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let repo = test_support::repo().await;
        test_support::member(&repo, "Ann", Role::Member).await;
        let again = repo
            .create_member(bc_core::models::NewMember {
                email: "ann@club.test".to_string(),
                name: "Ann Again".to_string(),
                password_hash: "hash".to_string(),
                role: Role::Pending,
            })
            .await;
        let err = again.unwrap_err();
        assert!(err.downcast_ref::<bc_core::error::UniqueViolation>().is_some());
    }

    #[tokio::test]
    async fn test_delete_member_removes_sessions() {
        let repo = test_support::repo().await;
        let pending = test_support::member(&repo, "Pat", Role::Pending).await;
        repo.create_session("digest", pending, Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        assert!(repo.delete_member(pending).await.unwrap());
        assert!(repo.find_session("digest").await.unwrap().is_none());
        assert!(repo.get_member(pending).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_role_filter_and_approved_count() {
        let repo = test_support::repo().await;
        test_support::member(&repo, "Ann", Role::Member).await;
        test_support::member(&repo, "Pat", Role::Pending).await;
        test_support::member(&repo, "Ada", Role::Admin).await;

        let active = repo
            .list_members_with_roles(&[Role::Admin, Role::Member])
            .await
            .unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(repo.count_approved_members().await.unwrap(), 2);
    }
}
