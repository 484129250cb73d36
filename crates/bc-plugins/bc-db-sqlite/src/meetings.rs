use std::collections::HashMap;

use async_trait::async_trait;
use bc_core::models::{
    Attendance, AttendanceStatus, MeetingComment, MeetingSubmission, SubmissionComment,
    SubmissionDraft,
};
use bc_core::traits::MeetingRepo;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use crate::rows;
use crate::SqliteClubRepo;

const SUBMISSION_COLUMNS: &str =
    "id, schedule_id, member_id, one_liner, rating_half_steps, created_at, updated_at";

impl SqliteClubRepo {
    /// Loads the ordered discussion entries of the given submissions.
    async fn attach_entries(&self, submissions: &mut [MeetingSubmission]) -> anyhow::Result<()> {
        if submissions.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = submissions.iter().map(|s| s.id).collect();
        let ids = ids.as_slice();

        let rows = self
            .run("load_submission_entries", || async move {
                let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
                    "SELECT submission_id, content FROM submission_entries WHERE submission_id IN (",
                );
                let mut list = query.separated(", ");
                for id in ids {
                    list.push_bind(*id);
                }
                list.push_unseparated(") ORDER BY submission_id, position ASC");
                query.build().fetch_all(&self.pool).await
            })
            .await?;

        let mut entries: HashMap<Uuid, Vec<String>> = HashMap::new();
        for row in rows {
            entries
                .entry(row.try_get("submission_id")?)
                .or_default()
                .push(row.try_get("content")?);
        }
        for submission in submissions.iter_mut() {
            submission.discussion = entries.remove(&submission.id).unwrap_or_default();
        }
        Ok(())
    }
}

#[async_trait]
impl MeetingRepo for SqliteClubRepo {
    async fn upsert_submission(&self, draft: SubmissionDraft) -> anyhow::Result<MeetingSubmission> {
        let draft = &draft;
        let rating = draft.rating.map(|r| i64::from(r.half_points()));
        let now = Utc::now();

        let id = self
            .run("upsert_submission", || async move {
                let mut tx = self.pool.begin().await?;

                let id: Uuid = sqlx::query_scalar(
                    "INSERT INTO meeting_submissions \
                     (id, schedule_id, member_id, one_liner, rating_half_steps, created_at, updated_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?) \
                     ON CONFLICT (schedule_id, member_id) DO UPDATE SET \
                     one_liner = excluded.one_liner, \
                     rating_half_steps = excluded.rating_half_steps, \
                     updated_at = excluded.updated_at \
                     RETURNING id",
                )
                .bind(Uuid::now_v7())
                .bind(draft.schedule_id)
                .bind(draft.member_id)
                .bind(&draft.one_liner)
                .bind(rating)
                .bind(now)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?;

                sqlx::query("DELETE FROM submission_entries WHERE submission_id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;

                for (position, content) in draft.discussion.iter().enumerate() {
                    sqlx::query(
                        "INSERT INTO submission_entries (submission_id, position, content) VALUES (?, ?, ?)",
                    )
                    .bind(id)
                    .bind(position as i64)
                    .bind(content)
                    .execute(&mut *tx)
                    .await?;
                }

                tx.commit().await?;
                Ok(id)
            })
            .await?;

        self.get_submission(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("submission {id} vanished after upsert"))
    }

    async fn get_submission(&self, id: Uuid) -> anyhow::Result<Option<MeetingSubmission>> {
        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM meeting_submissions WHERE id = ?");
        let sql = sql.as_str();
        let row = self
            .run("get_submission", || async move {
                sqlx::query(sql).bind(id).fetch_optional(&self.pool).await
            })
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut found = [rows::submission(&row)?];
        self.attach_entries(&mut found).await?;
        let [submission] = found;
        Ok(Some(submission))
    }

    async fn find_submission(
        &self,
        schedule_id: Uuid,
        member_id: Uuid,
    ) -> anyhow::Result<Option<MeetingSubmission>> {
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM meeting_submissions WHERE schedule_id = ? AND member_id = ?"
        );
        let sql = sql.as_str();
        let row = self
            .run("find_submission", || async move {
                sqlx::query(sql)
                    .bind(schedule_id)
                    .bind(member_id)
                    .fetch_optional(&self.pool)
                    .await
            })
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut found = [rows::submission(&row)?];
        self.attach_entries(&mut found).await?;
        let [submission] = found;
        Ok(Some(submission))
    }

    async fn list_submissions(&self, schedule_id: Uuid) -> anyhow::Result<Vec<MeetingSubmission>> {
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM meeting_submissions WHERE schedule_id = ? \
             ORDER BY created_at ASC"
        );
        let sql = sql.as_str();
        let rows = self
            .run("list_submissions", || async move {
                sqlx::query(sql).bind(schedule_id).fetch_all(&self.pool).await
            })
            .await?;

        let mut submissions = rows
            .iter()
            .map(rows::submission)
            .collect::<Result<Vec<_>, _>>()?;
        self.attach_entries(&mut submissions).await?;
        Ok(submissions)
    }

    async fn add_submission_comment(
        &self,
        submission_id: Uuid,
        member_id: Uuid,
        content: String,
    ) -> anyhow::Result<SubmissionComment> {
        let content_ref = content.as_str();
        let id = Uuid::now_v7();
        let now = Utc::now();

        self.run("add_submission_comment", || async move {
            sqlx::query(
                "INSERT INTO submission_comments (id, submission_id, member_id, content, created_at) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(submission_id)
            .bind(member_id)
            .bind(content_ref)
            .bind(now)
            .execute(&self.pool)
            .await
        })
        .await?;

        Ok(SubmissionComment {
            id,
            submission_id,
            member_id,
            content,
            created_at: now,
        })
    }

    async fn list_submission_comments(&self, schedule_id: Uuid) -> anyhow::Result<Vec<SubmissionComment>> {
        let rows = self
            .run("list_submission_comments", || async move {
                sqlx::query(
                    "SELECT c.id, c.submission_id, c.member_id, c.content, c.created_at \
                     FROM submission_comments c \
                     JOIN meeting_submissions s ON s.id = c.submission_id \
                     WHERE s.schedule_id = ? ORDER BY c.created_at ASC",
                )
                .bind(schedule_id)
                .fetch_all(&self.pool)
                .await
            })
            .await?;

        Ok(rows.iter().map(rows::submission_comment).collect::<Result<_, _>>()?)
    }

    async fn add_meeting_comment(
        &self,
        schedule_id: Uuid,
        member_id: Uuid,
        content: String,
    ) -> anyhow::Result<MeetingComment> {
        let content_ref = content.as_str();
        let id = Uuid::now_v7();
        let now = Utc::now();

        self.run("add_meeting_comment", || async move {
            sqlx::query(
                "INSERT INTO meeting_comments (id, schedule_id, member_id, content, created_at) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(schedule_id)
            .bind(member_id)
            .bind(content_ref)
            .bind(now)
            .execute(&self.pool)
            .await
        })
        .await?;

        Ok(MeetingComment {
            id,
            schedule_id,
            member_id,
            content,
            created_at: now,
        })
    }

    async fn list_meeting_comments(&self, schedule_id: Uuid) -> anyhow::Result<Vec<MeetingComment>> {
        let rows = self
            .run("list_meeting_comments", || async move {
                sqlx::query(
                    "SELECT id, schedule_id, member_id, content, created_at FROM meeting_comments \
                     WHERE schedule_id = ? ORDER BY created_at ASC",
                )
                .bind(schedule_id)
                .fetch_all(&self.pool)
                .await
            })
            .await?;

        Ok(rows.iter().map(rows::meeting_comment).collect::<Result<_, _>>()?)
    }

    async fn set_attendance(
        &self,
        schedule_id: Uuid,
        member_id: Uuid,
        status: AttendanceStatus,
    ) -> anyhow::Result<Attendance> {
        let now = Utc::now();

        self.run("set_attendance", || async move {
            sqlx::query(
                "INSERT INTO attendances (schedule_id, member_id, status, updated_at) VALUES (?, ?, ?, ?) \
                 ON CONFLICT (schedule_id, member_id) DO UPDATE SET \
                 status = excluded.status, updated_at = excluded.updated_at",
            )
            .bind(schedule_id)
            .bind(member_id)
            .bind(status.as_str())
            .bind(now)
            .execute(&self.pool)
            .await
        })
        .await?;

        Ok(Attendance {
            schedule_id,
            member_id,
            status,
            updated_at: now,
        })
    }

    async fn list_attendance(&self, schedule_id: Uuid) -> anyhow::Result<Vec<Attendance>> {
        let rows = self
            .run("list_attendance", || async move {
                sqlx::query(
                    "SELECT schedule_id, member_id, status, updated_at FROM attendances \
                     WHERE schedule_id = ? ORDER BY updated_at ASC",
                )
                .bind(schedule_id)
                .fetch_all(&self.pool)
                .await
            })
            .await?;

        Ok(rows.iter().map(rows::attendance).collect::<Result<_, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support;
    use bc_core::models::{AttendanceStatus, NewSchedule, Role, SubmissionDraft};
    use bc_core::rating::Rating;
    use bc_core::traits::{MeetingRepo, ScheduleRepo};
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_submission_upsert_replaces_entries_in_order() {
        let repo = test_support::repo().await;
        let ann = test_support::member(&repo, "Ann", Role::Member).await;
        let schedule = repo
            .confirm_schedule(NewSchedule {
                title: "March 10 meeting".to_string(),
                meeting_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
                presenter_id: ann,
                book_id: None,
                created_by: ann,
            })
            .await
            .unwrap();

        let first = repo
            .upsert_submission(SubmissionDraft {
                schedule_id: schedule.id,
                member_id: ann,
                discussion: vec!["one".into(), "two".into(), "three".into()],
                one_liner: None,
                rating: Rating::full(4),
            })
            .await
            .unwrap();
        assert_eq!(first.discussion, vec!["one", "two", "three"]);
        assert_eq!(first.rating.map(Rating::value), Some(4.0));

        let second = repo
            .upsert_submission(SubmissionDraft {
                schedule_id: schedule.id,
                member_id: ann,
                discussion: vec!["only".into()],
                one_liner: Some("short".into()),
                rating: None,
            })
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.discussion, vec!["only"]);
        assert_eq!(second.rating, None);
        assert_eq!(repo.list_submissions(schedule.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_attendance_last_write_wins() {
        let repo = test_support::repo().await;
        let ann = test_support::member(&repo, "Ann", Role::Member).await;
        let schedule = repo
            .confirm_schedule(NewSchedule {
                title: "March 10 meeting".to_string(),
                meeting_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
                presenter_id: ann,
                book_id: None,
                created_by: ann,
            })
            .await
            .unwrap();

        repo.set_attendance(schedule.id, ann, AttendanceStatus::Attending)
            .await
            .unwrap();
        repo.set_attendance(schedule.id, ann, AttendanceStatus::Maybe)
            .await
            .unwrap();

        let rows = repo.list_attendance(schedule.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, AttendanceStatus::Maybe);
    }
}
