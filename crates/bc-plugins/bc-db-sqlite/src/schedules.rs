use async_trait::async_trait;
use bc_core::models::{BookCandidate, BookVote, DateVote, NewSchedule, Schedule, ScheduleStatus};
use bc_core::traits::ScheduleRepo;
use chrono::{NaiveDate, NaiveTime, Utc};
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use crate::rows::{self, SCHEDULE_COLUMNS};
use crate::SqliteClubRepo;

const CANDIDATE_COLUMNS: &str = "id, schedule_id, book_id, created_at";

#[async_trait]
impl ScheduleRepo for SqliteClubRepo {
    async fn cast_date_vote(&self, member_id: Uuid, date: NaiveDate) -> anyhow::Result<bool> {
        let now = Utc::now();
        let inserted = self
            .run("cast_date_vote", || async move {
                sqlx::query(
                    "INSERT INTO date_votes (member_id, vote_date, created_at) VALUES (?, ?, ?) \
                     ON CONFLICT (member_id, vote_date) DO NOTHING",
                )
                .bind(member_id)
                .bind(date)
                .bind(now)
                .execute(&self.pool)
                .await
            })
            .await?;

        Ok(inserted.rows_affected() > 0)
    }

    async fn retract_date_vote(&self, member_id: Uuid, date: NaiveDate) -> anyhow::Result<bool> {
        let deleted = self
            .run("retract_date_vote", || async move {
                sqlx::query("DELETE FROM date_votes WHERE member_id = ? AND vote_date = ?")
                    .bind(member_id)
                    .bind(date)
                    .execute(&self.pool)
                    .await
            })
            .await?;

        Ok(deleted.rows_affected() > 0)
    }

    async fn date_votes_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<DateVote>> {
        let rows = self
            .run("date_votes_between", || async move {
                sqlx::query(
                    "SELECT member_id, vote_date, created_at FROM date_votes \
                     WHERE vote_date >= ? AND vote_date <= ? ORDER BY vote_date ASC, created_at ASC",
                )
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await
            })
            .await?;

        Ok(rows.iter().map(rows::date_vote).collect::<Result<_, _>>()?)
    }

    async fn get_schedule(&self, id: Uuid) -> anyhow::Result<Option<Schedule>> {
        let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = ?");
        let sql = sql.as_str();
        let row = self
            .run("get_schedule", || async move {
                sqlx::query(sql).bind(id).fetch_optional(&self.pool).await
            })
            .await?;

        Ok(row.as_ref().map(rows::schedule).transpose()?)
    }

    async fn schedule_on(&self, date: NaiveDate) -> anyhow::Result<Option<Schedule>> {
        let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE meeting_date = ?");
        let sql = sql.as_str();
        let row = self
            .run("schedule_on", || async move {
                sqlx::query(sql).bind(date).fetch_optional(&self.pool).await
            })
            .await?;

        Ok(row.as_ref().map(rows::schedule).transpose()?)
    }

    async fn schedules_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<Schedule>> {
        let sql = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules \
             WHERE meeting_date >= ? AND meeting_date <= ? ORDER BY meeting_date ASC"
        );
        let sql = sql.as_str();
        let rows = self
            .run("schedules_between", || async move {
                sqlx::query(sql).bind(start).bind(end).fetch_all(&self.pool).await
            })
            .await?;

        Ok(rows.iter().map(rows::schedule).collect::<Result<_, _>>()?)
    }

    async fn upcoming_schedules(&self, from: NaiveDate) -> anyhow::Result<Vec<Schedule>> {
        let sql = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE meeting_date >= ? ORDER BY meeting_date ASC"
        );
        let sql = sql.as_str();
        let rows = self
            .run("upcoming_schedules", || async move {
                sqlx::query(sql).bind(from).fetch_all(&self.pool).await
            })
            .await?;

        Ok(rows.iter().map(rows::schedule).collect::<Result<_, _>>()?)
    }

    async fn past_schedules(&self, before: NaiveDate, limit: i64) -> anyhow::Result<Vec<Schedule>> {
        let sql = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE meeting_date < ? \
             ORDER BY meeting_date DESC LIMIT ?"
        );
        let sql = sql.as_str();
        let rows = self
            .run("past_schedules", || async move {
                sqlx::query(sql).bind(before).bind(limit).fetch_all(&self.pool).await
            })
            .await?;

        Ok(rows.iter().map(rows::schedule).collect::<Result<_, _>>()?)
    }

    async fn schedules_for_book(&self, book_id: Uuid) -> anyhow::Result<Vec<Schedule>> {
        let sql = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE selected_book_id = ? \
             ORDER BY meeting_date DESC"
        );
        let sql = sql.as_str();
        let rows = self
            .run("schedules_for_book", || async move {
                sqlx::query(sql).bind(book_id).fetch_all(&self.pool).await
            })
            .await?;

        Ok(rows.iter().map(rows::schedule).collect::<Result<_, _>>()?)
    }

    async fn count_schedules(&self) -> anyhow::Result<i64> {
        self.run("count_schedules", || async move {
            sqlx::query_scalar("SELECT COUNT(*) FROM schedules")
                .fetch_one(&self.pool)
                .await
        })
        .await
    }

    async fn confirm_schedule(&self, schedule: NewSchedule) -> anyhow::Result<Schedule> {
        let new = &schedule;
        let id = Uuid::now_v7();
        let now = Utc::now();

        self.run("confirm_schedule", || async move {
            let mut tx = self.pool.begin().await?;

            sqlx::query(
                "INSERT INTO schedules (id, title, meeting_date, meeting_time, location, presenter_id, \
                 selected_book_id, status, is_revealed, created_by, created_at, updated_at) \
                 VALUES (?, ?, ?, NULL, NULL, ?, ?, ?, 0, ?, ?, ?)",
            )
            .bind(id)
            .bind(&new.title)
            .bind(new.meeting_date)
            .bind(new.presenter_id)
            .bind(new.book_id)
            .bind(ScheduleStatus::Confirmed.as_str())
            .bind(new.created_by)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if let Some(book_id) = new.book_id {
                sqlx::query(
                    "INSERT INTO book_candidates (id, schedule_id, book_id, created_at) VALUES (?, ?, ?, ?)",
                )
                .bind(Uuid::now_v7())
                .bind(id)
                .bind(book_id)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                sqlx::query("UPDATE books SET status = 'selected', updated_at = ? WHERE id = ?")
                    .bind(now)
                    .bind(book_id)
                    .execute(&mut *tx)
                    .await?;
            }

            let cleared = sqlx::query("DELETE FROM date_votes WHERE vote_date = ?")
                .bind(new.meeting_date)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            debug!(schedule_id = %id, cleared_votes = cleared.rows_affected(), "schedule confirmed");
            Ok(())
        })
        .await?;

        Ok(Schedule {
            id,
            title: new.title.clone(),
            meeting_date: new.meeting_date,
            meeting_time: None,
            location: None,
            presenter_id: new.presenter_id,
            selected_book_id: new.book_id,
            status: ScheduleStatus::Confirmed,
            is_revealed: false,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update_schedule_details(
        &self,
        id: Uuid,
        meeting_time: Option<NaiveTime>,
        location: Option<String>,
    ) -> anyhow::Result<Option<Schedule>> {
        let location = location.as_deref();
        let now = Utc::now();

        let updated = self
            .run("update_schedule_details", || async move {
                sqlx::query(
                    "UPDATE schedules SET meeting_time = ?, location = ?, updated_at = ? WHERE id = ?",
                )
                .bind(meeting_time)
                .bind(location)
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await
            })
            .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_schedule(id).await
    }

    async fn cancel_schedule(&self, id: Uuid) -> anyhow::Result<bool> {
        let now = Utc::now();

        self.run("cancel_schedule", || async move {
            let mut tx = self.pool.begin().await?;

            let Some(row) =
                sqlx::query("SELECT selected_book_id, is_revealed FROM schedules WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?
            else {
                return Ok(false);
            };
            let selected: Option<Uuid> = row.try_get("selected_book_id")?;
            let revealed: bool = row.try_get("is_revealed")?;

            for statement in [
                "DELETE FROM book_votes WHERE schedule_id = ?",
                "DELETE FROM book_candidates WHERE schedule_id = ?",
                "DELETE FROM attendances WHERE schedule_id = ?",
                "DELETE FROM submission_comments WHERE submission_id IN \
                 (SELECT id FROM meeting_submissions WHERE schedule_id = ?)",
                "DELETE FROM submission_entries WHERE submission_id IN \
                 (SELECT id FROM meeting_submissions WHERE schedule_id = ?)",
                "DELETE FROM meeting_submissions WHERE schedule_id = ?",
                "DELETE FROM meeting_comments WHERE schedule_id = ?",
                "DELETE FROM schedules WHERE id = ?",
            ] {
                sqlx::query(statement).bind(id).execute(&mut *tx).await?;
            }

            if let (Some(book_id), false) = (selected, revealed) {
                sqlx::query(
                    "UPDATE books SET status = 'nominated', updated_at = ? \
                     WHERE id = ? AND status = 'selected'",
                )
                .bind(now)
                .bind(book_id)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            Ok(true)
        })
        .await
    }

    async fn add_candidate(&self, schedule_id: Uuid, book_id: Uuid) -> anyhow::Result<BookCandidate> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        self.run("add_candidate", || async move {
            sqlx::query(
                "INSERT INTO book_candidates (id, schedule_id, book_id, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(id)
            .bind(schedule_id)
            .bind(book_id)
            .bind(now)
            .execute(&self.pool)
            .await
        })
        .await?;

        Ok(BookCandidate {
            id,
            schedule_id,
            book_id,
            created_at: now,
        })
    }

    async fn get_candidate(&self, id: Uuid) -> anyhow::Result<Option<BookCandidate>> {
        let sql = format!("SELECT {CANDIDATE_COLUMNS} FROM book_candidates WHERE id = ?");
        let sql = sql.as_str();
        let row = self
            .run("get_candidate", || async move {
                sqlx::query(sql).bind(id).fetch_optional(&self.pool).await
            })
            .await?;

        Ok(row.as_ref().map(rows::candidate).transpose()?)
    }

    async fn find_candidate(
        &self,
        schedule_id: Uuid,
        book_id: Uuid,
    ) -> anyhow::Result<Option<BookCandidate>> {
        let sql = format!(
            "SELECT {CANDIDATE_COLUMNS} FROM book_candidates WHERE schedule_id = ? AND book_id = ?"
        );
        let sql = sql.as_str();
        let row = self
            .run("find_candidate", || async move {
                sqlx::query(sql)
                    .bind(schedule_id)
                    .bind(book_id)
                    .fetch_optional(&self.pool)
                    .await
            })
            .await?;

        Ok(row.as_ref().map(rows::candidate).transpose()?)
    }

    async fn list_candidates(&self, schedule_id: Uuid) -> anyhow::Result<Vec<BookCandidate>> {
        let sql = format!(
            "SELECT {CANDIDATE_COLUMNS} FROM book_candidates WHERE schedule_id = ? ORDER BY created_at ASC"
        );
        let sql = sql.as_str();
        let rows = self
            .run("list_candidates", || async move {
                sqlx::query(sql).bind(schedule_id).fetch_all(&self.pool).await
            })
            .await?;

        Ok(rows.iter().map(rows::candidate).collect::<Result<_, _>>()?)
    }

    async fn remove_candidate(&self, id: Uuid) -> anyhow::Result<bool> {
        self.run("remove_candidate", || async move {
            let mut tx = self.pool.begin().await?;

            let Some(row) =
                sqlx::query("SELECT schedule_id, book_id FROM book_candidates WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?
            else {
                return Ok(false);
            };
            let schedule_id: Uuid = row.try_get("schedule_id")?;
            let book_id: Uuid = row.try_get("book_id")?;

            sqlx::query("DELETE FROM book_votes WHERE schedule_id = ? AND book_id = ?")
                .bind(schedule_id)
                .bind(book_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM book_candidates WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(true)
        })
        .await
    }

    async fn cast_book_vote(
        &self,
        schedule_id: Uuid,
        book_id: Uuid,
        member_id: Uuid,
    ) -> anyhow::Result<bool> {
        let now = Utc::now();
        let inserted = self
            .run("cast_book_vote", || async move {
                sqlx::query(
                    "INSERT INTO book_votes (schedule_id, book_id, member_id, created_at) \
                     VALUES (?, ?, ?, ?) ON CONFLICT (schedule_id, book_id, member_id) DO NOTHING",
                )
                .bind(schedule_id)
                .bind(book_id)
                .bind(member_id)
                .bind(now)
                .execute(&self.pool)
                .await
            })
            .await?;

        Ok(inserted.rows_affected() > 0)
    }

    async fn retract_book_vote(
        &self,
        schedule_id: Uuid,
        book_id: Uuid,
        member_id: Uuid,
    ) -> anyhow::Result<bool> {
        let deleted = self
            .run("retract_book_vote", || async move {
                sqlx::query(
                    "DELETE FROM book_votes WHERE schedule_id = ? AND book_id = ? AND member_id = ?",
                )
                .bind(schedule_id)
                .bind(book_id)
                .bind(member_id)
                .execute(&self.pool)
                .await
            })
            .await?;

        Ok(deleted.rows_affected() > 0)
    }

    async fn list_book_votes(&self, schedule_id: Uuid) -> anyhow::Result<Vec<BookVote>> {
        let rows = self
            .run("list_book_votes", || async move {
                sqlx::query(
                    "SELECT schedule_id, book_id, member_id, created_at FROM book_votes \
                     WHERE schedule_id = ? ORDER BY created_at ASC",
                )
                .bind(schedule_id)
                .fetch_all(&self.pool)
                .await
            })
            .await?;

        Ok(rows.iter().map(rows::book_vote).collect::<Result<_, _>>()?)
    }

    async fn select_book(&self, schedule_id: Uuid, book_id: Uuid) -> anyhow::Result<Option<Schedule>> {
        let now = Utc::now();

        let found = self
            .run("select_book", || async move {
                let mut tx = self.pool.begin().await?;

                let Some(row) = sqlx::query("SELECT selected_book_id FROM schedules WHERE id = ?")
                    .bind(schedule_id)
                    .fetch_optional(&mut *tx)
                    .await?
                else {
                    return Ok(false);
                };
                let previous: Option<Uuid> = row.try_get("selected_book_id")?;

                if let Some(previous) = previous.filter(|p| *p != book_id) {
                    sqlx::query(
                        "UPDATE books SET status = 'nominated', updated_at = ? \
                         WHERE id = ? AND status = 'selected'",
                    )
                    .bind(now)
                    .bind(previous)
                    .execute(&mut *tx)
                    .await?;
                }

                sqlx::query("UPDATE schedules SET selected_book_id = ?, updated_at = ? WHERE id = ?")
                    .bind(book_id)
                    .bind(now)
                    .bind(schedule_id)
                    .execute(&mut *tx)
                    .await?;

                sqlx::query("UPDATE books SET status = 'selected', updated_at = ? WHERE id = ?")
                    .bind(now)
                    .bind(book_id)
                    .execute(&mut *tx)
                    .await?;

                sqlx::query(
                    "UPDATE books SET status = 'nominated', updated_at = ? \
                     WHERE status = 'waiting' AND id <> ? AND id IN \
                     (SELECT book_id FROM book_candidates WHERE schedule_id = ?)",
                )
                .bind(now)
                .bind(book_id)
                .bind(schedule_id)
                .execute(&mut *tx)
                .await?;

                tx.commit().await?;
                Ok(true)
            })
            .await?;

        if !found {
            return Ok(None);
        }
        self.get_schedule(schedule_id).await
    }

    async fn reveal(&self, schedule_id: Uuid) -> anyhow::Result<Option<Schedule>> {
        let now = Utc::now();

        let found = self
            .run("reveal", || async move {
                let mut tx = self.pool.begin().await?;

                sqlx::query(
                    "UPDATE books SET status = 'completed', updated_at = ? \
                     WHERE id = (SELECT selected_book_id FROM schedules WHERE id = ?)",
                )
                .bind(now)
                .bind(schedule_id)
                .execute(&mut *tx)
                .await?;

                let updated =
                    sqlx::query("UPDATE schedules SET is_revealed = 1, updated_at = ? WHERE id = ?")
                        .bind(now)
                        .bind(schedule_id)
                        .execute(&mut *tx)
                        .await?;

                tx.commit().await?;
                Ok(updated.rows_affected() > 0)
            })
            .await?;

        if !found {
            return Ok(None);
        }
        self.get_schedule(schedule_id).await
    }
}
