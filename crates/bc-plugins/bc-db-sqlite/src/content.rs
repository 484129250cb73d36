use std::collections::HashMap;

use async_trait::async_trait;
use bc_core::models::{
    BoardComment, BoardPost, Comment, CommentableType, ContentCounts, Discussion, NewDiscussion,
    NewRecap, NewReview, Recap, Review,
};
use bc_core::traits::ContentRepo;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use crate::rows;
use crate::SqliteClubRepo;

const DISCUSSION_COLUMNS: &str = "id, book_id, schedule_id, member_id, title, content, created_at";
const REVIEW_COLUMNS: &str = "id, book_id, member_id, title, content, rating, created_at";
const RECAP_COLUMNS: &str = "id, schedule_id, member_id, title, content, created_at";
const COMMENT_COLUMNS: &str =
    "id, commentable_type, commentable_id, member_id, content, created_at";

impl SqliteClubRepo {
    async fn attach_photos(&self, recaps: &mut [Recap]) -> anyhow::Result<()> {
        if recaps.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = recaps.iter().map(|r| r.id).collect();
        let ids = ids.as_slice();

        let rows = self
            .run("load_recap_photos", || async move {
                let mut query: QueryBuilder<Sqlite> =
                    QueryBuilder::new("SELECT recap_id, url FROM recap_photos WHERE recap_id IN (");
                let mut list = query.separated(", ");
                for id in ids {
                    list.push_bind(*id);
                }
                list.push_unseparated(") ORDER BY recap_id, position ASC");
                query.build().fetch_all(&self.pool).await
            })
            .await?;

        let mut photos: HashMap<Uuid, Vec<String>> = HashMap::new();
        for row in rows {
            photos
                .entry(row.try_get("recap_id")?)
                .or_default()
                .push(row.try_get("url")?);
        }
        for recap in recaps.iter_mut() {
            recap.photos = photos.remove(&recap.id).unwrap_or_default();
        }
        Ok(())
    }
}

fn table_for(kind: CommentableType) -> &'static str {
    match kind {
        CommentableType::Discussion => "discussions",
        CommentableType::Review => "reviews",
        CommentableType::Recap => "recaps",
    }
}

#[async_trait]
impl ContentRepo for SqliteClubRepo {
    async fn create_board_post(
        &self,
        member_id: Uuid,
        title: String,
        content: String,
    ) -> anyhow::Result<BoardPost> {
        let (title_ref, content_ref) = (title.as_str(), content.as_str());
        let id = Uuid::now_v7();
        let now = Utc::now();

        self.run("create_board_post", || async move {
            sqlx::query(
                "INSERT INTO board_posts (id, member_id, title, content, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(member_id)
            .bind(title_ref)
            .bind(content_ref)
            .bind(now)
            .execute(&self.pool)
            .await
        })
        .await?;

        Ok(BoardPost {
            id,
            member_id,
            title,
            content,
            created_at: now,
        })
    }

    async fn list_board_posts(&self) -> anyhow::Result<Vec<BoardPost>> {
        let rows = self
            .run("list_board_posts", || async move {
                sqlx::query(
                    "SELECT id, member_id, title, content, created_at FROM board_posts \
                     ORDER BY created_at DESC, id DESC",
                )
                .fetch_all(&self.pool)
                .await
            })
            .await?;

        Ok(rows.iter().map(rows::board_post).collect::<Result<_, _>>()?)
    }

    async fn get_board_post(&self, id: Uuid) -> anyhow::Result<Option<BoardPost>> {
        let row = self
            .run("get_board_post", || async move {
                sqlx::query("SELECT id, member_id, title, content, created_at FROM board_posts WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
            })
            .await?;

        Ok(row.as_ref().map(rows::board_post).transpose()?)
    }

    async fn delete_board_post(&self, id: Uuid) -> anyhow::Result<bool> {
        self.run("delete_board_post", || async move {
            let mut tx = self.pool.begin().await?;

            sqlx::query("DELETE FROM board_comments WHERE post_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            let deleted = sqlx::query("DELETE FROM board_posts WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(deleted.rows_affected() > 0)
        })
        .await
    }

    async fn add_board_comment(
        &self,
        post_id: Uuid,
        member_id: Uuid,
        content: String,
    ) -> anyhow::Result<BoardComment> {
        let content_ref = content.as_str();
        let id = Uuid::now_v7();
        let now = Utc::now();

        self.run("add_board_comment", || async move {
            sqlx::query(
                "INSERT INTO board_comments (id, post_id, member_id, content, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(post_id)
            .bind(member_id)
            .bind(content_ref)
            .bind(now)
            .execute(&self.pool)
            .await
        })
        .await?;

        Ok(BoardComment {
            id,
            post_id,
            member_id,
            content,
            created_at: now,
        })
    }

    async fn list_board_comments(&self, post_id: Uuid) -> anyhow::Result<Vec<BoardComment>> {
        let rows = self
            .run("list_board_comments", || async move {
                sqlx::query(
                    "SELECT id, post_id, member_id, content, created_at FROM board_comments \
                     WHERE post_id = ? ORDER BY created_at ASC",
                )
                .bind(post_id)
                .fetch_all(&self.pool)
                .await
            })
            .await?;

        Ok(rows.iter().map(rows::board_comment).collect::<Result<_, _>>()?)
    }

    async fn create_discussion(&self, discussion: NewDiscussion) -> anyhow::Result<Discussion> {
        let new = &discussion;
        let id = Uuid::now_v7();
        let now = Utc::now();

        self.run("create_discussion", || async move {
            sqlx::query(
                "INSERT INTO discussions (id, book_id, schedule_id, member_id, title, content, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(new.book_id)
            .bind(new.schedule_id)
            .bind(new.member_id)
            .bind(&new.title)
            .bind(&new.content)
            .bind(now)
            .execute(&self.pool)
            .await
        })
        .await?;

        Ok(Discussion {
            id,
            book_id: discussion.book_id,
            schedule_id: discussion.schedule_id,
            member_id: discussion.member_id,
            title: discussion.title,
            content: discussion.content,
            created_at: now,
        })
    }

    async fn list_discussions(&self, book_id: Option<Uuid>) -> anyhow::Result<Vec<Discussion>> {
        let sql = format!(
            "SELECT {DISCUSSION_COLUMNS} FROM discussions WHERE (?1 IS NULL OR book_id = ?1) \
             ORDER BY created_at DESC, id DESC"
        );
        let sql = sql.as_str();
        let rows = self
            .run("list_discussions", || async move {
                sqlx::query(sql).bind(book_id).fetch_all(&self.pool).await
            })
            .await?;

        Ok(rows.iter().map(rows::discussion).collect::<Result<_, _>>()?)
    }

    async fn get_discussion(&self, id: Uuid) -> anyhow::Result<Option<Discussion>> {
        let sql = format!("SELECT {DISCUSSION_COLUMNS} FROM discussions WHERE id = ?");
        let sql = sql.as_str();
        let row = self
            .run("get_discussion", || async move {
                sqlx::query(sql).bind(id).fetch_optional(&self.pool).await
            })
            .await?;

        Ok(row.as_ref().map(rows::discussion).transpose()?)
    }

    async fn create_review(&self, review: NewReview) -> anyhow::Result<Review> {
        let new = &review;
        let id = Uuid::now_v7();
        let now = Utc::now();

        self.run("create_review", || async move {
            sqlx::query(
                "INSERT INTO reviews (id, book_id, member_id, title, content, rating, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(new.book_id)
            .bind(new.member_id)
            .bind(&new.title)
            .bind(&new.content)
            .bind(i64::from(new.rating))
            .bind(now)
            .execute(&self.pool)
            .await
        })
        .await?;

        Ok(Review {
            id,
            book_id: review.book_id,
            member_id: review.member_id,
            title: review.title,
            content: review.content,
            rating: review.rating,
            created_at: now,
        })
    }

    async fn list_reviews(&self, book_id: Option<Uuid>) -> anyhow::Result<Vec<Review>> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE (?1 IS NULL OR book_id = ?1) \
             ORDER BY created_at DESC, id DESC"
        );
        let sql = sql.as_str();
        let rows = self
            .run("list_reviews", || async move {
                sqlx::query(sql).bind(book_id).fetch_all(&self.pool).await
            })
            .await?;

        Ok(rows.iter().map(rows::review).collect::<Result<_, _>>()?)
    }

    async fn get_review(&self, id: Uuid) -> anyhow::Result<Option<Review>> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = ?");
        let sql = sql.as_str();
        let row = self
            .run("get_review", || async move {
                sqlx::query(sql).bind(id).fetch_optional(&self.pool).await
            })
            .await?;

        Ok(row.as_ref().map(rows::review).transpose()?)
    }

    async fn create_recap(&self, recap: NewRecap) -> anyhow::Result<Recap> {
        let new = &recap;
        let id = Uuid::now_v7();
        let now = Utc::now();

        self.run("create_recap", || async move {
            let mut tx = self.pool.begin().await?;

            sqlx::query(
                "INSERT INTO recaps (id, schedule_id, member_id, title, content, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(new.schedule_id)
            .bind(new.member_id)
            .bind(&new.title)
            .bind(&new.content)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            for (position, url) in new.photos.iter().enumerate() {
                sqlx::query("INSERT INTO recap_photos (recap_id, position, url) VALUES (?, ?, ?)")
                    .bind(id)
                    .bind(position as i64)
                    .bind(url)
                    .execute(&mut *tx)
                    .await?;
            }

            tx.commit().await
        })
        .await?;

        Ok(Recap {
            id,
            schedule_id: recap.schedule_id,
            member_id: recap.member_id,
            title: recap.title,
            content: recap.content,
            photos: recap.photos,
            created_at: now,
        })
    }

    async fn list_recaps(&self) -> anyhow::Result<Vec<Recap>> {
        let sql = format!("SELECT {RECAP_COLUMNS} FROM recaps ORDER BY created_at DESC, id DESC");
        let sql = sql.as_str();
        let rows = self
            .run("list_recaps", || async move {
                sqlx::query(sql).fetch_all(&self.pool).await
            })
            .await?;

        let mut recaps = rows.iter().map(rows::recap).collect::<Result<Vec<_>, _>>()?;
        self.attach_photos(&mut recaps).await?;
        Ok(recaps)
    }

    async fn get_recap(&self, id: Uuid) -> anyhow::Result<Option<Recap>> {
        let sql = format!("SELECT {RECAP_COLUMNS} FROM recaps WHERE id = ?");
        let sql = sql.as_str();
        let row = self
            .run("get_recap", || async move {
                sqlx::query(sql).bind(id).fetch_optional(&self.pool).await
            })
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut found = [rows::recap(&row)?];
        self.attach_photos(&mut found).await?;
        let [recap] = found;
        Ok(Some(recap))
    }

    async fn delete_commentable(&self, kind: CommentableType, id: Uuid) -> anyhow::Result<bool> {
        let delete_sql = format!("DELETE FROM {} WHERE id = ?", table_for(kind));
        let delete_sql = delete_sql.as_str();

        self.run("delete_commentable", || async move {
            let mut tx = self.pool.begin().await?;

            sqlx::query("DELETE FROM comments WHERE commentable_type = ? AND commentable_id = ?")
                .bind(kind.as_str())
                .bind(id)
                .execute(&mut *tx)
                .await?;

            if kind == CommentableType::Recap {
                sqlx::query("DELETE FROM recap_photos WHERE recap_id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }

            let deleted = sqlx::query(delete_sql).bind(id).execute(&mut *tx).await?;

            tx.commit().await?;
            Ok(deleted.rows_affected() > 0)
        })
        .await
    }

    async fn add_comment(
        &self,
        kind: CommentableType,
        target_id: Uuid,
        member_id: Uuid,
        content: String,
    ) -> anyhow::Result<Comment> {
        let content_ref = content.as_str();
        let id = Uuid::now_v7();
        let now = Utc::now();

        self.run("add_comment", || async move {
            sqlx::query(
                "INSERT INTO comments (id, commentable_type, commentable_id, member_id, content, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(kind.as_str())
            .bind(target_id)
            .bind(member_id)
            .bind(content_ref)
            .bind(now)
            .execute(&self.pool)
            .await
        })
        .await?;

        Ok(Comment {
            id,
            commentable_type: kind,
            commentable_id: target_id,
            member_id,
            content,
            created_at: now,
        })
    }

    async fn list_comments(&self, kind: CommentableType, target_id: Uuid) -> anyhow::Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments \
             WHERE commentable_type = ? AND commentable_id = ? ORDER BY created_at ASC"
        );
        let sql = sql.as_str();
        let rows = self
            .run("list_comments", || async move {
                sqlx::query(sql)
                    .bind(kind.as_str())
                    .bind(target_id)
                    .fetch_all(&self.pool)
                    .await
            })
            .await?;

        Ok(rows.iter().map(rows::comment).collect::<Result<_, _>>()?)
    }

    async fn get_comment(&self, id: Uuid) -> anyhow::Result<Option<Comment>> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?");
        let sql = sql.as_str();
        let row = self
            .run("get_comment", || async move {
                sqlx::query(sql).bind(id).fetch_optional(&self.pool).await
            })
            .await?;

        Ok(row.as_ref().map(rows::comment).transpose()?)
    }

    async fn delete_comment(&self, id: Uuid) -> anyhow::Result<bool> {
        let deleted = self
            .run("delete_comment", || async move {
                sqlx::query("DELETE FROM comments WHERE id = ?")
                    .bind(id)
                    .execute(&self.pool)
                    .await
            })
            .await?;

        Ok(deleted.rows_affected() > 0)
    }

    async fn content_counts(&self) -> anyhow::Result<ContentCounts> {
        let row = self
            .run("content_counts", || async move {
                sqlx::query(
                    "SELECT (SELECT COUNT(*) FROM discussions) AS discussions, \
                     (SELECT COUNT(*) FROM reviews) AS reviews, \
                     (SELECT COUNT(*) FROM recaps) AS recaps",
                )
                .fetch_one(&self.pool)
                .await
            })
            .await?;

        Ok(ContentCounts {
            discussions: row.try_get("discussions")?,
            reviews: row.try_get("reviews")?,
            recaps: row.try_get("recaps")?,
        })
    }
}
