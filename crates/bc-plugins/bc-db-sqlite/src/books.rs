use std::collections::HashMap;

use async_trait::async_trait;
use bc_core::models::{Book, BookStatus, NewBook};
use bc_core::traits::BookRepo;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

use crate::rows::{self, BOOK_COLUMNS};
use crate::SqliteClubRepo;

#[async_trait]
impl BookRepo for SqliteClubRepo {
    async fn create_book(&self, book: NewBook) -> anyhow::Result<Book> {
        let book = &book;
        let id = Uuid::now_v7();
        let now = Utc::now();

        self.run("create_book", || async move {
            sqlx::query(
                "INSERT INTO books (id, title, author, cover_url, description, isbn, category, \
                 selection_reason, status, created_by, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'waiting', ?, ?, ?)",
            )
            .bind(id)
            .bind(&book.title)
            .bind(&book.author)
            .bind(&book.cover_url)
            .bind(&book.description)
            .bind(&book.isbn)
            .bind(&book.category)
            .bind(&book.selection_reason)
            .bind(book.created_by)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await
        })
        .await?;

        Ok(Book {
            id,
            title: book.title.clone(),
            author: book.author.clone(),
            cover_url: book.cover_url.clone(),
            description: book.description.clone(),
            isbn: book.isbn.clone(),
            category: book.category.clone(),
            selection_reason: book.selection_reason.clone(),
            status: BookStatus::Waiting,
            created_by: book.created_by,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_book(&self, id: Uuid) -> anyhow::Result<Option<Book>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?");
        let sql = sql.as_str();
        let row = self
            .run("get_book", || async move {
                sqlx::query(sql).bind(id).fetch_optional(&self.pool).await
            })
            .await?;

        Ok(row.as_ref().map(rows::book).transpose()?)
    }

    async fn get_books(&self, ids: &[Uuid]) -> anyhow::Result<HashMap<Uuid, Book>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = self
            .run("get_books", || async move {
                let mut query: QueryBuilder<Sqlite> =
                    QueryBuilder::new(format!("SELECT {BOOK_COLUMNS} FROM books WHERE id IN ("));
                let mut list = query.separated(", ");
                for id in ids {
                    list.push_bind(*id);
                }
                list.push_unseparated(")");
                query.build().fetch_all(&self.pool).await
            })
            .await?;

        let mut books = HashMap::with_capacity(rows.len());
        for row in &rows {
            let book = rows::book(row)?;
            books.insert(book.id, book);
        }
        Ok(books)
    }

    async fn list_books(&self) -> anyhow::Result<Vec<Book>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY created_at DESC, id DESC");
        let sql = sql.as_str();
        let rows = self
            .run("list_books", || async move {
                sqlx::query(sql).fetch_all(&self.pool).await
            })
            .await?;

        Ok(rows.iter().map(rows::book).collect::<Result<_, _>>()?)
    }

    async fn list_books_with_status(&self, statuses: &[BookStatus]) -> anyhow::Result<Vec<Book>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .run("list_books_with_status", || async move {
                let mut query: QueryBuilder<Sqlite> =
                    QueryBuilder::new(format!("SELECT {BOOK_COLUMNS} FROM books WHERE status IN ("));
                let mut list = query.separated(", ");
                for status in statuses {
                    list.push_bind(status.as_str());
                }
                list.push_unseparated(") ORDER BY created_at DESC, id DESC");
                query.build().fetch_all(&self.pool).await
            })
            .await?;

        Ok(rows.iter().map(rows::book).collect::<Result<_, _>>()?)
    }

    async fn count_books(&self) -> anyhow::Result<i64> {
        self.run("count_books", || async move {
            sqlx::query_scalar("SELECT COUNT(*) FROM books")
                .fetch_one(&self.pool)
                .await
        })
        .await
    }
}
