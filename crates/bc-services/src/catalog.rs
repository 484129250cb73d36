//! The club's book catalog.

use bc_core::error::Result;
use bc_core::models::NewBook;
use bc_core::policy::{authorize, Action, Resource, Session};
use tracing::info;
use uuid::Uuid;

use crate::views::{BookDetail, BookView, DiscussionView, ReviewView};
use crate::{found, name_of, optional_text, required_text, Ports};

pub struct CatalogService {
    ports: Ports,
}

impl CatalogService {
    pub fn new(ports: Ports) -> Self {
        Self { ports }
    }

    /// Newest first, with the creator's name.
    pub async fn list_books(&self, actor: &Session) -> Result<Vec<BookView>> {
        authorize(actor, Action::ReadClub, Resource::Club)?;
        let books = self.ports.books.list_books().await?;
        let ids: Vec<Uuid> = books.iter().map(|b| b.created_by).collect();
        let names = self.ports.members.member_names(&ids).await?;

        Ok(books
            .into_iter()
            .map(|book| BookView {
                creator_name: name_of(&names, book.created_by),
                book,
            })
            .collect())
    }

    pub async fn create_book(&self, actor: &Session, input: NewBook) -> Result<BookView> {
        authorize(actor, Action::CreateContent, Resource::Club)?;

        let book = NewBook {
            title: required_text("title", &input.title)?,
            author: required_text("author", &input.author)?,
            cover_url: optional_text(input.cover_url),
            description: optional_text(input.description),
            isbn: optional_text(input.isbn),
            category: optional_text(input.category),
            selection_reason: optional_text(input.selection_reason),
            created_by: actor.member_id,
        };
        let book = self.ports.books.create_book(book).await?;
        info!(book_id = %book.id, title = %book.title, "book registered");

        Ok(BookView {
            book,
            creator_name: actor.name.clone(),
        })
    }

    /// The book with the meetings it belonged to and what was written about it.
    pub async fn book_detail(&self, actor: &Session, book_id: Uuid) -> Result<BookDetail> {
        authorize(actor, Action::ReadClub, Resource::Club)?;
        let book = found(self.ports.books.get_book(book_id).await?, "Book", book_id)?;

        let schedules = self.ports.schedules.schedules_for_book(book_id).await?;
        let discussions = self.ports.content.list_discussions(Some(book_id)).await?;
        let reviews = self.ports.content.list_reviews(Some(book_id)).await?;

        let mut ids = vec![book.created_by];
        ids.extend(discussions.iter().map(|d| d.member_id));
        ids.extend(reviews.iter().map(|r| r.member_id));
        let names = self.ports.members.member_names(&ids).await?;

        let title = Some(book.title.clone());
        Ok(BookDetail {
            discussions: discussions
                .into_iter()
                .map(|discussion| DiscussionView {
                    author_name: name_of(&names, discussion.member_id),
                    book_title: title.clone(),
                    discussion,
                })
                .collect(),
            reviews: reviews
                .into_iter()
                .map(|review| ReviewView {
                    author_name: name_of(&names, review.member_id),
                    book_title: title.clone(),
                    review,
                })
                .collect(),
            schedules,
            book: BookView {
                creator_name: name_of(&names, book.created_by),
                book,
            },
        })
    }
}
