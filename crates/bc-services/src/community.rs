//! Everything members write outside the meeting workflow: the board,
//! book discussions, reviews, photo recaps and the comments on them.

use std::collections::HashMap;

use bc_core::error::{AppError, Result};
use bc_core::models::*;
use bc_core::policy::{authorize, Action, Resource, Session};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::views::*;
use crate::{found, name_of, optional_text, required_text, Ports};

#[derive(Debug, Clone, Deserialize)]
pub struct NewBoardPost {
    pub title: String,
    pub content: String,
}

pub struct CommunityService {
    ports: Ports,
}

impl CommunityService {
    pub fn new(ports: Ports) -> Self {
        Self { ports }
    }

    async fn names(&self, ids: impl IntoIterator<Item = Uuid>) -> Result<HashMap<Uuid, String>> {
        let ids: Vec<Uuid> = ids.into_iter().collect();
        Ok(self.ports.members.member_names(&ids).await?)
    }

    async fn book_titles(&self, ids: impl IntoIterator<Item = Uuid>) -> Result<HashMap<Uuid, String>> {
        let ids: Vec<Uuid> = ids.into_iter().collect();
        Ok(self
            .ports
            .books
            .get_books(&ids)
            .await?
            .into_iter()
            .map(|(id, book)| (id, book.title))
            .collect())
    }

    // Board

    pub async fn list_board_posts(&self, actor: &Session) -> Result<Vec<BoardPostView>> {
        authorize(actor, Action::ReadClub, Resource::Club)?;
        let posts = self.ports.content.list_board_posts().await?;
        let names = self.names(posts.iter().map(|p| p.member_id)).await?;
        Ok(posts
            .into_iter()
            .map(|post| BoardPostView {
                author_name: name_of(&names, post.member_id),
                post,
            })
            .collect())
    }

    pub async fn create_board_post(&self, actor: &Session, input: NewBoardPost) -> Result<BoardPostView> {
        authorize(actor, Action::CreateContent, Resource::Club)?;
        let title = required_text("title", &input.title)?;
        let content = required_text("content", &input.content)?;

        let post = self
            .ports
            .content
            .create_board_post(actor.member_id, title, content)
            .await?;
        Ok(BoardPostView {
            post,
            author_name: actor.name.clone(),
        })
    }

    pub async fn board_post_detail(&self, actor: &Session, post_id: Uuid) -> Result<BoardPostDetail> {
        authorize(actor, Action::ReadClub, Resource::Club)?;
        let post = found(self.ports.content.get_board_post(post_id).await?, "Post", post_id)?;
        let comments = self.ports.content.list_board_comments(post_id).await?;

        let names = self
            .names(std::iter::once(post.member_id).chain(comments.iter().map(|c| c.member_id)))
            .await?;
        Ok(BoardPostDetail {
            post: BoardPostView {
                author_name: name_of(&names, post.member_id),
                post,
            },
            comments: comments
                .into_iter()
                .map(|comment| BoardCommentView {
                    author_name: name_of(&names, comment.member_id),
                    comment,
                })
                .collect(),
        })
    }

    /// Author or admin. Takes the post's comments with it.
    pub async fn delete_board_post(&self, actor: &Session, post_id: Uuid) -> Result<()> {
        let post = found(self.ports.content.get_board_post(post_id).await?, "Post", post_id)?;
        authorize(actor, Action::DeleteContent, Resource::OwnedBy(post.member_id))?;
        self.ports.content.delete_board_post(post_id).await?;
        info!(%post_id, by = %actor.member_id, "board post deleted");
        Ok(())
    }

    pub async fn add_board_comment(
        &self,
        actor: &Session,
        post_id: Uuid,
        content: &str,
    ) -> Result<BoardCommentView> {
        authorize(actor, Action::Comment, Resource::Club)?;
        let content = required_text("content", content)?;
        found(self.ports.content.get_board_post(post_id).await?, "Post", post_id)?;

        let comment = self
            .ports
            .content
            .add_board_comment(post_id, actor.member_id, content)
            .await?;
        Ok(BoardCommentView {
            comment,
            author_name: actor.name.clone(),
        })
    }

    // Discussions

    /// Newest first, optionally for one book.
    pub async fn list_discussions(&self, actor: &Session, book_id: Option<Uuid>) -> Result<Vec<DiscussionView>> {
        authorize(actor, Action::ReadClub, Resource::Club)?;
        let discussions = self.ports.content.list_discussions(book_id).await?;
        let names = self.names(discussions.iter().map(|d| d.member_id)).await?;
        let titles = self.book_titles(discussions.iter().map(|d| d.book_id)).await?;

        Ok(discussions
            .into_iter()
            .map(|discussion| DiscussionView {
                author_name: name_of(&names, discussion.member_id),
                book_title: titles.get(&discussion.book_id).cloned(),
                discussion,
            })
            .collect())
    }

    pub async fn create_discussion(&self, actor: &Session, input: NewDiscussion) -> Result<DiscussionView> {
        authorize(actor, Action::CreateContent, Resource::Club)?;
        let title = required_text("title", &input.title)?;
        let content = required_text("content", &input.content)?;

        let book = found(self.ports.books.get_book(input.book_id).await?, "Book", input.book_id)?;
        if let Some(schedule_id) = input.schedule_id {
            found(
                self.ports.schedules.get_schedule(schedule_id).await?,
                "Schedule",
                schedule_id,
            )?;
        }

        let discussion = self
            .ports
            .content
            .create_discussion(NewDiscussion {
                book_id: book.id,
                schedule_id: input.schedule_id,
                title,
                content,
                member_id: actor.member_id,
            })
            .await?;
        Ok(DiscussionView {
            discussion,
            author_name: actor.name.clone(),
            book_title: Some(book.title),
        })
    }

    pub async fn discussion_detail(&self, actor: &Session, id: Uuid) -> Result<Thread<DiscussionView>> {
        authorize(actor, Action::ReadClub, Resource::Club)?;
        let discussion = found(self.ports.content.get_discussion(id).await?, "Discussion", id)?;
        let book_title = self
            .ports
            .books
            .get_book(discussion.book_id)
            .await?
            .map(|b| b.title);
        let names = self.names([discussion.member_id]).await?;

        let item = DiscussionView {
            author_name: name_of(&names, discussion.member_id),
            book_title,
            discussion,
        };
        let comments = self.comment_views(CommentableType::Discussion, id).await?;
        Ok(Thread { item, comments })
    }

    // Reviews

    pub async fn list_reviews(&self, actor: &Session, book_id: Option<Uuid>) -> Result<Vec<ReviewView>> {
        authorize(actor, Action::ReadClub, Resource::Club)?;
        let reviews = self.ports.content.list_reviews(book_id).await?;
        let names = self.names(reviews.iter().map(|r| r.member_id)).await?;
        let titles = self.book_titles(reviews.iter().map(|r| r.book_id)).await?;

        Ok(reviews
            .into_iter()
            .map(|review| ReviewView {
                author_name: name_of(&names, review.member_id),
                book_title: titles.get(&review.book_id).cloned(),
                review,
            })
            .collect())
    }

    pub async fn create_review(&self, actor: &Session, input: NewReview) -> Result<ReviewView> {
        authorize(actor, Action::CreateContent, Resource::Club)?;
        let title = required_text("title", &input.title)?;
        let content = required_text("content", &input.content)?;
        if !(1..=5).contains(&input.rating) {
            return Err(AppError::invalid("rating must be between 1 and 5"));
        }
        let book = found(self.ports.books.get_book(input.book_id).await?, "Book", input.book_id)?;

        let review = self
            .ports
            .content
            .create_review(NewReview {
                book_id: book.id,
                title,
                content,
                rating: input.rating,
                member_id: actor.member_id,
            })
            .await?;
        Ok(ReviewView {
            review,
            author_name: actor.name.clone(),
            book_title: Some(book.title),
        })
    }

    pub async fn review_detail(&self, actor: &Session, id: Uuid) -> Result<Thread<ReviewView>> {
        authorize(actor, Action::ReadClub, Resource::Club)?;
        let review = found(self.ports.content.get_review(id).await?, "Review", id)?;
        let book_title = self.ports.books.get_book(review.book_id).await?.map(|b| b.title);
        let names = self.names([review.member_id]).await?;

        let item = ReviewView {
            author_name: name_of(&names, review.member_id),
            book_title,
            review,
        };
        let comments = self.comment_views(CommentableType::Review, id).await?;
        Ok(Thread { item, comments })
    }

    // Recaps

    pub async fn list_recaps(&self, actor: &Session) -> Result<Vec<RecapView>> {
        authorize(actor, Action::ReadClub, Resource::Club)?;
        let recaps = self.ports.content.list_recaps().await?;
        let names = self.names(recaps.iter().map(|r| r.member_id)).await?;
        Ok(recaps
            .into_iter()
            .map(|recap| RecapView {
                author_name: name_of(&names, recap.member_id),
                recap,
            })
            .collect())
    }

    pub async fn create_recap(&self, actor: &Session, input: NewRecap) -> Result<RecapView> {
        authorize(actor, Action::CreateContent, Resource::Club)?;
        let title = required_text("title", &input.title)?;
        let photos: Vec<String> = input
            .photos
            .into_iter()
            .filter_map(|p| optional_text(Some(p)))
            .collect();
        if photos.is_empty() {
            return Err(AppError::invalid("a recap needs at least one photo"));
        }
        if let Some(schedule_id) = input.schedule_id {
            found(
                self.ports.schedules.get_schedule(schedule_id).await?,
                "Schedule",
                schedule_id,
            )?;
        }

        let recap = self
            .ports
            .content
            .create_recap(NewRecap {
                schedule_id: input.schedule_id,
                title,
                content: optional_text(input.content),
                photos,
                member_id: actor.member_id,
            })
            .await?;
        info!(recap_id = %recap.id, photos = recap.photos.len(), "recap posted");
        Ok(RecapView {
            recap,
            author_name: actor.name.clone(),
        })
    }

    pub async fn recap_detail(&self, actor: &Session, id: Uuid) -> Result<Thread<RecapView>> {
        authorize(actor, Action::ReadClub, Resource::Club)?;
        let recap = found(self.ports.content.get_recap(id).await?, "Recap", id)?;
        let names = self.names([recap.member_id]).await?;

        let item = RecapView {
            author_name: name_of(&names, recap.member_id),
            recap,
        };
        let comments = self.comment_views(CommentableType::Recap, id).await?;
        Ok(Thread { item, comments })
    }

    /// Every recap photo, newest recap first.
    pub async fn gallery(&self, actor: &Session) -> Result<Vec<GalleryPhoto>> {
        authorize(actor, Action::ReadClub, Resource::Club)?;
        let recaps = self.ports.content.list_recaps().await?;
        let names = self.names(recaps.iter().map(|r| r.member_id)).await?;

        let mut photos = Vec::new();
        for recap in &recaps {
            let author = name_of(&names, recap.member_id);
            for url in &recap.photos {
                photos.push(GalleryPhoto {
                    url: url.clone(),
                    thumb_url: self.ports.media.get_thumbnail_url(url).await,
                    title: recap.title.clone(),
                    author: author.clone(),
                    recap_id: recap.id,
                    created_at: recap.created_at,
                });
            }
        }
        Ok(photos)
    }

    // Deleting discussions, reviews and recaps

    async fn author_of(&self, kind: CommentableType, id: Uuid) -> Result<Uuid> {
        let author = match kind {
            CommentableType::Discussion => self.ports.content.get_discussion(id).await?.map(|d| d.member_id),
            CommentableType::Review => self.ports.content.get_review(id).await?.map(|r| r.member_id),
            CommentableType::Recap => self.ports.content.get_recap(id).await?.map(|r| r.member_id),
        };
        let kind_name = match kind {
            CommentableType::Discussion => "Discussion",
            CommentableType::Review => "Review",
            CommentableType::Recap => "Recap",
        };
        found(author, kind_name, id)
    }

    /// Author or admin. Comments on the item go with it.
    pub async fn delete_content(&self, actor: &Session, kind: CommentableType, id: Uuid) -> Result<()> {
        let author = self.author_of(kind, id).await?;
        authorize(actor, Action::DeleteContent, Resource::OwnedBy(author))?;
        self.ports.content.delete_commentable(kind, id).await?;
        info!(%kind, %id, by = %actor.member_id, "content deleted");
        Ok(())
    }

    // Comments

    async fn comment_views(&self, kind: CommentableType, target_id: Uuid) -> Result<Vec<CommentView>> {
        let comments = self.ports.content.list_comments(kind, target_id).await?;
        let names = self.names(comments.iter().map(|c| c.member_id)).await?;
        Ok(comments
            .into_iter()
            .map(|comment| CommentView {
                author_name: name_of(&names, comment.member_id),
                comment,
            })
            .collect())
    }

    /// Oldest first.
    pub async fn list_comments(
        &self,
        actor: &Session,
        kind: CommentableType,
        target_id: Uuid,
    ) -> Result<Vec<CommentView>> {
        authorize(actor, Action::ReadClub, Resource::Club)?;
        self.comment_views(kind, target_id).await
    }

    pub async fn add_comment(
        &self,
        actor: &Session,
        kind: CommentableType,
        target_id: Uuid,
        content: &str,
    ) -> Result<CommentView> {
        authorize(actor, Action::Comment, Resource::Club)?;
        let content = required_text("content", content)?;
        self.author_of(kind, target_id).await?;

        let comment = self
            .ports
            .content
            .add_comment(kind, target_id, actor.member_id, content)
            .await?;
        Ok(CommentView {
            comment,
            author_name: actor.name.clone(),
        })
    }

    /// Author or admin.
    pub async fn delete_comment(&self, actor: &Session, comment_id: Uuid) -> Result<()> {
        let comment = found(self.ports.content.get_comment(comment_id).await?, "Comment", comment_id)?;
        authorize(actor, Action::DeleteContent, Resource::OwnedBy(comment.member_id))?;
        self.ports.content.delete_comment(comment_id).await?;
        Ok(())
    }
}
