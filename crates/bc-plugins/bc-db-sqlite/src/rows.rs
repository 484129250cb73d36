//! Mapping between SQLite rows and `bc-core` domain models.

use std::str::FromStr;

use bc_core::error::AppError;
use bc_core::models::*;
use bc_core::rating::Rating;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

pub(crate) const MEMBER_COLUMNS: &str = "id, email, name, avatar_url, role, created_at, updated_at";

pub(crate) const BOOK_COLUMNS: &str = "id, title, author, cover_url, description, isbn, category, \
     selection_reason, status, created_by, created_at, updated_at";

pub(crate) const SCHEDULE_COLUMNS: &str = "id, title, meeting_date, meeting_time, location, \
     presenter_id, selected_book_id, status, is_revealed, created_by, created_at, updated_at";

/// Decodes a TEXT column into one of the domain's text enums.
fn text_enum<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = AppError>,
{
    row.try_get::<String, _>(column)?
        .parse::<T>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

pub(crate) fn member(row: &SqliteRow) -> Result<Member, sqlx::Error> {
    Ok(Member {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        avatar_url: row.try_get("avatar_url")?,
        role: text_enum(row, "role")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn book(row: &SqliteRow) -> Result<Book, sqlx::Error> {
    Ok(Book {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        cover_url: row.try_get("cover_url")?,
        description: row.try_get("description")?,
        isbn: row.try_get("isbn")?,
        category: row.try_get("category")?,
        selection_reason: row.try_get("selection_reason")?,
        status: text_enum(row, "status")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn schedule(row: &SqliteRow) -> Result<Schedule, sqlx::Error> {
    Ok(Schedule {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        meeting_date: row.try_get("meeting_date")?,
        meeting_time: row.try_get("meeting_time")?,
        location: row.try_get("location")?,
        presenter_id: row.try_get("presenter_id")?,
        selected_book_id: row.try_get("selected_book_id")?,
        status: text_enum(row, "status")?,
        is_revealed: row.try_get("is_revealed")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn date_vote(row: &SqliteRow) -> Result<DateVote, sqlx::Error> {
    Ok(DateVote {
        member_id: row.try_get("member_id")?,
        vote_date: row.try_get("vote_date")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn candidate(row: &SqliteRow) -> Result<BookCandidate, sqlx::Error> {
    Ok(BookCandidate {
        id: row.try_get("id")?,
        schedule_id: row.try_get("schedule_id")?,
        book_id: row.try_get("book_id")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn book_vote(row: &SqliteRow) -> Result<BookVote, sqlx::Error> {
    Ok(BookVote {
        schedule_id: row.try_get("schedule_id")?,
        book_id: row.try_get("book_id")?,
        member_id: row.try_get("member_id")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Submission header row; discussion entries are attached by the caller.
pub(crate) fn submission(row: &SqliteRow) -> Result<MeetingSubmission, sqlx::Error> {
    let rating = row
        .try_get::<Option<i64>, _>("rating_half_steps")?
        .and_then(|h| u8::try_from(h).ok())
        .and_then(Rating::from_half_points);

    Ok(MeetingSubmission {
        id: row.try_get("id")?,
        schedule_id: row.try_get("schedule_id")?,
        member_id: row.try_get("member_id")?,
        discussion: Vec::new(),
        one_liner: row.try_get("one_liner")?,
        rating,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn submission_comment(row: &SqliteRow) -> Result<SubmissionComment, sqlx::Error> {
    Ok(SubmissionComment {
        id: row.try_get("id")?,
        submission_id: row.try_get("submission_id")?,
        member_id: row.try_get("member_id")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn meeting_comment(row: &SqliteRow) -> Result<MeetingComment, sqlx::Error> {
    Ok(MeetingComment {
        id: row.try_get("id")?,
        schedule_id: row.try_get("schedule_id")?,
        member_id: row.try_get("member_id")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn attendance(row: &SqliteRow) -> Result<Attendance, sqlx::Error> {
    Ok(Attendance {
        schedule_id: row.try_get("schedule_id")?,
        member_id: row.try_get("member_id")?,
        status: text_enum(row, "status")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn board_post(row: &SqliteRow) -> Result<BoardPost, sqlx::Error> {
    Ok(BoardPost {
        id: row.try_get("id")?,
        member_id: row.try_get("member_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn board_comment(row: &SqliteRow) -> Result<BoardComment, sqlx::Error> {
    Ok(BoardComment {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        member_id: row.try_get("member_id")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn discussion(row: &SqliteRow) -> Result<Discussion, sqlx::Error> {
    Ok(Discussion {
        id: row.try_get("id")?,
        book_id: row.try_get("book_id")?,
        schedule_id: row.try_get("schedule_id")?,
        member_id: row.try_get("member_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn review(row: &SqliteRow) -> Result<Review, sqlx::Error> {
    let rating: i64 = row.try_get("rating")?;
    Ok(Review {
        id: row.try_get("id")?,
        book_id: row.try_get("book_id")?,
        member_id: row.try_get("member_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        rating: u8::try_from(rating).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        created_at: row.try_get("created_at")?,
    })
}

/// Recap header row; photos are attached by the caller.
pub(crate) fn recap(row: &SqliteRow) -> Result<Recap, sqlx::Error> {
    Ok(Recap {
        id: row.try_get("id")?,
        schedule_id: row.try_get("schedule_id")?,
        member_id: row.try_get("member_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        photos: Vec::new(),
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn comment(row: &SqliteRow) -> Result<Comment, sqlx::Error> {
    Ok(Comment {
        id: row.try_get("id")?,
        commentable_type: text_enum(row, "commentable_type")?,
        commentable_id: row.try_get("commentable_id")?,
        member_id: row.try_get("member_id")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}
