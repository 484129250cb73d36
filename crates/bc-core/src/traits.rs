//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.
//! Operations documented as a single write must be applied atomically by the
//! implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::models::*;

/// Member accounts and their sessions.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait MemberRepo: Send + Sync {
    async fn create_member(&self, member: NewMember) -> anyhow::Result<Member>;
    async fn get_member(&self, id: Uuid) -> anyhow::Result<Option<Member>>;
    async fn get_credentials(&self, email: &str) -> anyhow::Result<Option<StoredCredentials>>;
    /// Newest first.
    async fn list_members(&self) -> anyhow::Result<Vec<Member>>;
    async fn list_members_with_roles(&self, roles: &[Role]) -> anyhow::Result<Vec<Member>>;
    /// Display names for the given ids; unknown ids are absent from the map.
    async fn member_names(&self, ids: &[Uuid]) -> anyhow::Result<HashMap<Uuid, String>>;
    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        avatar_url: Option<String>,
    ) -> anyhow::Result<Option<Member>>;
    async fn set_role(&self, id: Uuid, role: Role) -> anyhow::Result<Option<Member>>;
    /// Deletes the member and their sessions in one write.
    async fn delete_member(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn count_approved_members(&self) -> anyhow::Result<i64>;

    async fn create_session(
        &self,
        token_digest: &str,
        member_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;
    async fn find_session(&self, token_digest: &str) -> anyhow::Result<Option<SessionRecord>>;
    async fn delete_session(&self, token_digest: &str) -> anyhow::Result<()>;
}

/// The book catalog.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait BookRepo: Send + Sync {
    async fn create_book(&self, book: NewBook) -> anyhow::Result<Book>;
    async fn get_book(&self, id: Uuid) -> anyhow::Result<Option<Book>>;
    async fn get_books(&self, ids: &[Uuid]) -> anyhow::Result<HashMap<Uuid, Book>>;
    /// Newest first.
    async fn list_books(&self) -> anyhow::Result<Vec<Book>>;
    async fn list_books_with_status(&self, statuses: &[BookStatus]) -> anyhow::Result<Vec<Book>>;
    async fn count_books(&self) -> anyhow::Result<i64>;
}

/// Date votes, schedules, book candidates and book votes.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ScheduleRepo: Send + Sync {
    // Date votes
    /// Returns `false` when the vote already existed.
    async fn cast_date_vote(&self, member_id: Uuid, date: NaiveDate) -> anyhow::Result<bool>;
    async fn retract_date_vote(&self, member_id: Uuid, date: NaiveDate) -> anyhow::Result<bool>;
    async fn date_votes_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<DateVote>>;

    // Schedules
    async fn get_schedule(&self, id: Uuid) -> anyhow::Result<Option<Schedule>>;
    async fn schedule_on(&self, date: NaiveDate) -> anyhow::Result<Option<Schedule>>;
    async fn schedules_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<Schedule>>;
    /// Meeting date on or after `from`, soonest first.
    async fn upcoming_schedules(&self, from: NaiveDate) -> anyhow::Result<Vec<Schedule>>;
    /// Meeting date before `before`, latest first.
    async fn past_schedules(&self, before: NaiveDate, limit: i64) -> anyhow::Result<Vec<Schedule>>;
    async fn schedules_for_book(&self, book_id: Uuid) -> anyhow::Result<Vec<Schedule>>;
    async fn count_schedules(&self) -> anyhow::Result<i64>;
    /// Inserts the schedule, registers and selects `book_id` if given, and
    /// clears the date votes of its meeting date, in one write.
    async fn confirm_schedule(&self, schedule: NewSchedule) -> anyhow::Result<Schedule>;
    async fn update_schedule_details(
        &self,
        id: Uuid,
        meeting_time: Option<NaiveTime>,
        location: Option<String>,
    ) -> anyhow::Result<Option<Schedule>>;
    /// Deletes the schedule and every row scoped to it in one write; a
    /// selected book of an unrevealed schedule goes back to `nominated`.
    async fn cancel_schedule(&self, id: Uuid) -> anyhow::Result<bool>;

    // Candidates
    async fn add_candidate(&self, schedule_id: Uuid, book_id: Uuid) -> anyhow::Result<BookCandidate>;
    async fn get_candidate(&self, id: Uuid) -> anyhow::Result<Option<BookCandidate>>;
    async fn find_candidate(
        &self,
        schedule_id: Uuid,
        book_id: Uuid,
    ) -> anyhow::Result<Option<BookCandidate>>;
    async fn list_candidates(&self, schedule_id: Uuid) -> anyhow::Result<Vec<BookCandidate>>;
    /// Deletes the candidate and its votes in one write.
    async fn remove_candidate(&self, id: Uuid) -> anyhow::Result<bool>;

    // Book votes
    /// Returns `false` when the vote already existed.
    async fn cast_book_vote(
        &self,
        schedule_id: Uuid,
        book_id: Uuid,
        member_id: Uuid,
    ) -> anyhow::Result<bool>;
    async fn retract_book_vote(
        &self,
        schedule_id: Uuid,
        book_id: Uuid,
        member_id: Uuid,
    ) -> anyhow::Result<bool>;
    async fn list_book_votes(&self, schedule_id: Uuid) -> anyhow::Result<Vec<BookVote>>;

    /// Sets the schedule's book and the book statuses in one write.
    async fn select_book(&self, schedule_id: Uuid, book_id: Uuid) -> anyhow::Result<Option<Schedule>>;
    /// Completes the selected book and flips `is_revealed` in one write.
    async fn reveal(&self, schedule_id: Uuid) -> anyhow::Result<Option<Schedule>>;
}

/// Submissions, meeting chat and attendance.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait MeetingRepo: Send + Sync {
    /// Inserts or replaces the (schedule, member) submission with its
    /// discussion entries in one write.
    async fn upsert_submission(&self, draft: SubmissionDraft) -> anyhow::Result<MeetingSubmission>;
    async fn get_submission(&self, id: Uuid) -> anyhow::Result<Option<MeetingSubmission>>;
    async fn find_submission(
        &self,
        schedule_id: Uuid,
        member_id: Uuid,
    ) -> anyhow::Result<Option<MeetingSubmission>>;
    async fn list_submissions(&self, schedule_id: Uuid) -> anyhow::Result<Vec<MeetingSubmission>>;

    async fn add_submission_comment(
        &self,
        submission_id: Uuid,
        member_id: Uuid,
        content: String,
    ) -> anyhow::Result<SubmissionComment>;
    /// Comments on all submissions of a schedule, oldest first.
    async fn list_submission_comments(&self, schedule_id: Uuid) -> anyhow::Result<Vec<SubmissionComment>>;

    async fn add_meeting_comment(
        &self,
        schedule_id: Uuid,
        member_id: Uuid,
        content: String,
    ) -> anyhow::Result<MeetingComment>;
    async fn list_meeting_comments(&self, schedule_id: Uuid) -> anyhow::Result<Vec<MeetingComment>>;

    /// Last write wins per (schedule, member).
    async fn set_attendance(
        &self,
        schedule_id: Uuid,
        member_id: Uuid,
        status: AttendanceStatus,
    ) -> anyhow::Result<Attendance>;
    async fn list_attendance(&self, schedule_id: Uuid) -> anyhow::Result<Vec<Attendance>>;
}

/// Board posts, discussions, reviews, recaps and generic comments.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ContentRepo: Send + Sync {
    async fn create_board_post(
        &self,
        member_id: Uuid,
        title: String,
        content: String,
    ) -> anyhow::Result<BoardPost>;
    async fn list_board_posts(&self) -> anyhow::Result<Vec<BoardPost>>;
    async fn get_board_post(&self, id: Uuid) -> anyhow::Result<Option<BoardPost>>;
    /// Deletes the post and its comments in one write.
    async fn delete_board_post(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn add_board_comment(
        &self,
        post_id: Uuid,
        member_id: Uuid,
        content: String,
    ) -> anyhow::Result<BoardComment>;
    async fn list_board_comments(&self, post_id: Uuid) -> anyhow::Result<Vec<BoardComment>>;

    async fn create_discussion(&self, discussion: NewDiscussion) -> anyhow::Result<Discussion>;
    async fn list_discussions(&self, book_id: Option<Uuid>) -> anyhow::Result<Vec<Discussion>>;
    async fn get_discussion(&self, id: Uuid) -> anyhow::Result<Option<Discussion>>;

    async fn create_review(&self, review: NewReview) -> anyhow::Result<Review>;
    async fn list_reviews(&self, book_id: Option<Uuid>) -> anyhow::Result<Vec<Review>>;
    async fn get_review(&self, id: Uuid) -> anyhow::Result<Option<Review>>;

    async fn create_recap(&self, recap: NewRecap) -> anyhow::Result<Recap>;
    async fn list_recaps(&self) -> anyhow::Result<Vec<Recap>>;
    async fn get_recap(&self, id: Uuid) -> anyhow::Result<Option<Recap>>;

    /// Deletes a discussion, review or recap together with its comments.
    async fn delete_commentable(&self, kind: CommentableType, id: Uuid) -> anyhow::Result<bool>;

    async fn add_comment(
        &self,
        kind: CommentableType,
        target_id: Uuid,
        member_id: Uuid,
        content: String,
    ) -> anyhow::Result<Comment>;
    async fn list_comments(&self, kind: CommentableType, target_id: Uuid) -> anyhow::Result<Vec<Comment>>;
    async fn get_comment(&self, id: Uuid) -> anyhow::Result<Option<Comment>>;
    async fn delete_comment(&self, id: Uuid) -> anyhow::Result<bool>;

    async fn content_counts(&self) -> anyhow::Result<ContentCounts>;
}

/// Media storage contract for handling uploads and thumbnails.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Saves raw bytes on behalf of `owner` and returns a media_id.
    async fn save_upload(&self, owner: Uuid, data: Vec<u8>, content_type: &str) -> anyhow::Result<String>;
    /// Returns the public URL of the original media.
    async fn get_url(&self, media_id: &str) -> String;
    /// Maps a public URL this store issued to its thumbnail's URL. `None`
    /// for URLs from elsewhere.
    async fn get_thumbnail_url(&self, url: &str) -> Option<String>;
}

/// Password and session-token primitives.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    fn hash_password(&self, password: &str) -> anyhow::Result<String>;
    async fn verify_password(&self, password: &str, hash: &str) -> bool;
    /// A fresh opaque token handed to the client once.
    fn issue_token(&self) -> anyhow::Result<String>;
    /// The stored form of a token.
    fn token_digest(&self, token: &str) -> String;
}

/// Source of "now", injectable for reveal-date checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
