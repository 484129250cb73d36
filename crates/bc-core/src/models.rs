//! # Domain Models
//!
//! These structs represent the core entities of the book club.
//! We use UUID v7 for time-ordered, globally unique identification.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::rating::Rating;

/// Account role. New sign-ups start as `Pending` until an admin approves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
    Visitor,
    Pending,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
            Role::Visitor => "visitor",
            Role::Pending => "pending",
        }
    }

    /// Admins and members take part in meetings; visitors only read.
    pub fn is_participant(self) -> bool {
        matches!(self, Role::Admin | Role::Member)
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            "visitor" => Ok(Role::Visitor),
            "pending" => Ok(Role::Pending),
            other => Err(AppError::invalid(format!("unknown role `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sign-up payload after validation and password hashing.
#[derive(Debug, Clone)]
pub struct NewMember {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
}

/// A member row together with its stored password hash. Never serialized.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub member: Member,
    pub password_hash: String,
}

/// A persisted session, looked up by token digest.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub member_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    /// Newly registered
    Waiting,
    /// Was a candidate for a meeting but not picked
    Nominated,
    /// Picked as a meeting's book, discussion pending
    Selected,
    /// Its meeting has been revealed
    Completed,
}

impl BookStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookStatus::Waiting => "waiting",
            BookStatus::Nominated => "nominated",
            BookStatus::Selected => "selected",
            BookStatus::Completed => "completed",
        }
    }

    /// Statuses a book may have while it can still be nominated.
    pub const NOMINATABLE: [BookStatus; 3] =
        [BookStatus::Waiting, BookStatus::Nominated, BookStatus::Selected];
}

impl FromStr for BookStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(BookStatus::Waiting),
            "nominated" => Ok(BookStatus::Nominated),
            "selected" => Ok(BookStatus::Selected),
            "completed" => Ok(BookStatus::Completed),
            other => Err(AppError::invalid(format!("unknown book status `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub isbn: Option<String>,
    pub category: Option<String>,
    /// Why the creator proposed this book
    pub selection_reason: Option<String>,
    pub status: BookStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub isbn: Option<String>,
    pub category: Option<String>,
    pub selection_reason: Option<String>,
    #[serde(skip)]
    pub created_by: Uuid,
}

/// One member's availability vote for one calendar date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateVote {
    pub member_id: Uuid,
    pub vote_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Confirmed,
}

impl ScheduleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleStatus::Confirmed => "confirmed",
        }
    }
}

impl FromStr for ScheduleStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(ScheduleStatus::Confirmed),
            other => Err(AppError::invalid(format!("unknown schedule status `{other}`"))),
        }
    }
}

/// Lifecycle of a confirmed meeting's submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingPhase {
    /// Members write private submissions
    Collecting,
    /// Submissions are readable by everyone; terminal
    Revealed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub title: String,
    pub meeting_date: NaiveDate,
    pub meeting_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub presenter_id: Uuid,
    pub selected_book_id: Option<Uuid>,
    pub status: ScheduleStatus,
    /// One-way flag, false → true
    pub is_revealed: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    pub fn phase(&self) -> MeetingPhase {
        if self.is_revealed {
            MeetingPhase::Revealed
        } else {
            MeetingPhase::Collecting
        }
    }

    pub fn is_presenter(&self, member_id: Uuid) -> bool {
        self.presenter_id == member_id
    }
}

/// Input to schedule confirmation.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub title: String,
    pub meeting_date: NaiveDate,
    pub presenter_id: Uuid,
    /// Registered as a candidate and selected in the same write
    pub book_id: Option<Uuid>,
    pub created_by: Uuid,
}

/// A book nominated for a specific schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookCandidate {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub book_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookVote {
    pub schedule_id: Uuid,
    pub book_id: Uuid,
    pub member_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A member's private write-up for a meeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingSubmission {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub member_id: Uuid,
    /// Ordered discussion points
    pub discussion: Vec<String>,
    pub one_liner: Option<String>,
    pub rating: Option<Rating>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MeetingSubmission {
    /// Total characters across all discussion entries.
    pub fn char_count(&self) -> usize {
        self.discussion.iter().map(|d| d.chars().count()).sum()
    }
}

/// Upsert payload keyed by (schedule, member).
#[derive(Debug, Clone)]
pub struct SubmissionDraft {
    pub schedule_id: Uuid,
    pub member_id: Uuid,
    pub discussion: Vec<String>,
    pub one_liner: Option<String>,
    pub rating: Option<Rating>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionComment {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub member_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingComment {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub member_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Attending,
    NotAttending,
    Maybe,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Attending => "attending",
            AttendanceStatus::NotAttending => "not_attending",
            AttendanceStatus::Maybe => "maybe",
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attending" => Ok(AttendanceStatus::Attending),
            "not_attending" => Ok(AttendanceStatus::NotAttending),
            "maybe" => Ok(AttendanceStatus::Maybe),
            other => Err(AppError::invalid(format!("unknown attendance status `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendance {
    pub schedule_id: Uuid,
    pub member_id: Uuid,
    pub status: AttendanceStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardPost {
    pub id: Uuid,
    pub member_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardComment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub member_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discussion {
    pub id: Uuid,
    pub book_id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub member_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDiscussion {
    pub book_id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    #[serde(skip)]
    pub member_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub book_id: Uuid,
    pub member_id: Uuid,
    pub title: String,
    pub content: String,
    /// Whole stars, 1..=5
    pub rating: u8,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub book_id: Uuid,
    pub title: String,
    pub content: String,
    pub rating: u8,
    #[serde(skip)]
    pub member_id: Uuid,
}

/// A photo recap of a meeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recap {
    pub id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub member_id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub photos: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRecap {
    pub schedule_id: Option<Uuid>,
    pub title: String,
    pub content: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(skip)]
    pub member_id: Uuid,
}

/// Content kinds that accept generic comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentableType {
    Discussion,
    Review,
    Recap,
}

impl CommentableType {
    pub fn as_str(self) -> &'static str {
        match self {
            CommentableType::Discussion => "discussion",
            CommentableType::Review => "review",
            CommentableType::Recap => "recap",
        }
    }
}

impl FromStr for CommentableType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discussion" => Ok(CommentableType::Discussion),
            "review" => Ok(CommentableType::Review),
            "recap" => Ok(CommentableType::Recap),
            other => Err(AppError::invalid(format!("unknown commentable type `{other}`"))),
        }
    }
}

impl fmt::Display for CommentableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub commentable_type: CommentableType,
    pub commentable_id: Uuid,
    pub member_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Row counts shown on the admin console.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ContentCounts {
    pub discussions: i64,
    pub reviews: i64,
    pub recaps: i64,
}
