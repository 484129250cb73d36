//! Response shapes: stored rows plus resolved display names.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use bc_core::models::*;
use bc_core::rating::Rating;

#[derive(Debug, Clone, Serialize)]
pub struct MemberSummary {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

impl From<&Member> for MemberSummary {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id,
            name: member.name.clone(),
            role: member.role,
        }
    }
}

// ── Scheduling ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DateTally {
    pub date: NaiveDate,
    pub count: usize,
    pub voters: Vec<String>,
    pub has_my_vote: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleSummary {
    #[serde(flatten)]
    pub schedule: Schedule,
    pub phase: MeetingPhase,
    pub presenter_name: String,
    pub book_title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MonthOverview {
    pub month_start: NaiveDate,
    pub month_end: NaiveDate,
    pub tallies: Vec<DateTally>,
    pub schedules: Vec<ScheduleSummary>,
    /// Approved members, for presenter choice
    pub members: Vec<MemberSummary>,
    /// Books that may still be nominated
    pub books: Vec<Book>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateTally {
    pub candidate_id: Uuid,
    pub book: Book,
    pub votes: usize,
    pub voters: Vec<String>,
    pub has_my_vote: bool,
    pub is_selected: bool,
}

// ── Meetings ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionView {
    #[serde(flatten)]
    pub submission: MeetingSubmission,
    pub member_name: String,
}

/// Who has submitted, without any content.
#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    pub member_id: Uuid,
    pub name: String,
    pub submitted: bool,
    pub char_count: usize,
    pub has_one_liner: bool,
    pub has_rating: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionCommentView {
    #[serde(flatten)]
    pub comment: SubmissionComment,
    pub member_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeetingCommentView {
    #[serde(flatten)]
    pub comment: MeetingComment,
    pub member_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceView {
    #[serde(flatten)]
    pub attendance: Attendance,
    pub member_name: String,
}

#[derive(Debug, Serialize)]
pub struct MeetingDetail {
    #[serde(flatten)]
    pub summary: ScheduleSummary,
    pub book: Option<Book>,
    /// Own submission only while collecting; everyone's once revealed
    pub submissions: Vec<SubmissionView>,
    pub roster: Vec<RosterEntry>,
    pub submission_comments: Vec<SubmissionCommentView>,
    pub meeting_comments: Vec<MeetingCommentView>,
    pub attendance: Vec<AttendanceView>,
    pub can_reveal: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamedRating {
    pub name: String,
    pub rating: Rating,
}

#[derive(Debug, Serialize)]
pub struct PastMeeting {
    #[serde(flatten)]
    pub summary: ScheduleSummary,
    /// Empty until the meeting is revealed
    pub ratings: Vec<NamedRating>,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct MeetingList {
    pub upcoming: Vec<ScheduleSummary>,
    pub past: Vec<PastMeeting>,
}

// ── Catalog ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct BookView {
    #[serde(flatten)]
    pub book: Book,
    pub creator_name: String,
}

#[derive(Debug, Serialize)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: BookView,
    pub schedules: Vec<Schedule>,
    pub discussions: Vec<DiscussionView>,
    pub reviews: Vec<ReviewView>,
}

// ── Community ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct BoardPostView {
    #[serde(flatten)]
    pub post: BoardPost,
    pub author_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardCommentView {
    #[serde(flatten)]
    pub comment: BoardComment,
    pub author_name: String,
}

#[derive(Debug, Serialize)]
pub struct BoardPostDetail {
    #[serde(flatten)]
    pub post: BoardPostView,
    pub comments: Vec<BoardCommentView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscussionView {
    #[serde(flatten)]
    pub discussion: Discussion,
    pub author_name: String,
    pub book_title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: Review,
    pub author_name: String,
    pub book_title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecapView {
    #[serde(flatten)]
    pub recap: Recap,
    pub author_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author_name: String,
}

/// A discussion, review or recap with its comment thread.
#[derive(Debug, Serialize)]
pub struct Thread<T> {
    #[serde(flatten)]
    pub item: T,
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GalleryPhoto {
    pub url: String,
    /// Smaller rendition, when the photo was uploaded here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
    pub title: String,
    pub author: String,
    pub recap_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// ── Accounts ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SignedIn {
    pub token: String,
    pub member: Member,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct AdminCounts {
    pub approved_members: i64,
    pub books: i64,
    pub schedules: i64,
    pub discussions: i64,
    pub reviews: i64,
    pub recaps: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminOverview {
    pub members: Vec<Member>,
    pub counts: AdminCounts,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub ok: bool,
    pub members: i64,
    pub timestamp: DateTime<Utc>,
}
