//! # Authorization
//!
//! Every permission rule of the club lives in [`can`]. Services resolve the
//! resource first, then ask once per request.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Role, Schedule};

/// The signed-in caller, resolved once per request by the session middleware.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub member_id: Uuid,
    pub name: String,
    pub role: Role,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ReadClub,
    EditProfile,
    CastDateVote,
    ConfirmSchedule,
    UpdateScheduleDetails,
    CancelSchedule,
    ManageCandidates,
    VoteBook,
    SelectBook,
    WriteSubmission,
    Reveal,
    Comment,
    SetAttendance,
    CreateContent,
    DeleteContent,
    Upload,
    ManageMembers,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Action::ReadClub => "read club content",
            Action::EditProfile => "edit this profile",
            Action::CastDateVote => "vote on dates",
            Action::ConfirmSchedule => "confirm schedules",
            Action::UpdateScheduleDetails => "edit this schedule",
            Action::CancelSchedule => "cancel schedules",
            Action::ManageCandidates => "manage book candidates",
            Action::VoteBook => "vote on books",
            Action::SelectBook => "select the meeting book",
            Action::WriteSubmission => "write this submission",
            Action::Reveal => "reveal this meeting",
            Action::Comment => "comment",
            Action::SetAttendance => "set attendance",
            Action::CreateContent => "create content",
            Action::DeleteContent => "delete this content",
            Action::Upload => "upload files",
            Action::ManageMembers => "manage members",
        };
        f.write_str(text)
    }
}

/// What an action is aimed at.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    /// Club-wide actions with no specific target
    Club,
    Schedule(&'a Schedule),
    /// Authored content or a submission, by its owner
    OwnedBy(Uuid),
    /// A member account
    Member(Uuid),
}

pub fn can(actor: &Session, action: Action, resource: Resource<'_>) -> bool {
    let participant = actor.role.is_participant();

    match action {
        Action::EditProfile => matches!(resource, Resource::Member(id) if id == actor.member_id),
        Action::ReadClub => actor.role != Role::Pending,
        Action::ConfirmSchedule | Action::CancelSchedule | Action::ManageMembers => {
            actor.is_admin()
        }
        Action::UpdateScheduleDetails
        | Action::ManageCandidates
        | Action::SelectBook
        | Action::Reveal => {
            actor.is_admin()
                || (participant
                    && matches!(resource, Resource::Schedule(s) if s.is_presenter(actor.member_id)))
        }
        Action::WriteSubmission => {
            participant && matches!(resource, Resource::OwnedBy(owner) if owner == actor.member_id)
        }
        Action::DeleteContent => {
            actor.is_admin()
                || (participant
                    && matches!(resource, Resource::OwnedBy(owner) if owner == actor.member_id))
        }
        Action::CastDateVote
        | Action::VoteBook
        | Action::Comment
        | Action::SetAttendance
        | Action::CreateContent
        | Action::Upload => participant,
    }
}

/// [`can`], as a `Forbidden` error.
pub fn authorize(actor: &Session, action: Action, resource: Resource<'_>) -> Result<()> {
    if can(actor, action, resource) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("not permitted to {action}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScheduleStatus;
    use chrono::{NaiveDate, Utc};

    fn session(role: Role) -> Session {
        Session {
            member_id: Uuid::now_v7(),
            name: "reader".to_string(),
            role,
        }
    }

    fn schedule_presented_by(presenter_id: Uuid) -> Schedule {
        Schedule {
            id: Uuid::now_v7(),
            title: "March 10 meeting".to_string(),
            meeting_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            meeting_time: None,
            location: None,
            presenter_id,
            selected_book_id: None,
            status: ScheduleStatus::Confirmed,
            is_revealed: false,
            created_by: Uuid::now_v7(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_admin_only_actions() {
        let admin = session(Role::Admin);
        let member = session(Role::Member);
        for action in [Action::ConfirmSchedule, Action::CancelSchedule, Action::ManageMembers] {
            assert!(can(&admin, action, Resource::Club));
            assert!(!can(&member, action, Resource::Club));
        }
    }

    #[test]
    fn test_presenter_scoped_actions() {
        let presenter = session(Role::Member);
        let other = session(Role::Member);
        let admin = session(Role::Admin);
        let schedule = schedule_presented_by(presenter.member_id);

        for action in [
            Action::UpdateScheduleDetails,
            Action::ManageCandidates,
            Action::SelectBook,
            Action::Reveal,
        ] {
            assert!(can(&presenter, action, Resource::Schedule(&schedule)));
            assert!(can(&admin, action, Resource::Schedule(&schedule)));
            assert!(!can(&other, action, Resource::Schedule(&schedule)));
        }
    }

    #[test]
    fn test_demoted_presenter_loses_schedule_rights() {
        let visitor = session(Role::Visitor);
        let schedule = schedule_presented_by(visitor.member_id);
        assert!(!can(&visitor, Action::Reveal, Resource::Schedule(&schedule)));
    }

    #[test]
    fn test_pending_only_edits_own_profile() {
        let pending = session(Role::Pending);
        assert!(can(&pending, Action::EditProfile, Resource::Member(pending.member_id)));
        assert!(!can(&pending, Action::EditProfile, Resource::Member(Uuid::now_v7())));
        assert!(!can(&pending, Action::ReadClub, Resource::Club));
        assert!(!can(&pending, Action::CastDateVote, Resource::Club));
    }

    #[test]
    fn test_visitor_reads_but_does_not_write() {
        let visitor = session(Role::Visitor);
        assert!(can(&visitor, Action::ReadClub, Resource::Club));
        assert!(!can(&visitor, Action::VoteBook, Resource::Club));
        assert!(!can(&visitor, Action::CreateContent, Resource::Club));
    }

    #[test]
    fn test_delete_content_author_or_admin() {
        let author = session(Role::Member);
        let stranger = session(Role::Member);
        let admin = session(Role::Admin);
        let owned = Resource::OwnedBy(author.member_id);
        assert!(can(&author, Action::DeleteContent, owned));
        assert!(can(&admin, Action::DeleteContent, owned));
        assert!(!can(&stranger, Action::DeleteContent, owned));
    }

    #[test]
    fn test_authorize_reports_action() {
        let member = session(Role::Member);
        let err = authorize(&member, Action::ConfirmSchedule, Resource::Club).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(msg) if msg.contains("confirm schedules")));
    }
}
