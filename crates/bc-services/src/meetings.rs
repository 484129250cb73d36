//! Private submissions, the reveal, and the meeting pages around them.
//!
//! A meeting is `collecting` until its presenter (or an admin) reveals it
//! on or after the meeting date. While collecting, members only ever see
//! their own submission; the roster says who has written something and
//! how much, never what. Reveal is one-way.

use bc_core::error::{AppError, Result};
use bc_core::models::{MeetingSubmission, Role, Schedule, SubmissionDraft};
use bc_core::policy::{authorize, can, Action, Resource, Session};
use bc_core::rating::Rating;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::scheduling::summarize;
use crate::views::*;
use crate::{found, name_of, optional_text, required_text, Ports};

/// How many past meetings the meetings page lists.
const PAST_MEETINGS: i64 = 20;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionInput {
    #[serde(default)]
    pub discussion: Vec<String>,
    #[serde(default)]
    pub one_liner: Option<String>,
    /// 0.5 to 5 in half steps; 0 or absent clears the rating
    #[serde(default)]
    pub rating: Option<f64>,
}

pub struct MeetingService {
    ports: Ports,
}

fn clean_discussion(entries: Vec<String>) -> Vec<String> {
    entries
        .into_iter()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect()
}

fn ensure_collecting(schedule: &Schedule) -> Result<()> {
    if schedule.is_revealed {
        return Err(AppError::invalid("submissions are closed once the meeting is revealed"));
    }
    Ok(())
}

fn ensure_revealed(schedule: &Schedule) -> Result<()> {
    if !schedule.is_revealed {
        return Err(AppError::invalid("comments open once the meeting is revealed"));
    }
    Ok(())
}

impl MeetingService {
    pub fn new(ports: Ports) -> Self {
        Self { ports }
    }

    async fn schedule(&self, schedule_id: Uuid) -> Result<Schedule> {
        found(
            self.ports.schedules.get_schedule(schedule_id).await?,
            "Schedule",
            schedule_id,
        )
    }

    /// Creates or replaces the caller's own submission.
    pub async fn upsert_submission(
        &self,
        actor: &Session,
        schedule_id: Uuid,
        input: SubmissionInput,
    ) -> Result<MeetingSubmission> {
        authorize(actor, Action::WriteSubmission, Resource::OwnedBy(actor.member_id))?;
        let schedule = self.schedule(schedule_id).await?;
        ensure_collecting(&schedule)?;

        let draft = SubmissionDraft {
            schedule_id,
            member_id: actor.member_id,
            discussion: clean_discussion(input.discussion),
            one_liner: optional_text(input.one_liner),
            rating: Rating::from_input(input.rating)?,
        };
        Ok(self.ports.meetings.upsert_submission(draft).await?)
    }

    /// Applies a star click to the caller's rating, keeping the rest of the
    /// draft.
    pub async fn click_star(&self, actor: &Session, schedule_id: Uuid, star: u8) -> Result<MeetingSubmission> {
        authorize(actor, Action::WriteSubmission, Resource::OwnedBy(actor.member_id))?;
        let schedule = self.schedule(schedule_id).await?;
        ensure_collecting(&schedule)?;

        let current = self
            .ports
            .meetings
            .find_submission(schedule_id, actor.member_id)
            .await?;
        let rating = Rating::click(current.as_ref().and_then(|s| s.rating), star)?;

        let (discussion, one_liner) = match current {
            Some(existing) => (existing.discussion, existing.one_liner),
            None => (Vec::new(), None),
        };
        let draft = SubmissionDraft {
            schedule_id,
            member_id: actor.member_id,
            discussion,
            one_liner,
            rating: Some(rating),
        };
        Ok(self.ports.meetings.upsert_submission(draft).await?)
    }

    /// Admin or presenter, on or after the meeting date. Completes the
    /// selected book and opens every submission. Repeating it is harmless.
    pub async fn reveal(&self, actor: &Session, schedule_id: Uuid) -> Result<Schedule> {
        let schedule = self.schedule(schedule_id).await?;
        authorize(actor, Action::Reveal, Resource::Schedule(&schedule))?;

        let today = self.ports.clock.today();
        if today < schedule.meeting_date {
            return Err(AppError::invalid(format!(
                "submissions can be revealed from {}",
                schedule.meeting_date
            )));
        }

        let revealed = found(
            self.ports.schedules.reveal(schedule_id).await?,
            "Schedule",
            schedule_id,
        )?;
        info!(%schedule_id, by = %actor.member_id, "meeting revealed");
        Ok(revealed)
    }

    pub async fn meeting_detail(&self, actor: &Session, schedule_id: Uuid) -> Result<MeetingDetail> {
        authorize(actor, Action::ReadClub, Resource::Club)?;
        let schedule = self.schedule(schedule_id).await?;
        let revealed = schedule.is_revealed;

        let book = match schedule.selected_book_id {
            Some(id) => self.ports.books.get_book(id).await?,
            None => None,
        };
        let can_reveal = !revealed
            && can(actor, Action::Reveal, Resource::Schedule(&schedule))
            && self.ports.clock.today() >= schedule.meeting_date;

        let roster_members = self
            .ports
            .members
            .list_members_with_roles(&[Role::Admin, Role::Member])
            .await?;
        let all_submissions = self.ports.meetings.list_submissions(schedule_id).await?;

        let roster = roster_members
            .iter()
            .map(|member| {
                let own = all_submissions.iter().find(|s| s.member_id == member.id);
                RosterEntry {
                    member_id: member.id,
                    name: member.name.clone(),
                    submitted: own.is_some(),
                    char_count: own.map(MeetingSubmission::char_count).unwrap_or(0),
                    has_one_liner: own.is_some_and(|s| s.one_liner.is_some()),
                    has_rating: own.is_some_and(|s| s.rating.is_some()),
                }
            })
            .collect();

        let visible: Vec<MeetingSubmission> = all_submissions
            .into_iter()
            .filter(|s| revealed || s.member_id == actor.member_id)
            .collect();

        let (submission_comments, meeting_comments) = if revealed {
            (
                self.ports.meetings.list_submission_comments(schedule_id).await?,
                self.ports.meetings.list_meeting_comments(schedule_id).await?,
            )
        } else {
            (Vec::new(), Vec::new())
        };
        let attendance = self.ports.meetings.list_attendance(schedule_id).await?;

        let mut ids: Vec<Uuid> = visible.iter().map(|s| s.member_id).collect();
        ids.extend(submission_comments.iter().map(|c| c.member_id));
        ids.extend(meeting_comments.iter().map(|c| c.member_id));
        ids.extend(attendance.iter().map(|a| a.member_id));
        let names = self.ports.members.member_names(&ids).await?;

        let summary = summarize(&self.ports, vec![schedule])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("schedule summary missing".to_string()))?;

        Ok(MeetingDetail {
            summary,
            book,
            submissions: visible
                .into_iter()
                .map(|submission| SubmissionView {
                    member_name: name_of(&names, submission.member_id),
                    submission,
                })
                .collect(),
            roster,
            submission_comments: submission_comments
                .into_iter()
                .map(|comment| SubmissionCommentView {
                    member_name: name_of(&names, comment.member_id),
                    comment,
                })
                .collect(),
            meeting_comments: meeting_comments
                .into_iter()
                .map(|comment| MeetingCommentView {
                    member_name: name_of(&names, comment.member_id),
                    comment,
                })
                .collect(),
            attendance: attendance
                .into_iter()
                .map(|attendance| AttendanceView {
                    member_name: name_of(&names, attendance.member_id),
                    attendance,
                })
                .collect(),
            can_reveal,
        })
    }

    /// Upcoming meetings soonest first; the last past meetings latest first,
    /// with ratings once revealed.
    pub async fn list_meetings(&self, actor: &Session) -> Result<MeetingList> {
        authorize(actor, Action::ReadClub, Resource::Club)?;
        let today = self.ports.clock.today();

        let upcoming = self.ports.schedules.upcoming_schedules(today).await?;
        let upcoming = summarize(&self.ports, upcoming).await?;

        let past = self.ports.schedules.past_schedules(today, PAST_MEETINGS).await?;
        let past = summarize(&self.ports, past).await?;

        let mut past_meetings = Vec::with_capacity(past.len());
        for summary in past {
            let ratings = if summary.schedule.is_revealed {
                self.ratings_of(summary.schedule.id).await?
            } else {
                Vec::new()
            };
            let average_rating = (!ratings.is_empty()).then(|| {
                ratings.iter().map(|r| r.rating.value()).sum::<f64>() / ratings.len() as f64
            });
            past_meetings.push(PastMeeting {
                summary,
                ratings,
                average_rating,
            });
        }

        Ok(MeetingList {
            upcoming,
            past: past_meetings,
        })
    }

    async fn ratings_of(&self, schedule_id: Uuid) -> Result<Vec<NamedRating>> {
        let submissions = self.ports.meetings.list_submissions(schedule_id).await?;
        let ids: Vec<Uuid> = submissions.iter().map(|s| s.member_id).collect();
        let names = self.ports.members.member_names(&ids).await?;

        Ok(submissions
            .iter()
            .filter_map(|s| {
                s.rating.map(|rating| NamedRating {
                    name: name_of(&names, s.member_id),
                    rating,
                })
            })
            .collect())
    }

    /// Any participant, on any submission of a revealed meeting.
    pub async fn add_submission_comment(
        &self,
        actor: &Session,
        submission_id: Uuid,
        content: &str,
    ) -> Result<SubmissionCommentView> {
        authorize(actor, Action::Comment, Resource::Club)?;
        let content = required_text("content", content)?;

        let submission = found(
            self.ports.meetings.get_submission(submission_id).await?,
            "Submission",
            submission_id,
        )?;
        let schedule = self.schedule(submission.schedule_id).await?;
        ensure_revealed(&schedule)?;

        let comment = self
            .ports
            .meetings
            .add_submission_comment(submission_id, actor.member_id, content)
            .await?;
        Ok(SubmissionCommentView {
            comment,
            member_name: actor.name.clone(),
        })
    }

    /// Any participant, on a revealed meeting.
    pub async fn add_meeting_comment(
        &self,
        actor: &Session,
        schedule_id: Uuid,
        content: &str,
    ) -> Result<MeetingCommentView> {
        authorize(actor, Action::Comment, Resource::Club)?;
        let content = required_text("content", content)?;
        let schedule = self.schedule(schedule_id).await?;
        ensure_revealed(&schedule)?;

        let comment = self
            .ports
            .meetings
            .add_meeting_comment(schedule_id, actor.member_id, content)
            .await?;
        Ok(MeetingCommentView {
            comment,
            member_name: actor.name.clone(),
        })
    }

    /// Oldest first. Empty until the meeting is revealed.
    pub async fn list_meeting_comments(
        &self,
        actor: &Session,
        schedule_id: Uuid,
    ) -> Result<Vec<MeetingCommentView>> {
        authorize(actor, Action::ReadClub, Resource::Club)?;
        let schedule = self.schedule(schedule_id).await?;
        if !schedule.is_revealed {
            return Ok(Vec::new());
        }

        let comments = self.ports.meetings.list_meeting_comments(schedule_id).await?;
        let ids: Vec<Uuid> = comments.iter().map(|c| c.member_id).collect();
        let names = self.ports.members.member_names(&ids).await?;
        Ok(comments
            .into_iter()
            .map(|comment| MeetingCommentView {
                member_name: name_of(&names, comment.member_id),
                comment,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::ConfirmSchedule;
    use crate::test_support::{harness, harness_on, march_10, Harness};
    use bc_core::models::BookStatus;
    use bc_core::traits::{BookRepo, ScheduleRepo};
    use chrono::NaiveDate;

    async fn meeting(h: &Harness, presenter: &Session) -> Schedule {
        let admin = h.member("Ada", Role::Admin).await;
        h.services
            .scheduling
            .confirm(
                &admin,
                ConfirmSchedule {
                    date: march_10(),
                    presenter_id: presenter.member_id,
                    title: None,
                    book_id: None,
                },
            )
            .await
            .unwrap()
    }

    fn input(points: &[&str], rating: Option<f64>) -> SubmissionInput {
        SubmissionInput {
            discussion: points.iter().map(|p| p.to_string()).collect(),
            one_liner: None,
            rating,
        }
    }

    #[tokio::test]
    async fn test_discussion_entries_trimmed_and_blank_dropped() {
        let h = harness().await;
        let ann = h.member("Ann", Role::Member).await;
        let schedule = meeting(&h, &ann).await;

        let saved = h
            .services
            .meetings
            .upsert_submission(&ann, schedule.id, input(&["  first ", "", "   ", "second"], Some(0.0)))
            .await
            .unwrap();
        assert_eq!(saved.discussion, vec!["first", "second"]);
        assert_eq!(saved.rating, None);
    }

    #[tokio::test]
    async fn test_star_clicks_alternate() {
        let h = harness().await;
        let ann = h.member("Ann", Role::Member).await;
        let schedule = meeting(&h, &ann).await;
        h.services
            .meetings
            .upsert_submission(&ann, schedule.id, input(&["kept"], None))
            .await
            .unwrap();

        let mut seen = Vec::new();
        for _ in 0..3 {
            let saved = h.services.meetings.click_star(&ann, schedule.id, 3).await.unwrap();
            assert_eq!(saved.discussion, vec!["kept"]);
            seen.push(saved.rating.map(Rating::value));
        }
        assert_eq!(seen, vec![Some(3.0), Some(2.5), Some(3.0)]);
    }

    #[tokio::test]
    async fn test_reveal_before_meeting_date_rejected() {
        let h = harness_on(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()).await;
        let presenter = h.member("Pia", Role::Member).await;
        let schedule = meeting(&h, &presenter).await;

        let err = h
            .services
            .meetings
            .reveal(&presenter, schedule.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(!h.store.get_schedule(schedule.id).await.unwrap().unwrap().is_revealed);

        let detail = h.services.meetings.meeting_detail(&presenter, schedule.id).await.unwrap();
        assert!(!detail.can_reveal);
    }

    #[tokio::test]
    async fn test_roster_hides_content_until_reveal() {
        let h = harness().await;
        let presenter = h.member("Pia", Role::Member).await;
        let ann = h.member("Ann", Role::Member).await;
        let schedule = meeting(&h, &presenter).await;

        h.services
            .meetings
            .upsert_submission(&ann, schedule.id, input(&["topic1"], Some(4.0)))
            .await
            .unwrap();

        let seen_by_presenter = h
            .services
            .meetings
            .meeting_detail(&presenter, schedule.id)
            .await
            .unwrap();
        assert!(seen_by_presenter.submissions.is_empty());
        let ann_row = seen_by_presenter
            .roster
            .iter()
            .find(|r| r.member_id == ann.member_id)
            .unwrap();
        assert!(ann_row.submitted);
        assert_eq!(ann_row.char_count, 6);
        assert!(ann_row.has_rating);
        assert!(seen_by_presenter.can_reveal);

        let seen_by_ann = h.services.meetings.meeting_detail(&ann, schedule.id).await.unwrap();
        assert_eq!(seen_by_ann.submissions.len(), 1);
        assert!(!seen_by_ann.can_reveal);

        h.services.meetings.reveal(&presenter, schedule.id).await.unwrap();
        let after = h
            .services
            .meetings
            .meeting_detail(&presenter, schedule.id)
            .await
            .unwrap();
        assert_eq!(after.submissions.len(), 1);
        assert_eq!(after.submissions[0].member_name, "Ann");
    }

    #[tokio::test]
    async fn test_writes_after_reveal_rejected() {
        let h = harness().await;
        let presenter = h.member("Pia", Role::Member).await;
        let schedule = meeting(&h, &presenter).await;
        h.services.meetings.reveal(&presenter, schedule.id).await.unwrap();

        let err = h
            .services
            .meetings
            .upsert_submission(&presenter, schedule.id, input(&["late"], None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(h.services.meetings.click_star(&presenter, schedule.id, 2).await.is_err());
    }

    #[tokio::test]
    async fn test_comments_need_reveal() {
        let h = harness().await;
        let presenter = h.member("Pia", Role::Member).await;
        let schedule = meeting(&h, &presenter).await;
        let submission = h
            .services
            .meetings
            .upsert_submission(&presenter, schedule.id, input(&["point"], None))
            .await
            .unwrap();

        assert!(h
            .services
            .meetings
            .add_meeting_comment(&presenter, schedule.id, "hi")
            .await
            .is_err());
        assert!(h
            .services
            .meetings
            .add_submission_comment(&presenter, submission.id, "hi")
            .await
            .is_err());

        h.services.meetings.reveal(&presenter, schedule.id).await.unwrap();
        let comment = h
            .services
            .meetings
            .add_submission_comment(&presenter, submission.id, "  nice point ")
            .await
            .unwrap();
        assert_eq!(comment.comment.content, "nice point");
        h.services
            .meetings
            .add_meeting_comment(&presenter, schedule.id, "great meeting")
            .await
            .unwrap();

        let detail = h.services.meetings.meeting_detail(&presenter, schedule.id).await.unwrap();
        assert_eq!(detail.submission_comments.len(), 1);
        assert_eq!(detail.meeting_comments.len(), 1);
    }

    #[tokio::test]
    async fn test_past_meetings_show_ratings_only_when_revealed() {
        let h = harness_on(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()).await;
        let presenter = h.member("Pia", Role::Member).await;
        let ann = h.member("Ann", Role::Member).await;
        let schedule = meeting(&h, &presenter).await;
        for (who, rating) in [(&presenter, 4.0), (&ann, 3.0)] {
            h.services
                .meetings
                .upsert_submission(who, schedule.id, input(&["x"], Some(rating)))
                .await
                .unwrap();
        }

        let list = h.services.meetings.list_meetings(&ann).await.unwrap();
        assert!(list.upcoming.is_empty());
        assert!(list.past[0].ratings.is_empty());

        h.services.meetings.reveal(&presenter, schedule.id).await.unwrap();
        let list = h.services.meetings.list_meetings(&ann).await.unwrap();
        assert_eq!(list.past[0].ratings.len(), 2);
        assert_eq!(list.past[0].average_rating, Some(3.5));
    }

    #[tokio::test]
    async fn test_end_to_end_meeting_flow() {
        let h = harness().await;
        let admin = h.member("Ada", Role::Admin).await;
        let presenter = h.member("Pia", Role::Member).await;
        let m1 = h.member("Max", Role::Member).await;
        let m2 = h.member("Mia", Role::Member).await;

        h.services.dates.cast(&m1, march_10()).await.unwrap();
        let schedule = h
            .services
            .scheduling
            .confirm(
                &admin,
                ConfirmSchedule {
                    date: march_10(),
                    presenter_id: presenter.member_id,
                    title: None,
                    book_id: None,
                },
            )
            .await
            .unwrap();
        assert!(!schedule.is_revealed);
        assert!(h.store.date_votes_between(march_10(), march_10()).await.unwrap().is_empty());

        let a = h.book("Book A", &presenter).await;
        let b = h.book("Book B", &presenter).await;
        h.services.candidates.add_candidate(&presenter, schedule.id, a).await.unwrap();
        h.services.candidates.add_candidate(&presenter, schedule.id, b).await.unwrap();
        assert_eq!(h.store.list_candidates(schedule.id).await.unwrap().len(), 2);

        h.services.candidates.vote(&m1, schedule.id, a).await.unwrap();
        h.services.candidates.vote(&m2, schedule.id, a).await.unwrap();
        let tally = h.services.candidates.tally(&admin, schedule.id).await.unwrap();
        assert_eq!(tally[0].book.id, a);
        assert_eq!(tally[0].votes, 2);

        let selected = h
            .services
            .candidates
            .select_final_book(&admin, schedule.id, a)
            .await
            .unwrap();
        assert_eq!(selected.selected_book_id, Some(a));
        assert_eq!(h.store.get_book(a).await.unwrap().unwrap().status, BookStatus::Selected);

        h.services
            .meetings
            .upsert_submission(&m1, schedule.id, input(&["topic1"], Some(4.0)))
            .await
            .unwrap();
        let hidden = h.services.meetings.meeting_detail(&m2, schedule.id).await.unwrap();
        assert!(hidden.submissions.is_empty());

        for _ in 0..2 {
            let revealed = h.services.meetings.reveal(&presenter, schedule.id).await.unwrap();
            assert!(revealed.is_revealed);
            assert_eq!(h.store.get_book(a).await.unwrap().unwrap().status, BookStatus::Completed);
        }

        let visible = h.services.meetings.meeting_detail(&m2, schedule.id).await.unwrap();
        assert_eq!(visible.submissions.len(), 1);
        assert_eq!(visible.submissions[0].submission.discussion, vec!["topic1"]);
    }
}
