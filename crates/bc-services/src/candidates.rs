//! Book candidates of a meeting, votes on them, and the final pick.

use std::collections::HashMap;

use bc_core::error::{AppError, Result};
use bc_core::models::{BookStatus, Schedule};
use bc_core::policy::{authorize, Action, Resource, Session};
use tracing::info;
use uuid::Uuid;

use crate::views::CandidateTally;
use crate::{found, name_of, or_conflict, Ports};

pub struct CandidateService {
    ports: Ports,
}

fn ensure_open(schedule: &Schedule) -> Result<()> {
    if schedule.is_revealed {
        return Err(AppError::invalid("this meeting has been revealed and is locked"));
    }
    Ok(())
}

impl CandidateService {
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

    /// Admin or presenter. Nominates a book for the meeting.
    pub async fn add_candidate(
        &self,
        actor: &Session,
        schedule_id: Uuid,
        book_id: Uuid,
    ) -> Result<bc_core::models::BookCandidate> {
        let schedule = self.schedule(schedule_id).await?;
        authorize(actor, Action::ManageCandidates, Resource::Schedule(&schedule))?;
        ensure_open(&schedule)?;

        let book = found(self.ports.books.get_book(book_id).await?, "Book", book_id)?;
        if book.status == BookStatus::Completed {
            return Err(AppError::invalid("a completed book cannot be nominated"));
        }
        if self
            .ports
            .schedules
            .find_candidate(schedule_id, book_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!("\"{}\" is already a candidate", book.title)));
        }

        let candidate = self
            .ports
            .schedules
            .add_candidate(schedule_id, book_id)
            .await
            .map_err(or_conflict(format!("\"{}\" is already a candidate", book.title)))?;
        info!(%schedule_id, %book_id, "candidate added");
        Ok(candidate)
    }

    /// Admin or presenter. Drops a candidate and its votes.
    pub async fn remove_candidate(
        &self,
        actor: &Session,
        schedule_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<()> {
        let schedule = self.schedule(schedule_id).await?;
        authorize(actor, Action::ManageCandidates, Resource::Schedule(&schedule))?;
        ensure_open(&schedule)?;

        let candidate = self
            .ports
            .schedules
            .get_candidate(candidate_id)
            .await?
            .filter(|c| c.schedule_id == schedule_id);
        let candidate = found(candidate, "Candidate", candidate_id)?;

        if schedule.selected_book_id == Some(candidate.book_id) {
            return Err(AppError::invalid("the selected book cannot be removed"));
        }

        self.ports.schedules.remove_candidate(candidate_id).await?;
        Ok(())
    }

    /// Any participant. Returns `false` if the vote was already there.
    pub async fn vote(&self, actor: &Session, schedule_id: Uuid, book_id: Uuid) -> Result<bool> {
        authorize(actor, Action::VoteBook, Resource::Club)?;
        let schedule = self.schedule(schedule_id).await?;
        ensure_open(&schedule)?;

        if self
            .ports
            .schedules
            .find_candidate(schedule_id, book_id)
            .await?
            .is_none()
        {
            return Err(AppError::invalid("that book is not a candidate for this meeting"));
        }

        Ok(self
            .ports
            .schedules
            .cast_book_vote(schedule_id, book_id, actor.member_id)
            .await?)
    }

    /// Any participant. Returns `false` if there was no vote.
    pub async fn unvote(&self, actor: &Session, schedule_id: Uuid, book_id: Uuid) -> Result<bool> {
        authorize(actor, Action::VoteBook, Resource::Club)?;
        let schedule = self.schedule(schedule_id).await?;
        ensure_open(&schedule)?;

        Ok(self
            .ports
            .schedules
            .retract_book_vote(schedule_id, book_id, actor.member_id)
            .await?)
    }

    /// Candidates by vote count (most first), then title.
    pub async fn tally(&self, actor: &Session, schedule_id: Uuid) -> Result<Vec<CandidateTally>> {
        authorize(actor, Action::ReadClub, Resource::Club)?;
        let schedule = self.schedule(schedule_id).await?;

        let candidates = self.ports.schedules.list_candidates(schedule_id).await?;
        let votes = self.ports.schedules.list_book_votes(schedule_id).await?;

        let book_ids: Vec<Uuid> = candidates.iter().map(|c| c.book_id).collect();
        let voter_ids: Vec<Uuid> = votes.iter().map(|v| v.member_id).collect();
        let mut books = self.ports.books.get_books(&book_ids).await?;
        let names = self.ports.members.member_names(&voter_ids).await?;

        let mut voters_by_book: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for vote in &votes {
            voters_by_book.entry(vote.book_id).or_default().push(vote.member_id);
        }

        let mut tallies: Vec<CandidateTally> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let book = books.remove(&candidate.book_id)?;
                let voters = voters_by_book.remove(&candidate.book_id).unwrap_or_default();
                Some(CandidateTally {
                    candidate_id: candidate.id,
                    is_selected: schedule.selected_book_id == Some(book.id),
                    has_my_vote: voters.contains(&actor.member_id),
                    votes: voters.len(),
                    voters: voters.iter().map(|id| name_of(&names, *id)).collect(),
                    book,
                })
            })
            .collect();

        tallies.sort_by(|a, b| {
            b.votes
                .cmp(&a.votes)
                .then_with(|| a.book.title.cmp(&b.book.title))
        });
        Ok(tallies)
    }

    /// Admin or presenter. Picks one of the candidates as the meeting's book.
    pub async fn select_final_book(
        &self,
        actor: &Session,
        schedule_id: Uuid,
        book_id: Uuid,
    ) -> Result<Schedule> {
        let schedule = self.schedule(schedule_id).await?;
        authorize(actor, Action::SelectBook, Resource::Schedule(&schedule))?;
        ensure_open(&schedule)?;

        if self
            .ports
            .schedules
            .find_candidate(schedule_id, book_id)
            .await?
            .is_none()
        {
            return Err(AppError::invalid("only a candidate of this meeting can be selected"));
        }

        let updated = self.ports.schedules.select_book(schedule_id, book_id).await?;
        info!(%schedule_id, %book_id, "final book selected");
        found(updated, "Schedule", schedule_id)
    }
}
