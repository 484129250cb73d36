//! Date-vote ledger: who is available on which day of a month.

use std::collections::BTreeMap;

use bc_core::error::{AppError, Result};
use bc_core::models::{BookStatus, Role};
use bc_core::policy::{authorize, Action, Resource, Session};
use chrono::{Datelike, Months, NaiveDate};
use tracing::info;

use crate::scheduling::summarize;
use crate::views::{DateTally, MemberSummary, MonthOverview};
use crate::{name_of, Ports};

pub struct DateVoteService {
    ports: Ports,
}

/// First and last day of the month containing `date`.
pub fn month_window(date: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let start = date
        .with_day(1)
        .ok_or_else(|| AppError::invalid("invalid date"))?;
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| AppError::invalid("date out of range"))?;
    Ok((start, end))
}

impl DateVoteService {
    pub fn new(ports: Ports) -> Self {
        Self { ports }
    }

    /// Records the caller's availability. Returns `false` if the vote was
    /// already there.
    pub async fn cast(&self, actor: &Session, date: NaiveDate) -> Result<bool> {
        authorize(actor, Action::CastDateVote, Resource::Club)?;

        if self.ports.schedules.schedule_on(date).await?.is_some() {
            return Err(AppError::invalid(format!("{date} is already confirmed")));
        }

        let created = self.ports.schedules.cast_date_vote(actor.member_id, date).await?;
        if created {
            info!(member_id = %actor.member_id, %date, "date vote cast");
        }
        Ok(created)
    }

    /// Removes the caller's vote. Returns `false` if there was none.
    pub async fn retract(&self, actor: &Session, date: NaiveDate) -> Result<bool> {
        authorize(actor, Action::CastDateVote, Resource::Club)?;
        Ok(self.ports.schedules.retract_date_vote(actor.member_id, date).await?)
    }

    pub async fn month_overview(&self, actor: &Session, date: NaiveDate) -> Result<MonthOverview> {
        authorize(actor, Action::ReadClub, Resource::Club)?;
        let (month_start, month_end) = month_window(date)?;

        let votes = self
            .ports
            .schedules
            .date_votes_between(month_start, month_end)
            .await?;
        let voter_ids: Vec<_> = votes.iter().map(|v| v.member_id).collect();
        let names = self.ports.members.member_names(&voter_ids).await?;

        let mut by_date: BTreeMap<NaiveDate, DateTally> = BTreeMap::new();
        for vote in &votes {
            let tally = by_date.entry(vote.vote_date).or_insert_with(|| DateTally {
                date: vote.vote_date,
                count: 0,
                voters: Vec::new(),
                has_my_vote: false,
            });
            tally.count += 1;
            tally.voters.push(name_of(&names, vote.member_id));
            tally.has_my_vote |= vote.member_id == actor.member_id;
        }

        let schedules = self
            .ports
            .schedules
            .schedules_between(month_start, month_end)
            .await?;
        let schedules = summarize(&self.ports, schedules).await?;

        let members = self
            .ports
            .members
            .list_members_with_roles(&[Role::Admin, Role::Member])
            .await?
            .iter()
            .map(MemberSummary::from)
            .collect();

        let books = self
            .ports
            .books
            .list_books_with_status(&BookStatus::NOMINATABLE)
            .await?;

        Ok(MonthOverview {
            month_start,
            month_end,
            tallies: by_date.into_values().collect(),
            schedules,
            members,
            books,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{harness, march_10};

    #[test]
    fn test_month_window_handles_short_months() {
        let (start, end) = month_window(NaiveDate::from_ymd_opt(2024, 2, 17).unwrap()).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let (_, end) = month_window(NaiveDate::from_ymd_opt(2025, 12, 3).unwrap()).unwrap();
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[tokio::test]
    async fn test_double_cast_keeps_one_vote() {
        let h = harness().await;
        let ann = h.member("Ann", Role::Member).await;
        let bob = h.member("Bob", Role::Member).await;

        assert!(h.services.dates.cast(&ann, march_10()).await.unwrap());
        assert!(!h.services.dates.cast(&ann, march_10()).await.unwrap());
        h.services.dates.cast(&bob, march_10()).await.unwrap();

        let overview = h.services.dates.month_overview(&ann, march_10()).await.unwrap();
        assert_eq!(overview.tallies.len(), 1);
        assert_eq!(overview.tallies[0].count, 2);
        assert!(overview.tallies[0].has_my_vote);
        assert_eq!(overview.members.len(), 2);

        assert!(h.services.dates.retract(&ann, march_10()).await.unwrap());
        let overview = h.services.dates.month_overview(&ann, march_10()).await.unwrap();
        assert_eq!(overview.tallies[0].count, 1);
        assert!(!overview.tallies[0].has_my_vote);
        assert_eq!(overview.tallies[0].voters, vec!["Bob"]);
    }

    #[tokio::test]
    async fn test_visitor_and_pending_cannot_vote() {
        let h = harness().await;
        let visitor = h.member("Vic", Role::Visitor).await;
        let pending = h.member("Pat", Role::Pending).await;

        for actor in [&visitor, &pending] {
            let err = h.services.dates.cast(actor, march_10()).await.unwrap_err();
            assert!(matches!(err, AppError::Forbidden(_)));
        }
        assert!(h.services.dates.month_overview(&visitor, march_10()).await.is_ok());
        assert!(h.services.dates.month_overview(&pending, march_10()).await.is_err());
    }
}
