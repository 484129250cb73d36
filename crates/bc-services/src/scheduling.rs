//! Schedule confirmation: turning a voted date into a meeting.

use bc_core::error::{AppError, Result};
use bc_core::models::{BookStatus, NewSchedule, Schedule};
use bc_core::policy::{authorize, Action, Resource, Session};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::views::ScheduleSummary;
use crate::{found, name_of, optional_text, or_conflict, Ports};

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmSchedule {
    pub date: NaiveDate,
    pub presenter_id: Uuid,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub book_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleDetails {
    pub meeting_time: Option<NaiveTime>,
    pub location: Option<String>,
}

pub struct SchedulingService {
    ports: Ports,
}

/// "March 10 meeting"
pub fn default_title(date: NaiveDate) -> String {
    format!("{} meeting", date.format("%B %-d"))
}

/// Attaches presenter names and book titles to schedules.
pub(crate) async fn summarize(ports: &Ports, schedules: Vec<Schedule>) -> Result<Vec<ScheduleSummary>> {
    let presenter_ids: Vec<Uuid> = schedules.iter().map(|s| s.presenter_id).collect();
    let book_ids: Vec<Uuid> = schedules.iter().filter_map(|s| s.selected_book_id).collect();

    let names = ports.members.member_names(&presenter_ids).await?;
    let books = ports.books.get_books(&book_ids).await?;

    Ok(schedules
        .into_iter()
        .map(|schedule| ScheduleSummary {
            phase: schedule.phase(),
            presenter_name: name_of(&names, schedule.presenter_id),
            book_title: schedule
                .selected_book_id
                .and_then(|id| books.get(&id))
                .map(|b| b.title.clone()),
            schedule,
        })
        .collect())
}

impl SchedulingService {
    pub fn new(ports: Ports) -> Self {
        Self { ports }
    }

    /// Admin-only. Creates the meeting, optionally with its book already
    /// chosen, and clears the date votes of that day.
    pub async fn confirm(&self, actor: &Session, request: ConfirmSchedule) -> Result<Schedule> {
        authorize(actor, Action::ConfirmSchedule, Resource::Club)?;

        if self.ports.schedules.schedule_on(request.date).await?.is_some() {
            return Err(AppError::Conflict(format!("{} is already confirmed", request.date)));
        }

        let presenter = found(
            self.ports.members.get_member(request.presenter_id).await?,
            "Member",
            request.presenter_id,
        )?;
        if !presenter.role.is_participant() {
            return Err(AppError::invalid("presenter must be an admin or member"));
        }

        if let Some(book_id) = request.book_id {
            let book = found(self.ports.books.get_book(book_id).await?, "Book", book_id)?;
            if book.status == BookStatus::Completed {
                return Err(AppError::invalid("a completed book cannot be chosen again"));
            }
        }

        let title = optional_text(request.title).unwrap_or_else(|| default_title(request.date));
        let schedule = self
            .ports
            .schedules
            .confirm_schedule(NewSchedule {
                title,
                meeting_date: request.date,
                presenter_id: presenter.id,
                book_id: request.book_id,
                created_by: actor.member_id,
            })
            .await
            .map_err(or_conflict(format!("{} is already confirmed", request.date)))?;

        info!(schedule_id = %schedule.id, date = %schedule.meeting_date, presenter = %presenter.name, "schedule confirmed");
        Ok(schedule)
    }

    /// Admin or presenter. Sets meeting time and location.
    pub async fn update_details(
        &self,
        actor: &Session,
        schedule_id: Uuid,
        details: ScheduleDetails,
    ) -> Result<Schedule> {
        let schedule = found(
            self.ports.schedules.get_schedule(schedule_id).await?,
            "Schedule",
            schedule_id,
        )?;
        authorize(actor, Action::UpdateScheduleDetails, Resource::Schedule(&schedule))?;

        let updated = self
            .ports
            .schedules
            .update_schedule_details(schedule_id, details.meeting_time, optional_text(details.location))
            .await?;
        found(updated, "Schedule", schedule_id)
    }

    /// Admin-only. Deletes the meeting and everything scoped to it.
    pub async fn cancel(&self, actor: &Session, schedule_id: Uuid) -> Result<()> {
        authorize(actor, Action::CancelSchedule, Resource::Club)?;

        if !self.ports.schedules.cancel_schedule(schedule_id).await? {
            return Err(AppError::not_found("Schedule", schedule_id));
        }
        info!(%schedule_id, "schedule cancelled");
        Ok(())
    }
}
