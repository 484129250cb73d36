use bc_core::error::Result;
use bc_core::models::AttendanceStatus;
use bc_core::policy::{authorize, Action, Resource, Session};
use uuid::Uuid;

use crate::views::AttendanceView;
use crate::{found, name_of, Ports};

pub struct AttendanceService {
    ports: Ports,
}

impl AttendanceService {
    pub fn new(ports: Ports) -> Self {
        Self { ports }
    }

    /// Records the caller's RSVP and returns the schedule's full list.
    pub async fn set_status(
        &self,
        actor: &Session,
        schedule_id: Uuid,
        status: AttendanceStatus,
    ) -> Result<Vec<AttendanceView>> {
        authorize(actor, Action::SetAttendance, Resource::Club)?;
        found(
            self.ports.schedules.get_schedule(schedule_id).await?,
            "Schedule",
            schedule_id,
        )?;

        self.ports
            .meetings
            .set_attendance(schedule_id, actor.member_id, status)
            .await?;
        self.views(schedule_id).await
    }

    pub async fn list_attendance(&self, actor: &Session, schedule_id: Uuid) -> Result<Vec<AttendanceView>> {
        authorize(actor, Action::ReadClub, Resource::Club)?;
        found(
            self.ports.schedules.get_schedule(schedule_id).await?,
            "Schedule",
            schedule_id,
        )?;
        self.views(schedule_id).await
    }

    async fn views(&self, schedule_id: Uuid) -> Result<Vec<AttendanceView>> {
        let rows = self.ports.meetings.list_attendance(schedule_id).await?;
        let ids: Vec<Uuid> = rows.iter().map(|a| a.member_id).collect();
        let names = self.ports.members.member_names(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|attendance| AttendanceView {
                member_name: name_of(&names, attendance.member_id),
                attendance,
            })
            .collect())
    }
}
