use crate::{
    IssueSnapshot, ProjectId, ProjectSnapshot, Result, SprintId, SprintSnapshot, SprintStatus,
    TeamId, TeamSnapshot,
};
use async_trait::async_trait;

/// Read-only access to tracker data, backed by one consistent snapshot.
///
/// The planning pipeline issues no writes, so implementations only need the
/// five queries below. Every method is independently failable; a failed read
/// surfaces as [`crate::PlanningError::Store`].
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn project(&self, id: ProjectId) -> Result<Option<ProjectSnapshot>>;

    async fn team(&self, id: TeamId) -> Result<Option<TeamSnapshot>>;

    /// Issues of the project with no sprint assignment, in store order.
    async fn backlog_issues(&self, project_id: ProjectId) -> Result<Vec<IssueSnapshot>>;

    async fn sprints_with_status(
        &self,
        project_id: ProjectId,
        status: SprintStatus,
    ) -> Result<Vec<SprintSnapshot>>;

    /// All issues linked to the given sprint, regardless of status.
    async fn sprint_issues(&self, sprint_id: SprintId) -> Result<Vec<IssueSnapshot>>;
}
