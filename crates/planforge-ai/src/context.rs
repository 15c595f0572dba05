use std::cmp::Ordering;
use std::sync::Arc;

use futures::try_join;
use tracing::{debug, instrument};

use planforge_analytics::{average_velocity, classify_trend, historical_sprint, member_velocities};
use planforge_core::{
    ActiveSprintLoad, BacklogIssue, HistoricalSprint, NewSprint, PlanRequest, PlannedSprintLoad,
    PlanningConfig, PlanningContext, PlanningError, ProjectId, ProjectSnapshot, ProjectStore,
    Result, SprintSnapshot, SprintStatus, TeamId, TeamSnapshot, TeamVelocity, VelocitySource,
};

/// Assembles the read-only [`PlanningContext`] for one request.
///
/// Each step reads from the store independently and fails on its own; the
/// builder performs no writes, so rebuilding against an unchanged snapshot
/// yields an identical context.
pub struct ContextBuilder {
    store: Arc<dyn ProjectStore>,
    config: PlanningConfig,
}

impl ContextBuilder {
    pub fn new(store: Arc<dyn ProjectStore>, config: PlanningConfig) -> Self {
        Self { store, config }
    }

    #[instrument(skip(self, request), fields(project_id = %request.project_id))]
    pub async fn build(&self, request: &PlanRequest) -> Result<PlanningContext> {
        let project = self
            .store
            .project(request.project_id)
            .await?
            .ok_or(PlanningError::ProjectNotFound(request.project_id))?;

        let team = match request.team_id {
            Some(team_id) => Some(self.resolve_team(team_id, &project).await?),
            None => None,
        };

        let backlog = self.collect_backlog(project.id).await?;
        let (in_progress_sprints, planned_sprints) = self
            .collect_sprint_loads(project.id, request.team_id)
            .await?;

        let velocity = match &team {
            Some(team) => VelocitySource::TeamScoped {
                team_velocity: self.team_velocity(team).await?,
            },
            None => VelocitySource::ProjectWide {
                historical_sprints: self.project_history(project.id).await?,
            },
        };

        debug!(
            backlog = backlog.len(),
            in_progress = in_progress_sprints.len(),
            planned = planned_sprints.len(),
            team_scoped = team.is_some(),
            "planning context assembled"
        );

        Ok(PlanningContext {
            project,
            new_sprint: NewSprint {
                name: request.sprint_name.clone(),
                goal: request.sprint_goal.clone(),
                team_id: request.team_id,
                start_date: request.start_date,
                due_date: request.due_date,
                target_story_points: request.target_story_points,
            },
            backlog,
            velocity,
            in_progress_sprints,
            planned_sprints,
        })
    }

    /// The team must exist, belong to the project and be active.
    async fn resolve_team(&self, team_id: TeamId, project: &ProjectSnapshot) -> Result<TeamSnapshot> {
        let team = self
            .store
            .team(team_id)
            .await?
            .ok_or_else(|| PlanningError::InvalidTeam(format!("team {} does not exist", team_id)))?;

        if team.project_id != project.id {
            return Err(PlanningError::InvalidTeam(format!(
                "team '{}' does not belong to project {}",
                team.name, project.key
            )));
        }
        if !team.active {
            return Err(PlanningError::InvalidTeam(format!(
                "team '{}' is not active",
                team.name
            )));
        }
        Ok(team)
    }

    /// Unassigned issues ordered by priority descending, then creation
    /// ascending. The ordering is enforced here rather than trusted from the
    /// store.
    async fn collect_backlog(&self, project_id: ProjectId) -> Result<Vec<BacklogIssue>> {
        let mut issues = self.store.backlog_issues(project_id).await?;
        issues.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(issues.iter().map(BacklogIssue::from).collect())
    }

    async fn collect_sprint_loads(
        &self,
        project_id: ProjectId,
        team_id: Option<TeamId>,
    ) -> Result<(Vec<ActiveSprintLoad>, Vec<PlannedSprintLoad>)> {
        let (active, planned) = try_join!(
            self.store.sprints_with_status(project_id, SprintStatus::Active),
            self.store.sprints_with_status(project_id, SprintStatus::Planned),
        )?;
        let retained = |sprint: &SprintSnapshot| team_id.is_none() || sprint.team_id == team_id;

        let mut in_progress_loads = Vec::new();
        for sprint in active.into_iter().filter(retained) {
            let issues = self.store.sprint_issues(sprint.id).await?;
            let allocated: f64 = issues.iter().filter_map(|i| i.story_points).sum();
            let done: f64 = issues
                .iter()
                .filter(|i| self.config.is_completed_status(&i.status_name))
                .filter_map(|i| i.story_points)
                .sum();
            in_progress_loads.push(ActiveSprintLoad {
                sprint_id: sprint.id,
                name: sprint.name,
                due_date: sprint.due_date,
                allocated_points: allocated,
                remaining_points: (allocated - done).max(0.0),
            });
        }

        let mut planned_loads = Vec::new();
        for sprint in planned.into_iter().filter(retained) {
            let issues = self.store.sprint_issues(sprint.id).await?;
            planned_loads.push(PlannedSprintLoad {
                sprint_id: sprint.id,
                name: sprint.name,
                start_date: sprint.start_date,
                allocated_points: issues.iter().filter_map(|i| i.story_points).sum(),
            });
        }

        Ok((in_progress_loads, planned_loads))
    }

    /// Completed sprints, most recent first. Undated sprints sort last and
    /// name breaks ties so the ordering is deterministic.
    async fn completed_sprints(
        &self,
        project_id: ProjectId,
        team_id: Option<TeamId>,
    ) -> Result<Vec<SprintSnapshot>> {
        let mut sprints: Vec<SprintSnapshot> = self
            .store
            .sprints_with_status(project_id, SprintStatus::Completed)
            .await?
            .into_iter()
            .filter(|s| team_id.is_none() || s.team_id == team_id)
            .collect();

        sprints.sort_by(|a, b| match (a.start_date, b.start_date) {
            (Some(a_start), Some(b_start)) => {
                b_start.cmp(&a_start).then_with(|| a.name.cmp(&b.name))
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.name.cmp(&b.name),
        });
        Ok(sprints)
    }

    async fn team_velocity(&self, team: &TeamSnapshot) -> Result<TeamVelocity> {
        let sprints = self.completed_sprints(team.project_id, Some(team.id)).await?;

        let mut history = Vec::with_capacity(sprints.len());
        let mut completed_issues = Vec::new();
        for sprint in &sprints {
            let issues = self.store.sprint_issues(sprint.id).await?;
            history.push(historical_sprint(sprint, &issues));
            completed_issues.extend(issues);
        }

        let points: Vec<f64> = history.iter().map(|h| h.completed_points).collect();
        Ok(TeamVelocity {
            team_id: team.id,
            team_name: team.name.clone(),
            member_count: team.members.len(),
            average_velocity: average_velocity(&points),
            recent_velocity_trend: classify_trend(&points),
            member_velocities: member_velocities(team, &completed_issues, &self.config),
            historical_sprints: history,
        })
    }

    async fn project_history(&self, project_id: ProjectId) -> Result<Vec<HistoricalSprint>> {
        let sprints = self.completed_sprints(project_id, None).await?;
        let mut history = Vec::with_capacity(sprints.len());
        for sprint in &sprints {
            let issues = self.store.sprint_issues(sprint.id).await?;
            history.push(historical_sprint(sprint, &issues));
        }
        Ok(history)
    }
}
