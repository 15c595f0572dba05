use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use planforge_core::{
    PlanRequest, PlanningConfig, PlanningContext, PlanningError, ProjectStore, Result, SprintPlan,
};

use crate::context::ContextBuilder;
use crate::planner::SprintPlanner;
use crate::prompt::PromptComposer;

/// Entry point for one planning request: validate, assemble the context,
/// compose the prompt, call the planner.
///
/// Failures are returned as values with a stable [`planforge_core::ErrorKind`];
/// nothing here retries (retries live inside the planner client) and known-bad
/// input is rejected before any store or network work is spent on it.
pub struct PlanningEngine {
    context_builder: ContextBuilder,
    composer: PromptComposer,
    planner: Arc<dyn SprintPlanner>,
}

impl PlanningEngine {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        planner: Arc<dyn SprintPlanner>,
        config: PlanningConfig,
    ) -> Self {
        Self {
            context_builder: ContextBuilder::new(store, config.clone()),
            composer: PromptComposer::new(&config),
            planner,
        }
    }

    #[instrument(skip(self, request), fields(project_id = %request.project_id, sprint = %request.sprint_name))]
    pub async fn plan_sprint(&self, request: &PlanRequest) -> Result<SprintPlan> {
        let started = Instant::now();
        validate(request)?;

        let context = self.context_builder.build(request).await?;
        advise_on_target(&context);

        let prompt = self.composer.compose(&context);
        debug!(
            prompt_chars = prompt.len(),
            provider = self.planner.provider_name(),
            "invoking planner"
        );

        let plan = self.planner.plan(&prompt).await?;
        info!(
            selected = plan.selected_issues.len(),
            total_points = plan.total_story_points,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sprint plan ready"
        );
        Ok(plan)
    }
}

/// Request checks that need no store access. These short-circuit before any
/// read or network call.
fn validate(request: &PlanRequest) -> Result<()> {
    if request.sprint_name.trim().is_empty() {
        return Err(PlanningError::Validation(
            "sprint name must not be empty".to_string(),
        ));
    }
    if let Some(team_id) = request.team_id {
        if team_id <= 0 {
            return Err(PlanningError::Validation(format!(
                "team id must be positive, got {}",
                team_id
            )));
        }
    }
    if let (Some(start), Some(due)) = (request.start_date, request.due_date) {
        if due < start {
            return Err(PlanningError::Validation(format!(
                "sprint due date {} precedes start date {}",
                due, start
            )));
        }
    }
    if let Some(points) = request.target_story_points {
        if points < 0.0 {
            return Err(PlanningError::Validation(
                "target story points must not be negative".to_string(),
            ));
        }
    }
    Ok(())
}

/// Log-only advisory when the requested target overshoots what the team has
/// historically delivered.
fn advise_on_target(context: &PlanningContext) {
    let Some(target) = context.new_sprint.target_story_points else {
        return;
    };
    let Some(velocity) = context.velocity.team_velocity() else {
        return;
    };
    if velocity.average_velocity > 0.0 && target > velocity.average_velocity {
        warn!(
            target,
            average = velocity.average_velocity,
            team = %velocity.team_name,
            "requested target exceeds the team's proven average velocity"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use planforge_core::{
        CapacityAnalysis, ErrorKind, ProjectSnapshot, SnapshotStore, TeamSnapshot,
    };
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FakePlanner {
        calls: AtomicU32,
    }

    impl FakePlanner {
        fn new() -> Self {
            Self {
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl SprintPlanner for FakePlanner {
        async fn plan(&self, _prompt: &str) -> Result<SprintPlan> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SprintPlan {
                selected_issues: Vec::new(),
                total_story_points: 0.0,
                summary: "empty".to_string(),
                recommendations: Vec::new(),
                capacity_analysis: CapacityAnalysis {
                    team_capacity_utilization: 0.0,
                    estimated_completion_probability: 1.0,
                    risk_factors: Vec::new(),
                },
            })
        }

        fn provider_name(&self) -> &str {
            "fake"
        }
    }

    fn engine_with(store: SnapshotStore, planner: Arc<FakePlanner>) -> PlanningEngine {
        PlanningEngine::new(Arc::new(store), planner, PlanningConfig::default())
    }

    #[tokio::test]
    async fn empty_sprint_name_fails_before_any_call() {
        let planner = Arc::new(FakePlanner::new());
        let engine = engine_with(SnapshotStore::new(), planner.clone());
        let request = PlanRequest::new(uuid::Uuid::new_v4(), "   ", 10);

        let error = engine.plan_sprint(&request).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(planner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_positive_team_id_fails_before_any_call() {
        let planner = Arc::new(FakePlanner::new());
        let engine = engine_with(SnapshotStore::new(), planner.clone());
        let request = PlanRequest::new(uuid::Uuid::new_v4(), "Sprint 1", 10).with_team(0);

        let error = engine.plan_sprint(&request).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(planner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn inverted_dates_fail_validation() {
        let planner = Arc::new(FakePlanner::new());
        let engine = engine_with(SnapshotStore::new(), planner.clone());
        let request = PlanRequest::new(uuid::Uuid::new_v4(), "Sprint 1", 10).with_dates(
            chrono::NaiveDate::from_ymd_opt(2025, 7, 14).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2025, 7, 7).unwrap(),
        );

        let error = engine.plan_sprint(&request).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(planner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn valid_request_reaches_the_planner() {
        let project = ProjectSnapshot::new("PF", "Planforge");
        let store = SnapshotStore::new()
            .with_project(project.clone())
            .with_team(TeamSnapshot::new(1, project.id, "Platform"));
        let planner = Arc::new(FakePlanner::new());
        let engine = engine_with(store, planner.clone());
        let request = PlanRequest::new(project.id, "Sprint 1", 10).with_team(1);

        let plan = engine.plan_sprint(&request).await.unwrap();
        assert_eq!(plan.summary, "empty");
        assert_eq!(planner.calls.load(Ordering::SeqCst), 1);
    }
}
