use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use planforge_ai::{PlanningEngine, SprintPlanner};
use planforge_core::{
    CapacityAnalysis, ErrorKind, IssuePriority, IssueSnapshot, IssueType, PlanRequest,
    PlanningConfig, PlanningError, ProjectSnapshot, Recommendation, RecommendationSeverity,
    Result, SelectedIssue, SnapshotStore, SprintPlan, SprintSnapshot, SprintStatus, TeamSnapshot,
};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("planforge_ai=debug")
        .with_test_writer()
        .try_init()
        .ok();
}

/// Planner double that records every prompt and answers with a canned plan.
struct RecordingPlanner {
    plan: SprintPlan,
    prompts: Mutex<Vec<String>>,
}

impl RecordingPlanner {
    fn returning(plan: SprintPlan) -> Arc<Self> {
        Arc::new(Self {
            plan,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SprintPlanner for RecordingPlanner {
    async fn plan(&self, prompt: &str) -> Result<SprintPlan> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.plan.clone())
    }

    fn provider_name(&self) -> &str {
        "recording"
    }
}

/// Planner double that fails the same way a schema decode failure does.
struct FailingPlanner;

#[async_trait]
impl SprintPlanner for FailingPlanner {
    async fn plan(&self, _prompt: &str) -> Result<SprintPlan> {
        Err(PlanningError::MalformedPlan(
            "plan does not match the required schema: missing field `summary`".to_string(),
        ))
    }

    fn provider_name(&self) -> &str {
        "failing"
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
}

fn canned_plan(backlog_issue: &IssueSnapshot) -> SprintPlan {
    SprintPlan {
        selected_issues: vec![SelectedIssue {
            issue_id: backlog_issue.id,
            issue_key: backlog_issue.key.clone(),
            story_points: backlog_issue.story_points.unwrap_or(0.0),
            suggested_assignee_id: Some(10),
            rationale: "Highest priority item in the backlog".to_string(),
        }],
        total_story_points: backlog_issue.story_points.unwrap_or(0.0),
        summary: "Focus the sprint on the critical backlog work".to_string(),
        recommendations: vec![Recommendation {
            kind: "scope_risk".to_string(),
            severity: RecommendationSeverity::Warning,
            message: "Single large item dominates the sprint".to_string(),
        }],
        capacity_analysis: CapacityAnalysis {
            team_capacity_utilization: 0.38,
            estimated_completion_probability: 0.9,
            risk_factors: Vec::new(),
        },
    }
}

/// One project with a three-sprint velocity history averaging 21 points and a
/// single critical backlog item.
fn seeded_store() -> (SnapshotStore, ProjectSnapshot, IssueSnapshot) {
    let project = ProjectSnapshot::new("PF", "Planforge");
    let team = TeamSnapshot::new(1, project.id, "Platform")
        .with_member(10, "Dana")
        .with_member(11, "Rishi");
    let backlog_issue = IssueSnapshot::new(
        project.id,
        "PF-40",
        "Rework capacity dashboard",
        IssueType::Story,
        IssuePriority::Critical,
    )
    .with_story_points(8.0);

    let mut store = SnapshotStore::new()
        .with_project(project.clone())
        .with_team(team)
        .with_issue(backlog_issue.clone());

    for (i, (start, points)) in [(1u32, 20.0), (8, 22.0), (15, 21.0)].iter().enumerate() {
        let sprint = SprintSnapshot::new(
            project.id,
            format!("Sprint {}", i + 1),
            SprintStatus::Completed,
        )
        .with_team(1)
        .with_dates(day(*start), day(start + 4))
        .with_planned_points(*points);
        let delivered = IssueSnapshot::new(
            project.id,
            format!("PF-{}", i + 1),
            "Delivered work",
            IssueType::Story,
            IssuePriority::Medium,
        )
        .with_sprint(sprint.id)
        .with_status("Done")
        .with_story_points(*points)
        .with_assignee(10);
        store = store.with_sprint(sprint).with_issue(delivered);
    }

    (store, project, backlog_issue)
}

fn engine_over(
    store: SnapshotStore,
    planner: Arc<dyn SprintPlanner>,
) -> PlanningEngine {
    PlanningEngine::new(Arc::new(store), planner, PlanningConfig::default())
}

#[tokio::test]
async fn team_scoped_request_flows_velocity_into_the_prompt() {
    init_tracing();
    let (store, project, backlog_issue) = seeded_store();
    let planner = RecordingPlanner::returning(canned_plan(&backlog_issue));
    let engine = engine_over(store, planner.clone());
    let request = PlanRequest::new(project.id, "Sprint 4", 10)
        .with_team(1)
        .with_goal("Stabilize reporting");

    let plan = engine.plan_sprint(&request).await.unwrap();

    assert_eq!(plan, canned_plan(&backlog_issue));
    let prompts = planner.prompts();
    assert_eq!(prompts.len(), 1);
    let prompt = &prompts[0];
    assert!(prompt.contains("TEAM VELOCITY"));
    assert!(prompt.contains("\"scope\": \"team_scoped\""));
    assert!(prompt.contains("\"average_velocity\": 21.0"));
    assert!(prompt.contains("PF-40"));
}

#[tokio::test]
async fn teamless_request_plans_from_project_history() {
    init_tracing();
    let (store, project, backlog_issue) = seeded_store();
    let planner = RecordingPlanner::returning(canned_plan(&backlog_issue));
    let engine = engine_over(store, planner.clone());
    let request = PlanRequest::new(project.id, "Sprint 4", 10);

    engine.plan_sprint(&request).await.unwrap();

    let prompts = planner.prompts();
    let prompt = &prompts[0];
    assert!(prompt.contains("PROJECT HISTORY"));
    assert!(prompt.contains("\"scope\": \"project_wide\""));
    assert!(!prompt.contains("TEAM VELOCITY"));
}

#[tokio::test]
async fn invalid_requests_never_reach_the_planner() {
    init_tracing();
    let (store, project, backlog_issue) = seeded_store();
    let planner = RecordingPlanner::returning(canned_plan(&backlog_issue));
    let engine = engine_over(store, planner.clone());

    let bad_requests = vec![
        PlanRequest::new(project.id, "", 10),
        PlanRequest::new(project.id, "Sprint 4", 10).with_team(-3),
        PlanRequest::new(project.id, "Sprint 4", 10).with_dates(day(20), day(6)),
        PlanRequest::new(project.id, "Sprint 4", 10).with_target_points(-5.0),
    ];
    for request in bad_requests {
        let error = engine.plan_sprint(&request).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
    }

    assert!(planner.prompts().is_empty());
}

#[tokio::test]
async fn unknown_project_is_reported_as_not_found() {
    init_tracing();
    let (store, _, backlog_issue) = seeded_store();
    let planner = RecordingPlanner::returning(canned_plan(&backlog_issue));
    let engine = engine_over(store, planner.clone());
    let request = PlanRequest::new(uuid::Uuid::new_v4(), "Sprint 4", 10);

    let error = engine.plan_sprint(&request).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
    assert!(planner.prompts().is_empty());
}

#[tokio::test]
async fn team_from_another_project_is_rejected() {
    init_tracing();
    let (store, project, backlog_issue) = seeded_store();
    let store = store.with_team(TeamSnapshot::new(2, uuid::Uuid::new_v4(), "Mobile"));
    let planner = RecordingPlanner::returning(canned_plan(&backlog_issue));
    let engine = engine_over(store, planner.clone());
    let request = PlanRequest::new(project.id, "Sprint 4", 10).with_team(2);

    let error = engine.plan_sprint(&request).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidTeam);
    assert!(planner.prompts().is_empty());
}

#[tokio::test]
async fn planner_parse_failures_surface_as_malformed_plan() {
    init_tracing();
    let (store, project, _) = seeded_store();
    let engine = engine_over(store, Arc::new(FailingPlanner));
    let request = PlanRequest::new(project.id, "Sprint 4", 10).with_team(1);

    let error = engine.plan_sprint(&request).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MalformedPlan);
    assert!(!error.is_retryable());
}
