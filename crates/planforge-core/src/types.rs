use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use chrono::{DateTime, NaiveDate, Utc};

pub type ProjectId = Uuid;
pub type SprintId = Uuid;
pub type IssueId = Uuid;
pub type TeamId = i64;
pub type UserId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SprintStatus {
    Planned,
    Active,
    Completed,
    Cancelled,
}

impl fmt::Display for SprintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SprintStatus::Planned => "PLANNED",
            SprintStatus::Active => "ACTIVE",
            SprintStatus::Completed => "COMPLETED",
            SprintStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

/// Priority ordering is ascending, so `Critical` compares greatest and a
/// descending sort puts the most urgent work first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssuePriority {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for IssuePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssuePriority::Low => "LOW",
            IssuePriority::Medium => "MEDIUM",
            IssuePriority::High => "HIGH",
            IssuePriority::Critical => "CRITICAL",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    Story,
    Task,
    Bug,
    Epic,
    Subtask,
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueType::Story => "STORY",
            IssueType::Task => "TASK",
            IssueType::Bug => "BUG",
            IssueType::Epic => "EPIC",
            IssueType::Subtask => "SUBTASK",
        };
        write!(f, "{}", s)
    }
}

/// Direction of recent velocity movement over the trend window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Stable,
    Decreasing,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Stable => "stable",
            TrendDirection::Decreasing => "decreasing",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSeverity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for RecommendationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecommendationSeverity::Info => "info",
            RecommendationSeverity::Warning => "warning",
            RecommendationSeverity::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for RecommendationSeverity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(RecommendationSeverity::Info),
            "warning" => Ok(RecommendationSeverity::Warning),
            "critical" => Ok(RecommendationSeverity::Critical),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

// Read-only snapshots of tracker entities. The planning pipeline consumes
// these and never writes back.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub id: ProjectId,
    pub key: String,
    pub name: String,
}

impl ProjectSnapshot {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: key.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub user_id: UserId,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSnapshot {
    pub id: TeamId,
    pub project_id: ProjectId,
    pub name: String,
    pub active: bool,
    pub members: Vec<TeamMember>,
}

impl TeamSnapshot {
    pub fn new(id: TeamId, project_id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            project_id,
            name: name.into(),
            active: true,
            members: Vec::new(),
        }
    }

    pub fn with_member(mut self, user_id: UserId, display_name: impl Into<String>) -> Self {
        self.members.push(TeamMember {
            user_id,
            display_name: display_name.into(),
        });
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintSnapshot {
    pub id: SprintId,
    pub project_id: ProjectId,
    pub team_id: Option<TeamId>,
    pub name: String,
    pub status: SprintStatus,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub planned_points: f64,
}

impl SprintSnapshot {
    pub fn new(project_id: ProjectId, name: impl Into<String>, status: SprintStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            team_id: None,
            name: name.into(),
            status,
            start_date: None,
            due_date: None,
            planned_points: 0.0,
        }
    }

    pub fn with_team(mut self, team_id: TeamId) -> Self {
        self.team_id = Some(team_id);
        self
    }

    pub fn with_dates(mut self, start: NaiveDate, due: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.due_date = Some(due);
        self
    }

    pub fn with_planned_points(mut self, points: f64) -> Self {
        self.planned_points = points;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueSnapshot {
    pub id: IssueId,
    pub project_id: ProjectId,
    pub sprint_id: Option<SprintId>,
    pub key: String,
    pub title: String,
    pub issue_type: IssueType,
    pub priority: IssuePriority,
    /// Display name of the board column the issue sits in, e.g. "Done".
    pub status_name: String,
    pub story_points: Option<f64>,
    pub assignee_id: Option<UserId>,
    pub epic_id: Option<IssueId>,
    pub parent_issue_id: Option<IssueId>,
    pub labels: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

impl IssueSnapshot {
    pub fn new(
        project_id: ProjectId,
        key: impl Into<String>,
        title: impl Into<String>,
        issue_type: IssueType,
        priority: IssuePriority,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            sprint_id: None,
            key: key.into(),
            title: title.into(),
            issue_type,
            priority,
            status_name: "To Do".to_string(),
            story_points: None,
            assignee_id: None,
            epic_id: None,
            parent_issue_id: None,
            labels: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_sprint(mut self, sprint_id: SprintId) -> Self {
        self.sprint_id = Some(sprint_id);
        self
    }

    pub fn with_status(mut self, status_name: impl Into<String>) -> Self {
        self.status_name = status_name.into();
        self
    }

    pub fn with_story_points(mut self, points: f64) -> Self {
        self.story_points = Some(points);
        self
    }

    pub fn with_assignee(mut self, user_id: UserId) -> Self {
        self.assignee_id = Some(user_id);
        self
    }

    pub fn with_parent(mut self, parent_id: IssueId) -> Self {
        self.parent_issue_id = Some(parent_id);
        self
    }

    pub fn with_epic(mut self, epic_id: IssueId) -> Self {
        self.epic_id = Some(epic_id);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.insert(label.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

// Planning request and assembled context. Context objects are built fresh per
// request, never cached and never mutated after construction.

/// Inbound request from the command layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub project_id: ProjectId,
    pub sprint_name: String,
    pub sprint_goal: Option<String>,
    pub team_id: Option<TeamId>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub target_story_points: Option<f64>,
    pub requesting_user_id: UserId,
}

impl PlanRequest {
    pub fn new(
        project_id: ProjectId,
        sprint_name: impl Into<String>,
        requesting_user_id: UserId,
    ) -> Self {
        Self {
            project_id,
            sprint_name: sprint_name.into(),
            sprint_goal: None,
            team_id: None,
            start_date: None,
            due_date: None,
            target_story_points: None,
            requesting_user_id,
        }
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.sprint_goal = Some(goal.into());
        self
    }

    pub fn with_team(mut self, team_id: TeamId) -> Self {
        self.team_id = Some(team_id);
        self
    }

    pub fn with_dates(mut self, start: NaiveDate, due: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.due_date = Some(due);
        self
    }

    pub fn with_target_points(mut self, points: f64) -> Self {
        self.target_story_points = Some(points);
        self
    }
}

/// Parameters of the sprint being planned. It does not exist in the tracker
/// yet, so there is no sprint id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSprint {
    pub name: String,
    pub goal: Option<String>,
    pub team_id: Option<TeamId>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub target_story_points: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogIssue {
    pub id: IssueId,
    pub key: String,
    pub title: String,
    pub issue_type: IssueType,
    pub priority: IssuePriority,
    pub story_points: Option<f64>,
    pub assignee_id: Option<UserId>,
    pub epic_id: Option<IssueId>,
    pub parent_issue_id: Option<IssueId>,
    pub labels: BTreeSet<String>,
}

impl From<&IssueSnapshot> for BacklogIssue {
    fn from(issue: &IssueSnapshot) -> Self {
        Self {
            id: issue.id,
            key: issue.key.clone(),
            title: issue.title.clone(),
            issue_type: issue.issue_type,
            priority: issue.priority,
            story_points: issue.story_points,
            assignee_id: issue.assignee_id,
            epic_id: issue.epic_id,
            parent_issue_id: issue.parent_issue_id,
            labels: issue.labels.clone(),
        }
    }
}

/// One finished (or otherwise historical) sprint rolled up for velocity math.
///
/// `completed_points` sums the story points of every issue linked to the
/// sprint regardless of issue status, matching the tracker's reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSprint {
    pub sprint_id: SprintId,
    pub name: String,
    pub status: SprintStatus,
    pub duration_days: Option<i64>,
    pub planned_points: f64,
    pub completed_points: f64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberVelocity {
    pub user_id: UserId,
    pub name: String,
    pub avg_points_per_sprint: f64,
    pub completion_rate: f64,
    /// Issue types the member has worked most, descending by frequency.
    pub issue_types_preference: Vec<IssueType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamVelocity {
    pub team_id: TeamId,
    pub team_name: String,
    pub member_count: usize,
    /// Completed sprints of this team, most recent first.
    pub historical_sprints: Vec<HistoricalSprint>,
    pub average_velocity: f64,
    pub recent_velocity_trend: TrendDirection,
    pub member_velocities: Vec<MemberVelocity>,
}

/// Velocity data attached to a context. Exactly one variant is ever present,
/// decided by whether the request named a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum VelocitySource {
    TeamScoped { team_velocity: TeamVelocity },
    ProjectWide { historical_sprints: Vec<HistoricalSprint> },
}

impl VelocitySource {
    pub fn team_velocity(&self) -> Option<&TeamVelocity> {
        match self {
            VelocitySource::TeamScoped { team_velocity } => Some(team_velocity),
            VelocitySource::ProjectWide { .. } => None,
        }
    }

    pub fn project_history(&self) -> Option<&[HistoricalSprint]> {
        match self {
            VelocitySource::TeamScoped { .. } => None,
            VelocitySource::ProjectWide { historical_sprints } => Some(historical_sprints),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSprintLoad {
    pub sprint_id: SprintId,
    pub name: String,
    pub due_date: Option<NaiveDate>,
    pub allocated_points: f64,
    pub remaining_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedSprintLoad {
    pub sprint_id: SprintId,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub allocated_points: f64,
}

/// Everything the planner is allowed to know about one request, assembled
/// once and discarded when the orchestrator returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningContext {
    pub project: ProjectSnapshot,
    pub new_sprint: NewSprint,
    /// Unassigned issues, priority descending then creation ascending.
    pub backlog: Vec<BacklogIssue>,
    pub velocity: VelocitySource,
    pub in_progress_sprints: Vec<ActiveSprintLoad>,
    pub planned_sprints: Vec<PlannedSprintLoad>,
}

// Structured output returned by the planner.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedIssue {
    pub issue_id: IssueId,
    pub issue_key: String,
    pub story_points: f64,
    pub suggested_assignee_id: Option<UserId>,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: RecommendationSeverity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityAnalysis {
    pub team_capacity_utilization: f64,
    pub estimated_completion_probability: f64,
    pub risk_factors: Vec<String>,
}

/// The planner's recommendation for the sprint under planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintPlan {
    pub selected_issues: Vec<SelectedIssue>,
    pub total_story_points: f64,
    pub summary: String,
    pub recommendations: Vec<Recommendation>,
    pub capacity_analysis: CapacityAnalysis,
}
