use std::collections::BTreeMap;

use planforge_core::{
    HistoricalSprint, IssueSnapshot, IssueType, MemberVelocity, PlanningConfig, SprintSnapshot,
    TeamSnapshot, TrendDirection,
};

/// Number of most recent completed sprints inspected by [`classify_trend`].
pub const TREND_WINDOW: usize = 3;

/// Completed-points spread beyond which the trend window counts as moving.
pub const TREND_SPREAD_THRESHOLD: f64 = 5.0;

/// Percentage of planned points that were completed, rounded to 2 decimals.
/// Zero or negative planned points yield 0 rather than a division error.
pub fn completion_rate(planned: f64, completed: f64) -> f64 {
    if planned <= 0.0 {
        return 0.0;
    }
    round2(completed / planned * 100.0)
}

/// Classifies velocity movement over the most recent completed sprints.
///
/// `completed_points` must be ordered most recent first. Fewer than
/// [`TREND_WINDOW`] samples always classify as stable. Within the window the
/// spread `max - min` keeps its positive sign when the maximum sits later in
/// the window than the minimum and is negated otherwise; a signed spread
/// above [`TREND_SPREAD_THRESHOLD`] is increasing, below the negated
/// threshold decreasing. This is a spread heuristic, not a slope fit.
pub fn classify_trend(completed_points: &[f64]) -> TrendDirection {
    if completed_points.len() < TREND_WINDOW {
        return TrendDirection::Stable;
    }

    let window = &completed_points[..TREND_WINDOW];
    let mut max_idx = 0;
    let mut min_idx = 0;
    for (i, &points) in window.iter().enumerate() {
        if points > window[max_idx] {
            max_idx = i;
        }
        if points < window[min_idx] {
            min_idx = i;
        }
    }

    let spread = window[max_idx] - window[min_idx];
    if spread > TREND_SPREAD_THRESHOLD && max_idx > min_idx {
        TrendDirection::Increasing
    } else if spread > TREND_SPREAD_THRESHOLD && max_idx < min_idx {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

/// Mean completed points across the given sprints; 0 when there are none.
pub fn average_velocity(completed_points: &[f64]) -> f64 {
    if completed_points.is_empty() {
        return 0.0;
    }
    completed_points.iter().sum::<f64>() / completed_points.len() as f64
}

/// Rolls a sprint and its linked issues into a historical entry.
///
/// `completed_points` sums the story points of every linked issue regardless
/// of issue status, matching the tracker's reporting.
pub fn historical_sprint(sprint: &SprintSnapshot, issues: &[IssueSnapshot]) -> HistoricalSprint {
    let completed_points: f64 = issues.iter().filter_map(|i| i.story_points).sum();
    let duration_days = match (sprint.start_date, sprint.due_date) {
        (Some(start), Some(due)) => Some((due - start).num_days()),
        _ => None,
    };

    HistoricalSprint {
        sprint_id: sprint.id,
        name: sprint.name.clone(),
        status: sprint.status,
        duration_days,
        planned_points: sprint.planned_points,
        completed_points,
        completion_rate: completion_rate(sprint.planned_points, completed_points),
    }
}

/// Per-member performance across the team's completed sprints.
///
/// Only issues assigned to current team members are considered, and members
/// without any issue in the window are skipped. The points average is a mean
/// over the member's issues, not over the sprint count; unestimated issues
/// count as zero points.
pub fn member_velocities(
    team: &TeamSnapshot,
    completed_sprint_issues: &[IssueSnapshot],
    config: &PlanningConfig,
) -> Vec<MemberVelocity> {
    let mut velocities = Vec::new();

    for member in &team.members {
        let issues: Vec<&IssueSnapshot> = completed_sprint_issues
            .iter()
            .filter(|i| i.assignee_id == Some(member.user_id))
            .collect();
        if issues.is_empty() {
            continue;
        }

        let total_points: f64 = issues.iter().map(|i| i.story_points.unwrap_or(0.0)).sum();
        let completed = issues
            .iter()
            .filter(|i| config.is_completed_status(&i.status_name))
            .count();

        velocities.push(MemberVelocity {
            user_id: member.user_id,
            name: member.display_name.clone(),
            avg_points_per_sprint: total_points / issues.len() as f64,
            completion_rate: round1(completed as f64 / issues.len() as f64 * 100.0),
            issue_types_preference: issue_type_preference(&issues),
        });
    }

    velocities
}

/// Issue types ordered by descending frequency; ties break by type name so
/// the output is deterministic.
fn issue_type_preference(issues: &[&IssueSnapshot]) -> Vec<IssueType> {
    let mut counts: BTreeMap<IssueType, usize> = BTreeMap::new();
    for issue in issues {
        *counts.entry(issue.issue_type).or_default() += 1;
    }

    let mut ranked: Vec<(IssueType, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().map(|(issue_type, _)| issue_type).collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
