use planforge_core::{
    CapacityAnalysis, IssueId, PlanningError, Recommendation, Result, SelectedIssue, SprintPlan,
    UserId,
};
use serde::Deserialize;
use serde_json::{json, Value};

/// Decodes the planner's answer text into a [`SprintPlan`].
///
/// The payload may arrive wrapped in a ```json fence. Object keys are
/// matched case-insensitively and in either snake_case or camelCase; a
/// payload that still does not fit the schema is a terminal
/// [`PlanningError::MalformedPlan`].
pub fn parse_plan(text: &str) -> Result<SprintPlan> {
    let body = strip_code_fence(text);
    let mut value: Value = serde_json::from_str(body)
        .map_err(|e| PlanningError::MalformedPlan(format!("plan is not valid JSON: {}", e)))?;
    normalize_keys(&mut value);

    let envelope: PlanEnvelope = serde_json::from_value(value).map_err(|e| {
        PlanningError::MalformedPlan(format!("plan does not match the required schema: {}", e))
    })?;
    envelope.sprint_plan.into_plan()
}

/// JSON template the planner must fill in, embedded verbatim in every prompt.
pub fn output_schema_json() -> String {
    serde_json::to_string_pretty(&json!({
        "sprint_plan": {
            "selected_issues": [{
                "issue_id": "uuid of a backlog issue",
                "issue_key": "e.g. PF-123",
                "story_points": 5.0,
                "suggested_assignee_id": 42,
                "rationale": "why this issue belongs in the sprint"
            }],
            "total_story_points": 0.0,
            "summary": "one paragraph describing the proposed sprint",
            "recommendations": [{
                "type": "capacity",
                "severity": "info | warning | critical",
                "message": "actionable advice for the planner"
            }],
            "capacity_analysis": {
                "team_capacity_utilization": 0.0,
                "estimated_completion_probability": 0.0,
                "risk_factors": ["short risk description"]
            }
        }
    }))
    .expect("schema template serializes")
}

/// Removes a surrounding markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Lowercases every object key and strips underscores, recursively, so
/// `issue_id`, `issueId` and `IssueID` all land on the same field.
fn normalize_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let entries: Vec<(String, Value)> = std::mem::take(map).into_iter().collect();
            for (key, mut inner) in entries {
                normalize_keys(&mut inner);
                map.insert(key.replace('_', "").to_lowercase(), inner);
            }
        }
        Value::Array(items) => {
            for item in items {
                normalize_keys(item);
            }
        }
        _ => {}
    }
}

// Wire shapes after key normalization. Field renames are the normalized
// (lowercased, underscore-free) spellings.

#[derive(Debug, Deserialize)]
struct PlanEnvelope {
    #[serde(rename = "sprintplan")]
    sprint_plan: WirePlan,
}

#[derive(Debug, Deserialize)]
struct WirePlan {
    #[serde(rename = "selectedissues")]
    selected_issues: Vec<WireSelectedIssue>,
    #[serde(rename = "totalstorypoints")]
    total_story_points: f64,
    summary: String,
    #[serde(default)]
    recommendations: Vec<WireRecommendation>,
    #[serde(rename = "capacityanalysis")]
    capacity_analysis: WireCapacityAnalysis,
}

#[derive(Debug, Deserialize)]
struct WireSelectedIssue {
    #[serde(rename = "issueid")]
    issue_id: IssueId,
    #[serde(rename = "issuekey")]
    issue_key: String,
    #[serde(rename = "storypoints")]
    story_points: f64,
    #[serde(rename = "suggestedassigneeid", default)]
    suggested_assignee_id: Option<UserId>,
    rationale: String,
}

#[derive(Debug, Deserialize)]
struct WireRecommendation {
    #[serde(rename = "type")]
    kind: String,
    severity: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WireCapacityAnalysis {
    #[serde(rename = "teamcapacityutilization")]
    team_capacity_utilization: f64,
    #[serde(rename = "estimatedcompletionprobability")]
    estimated_completion_probability: f64,
    #[serde(rename = "riskfactors", default)]
    risk_factors: Vec<String>,
}

impl WirePlan {
    fn into_plan(self) -> Result<SprintPlan> {
        let recommendations = self
            .recommendations
            .into_iter()
            .map(|r| {
                let severity = r.severity.parse().map_err(|_| {
                    PlanningError::MalformedPlan(format!(
                        "unknown recommendation severity '{}'",
                        r.severity
                    ))
                })?;
                Ok(Recommendation {
                    kind: r.kind,
                    severity,
                    message: r.message,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SprintPlan {
            selected_issues: self
                .selected_issues
                .into_iter()
                .map(|issue| SelectedIssue {
                    issue_id: issue.issue_id,
                    issue_key: issue.issue_key,
                    story_points: issue.story_points,
                    suggested_assignee_id: issue.suggested_assignee_id,
                    rationale: issue.rationale,
                })
                .collect(),
            total_story_points: self.total_story_points,
            summary: self.summary,
            recommendations,
            capacity_analysis: CapacityAnalysis {
                team_capacity_utilization: self.capacity_analysis.team_capacity_utilization,
                estimated_completion_probability: self
                    .capacity_analysis
                    .estimated_completion_probability,
                risk_factors: self.capacity_analysis.risk_factors,
            },
        })
    }
}
