use planforge_core::{PlanningConfig, PlanningContext};

use crate::schema::output_schema_json;

/// Renders a [`PlanningContext`] into the instruction document sent to the
/// planner. Pure transform: equal contexts produce byte-identical documents.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    velocity_target_floor: f64,
    velocity_target_ceiling: f64,
}

impl PromptComposer {
    pub fn new(config: &PlanningConfig) -> Self {
        Self {
            velocity_target_floor: config.velocity_target_floor,
            velocity_target_ceiling: config.velocity_target_ceiling,
        }
    }

    pub fn compose(&self, context: &PlanningContext) -> String {
        let mut prompt = String::with_capacity(4096);

        prompt.push_str(
            "You are an expert agile planner for a software project tracker. \
             Select backlog issues for the upcoming sprint described below.\n\n",
        );

        self.push_sprint_section(&mut prompt, context);
        self.push_velocity_section(&mut prompt, context);
        self.push_load_section(&mut prompt, context);
        self.push_rules_section(&mut prompt);

        prompt.push_str("PLANNING CONTEXT (JSON):\n");
        prompt.push_str(
            &serde_json::to_string_pretty(context).expect("planning context serializes"),
        );
        prompt.push_str("\n\n");

        prompt.push_str("OUTPUT FORMAT:\n");
        prompt.push_str(
            "Respond with a single JSON object matching this schema exactly. \
             Do not add prose outside the JSON.\n",
        );
        prompt.push_str(&output_schema_json());
        prompt.push('\n');

        prompt
    }

    fn push_sprint_section(&self, prompt: &mut String, context: &PlanningContext) {
        let sprint = &context.new_sprint;
        prompt.push_str("TARGET SPRINT:\n");
        prompt.push_str(&format!(
            "- Project: {} ({})\n",
            context.project.name, context.project.key
        ));
        prompt.push_str(&format!("- Sprint name: {}\n", sprint.name));
        if let Some(goal) = &sprint.goal {
            prompt.push_str(&format!("- Goal: {}\n", goal));
        }
        if let Some(start) = sprint.start_date {
            prompt.push_str(&format!("- Start date: {}\n", start));
        }
        if let Some(due) = sprint.due_date {
            prompt.push_str(&format!("- Due date: {}\n", due));
        }
        if let Some(target) = sprint.target_story_points {
            prompt.push_str(&format!("- Requested target: {} story points\n", target));
        }
        prompt.push_str(&format!("- Backlog size: {} issues\n\n", context.backlog.len()));
    }

    fn push_velocity_section(&self, prompt: &mut String, context: &PlanningContext) {
        match context.velocity.team_velocity() {
            Some(velocity) => {
                prompt.push_str("TEAM VELOCITY:\n");
                prompt.push_str(&format!(
                    "- Team: {} ({} members)\n",
                    velocity.team_name, velocity.member_count
                ));
                prompt.push_str(&format!(
                    "- Average velocity over {} completed sprints: {:.1} points\n",
                    velocity.historical_sprints.len(),
                    velocity.average_velocity
                ));
                prompt.push_str(&format!(
                    "- Recent trend: {}\n\n",
                    velocity.recent_velocity_trend
                ));
            }
            None => {
                let history = context.velocity.project_history().unwrap_or_default();
                prompt.push_str("PROJECT HISTORY:\n");
                prompt.push_str(&format!(
                    "- No team was specified; {} completed project sprints are listed in the context\n\n",
                    history.len()
                ));
            }
        }
    }

    fn push_load_section(&self, prompt: &mut String, context: &PlanningContext) {
        if context.in_progress_sprints.is_empty() && context.planned_sprints.is_empty() {
            return;
        }
        prompt.push_str("CURRENT LOAD:\n");
        for sprint in &context.in_progress_sprints {
            prompt.push_str(&format!(
                "- Active '{}': {} points allocated, {} remaining\n",
                sprint.name, sprint.allocated_points, sprint.remaining_points
            ));
        }
        for sprint in &context.planned_sprints {
            prompt.push_str(&format!(
                "- Planned '{}': {} points allocated\n",
                sprint.name, sprint.allocated_points
            ));
        }
        prompt.push('\n');
    }

    fn push_rules_section(&self, prompt: &mut String) {
        prompt.push_str("SELECTION RULES:\n");
        prompt.push_str("1. Prefer CRITICAL and HIGH priority issues, then fill by priority order.\n");
        prompt.push_str(&format!(
            "2. Target {:.0}-{:.0}% of the team's average velocity when it is known; otherwise respect the requested target story points.\n",
            self.velocity_target_floor * 100.0,
            self.velocity_target_ceiling * 100.0
        ));
        prompt.push_str("3. Never schedule a child issue without its parent issue.\n");
        prompt.push_str("4. Select only issues listed in the backlog; never invent issue ids or keys.\n");
        prompt.push_str("5. Use the story point values exactly as given; never re-estimate them.\n\n");
    }
}
