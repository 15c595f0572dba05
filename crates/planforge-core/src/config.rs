/// Tunables for context assembly and velocity statistics.
#[derive(Debug, Clone)]
pub struct PlanningConfig {
    /// Status names that count an issue as completed.
    pub completed_status_names: Vec<String>,
    /// Lower edge of the recommended sprint fill, as a fraction of average velocity.
    pub velocity_target_floor: f64,
    /// Upper edge of the recommended sprint fill, as a fraction of average velocity.
    pub velocity_target_ceiling: f64,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            completed_status_names: vec![
                "Done".to_string(),
                "Closed".to_string(),
                "Completed".to_string(),
            ],
            velocity_target_floor: 0.85,
            velocity_target_ceiling: 0.95,
        }
    }
}

impl PlanningConfig {
    /// Exact match against the configured completed-status names.
    pub fn is_completed_status(&self, status_name: &str) -> bool {
        self.completed_status_names
            .iter()
            .any(|name| name == status_name)
    }
}
