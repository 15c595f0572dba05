use async_trait::async_trait;

use crate::{
    IssueSnapshot, ProjectId, ProjectSnapshot, ProjectStore, Result, SprintId, SprintSnapshot,
    SprintStatus, TeamId, TeamSnapshot,
};

/// In-memory [`ProjectStore`] over materialized snapshot rows.
///
/// Backs integration tests and embedders that already hold the data in
/// memory. Reads clone out of plain vectors; nothing mutates after
/// construction, so repeated queries always see the same snapshot.
#[derive(Debug, Default, Clone)]
pub struct SnapshotStore {
    projects: Vec<ProjectSnapshot>,
    teams: Vec<TeamSnapshot>,
    sprints: Vec<SprintSnapshot>,
    issues: Vec<IssueSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, project: ProjectSnapshot) -> Self {
        self.projects.push(project);
        self
    }

    pub fn with_team(mut self, team: TeamSnapshot) -> Self {
        self.teams.push(team);
        self
    }

    pub fn with_sprint(mut self, sprint: SprintSnapshot) -> Self {
        self.sprints.push(sprint);
        self
    }

    pub fn with_issue(mut self, issue: IssueSnapshot) -> Self {
        self.issues.push(issue);
        self
    }

    pub fn with_issues(mut self, issues: impl IntoIterator<Item = IssueSnapshot>) -> Self {
        self.issues.extend(issues);
        self
    }
}

#[async_trait]
impl ProjectStore for SnapshotStore {
    async fn project(&self, id: ProjectId) -> Result<Option<ProjectSnapshot>> {
        Ok(self.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn team(&self, id: TeamId) -> Result<Option<TeamSnapshot>> {
        Ok(self.teams.iter().find(|t| t.id == id).cloned())
    }

    async fn backlog_issues(&self, project_id: ProjectId) -> Result<Vec<IssueSnapshot>> {
        Ok(self
            .issues
            .iter()
            .filter(|i| i.project_id == project_id && i.sprint_id.is_none())
            .cloned()
            .collect())
    }

    async fn sprints_with_status(
        &self,
        project_id: ProjectId,
        status: SprintStatus,
    ) -> Result<Vec<SprintSnapshot>> {
        Ok(self
            .sprints
            .iter()
            .filter(|s| s.project_id == project_id && s.status == status)
            .cloned()
            .collect())
    }

    async fn sprint_issues(&self, sprint_id: SprintId) -> Result<Vec<IssueSnapshot>> {
        Ok(self
            .issues
            .iter()
            .filter(|i| i.sprint_id == Some(sprint_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IssuePriority, IssueType};

    fn fixture() -> (SnapshotStore, ProjectSnapshot, SprintSnapshot) {
        let project = ProjectSnapshot::new("PF", "Planforge");
        let sprint = SprintSnapshot::new(project.id, "Sprint 1", SprintStatus::Completed);
        let store = SnapshotStore::new()
            .with_project(project.clone())
            .with_team(TeamSnapshot::new(7, project.id, "Platform"))
            .with_sprint(sprint.clone())
            .with_issue(
                IssueSnapshot::new(project.id, "PF-1", "In backlog", IssueType::Task, IssuePriority::Low),
            )
            .with_issue(
                IssueSnapshot::new(project.id, "PF-2", "In sprint", IssueType::Story, IssuePriority::High)
                    .with_sprint(sprint.id),
            );
        (store, project, sprint)
    }

    #[tokio::test]
    async fn looks_up_projects_and_teams_by_id() {
        let (store, project, _) = fixture();
        assert_eq!(store.project(project.id).await.unwrap().unwrap().key, "PF");
        assert!(store.project(uuid::Uuid::new_v4()).await.unwrap().is_none());
        assert_eq!(store.team(7).await.unwrap().unwrap().name, "Platform");
        assert!(store.team(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn backlog_excludes_sprint_assigned_issues() {
        let (store, project, _) = fixture();
        let backlog = store.backlog_issues(project.id).await.unwrap();
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].key, "PF-1");
    }

    #[test]
    fn sprint_issues_filter_by_sprint() {
        let (store, _, sprint) = fixture();
        let issues = tokio_test::block_on(store.sprint_issues(sprint.id)).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].key, "PF-2");
    }

    #[tokio::test]
    async fn repeated_reads_see_the_same_snapshot() {
        let (store, project, _) = fixture();
        let first = store.backlog_issues(project.id).await.unwrap();
        let second = store.backlog_issues(project.id).await.unwrap();
        assert_eq!(first, second);
    }
}
