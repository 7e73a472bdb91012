use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::error::StoreError;
use crate::kv::KeyValueStore;
use crate::types::{CollectedReward, Milestone, Project};

pub const PROJECTS_KEY: &str = "soulstep_projects";
pub const TREASURY_KEY: &str = "soulstep_treasury";
/// Single-project key from before multiple journeys were supported. Read
/// once for migration and never written.
pub const LEGACY_PROJECT_KEY: &str = "soulstep_project";

/// Shape of the legacy single-project record; it may predate project ids.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyProject {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    milestones: Vec<Milestone>,
    started_at: DateTime<Utc>,
}

impl From<LegacyProject> for Project {
    fn from(legacy: LegacyProject) -> Self {
        let id = legacy
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Ulid::new().to_string());
        Project {
            id,
            name: legacy.name,
            milestones: legacy.milestones,
            started_at: legacy.started_at,
        }
    }
}

pub struct Storage<S> {
    backend: S,
}

impl<S: KeyValueStore> Storage<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Load all projects. Missing or unreadable data yields an empty list.
    /// A legacy single-project record is migrated and written under
    /// [`PROJECTS_KEY`] before returning.
    pub fn load_projects(&self) -> Vec<Project> {
        if let Some(raw) = self.read(PROJECTS_KEY) {
            match serde_json::from_str::<Vec<Project>>(&raw) {
                Ok(projects) => {
                    debug!(count = projects.len(), "loaded projects");
                    return projects;
                }
                Err(e) => warn!(error = %e, "failed to parse projects"),
            }
        }

        let Some(raw) = self.read(LEGACY_PROJECT_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str::<LegacyProject>(&raw) {
            Ok(legacy) => {
                let projects = vec![Project::from(legacy)];
                debug!(id = %projects[0].id, "migrated legacy project");
                // Write the current key now so the generated id sticks.
                if let Err(e) = self.save_projects(&projects) {
                    warn!(error = %e, "failed to save migrated projects");
                }
                projects
            }
            Err(e) => {
                warn!(error = %e, "failed to parse legacy project");
                Vec::new()
            }
        }
    }

    pub fn load_treasury(&self) -> Vec<CollectedReward> {
        let Some(raw) = self.read(TREASURY_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<CollectedReward>>(&raw) {
            Ok(treasury) => {
                debug!(count = treasury.len(), "loaded treasury");
                treasury
            }
            Err(e) => {
                warn!(error = %e, "failed to parse treasury");
                Vec::new()
            }
        }
    }

    pub fn save_projects(&self, projects: &[Project]) -> Result<(), StoreError> {
        let content = serde_json::to_string(projects)?;
        self.backend.set(PROJECTS_KEY, &content)?;
        debug!(count = projects.len(), "saved projects");
        Ok(())
    }

    pub fn save_treasury(&self, treasury: &[CollectedReward]) -> Result<(), StoreError> {
        let content = serde_json::to_string(treasury)?;
        self.backend.set(TREASURY_KEY, &content)?;
        debug!(count = treasury.len(), "saved treasury");
        Ok(())
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "failed to read key");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use pretty_assertions::assert_eq;

    fn sample_project() -> Project {
        Project {
            id: Ulid::new().to_string(),
            name: "写作".to_string(),
            milestones: vec![Milestone {
                id: "m1".to_string(),
                title: "开头".to_string(),
                reward: "咖啡".to_string(),
                is_completed: true,
                completed_at: Some(Utc::now()),
            }],
            started_at: Utc::now(),
        }
    }

    #[test]
    fn empty_backend_loads_nothing() {
        let storage = Storage::new(MemoryStore::new());
        assert!(storage.load_projects().is_empty());
        assert!(storage.load_treasury().is_empty());
    }

    #[test]
    fn corrupt_documents_degrade_to_empty() {
        let backend = MemoryStore::new()
            .with_entry(PROJECTS_KEY, "{not json")
            .with_entry(TREASURY_KEY, "[{\"id\":1}]");
        let storage = Storage::new(backend);
        assert!(storage.load_projects().is_empty());
        assert!(storage.load_treasury().is_empty());
    }

    #[test]
    fn projects_round_trip() {
        let storage = Storage::new(MemoryStore::new());
        let projects = vec![sample_project()];
        storage.save_projects(&projects).unwrap();
        assert_eq!(storage.load_projects(), projects);
    }

    #[test]
    fn treasury_round_trip_keeps_usage() {
        let storage = Storage::new(MemoryStore::new());
        let treasury = vec![CollectedReward {
            id: "r1".to_string(),
            content: "散步".to_string(),
            earned_at: Utc::now(),
            source_project_name: "写作".to_string(),
            is_used: true,
            used_at: Some(Utc::now()),
        }];
        storage.save_treasury(&treasury).unwrap();
        assert_eq!(storage.load_treasury(), treasury);
    }

    #[test]
    fn legacy_project_without_id_gets_fresh_id() {
        let legacy = r#"{
            "name": "旧项目",
            "startedAt": "2024-03-01T08:00:00.000Z",
            "milestones": [
                {"id": "a", "title": "一", "reward": "茶", "isCompleted": false},
                {"id": "b", "title": "二", "reward": "书", "isCompleted": true, "completedAt": "2024-03-02T08:00:00.000Z"},
                {"id": "c", "title": "三", "reward": "花", "isCompleted": false}
            ]
        }"#;
        let storage = Storage::new(MemoryStore::new().with_entry(LEGACY_PROJECT_KEY, legacy));
        let projects = storage.load_projects();
        assert_eq!(projects.len(), 1);
        assert!(!projects[0].id.is_empty());
        assert_eq!(projects[0].name, "旧项目");
        assert_eq!(projects[0].progress(), (1, 3));
    }

    #[test]
    fn legacy_project_keeps_existing_id() {
        let legacy = r#"{"id":"keep-me","name":"n","startedAt":"2024-03-01T08:00:00Z","milestones":[]}"#;
        let storage = Storage::new(MemoryStore::new().with_entry(LEGACY_PROJECT_KEY, legacy));
        assert_eq!(storage.load_projects()[0].id, "keep-me");
    }

    #[test]
    fn migrated_id_is_stable_across_loads() {
        let legacy = r#"{"name":"old","startedAt":"2024-03-01T08:00:00Z","milestones":[]}"#;
        let storage = Storage::new(MemoryStore::new().with_entry(LEGACY_PROJECT_KEY, legacy));

        let first = storage.load_projects();
        assert!(storage.backend().contains(PROJECTS_KEY));
        let second = storage.load_projects();
        assert_eq!(first.len(), 1);
        assert_eq!(second, first);
    }

    #[test]
    fn current_key_shadows_legacy_key() {
        let legacy = r#"{"name":"old","startedAt":"2024-03-01T08:00:00Z","milestones":[]}"#;
        let backend = MemoryStore::new().with_entry(LEGACY_PROJECT_KEY, legacy);
        let storage = Storage::new(backend);

        let migrated = storage.load_projects();
        storage.save_projects(&migrated).unwrap();
        let reloaded = storage.load_projects();
        assert_eq!(reloaded, migrated);

        storage.save_projects(&[]).unwrap();
        assert!(storage.load_projects().is_empty());
        assert!(storage.backend().contains(LEGACY_PROJECT_KEY));
    }
}
