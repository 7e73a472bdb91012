use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound on milestones in a journey.
pub const MIN_MILESTONES: usize = 3;
/// Upper bound on milestones in a journey.
pub const MAX_MILESTONES: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: String,
    pub title: String,
    pub reward: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Milestone {
    /// Flip completion, keeping `completed_at` in lock-step with `is_completed`.
    pub(crate) fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        self.is_completed = completed;
        self.completed_at = completed.then_some(now);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub milestones: Vec<Milestone>,
    pub started_at: DateTime<Utc>,
}

impl Project {
    /// `(completed, total)` milestone counts.
    pub fn progress(&self) -> (usize, usize) {
        let done = self.milestones.iter().filter(|m| m.is_completed).count();
        (done, self.milestones.len())
    }

    pub fn percent(&self) -> u8 {
        let (done, total) = self.progress();
        if total == 0 {
            return 0;
        }
        ((done * 100) / total) as u8
    }

    pub fn is_finished(&self) -> bool {
        let (done, total) = self.progress();
        total > 0 && done == total
    }

    pub fn milestone(&self, id: &str) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == id)
    }
}

/// An entry in the treasury. `content` and `source_project_name` are
/// snapshots taken when the milestone was completed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedReward {
    pub id: String,
    pub content: String,
    pub earned_at: DateTime<Utc>,
    pub source_project_name: String,
    #[serde(default)]
    pub is_used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewState {
    #[default]
    Dashboard,
    Setup,
    Tracker,
}

impl ViewState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewState::Dashboard => "dashboard",
            ViewState::Setup => "setup",
            ViewState::Tracker => "tracker",
        }
    }
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedMilestone {
    pub title: String,
    pub reward: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSuggestion {
    pub milestones: Vec<SuggestedMilestone>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn milestone(id: &str, done: bool) -> Milestone {
        Milestone {
            id: id.to_string(),
            title: format!("step {id}"),
            reward: "tea".to_string(),
            is_completed: done,
            completed_at: None,
        }
    }

    #[test]
    fn progress_counts_completed_milestones() {
        let project = Project {
            id: "p".to_string(),
            name: "Novel".to_string(),
            milestones: vec![milestone("a", true), milestone("b", false), milestone("c", false)],
            started_at: Utc::now(),
        };
        assert_eq!(project.progress(), (1, 3));
        assert_eq!(project.percent(), 33);
        assert!(!project.is_finished());
    }

    #[test]
    fn empty_project_is_never_finished() {
        let project = Project {
            id: "p".to_string(),
            name: "Empty".to_string(),
            milestones: vec![],
            started_at: Utc::now(),
        };
        assert_eq!(project.percent(), 0);
        assert!(!project.is_finished());
    }

    #[test]
    fn serializes_camel_case_and_omits_absent_timestamps() {
        let m = milestone("a", false);
        let value = serde_json::to_value(&m).unwrap();
        assert_eq!(value["isCompleted"], false);
        assert!(value.get("completedAt").is_none());
    }

    #[test]
    fn reward_without_is_used_defaults_to_unused() {
        let raw = r#"{"id":"r1","content":"咖啡","earnedAt":"2024-05-01T10:00:00.000Z","sourceProjectName":"写作"}"#;
        let reward: CollectedReward = serde_json::from_str(raw).unwrap();
        assert!(!reward.is_used);
        assert_eq!(reward.used_at, None);
        assert_eq!(
            reward.earned_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn set_completed_keeps_timestamp_in_step() {
        let mut m = milestone("a", false);
        let now = Utc::now();
        m.set_completed(true, now);
        assert_eq!(m.completed_at, Some(now));
        m.set_completed(false, now);
        assert!(!m.is_completed);
        assert_eq!(m.completed_at, None);
    }
}
