//! State transitions over the project list and the treasury.
//!
//! Every operation either applies completely or leaves its inputs untouched.
//! Unknown ids are no-ops rather than errors.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;
use ulid::Ulid;

use crate::types::{CollectedReward, MAX_MILESTONES, MIN_MILESTONES, Milestone, Project};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Give your journey a name.")]
    EmptyName,
    #[error("A journey needs between 3 and 5 milestones, got {0}.")]
    MilestoneCount(usize),
    #[error("Milestone {0} needs a title.")]
    EmptyTitle(usize),
    #[error("Milestone {0} needs a reward.")]
    EmptyReward(usize),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MilestoneDraft {
    pub title: String,
    pub reward: String,
}

impl MilestoneDraft {
    pub fn new(title: impl Into<String>, reward: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            reward: reward.into(),
        }
    }
}

/// Checked input for [`create_project`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewProject {
    name: String,
    milestones: Vec<MilestoneDraft>,
}

impl NewProject {
    /// Milestone numbers in errors are 1-based, matching how they are shown.
    pub fn new(name: &str, milestones: Vec<MilestoneDraft>) -> Result<Self, ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !(MIN_MILESTONES..=MAX_MILESTONES).contains(&milestones.len()) {
            return Err(ValidationError::MilestoneCount(milestones.len()));
        }
        for (i, m) in milestones.iter().enumerate() {
            if m.title.trim().is_empty() {
                return Err(ValidationError::EmptyTitle(i + 1));
            }
            if m.reward.trim().is_empty() {
                return Err(ValidationError::EmptyReward(i + 1));
            }
        }
        Ok(Self {
            name: name.to_string(),
            milestones,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn milestones(&self) -> &[MilestoneDraft] {
        &self.milestones
    }
}

pub fn create_project(request: NewProject, now: DateTime<Utc>) -> Project {
    let milestones = request
        .milestones
        .into_iter()
        .map(|m| Milestone {
            id: Ulid::new().to_string(),
            title: m.title,
            reward: m.reward,
            is_completed: false,
            completed_at: None,
        })
        .collect();
    let project = Project {
        id: Ulid::new().to_string(),
        name: request.name,
        milestones,
        started_at: now,
    };
    info!(id = %project.id, name = %project.name, "created project");
    project
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The milestone went from open to done; the reward was logged.
    Completed {
        milestone: Milestone,
        reward: CollectedReward,
    },
    Reopened,
    NotFound,
}

impl ToggleOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, ToggleOutcome::NotFound)
    }
}

/// Flip a milestone. Completion prepends a treasury entry that copies the
/// reward text and project name as they are right now. Reopening leaves the
/// treasury alone: it records what was earned, not what is currently done.
pub fn toggle_milestone(
    projects: &mut [Project],
    treasury: &mut Vec<CollectedReward>,
    project_id: &str,
    milestone_id: &str,
    now: DateTime<Utc>,
) -> ToggleOutcome {
    let Some(project) = projects.iter_mut().find(|p| p.id == project_id) else {
        return ToggleOutcome::NotFound;
    };
    let project_name = project.name.clone();
    let Some(milestone) = project.milestones.iter_mut().find(|m| m.id == milestone_id) else {
        return ToggleOutcome::NotFound;
    };

    if milestone.is_completed {
        milestone.set_completed(false, now);
        info!(project = %project_id, milestone = %milestone_id, "reopened milestone");
        return ToggleOutcome::Reopened;
    }

    milestone.set_completed(true, now);
    let reward = CollectedReward {
        id: Ulid::new().to_string(),
        content: milestone.reward.clone(),
        earned_at: now,
        source_project_name: project_name,
        is_used: false,
        used_at: None,
    };
    treasury.insert(0, reward.clone());
    info!(project = %project_id, milestone = %milestone_id, reward = %reward.id, "completed milestone");
    ToggleOutcome::Completed {
        milestone: milestone.clone(),
        reward,
    }
}

/// Returns whether a project was removed. Rewards already earned stay.
pub fn delete_project(projects: &mut Vec<Project>, project_id: &str) -> bool {
    let before = projects.len();
    projects.retain(|p| p.id != project_id);
    let removed = projects.len() != before;
    if removed {
        info!(id = %project_id, "deleted project");
    }
    removed
}

/// Mark a reward as used. Already-used or unknown rewards are untouched.
pub fn redeem_reward(
    treasury: &mut [CollectedReward],
    reward_id: &str,
    now: DateTime<Utc>,
) -> bool {
    match treasury.iter_mut().find(|r| r.id == reward_id) {
        Some(reward) if !reward.is_used => {
            reward.is_used = true;
            reward.used_at = Some(now);
            info!(id = %reward_id, "redeemed reward");
            true
        }
        _ => false,
    }
}
