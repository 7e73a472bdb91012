//! Application controller.
//!
//! `App` owns every piece of state the front-end shows: both collections,
//! the current selection, the visible view and the pending celebration.
//! Front-ends only read through accessors and change things by sending an
//! [`Action`] to [`App::dispatch`].

use chrono::Utc;
use tracing::{debug, warn};

use crate::kv::KeyValueStore;
use crate::storage::Storage;
use crate::store::{self, NewProject, ToggleOutcome};
use crate::types::{CollectedReward, Milestone, Project, ViewState};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Open the creation form.
    StartNew,
    /// Leave the current view for the dashboard, dropping any selection.
    Back,
    OpenProject(String),
    CreateProject(NewProject),
    /// Toggle a milestone of the selected project.
    ToggleMilestone(String),
    /// Delete the selected project.
    DeleteActive,
    /// Delete a project by id without changing the selection.
    DeleteProject(String),
    RedeemReward(String),
    AcknowledgeCelebration,
}

/// Which view to show for a selection and the last explicit navigation.
pub fn route(selection: Option<&str>, requested: ViewState) -> ViewState {
    match (selection, requested) {
        (Some(_), _) => ViewState::Tracker,
        (None, ViewState::Tracker) => ViewState::Dashboard,
        (None, view) => view,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Dirty {
    projects: bool,
    treasury: bool,
}

pub struct App<S> {
    storage: Storage<S>,
    projects: Vec<Project>,
    treasury: Vec<CollectedReward>,
    active_project_id: Option<String>,
    view: ViewState,
    celebration: Option<Milestone>,
}

impl<S: KeyValueStore> App<S> {
    /// Load both collections from `storage` and start on the dashboard.
    pub fn load(storage: Storage<S>) -> Self {
        let projects = storage.load_projects();
        let treasury = storage.load_treasury();
        Self {
            storage,
            projects,
            treasury,
            active_project_id: None,
            view: ViewState::Dashboard,
            celebration: None,
        }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn treasury(&self) -> &[CollectedReward] {
        &self.treasury
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn active_project_id(&self) -> Option<&str> {
        self.active_project_id.as_deref()
    }

    pub fn active_project(&self) -> Option<&Project> {
        let id = self.active_project_id.as_deref()?;
        self.project(id)
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn celebration(&self) -> Option<&Milestone> {
        self.celebration.as_ref()
    }

    pub fn storage(&self) -> &Storage<S> {
        &self.storage
    }

    pub fn dispatch(&mut self, action: Action) {
        debug!(?action, view = %self.view, "dispatch");
        let mut dirty = Dirty::default();
        let mut requested = self.view;

        match action {
            Action::StartNew => {
                self.active_project_id = None;
                requested = ViewState::Setup;
            }
            Action::Back => {
                self.active_project_id = None;
                requested = ViewState::Dashboard;
            }
            Action::OpenProject(id) => {
                if self.project(&id).is_some() {
                    self.active_project_id = Some(id);
                } else {
                    debug!(%id, "ignoring unknown project");
                }
            }
            Action::CreateProject(request) => {
                let project = store::create_project(request, Utc::now());
                self.active_project_id = Some(project.id.clone());
                self.projects.push(project);
                dirty.projects = true;
            }
            Action::ToggleMilestone(milestone_id) => {
                if let Some(project_id) = self.active_project_id.clone() {
                    let outcome = store::toggle_milestone(
                        &mut self.projects,
                        &mut self.treasury,
                        &project_id,
                        &milestone_id,
                        Utc::now(),
                    );
                    dirty.projects = outcome.changed();
                    if let ToggleOutcome::Completed { milestone, .. } = outcome {
                        self.celebration = Some(milestone);
                        dirty.treasury = true;
                    }
                }
            }
            Action::DeleteActive => {
                if let Some(id) = self.active_project_id.take() {
                    dirty.projects = store::delete_project(&mut self.projects, &id);
                    requested = ViewState::Dashboard;
                }
            }
            Action::DeleteProject(id) => {
                dirty.projects = store::delete_project(&mut self.projects, &id);
                if self.active_project_id.as_deref() == Some(id.as_str()) {
                    self.active_project_id = None;
                    requested = ViewState::Dashboard;
                }
            }
            Action::RedeemReward(id) => {
                dirty.treasury = store::redeem_reward(&mut self.treasury, &id, Utc::now());
            }
            Action::AcknowledgeCelebration => {
                self.celebration = None;
            }
        }

        self.view = route(self.active_project_id.as_deref(), requested);
        self.persist(dirty);
    }

    /// Saves run after the in-memory change. A failed save is logged and
    /// the in-memory state stays as is.
    fn persist(&self, dirty: Dirty) {
        if dirty.projects {
            if let Err(e) = self.storage.save_projects(&self.projects) {
                warn!(error = %e, "failed to save projects");
            }
        }
        if dirty.treasury {
            if let Err(e) = self.storage.save_treasury(&self.treasury) {
                warn!(error = %e, "failed to save treasury");
            }
        }
    }
}
