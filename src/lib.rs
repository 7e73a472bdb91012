pub mod app;
pub mod error;
pub mod kv;
pub mod prompts;
pub mod render;
pub mod settings;
pub mod setup;
pub mod storage;
pub mod store;
pub mod suggest;
pub mod types;

pub mod metadata {
    include!(concat!(env!("OUT_DIR"), "/pkg_info.rs"));
}

pub use app::{Action, App};
pub use types::{CollectedReward, Milestone, Project, ViewState};
