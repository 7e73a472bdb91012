use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use soulstep::metadata::{PKG_DESCRIPTION, PKG_NAME, PKG_VERSION};
use soulstep::settings::Overrides;
use soulstep::store::MilestoneDraft;

#[derive(Parser, Debug, Clone)]
#[command(name = PKG_NAME)]
#[command(version = PKG_VERSION)]
#[command(about = PKG_DESCRIPTION, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArguments,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArguments {
    /// Directory holding journeys, the treasury and settings.json
    #[arg(long, global = true, env = "SOULSTEP_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Keep everything in memory; nothing is read or written
    #[arg(long, global = true, default_value_t = false)]
    pub ephemeral: bool,

    /// Gemini API key used for suggestions
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Older API key variable, used when `GEMINI_API_KEY` is unset
    #[arg(long = "fallback-api-key", global = true, env = "API_KEY", hide = true, hide_env_values = true)]
    pub fallback_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, global = true, env = "SOULSTEP_MODEL")]
    pub model: Option<String>,

    /// City used to localise suggestions
    #[arg(long, global = true, env = "SOULSTEP_CITY")]
    pub city: Option<String>,
}

impl GlobalArguments {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            data_dir: self.data_dir.clone(),
            api_key: self.api_key.clone().or_else(|| self.fallback_api_key.clone()),
            model: self.model.clone(),
            city: self.city.clone(),
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show all journeys and a treasury summary
    List,
    /// Start a new journey
    New(NewArguments),
    /// Show one journey and its milestones
    Show {
        /// Project id or 1-based position on the dashboard
        project: String,
    },
    /// Complete or reopen a milestone
    Toggle {
        /// Project id or 1-based position on the dashboard
        project: String,
        /// Milestone id or 1-based position
        milestone: String,
    },
    /// Delete a journey (earned rewards stay in the treasury)
    Delete {
        /// Project id or 1-based position on the dashboard
        project: String,
    },
    /// List collected rewards
    Treasury,
    /// Mark a collected reward as enjoyed
    Redeem {
        /// Reward id or 1-based position in the treasury
        reward: String,
    },
    /// Print reward inspirations, localised when a city is known
    Ideas,
    /// Interactive session
    Shell,
    /// Print the resolved settings
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct NewArguments {
    /// Journey name
    #[arg(long)]
    pub name: String,

    /// Milestone as `title=reward`; repeat 3 to 5 times
    #[arg(long = "step", value_parser = parse_step)]
    pub steps: Vec<MilestoneDraft>,

    /// Ask the suggestion service to propose milestones
    #[arg(long, default_value_t = false, conflicts_with = "steps")]
    pub suggest: bool,
}

pub fn parse_step(raw: &str) -> Result<MilestoneDraft, String> {
    let (title, reward) = raw
        .split_once('=')
        .ok_or_else(|| format!("Expected `title=reward`, got '{raw}'"))?;
    Ok(MilestoneDraft::new(title.trim(), reward.trim()))
}
