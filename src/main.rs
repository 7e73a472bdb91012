mod cli;
mod shell;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use soulstep::error::{ServiceError, ServiceResult};
use soulstep::kv::{FileStore, KeyValueStore, MemoryStore};
use soulstep::settings::Settings;
use soulstep::setup::SetupForm;
use soulstep::storage::Storage;
use soulstep::store::NewProject;
use soulstep::suggest::{GeminiClient, GeminiConfig, SuggestionService, reward_ideas_or_default};
use soulstep::types::{AiSuggestion, Project};
use soulstep::{Action, App, render};

use crate::cli::{Cli, Command, NewArguments};

pub type Backend = Box<dyn KeyValueStore>;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ServiceResult<()> {
    let settings = Settings::resolve(cli.global.overrides());
    let backend: Backend = if cli.global.ephemeral {
        Box::new(MemoryStore::new())
    } else {
        Box::new(FileStore::new(&settings.data_dir))
    };
    let mut app = App::load(Storage::new(backend));
    tracing::debug!(projects = app.projects().len(), "loaded state");

    match cli.command.unwrap_or(Command::List) {
        Command::List => print!("{}", render::dashboard(app.projects(), app.treasury())),
        Command::New(args) => create(&mut app, &settings, args).await?,
        Command::Show { project } => {
            let id = resolve_project(&app, &project)?;
            app.dispatch(Action::OpenProject(id));
            if let Some(project) = app.active_project() {
                print!("{}", render::tracker(project));
            }
        }
        Command::Toggle { project, milestone } => {
            let id = resolve_project(&app, &project)?;
            app.dispatch(Action::OpenProject(id));
            let milestone_id = app
                .active_project()
                .and_then(|p| resolve_milestone(p, &milestone))
                .ok_or_else(|| ServiceError::MilestoneNotFound(milestone.clone()))?;
            app.dispatch(Action::ToggleMilestone(milestone_id));
            if let Some(done) = app.celebration() {
                print!("{}", render::celebration(done));
                app.dispatch(Action::AcknowledgeCelebration);
            }
            if let Some(project) = app.active_project() {
                print!("{}", render::tracker(project));
            }
        }
        Command::Delete { project } => {
            let id = resolve_project(&app, &project)?;
            app.dispatch(Action::DeleteProject(id));
            println!("Deleted. Earned rewards stay in the treasury.");
        }
        Command::Treasury => print!("{}", render::treasury(app.treasury())),
        Command::Redeem { reward } => {
            let id = resolve_reward(&app, &reward)?;
            app.dispatch(Action::RedeemReward(id));
            print!("{}", render::treasury(app.treasury()));
        }
        Command::Ideas => {
            let ideas = match settings.city.clone() {
                Some(city) => fetch_reward_ideas(&settings, city).await,
                None => SetupForm::new().inspirations().to_vec(),
            };
            for idea in ideas {
                println!("  {idea}");
            }
        }
        Command::Shell => shell::run(&mut app, &settings).await?,
        Command::Config => println!("{}", serde_json::to_string_pretty(&settings.redacted())?),
    }
    Ok(())
}

async fn create(app: &mut App<Backend>, settings: &Settings, args: NewArguments) -> ServiceResult<()> {
    let request = if args.suggest {
        let mut form = SetupForm::new();
        form.name = args.name;
        if let Some(ticket) = form.begin_suggestion() {
            let result = fetch_suggestions(settings, form.name.clone(), settings.city.clone()).await;
            form.apply_suggestion(ticket, result);
        }
        if let Some(notice) = form.take_notice() {
            return Err(ServiceError::Other(shell::notice_text(&notice)));
        }
        form.submit()?
    } else {
        NewProject::new(&args.name, args.steps)?
    };

    app.dispatch(Action::CreateProject(request));
    if let Some(project) = app.active_project() {
        print!("{}", render::tracker(project));
    }
    Ok(())
}

pub fn gemini(settings: &Settings) -> GeminiClient {
    GeminiClient::new(GeminiConfig::from_settings(settings))
}

/// Run the blocking suggestion call off the async runtime.
pub async fn fetch_suggestions(
    settings: &Settings,
    name: String,
    city: Option<String>,
) -> Result<AiSuggestion, soulstep::suggest::SuggestError> {
    let client = gemini(settings);
    tokio::task::spawn_blocking(move || client.generate_suggestions(&name, city.as_deref()))
        .await
        .unwrap_or_else(|e| Err(soulstep::suggest::SuggestError::Network(e.to_string())))
}

pub async fn fetch_reward_ideas(settings: &Settings, city: String) -> Vec<String> {
    let client = gemini(settings);
    tokio::task::spawn_blocking(move || reward_ideas_or_default(&client, &city))
        .await
        .unwrap_or_else(|_| soulstep::suggest::default_reward_ideas())
}

/// Accept either an id or a 1-based dashboard position.
fn resolve_project(app: &App<Backend>, reference: &str) -> ServiceResult<String> {
    let projects = app.projects();
    if let Some(p) = projects.iter().find(|p| p.id == reference) {
        return Ok(p.id.clone());
    }
    reference
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| projects.get(i))
        .map(|p| p.id.clone())
        .ok_or_else(|| ServiceError::ProjectNotFound(reference.to_string()))
}

fn resolve_milestone(project: &Project, reference: &str) -> Option<String> {
    if let Some(m) = project.milestone(reference) {
        return Some(m.id.clone());
    }
    let index = reference.parse::<usize>().ok()?.checked_sub(1)?;
    project.milestones.get(index).map(|m| m.id.clone())
}

fn resolve_reward(app: &App<Backend>, reference: &str) -> ServiceResult<String> {
    let treasury = app.treasury();
    if let Some(r) = treasury.iter().find(|r| r.id == reference) {
        return Ok(r.id.clone());
    }
    reference
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| treasury.get(i))
        .map(|r| r.id.clone())
        .ok_or_else(|| ServiceError::RewardNotFound(reference.to_string()))
}
