//! Interactive session: one menu per view, driven through `App::dispatch`.

use colored::Colorize;
use dialoguer::{Confirm, Input, Select};

use soulstep::error::ServiceResult;
use soulstep::settings::Settings;
use soulstep::setup::{SetupForm, SetupNotice};
use soulstep::types::ViewState;
use soulstep::{Action, App, render};

use crate::{Backend, fetch_reward_ideas, fetch_suggestions, gemini};

pub fn notice_text(notice: &SetupNotice) -> String {
    match notice {
        SetupNotice::NeedName => "请先输入项目名称，这样灵感之神才能降临。".to_string(),
        SetupNotice::NeedCity => "请先输入城市名称，以便为你寻找本地灵感。".to_string(),
        SetupNotice::SuggestionFailed(reason) => {
            format!("灵感暂时枯竭，请手动填写细节。({reason})")
        }
    }
}

pub async fn run(app: &mut App<Backend>, settings: &Settings) -> ServiceResult<()> {
    let mut form: Option<SetupForm> = None;
    loop {
        if let Some(milestone) = app.celebration() {
            print!("{}", render::celebration(milestone));
            Confirm::new()
                .with_prompt("我已收下")
                .default(true)
                .show_default(false)
                .interact()?;
            app.dispatch(Action::AcknowledgeCelebration);
        }

        let keep_going = match app.view() {
            ViewState::Dashboard => {
                form = None;
                dashboard(app)?
            }
            ViewState::Setup => {
                let draft = form.get_or_insert_with(|| {
                    let mut f = SetupForm::new();
                    f.city = settings.city.clone().unwrap_or_default();
                    f
                });
                setup(app, settings, draft).await?;
                true
            }
            ViewState::Tracker => {
                form = None;
                tracker(app)?;
                true
            }
        };
        if !keep_going {
            return Ok(());
        }
    }
}

fn dashboard(app: &mut App<Backend>) -> ServiceResult<bool> {
    print!("\n{}", render::dashboard(app.projects(), app.treasury()));

    let mut items: Vec<String> = app
        .projects()
        .iter()
        .map(|p| format!("Open {} ({}/{})", p.name, p.progress().0, p.progress().1))
        .collect();
    let projects = items.len();
    items.push("Start a new journey".to_string());
    items.push("Open the treasury".to_string());
    items.push("Delete a journey".to_string());
    items.push("Quit".to_string());

    let choice = Select::new().with_prompt("Dashboard").items(&items).default(0).interact()?;
    if choice < projects {
        let id = app.projects()[choice].id.clone();
        app.dispatch(Action::OpenProject(id));
        return Ok(true);
    }
    match choice - projects {
        0 => app.dispatch(Action::StartNew),
        1 => treasury(app)?,
        2 => {
            if let Some(id) = pick_project(app, "Delete which journey?")? {
                let confirmed = Confirm::new()
                    .with_prompt("Delete it? Earned rewards stay in the treasury.")
                    .default(false)
                    .interact()?;
                if confirmed {
                    app.dispatch(Action::DeleteProject(id));
                }
            }
        }
        _ => return Ok(false),
    }
    Ok(true)
}

fn pick_project(app: &App<Backend>, prompt: &str) -> ServiceResult<Option<String>> {
    if app.projects().is_empty() {
        return Ok(None);
    }
    let mut items: Vec<String> = app.projects().iter().map(|p| p.name.clone()).collect();
    items.push("Cancel".to_string());
    let choice = Select::new().with_prompt(prompt).items(&items).default(0).interact()?;
    Ok(app.projects().get(choice).map(|p| p.id.clone()))
}

fn treasury(app: &mut App<Backend>) -> ServiceResult<()> {
    print!("\n{}", render::treasury(app.treasury()));
    let unused: Vec<(String, String)> = app
        .treasury()
        .iter()
        .filter(|r| !r.is_used)
        .map(|r| (r.id.clone(), format!("Enjoy \"{}\" from {}", r.content, r.source_project_name)))
        .collect();
    if unused.is_empty() {
        return Ok(());
    }
    let mut items: Vec<String> = unused.iter().map(|(_, label)| label.clone()).collect();
    items.push("Back".to_string());
    let choice = Select::new().with_prompt("Treasury").items(&items).default(0).interact()?;
    if let Some((id, _)) = unused.get(choice) {
        app.dispatch(Action::RedeemReward(id.clone()));
    }
    Ok(())
}

fn tracker(app: &mut App<Backend>) -> ServiceResult<()> {
    let Some(project) = app.active_project() else {
        app.dispatch(Action::Back);
        return Ok(());
    };
    print!("\n{}", render::tracker(project));

    let ids: Vec<String> = project.milestones.iter().map(|m| m.id.clone()).collect();
    let mut items: Vec<String> = project
        .milestones
        .iter()
        .map(|m| {
            let verb = if m.is_completed { "Reopen" } else { "Complete" };
            format!("{verb}: {}", m.title)
        })
        .collect();
    items.push("Delete this journey".to_string());
    items.push("Back to dashboard".to_string());

    let choice = Select::new().with_prompt("Journey").items(&items).default(0).interact()?;
    if let Some(id) = ids.get(choice) {
        app.dispatch(Action::ToggleMilestone(id.clone()));
    } else if choice == ids.len() {
        let confirmed = Confirm::new()
            .with_prompt("Delete this journey?")
            .default(false)
            .interact()?;
        if confirmed {
            app.dispatch(Action::DeleteActive);
        }
    } else {
        app.dispatch(Action::Back);
    }
    Ok(())
}

const SETUP_ACTIONS: [&str; 10] = [
    "Set journey name",
    "Set city",
    "Edit a milestone",
    "Add a milestone",
    "Remove a milestone",
    "Use an inspiration",
    "Shuffle inspirations",
    "Fill in with AI",
    "Refresh local inspirations",
    "Create journey",
];

async fn setup(app: &mut App<Backend>, settings: &Settings, form: &mut SetupForm) -> ServiceResult<()> {
    print_form(form);

    let mut items: Vec<&str> = SETUP_ACTIONS.to_vec();
    let ai_ready = gemini(settings).has_credentials();
    if !ai_ready {
        items[7] = "Fill in with AI (needs GEMINI_API_KEY)";
    }
    items.push("Back");
    let choice = Select::new().with_prompt("New journey").items(&items).default(0).interact()?;

    match choice {
        0 => form.name = prompt_text("Journey name", &form.name)?,
        1 => form.city = prompt_text("City", &form.city)?,
        2 => {
            if let Some(i) = pick_row(form)? {
                let title = prompt_text("Milestone", &form.rows()[i].title)?;
                let reward = prompt_text("Reward", &form.rows()[i].reward)?;
                form.set_title(i, &title);
                form.set_reward(i, &reward);
            }
        }
        3 => {
            if !form.add_row() {
                println!("{}", "At most five milestones.".yellow());
            }
        }
        4 => {
            if !form.can_remove_row() {
                println!("{}", "At least three milestones.".yellow());
            } else if let Some(i) = pick_row(form)? {
                form.remove_row(i);
            }
        }
        5 => {
            let choice = Select::new()
                .with_prompt("Inspiration")
                .items(form.inspirations())
                .default(0)
                .interact()?;
            let text = form.inspirations()[choice].clone();
            if form.apply_inspiration(&text).is_none() {
                println!("{}", "Every milestone already has a reward.".yellow());
            }
        }
        6 => form.shuffle_inspirations(),
        7 if !ai_ready => println!("{}", "No API key configured.".yellow()),
        7 => {
            if let Some(ticket) = form.begin_suggestion() {
                println!("{}", "正在连接灵感...".dimmed());
                let city = Some(form.city.clone()).filter(|c| !c.trim().is_empty());
                let result = fetch_suggestions(settings, form.name.clone(), city).await;
                form.apply_suggestion(ticket, result);
            }
        }
        8 => {
            if let Some(city) = form.reward_ideas_city() {
                let ideas = fetch_reward_ideas(settings, city).await;
                form.apply_reward_ideas(ideas);
            }
        }
        9 => match form.submit() {
            Ok(request) => app.dispatch(Action::CreateProject(request)),
            Err(e) => println!("{}", e.to_string().red()),
        },
        _ => {
            form.cancel_suggestion();
            app.dispatch(Action::Back);
        }
    }

    if let Some(notice) = form.take_notice() {
        println!("{}", notice_text(&notice).yellow());
    }
    Ok(())
}

fn print_form(form: &SetupForm) {
    println!("\n{}", "New journey".bold().underline());
    println!("  name: {}", form.name);
    if !form.city.is_empty() {
        println!("  city: {}", form.city);
    }
    for (i, row) in form.rows().iter().enumerate() {
        println!("  {}. {}  → {}", i + 1, row.title, row.reward.italic());
    }
}

fn pick_row(form: &SetupForm) -> ServiceResult<Option<usize>> {
    let mut items: Vec<String> = form
        .rows()
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}", i + 1, r.title))
        .collect();
    items.push("Cancel".to_string());
    let choice = Select::new().with_prompt("Which milestone?").items(&items).default(0).interact()?;
    Ok((choice < form.rows().len()).then_some(choice))
}

fn prompt_text(prompt: &str, initial: &str) -> ServiceResult<String> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .with_initial_text(initial)
        .allow_empty(true)
        .interact_text()?;
    Ok(value)
}
