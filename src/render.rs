//! Plain-text rendering of the three views and the celebration card.

use std::fmt::Write;

use colored::Colorize;
use rand::Rng;

use crate::types::{CollectedReward, Milestone, Project};

const BAR_WIDTH: usize = 20;
const CONFETTI: [char; 6] = ['·', '✦', '✧', '°', '⋆', '˚'];

pub fn progress_bar(project: &Project) -> String {
    let (done, total) = project.progress();
    let filled = if total == 0 { 0 } else { done * BAR_WIDTH / total };
    format!(
        "[{}{}] {done}/{total}",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled)
    )
}

pub fn project_line(index: usize, project: &Project) -> String {
    let marker = if project.is_finished() { "✓".green().to_string() } else { " ".to_string() };
    format!(
        "{marker} {index:>2}. {}  {}  {}  {}",
        project.name.bold(),
        progress_bar(project),
        project.started_at.format("%Y-%m-%d").to_string().dimmed(),
        project.id.dimmed()
    )
}

pub fn dashboard(projects: &[Project], treasury: &[CollectedReward]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Journeys".bold().underline());
    if projects.is_empty() {
        let _ = writeln!(out, "  No journeys yet. Start one with `soulstep new`.");
    }
    for (i, project) in projects.iter().enumerate() {
        let _ = writeln!(out, "{}", project_line(i + 1, project));
    }
    let unused = treasury.iter().filter(|r| !r.is_used).count();
    let _ = writeln!(
        out,
        "\n{} {} collected, {} waiting to be enjoyed",
        "Treasury:".bold(),
        treasury.len(),
        unused
    );
    out
}

pub fn tracker(project: &Project) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}  {}", project.name.bold().underline(), progress_bar(project));
    let _ = writeln!(
        out,
        "{}",
        format!("started {}", project.started_at.format("%Y-%m-%d")).dimmed()
    );
    for (i, m) in project.milestones.iter().enumerate() {
        let _ = writeln!(out, "{}", milestone_line(i + 1, m));
    }
    if project.is_finished() {
        let _ = writeln!(out, "\n{}", "Journey complete. Rest well.".green());
    }
    out
}

fn milestone_line(index: usize, m: &Milestone) -> String {
    let check = if m.is_completed { "[x]".green() } else { "[ ]".normal() };
    let title = if m.is_completed { m.title.strikethrough() } else { m.title.normal() };
    let mut line = format!("  {check} {index}. {title}  → {}", m.reward.italic());
    if let Some(at) = m.completed_at {
        let _ = write!(line, "  {}", at.format("%m-%d %H:%M").to_string().dimmed());
    }
    line
}

pub fn treasury(treasury: &[CollectedReward]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Treasury".bold().underline());
    if treasury.is_empty() {
        let _ = writeln!(out, "  Nothing collected yet.");
    }
    for reward in treasury {
        let status = match reward.used_at {
            Some(at) => format!("enjoyed {}", at.format("%Y-%m-%d")).dimmed(),
            None => "ready".yellow(),
        };
        let _ = writeln!(
            out,
            "  {} {}  from {}  {}  {}",
            if reward.is_used { "◇" } else { "◆" },
            reward.content,
            reward.source_project_name.bold(),
            status,
            reward.id.dimmed()
        );
    }
    out
}

/// One line of randomly scattered confetti; regenerated on every call.
pub fn confetti_line(width: usize) -> String {
    let mut rng = rand::rng();
    (0..width)
        .map(|_| {
            if rng.random_bool(0.35) {
                CONFETTI[rng.random_range(0..CONFETTI.len())]
            } else {
                ' '
            }
        })
        .collect()
}

pub fn celebration(milestone: &Milestone) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", confetti_line(40).yellow());
    let _ = writeln!(out, "  {}", "MILESTONE COMPLETED".dimmed());
    let _ = writeln!(out, "  {}", milestone.title.bold());
    let _ = writeln!(out, "  \"{}\"", milestone.reward.italic());
    let _ = writeln!(out, "  不必急于赶路。此刻，只属于你。");
    let _ = writeln!(out, "{}", confetti_line(40).yellow());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn project(done: usize) -> Project {
        Project {
            id: "p1".to_string(),
            name: "写作".to_string(),
            milestones: (0..4)
                .map(|i| Milestone {
                    id: format!("m{i}"),
                    title: format!("step {i}"),
                    reward: "茶".to_string(),
                    is_completed: i < done,
                    completed_at: (i < done).then(Utc::now),
                })
                .collect(),
            started_at: Utc::now(),
        }
    }

    #[test]
    fn progress_bar_scales_to_width() {
        colored::control::set_override(false);
        let bar = progress_bar(&project(2));
        assert_eq!(bar.matches('█').count(), 10);
        assert!(bar.ends_with("2/4"));
    }

    #[test]
    fn dashboard_counts_unused_rewards() {
        colored::control::set_override(false);
        let reward = CollectedReward {
            id: "r".to_string(),
            content: "茶".to_string(),
            earned_at: Utc::now(),
            source_project_name: "写作".to_string(),
            is_used: false,
            used_at: None,
        };
        let text = dashboard(&[project(0)], &[reward]);
        assert!(text.contains("1 collected, 1 waiting"));
        assert!(text.contains("写作"));
    }

    #[test]
    fn finished_tracker_says_so() {
        colored::control::set_override(false);
        assert!(tracker(&project(4)).contains("Journey complete"));
        assert!(!tracker(&project(3)).contains("Journey complete"));
    }

    #[test]
    fn confetti_has_requested_width() {
        assert_eq!(confetti_line(25).chars().count(), 25);
    }
}
