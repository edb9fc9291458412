//! Terminal rendering of progress cards and the operation log.

use owo_colors::OwoColorize;
use vault_common::progress::XP_PER_LEVEL;
use vault_common::{OpEntry, OpKind, ProgressRecord, User, VaultState};

const BAR_WIDTH: usize = 20;

fn bar(percent: u8) -> String {
    let filled = (percent as usize * BAR_WIDTH) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

pub fn state_line(state: &VaultState) -> String {
    format!("{} {}", "state:".dimmed(), state.as_str())
}

pub fn user_line(user: &User) -> String {
    format!(
        "{} {} {}",
        "signed in as".dimmed(),
        user.email.bold(),
        format!("(since {})", user.created_at.format("%Y-%m-%d")).dimmed()
    )
}

pub fn progress_card(record: &ProgressRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<12} {}  {} {}/{} XP\n",
        "level".cyan(),
        record.level.to_string().bold(),
        bar(record.level_progress_percent()),
        record.xp,
        XP_PER_LEVEL
    ));
    out.push_str(&format!(
        "{:<12} {}/{}  {} {}%",
        "lessons".cyan(),
        record.lessons_completed,
        record.total_lessons,
        bar(record.lessons_percent()),
        record.lessons_percent()
    ));
    if record.course_complete() {
        out.push_str(&format!("\n{}", "All lessons completed!".green()));
    }
    out
}

pub fn operation(entry: &OpEntry) -> String {
    let kind = match entry.kind {
        OpKind::Read => "READ ".blue().to_string(),
        OpKind::Write => "WRITE".green().to_string(),
    };
    let column = entry
        .column
        .as_deref()
        .map(|c| format!(" [{}]", c).yellow().to_string())
        .unwrap_or_default();
    format!(
        "{} {} {:<6}{} {}",
        entry.timestamp.format("%H:%M:%S").to_string().dimmed(),
        kind,
        entry.operation.as_str().bold(),
        column,
        entry.query
    )
}

pub fn operation_log(entries: &[OpEntry]) -> String {
    if entries.is_empty() {
        return "No operations yet. Try `xp` or `lesson`.".dimmed().to_string();
    }
    let mut out = format!("{}\n", "Operation log (newest first)".bold());
    for entry in entries {
        out.push_str(&operation(entry));
        out.push('\n');
    }
    if let Some(latest) = entries.first() {
        out.push_str(&format!(
            "{} {}",
            latest.kind.direction().dimmed(),
            latest.operation.explanation().dimmed()
        ));
    }
    out
}
