use chrono::{DateTime, Utc};

use studymate_lib::review::format_interval;
use studymate_lib::storage::MASTERED_THRESHOLD;

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

/// Wrap `text` in `color` when colors are on
pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

pub fn bold(text: &str, use_color: bool) -> String {
    paint(text, Color::BOLD, use_color)
}

pub fn dim(text: &str, use_color: bool) -> String {
    paint(text, Color::GRAY, use_color)
}

/// Ten-cell bar plus percentage, colored by band
pub fn mastery_bar(mastery: u8, use_color: bool) -> String {
    let filled = (mastery as usize + 5) / 10;
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled.min(10)));
    let color = if mastery >= MASTERED_THRESHOLD {
        Color::GREEN
    } else if mastery >= 60 {
        Color::YELLOW
    } else {
        Color::RED
    };
    format!("{} {:>3}%", paint(&bar, color, use_color), mastery)
}

/// Color for a single practice score
pub fn score_color(score: u8) -> &'static str {
    if score >= MASTERED_THRESHOLD {
        Color::GREEN
    } else if score >= 60 {
        Color::YELLOW
    } else {
        Color::RED
    }
}

/// "not practiced", "due now", "overdue 3d" or "in 2w"
pub fn due_label(next_review: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(next) = next_review else {
        return "not practiced".to_string();
    };
    let days = (next - now).num_days();
    if next <= now {
        let overdue = (now - next).num_days();
        if overdue == 0 {
            "due now".to_string()
        } else {
            format!("overdue {}", format_interval(overdue))
        }
    } else if days == 0 {
        "due today".to_string()
    } else {
        format!("in {}", format_interval(days))
    }
}

/// Short id prefix for display
pub fn short_id(id: &uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Truncate to `max` characters, adding an ellipsis
pub fn truncate(text: &str, max: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= max {
        return single_line;
    }
    let cut: String = single_line.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut)
}
