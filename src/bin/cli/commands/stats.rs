use anyhow::Result;
use chrono::Utc;

use studymate_lib::review::streak::longest_streak;

use crate::app::App;
use crate::render::terminal::{bold, mastery_bar};
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let stats = app.store.stats(Utc::now())?;
    let longest = longest_streak(&app.store.get_all()?);

    match format {
        OutputFormat::Json => {
            let mut output = serde_json::to_value(&stats)?;
            output["longestStreak"] = serde_json::json!(longest);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("{}", bold("Learning stats", use_color));
            println!("  Topics:           {}", stats.total_topics);
            println!("  Knowledge points: {}", stats.total_knowledge_points);
            println!("    mastered:       {}", stats.mastered);
            println!("    never practiced {}", stats.never_practiced);
            println!("    due now:        {}", stats.due_count);
            println!("  Practices:        {}", stats.total_practices);
            println!(
                "  Average mastery:  {}",
                mastery_bar(stats.average_mastery.round() as u8, use_color)
            );
            println!(
                "  Streak:           {} day(s) (longest {})",
                stats.streak, longest
            );
            println!("  Activity today:   {}", stats.activity_today);
        }
    }
    Ok(())
}
