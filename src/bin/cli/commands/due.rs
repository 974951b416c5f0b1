use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use crate::app::App;
use crate::render::terminal::{dim, due_label, mastery_bar, short_id};
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let now = Utc::now();
    let due = app.store.get_due(now)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&due)?),
        OutputFormat::Plain => {
            if due.is_empty() {
                println!("Nothing due. Come back later.");
                return Ok(());
            }

            let data = app.store.get_all()?;
            let topic_titles: HashMap<Uuid, &str> = data
                .topics
                .iter()
                .map(|t| (t.id, t.title.as_str()))
                .collect();

            println!("{} knowledge point(s) due:\n", due.len());
            for kp in &due {
                println!(
                    "  {} {}  {}  {}",
                    dim(&short_id(&kp.id), use_color),
                    mastery_bar(kp.mastery, use_color),
                    kp.title,
                    dim(
                        &format!(
                            "{} · {}",
                            topic_titles.get(&kp.topic_id).copied().unwrap_or("?"),
                            due_label(kp.next_review, now)
                        ),
                        use_color
                    )
                );
            }
            println!("\nRun `studymate-cli quiz` to start with the first one.");
        }
    }
    Ok(())
}
