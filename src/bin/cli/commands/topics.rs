use anyhow::Result;
use chrono::Utc;

use studymate_lib::storage::UpdateTopicRequest;

use crate::app::App;
use crate::render::terminal::{bold, dim, due_label, mastery_bar, short_id, truncate};
use crate::OutputFormat;

pub fn run_list(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let data = app.store.get_all()?;
    let now = Utc::now();

    match format {
        OutputFormat::Json => {
            let output: Vec<_> = data
                .topics
                .iter()
                .map(|t| {
                    let points: Vec<_> = data
                        .knowledge_points
                        .iter()
                        .filter(|kp| kp.topic_id == t.id)
                        .collect();
                    serde_json::json!({
                        "id": t.id,
                        "title": t.title,
                        "createdAt": t.created_at,
                        "knowledgePointCount": points.len(),
                        "dueCount": points.iter().filter(|kp| kp.is_due(now)).count(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if data.topics.is_empty() {
                println!("No topics yet. Add one with `studymate-cli add <title> --content ...`");
                return Ok(());
            }
            for topic in &data.topics {
                let points: Vec<_> = data
                    .knowledge_points
                    .iter()
                    .filter(|kp| kp.topic_id == topic.id)
                    .collect();
                let due = points.iter().filter(|kp| kp.is_due(now)).count();
                let due_note = if due > 0 {
                    format!(", {} due", due)
                } else {
                    String::new()
                };
                println!(
                    "{} ({} points{}) {}",
                    bold(&topic.title, use_color),
                    points.len(),
                    due_note,
                    dim(&topic.created_at.format("%Y-%m-%d").to_string(), use_color)
                );
            }
        }
    }

    Ok(())
}

pub fn run_show(app: &App, name: &str, format: &OutputFormat, use_color: bool) -> Result<()> {
    let topic = app.find_topic(name)?;
    let points = app.store.knowledge_points_for(topic.id)?;
    let now = Utc::now();

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "topic": topic,
                "knowledgePoints": points,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("{}", bold(&topic.title, use_color));
            if !topic.content.trim().is_empty() {
                println!("{}", dim(&truncate(&topic.content, 200), use_color));
            }
            println!();

            if points.is_empty() {
                println!("  (no knowledge points)");
            }
            for kp in &points {
                println!(
                    "  {} {}  {}  {}",
                    dim(&short_id(&kp.id), use_color),
                    mastery_bar(kp.mastery, use_color),
                    kp.title,
                    dim(&due_label(kp.next_review, now), use_color)
                );
                if !kp.description.is_empty() {
                    println!("             {}", truncate(&kp.description, 100));
                }
            }
        }
    }

    Ok(())
}

pub fn run_edit(
    app: &App,
    name: &str,
    title: Option<String>,
    content: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let topic = app.find_topic(name)?;
    let updated = app
        .store
        .update_topic(topic.id, UpdateTopicRequest { title, content })?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&updated)?),
        OutputFormat::Plain => println!("Updated topic \"{}\"", updated.title),
    }
    Ok(())
}

pub fn run_delete(app: &App, name: &str, format: &OutputFormat) -> Result<()> {
    let topic = app.find_topic(name)?;
    app.store.delete_topic(topic.id)?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "deleted": topic.id,
                "knowledgePointsDeleted": topic.knowledge_point_ids.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => println!(
            "Deleted topic \"{}\" and {} knowledge point(s)",
            topic.title,
            topic.knowledge_point_ids.len()
        ),
    }
    Ok(())
}
