use anyhow::Result;

use studymate_lib::storage::{NewKnowledgePoint, UpdateKnowledgePointRequest};

use crate::app::App;
use crate::render::terminal::{dim, paint, score_color, short_id, truncate};
use crate::OutputFormat;

pub fn run_add(
    app: &App,
    topic: &str,
    title: &str,
    description: &str,
    format: &OutputFormat,
) -> Result<()> {
    let topic = app.find_topic(topic)?;
    let kp = app.store.add_knowledge_point(
        topic.id,
        NewKnowledgePoint {
            title: title.to_string(),
            description: description.to_string(),
        },
    )?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&kp)?),
        OutputFormat::Plain => println!(
            "Added \"{}\" to {} ({})",
            kp.title,
            topic.title,
            short_id(&kp.id)
        ),
    }
    Ok(())
}

pub fn run_edit(
    app: &App,
    point: &str,
    title: Option<String>,
    description: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let kp = app.find_point(point)?;
    let updated = app
        .store
        .update_knowledge_point(kp.id, UpdateKnowledgePointRequest { title, description })?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&updated)?),
        OutputFormat::Plain => println!("Updated \"{}\"", updated.title),
    }
    Ok(())
}

pub fn run_delete(app: &App, point: &str, format: &OutputFormat) -> Result<()> {
    let kp = app.find_point(point)?;
    app.store.delete_knowledge_point(kp.id)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "deleted": kp.id }))?)
        }
        OutputFormat::Plain => println!("Deleted \"{}\"", kp.title),
    }
    Ok(())
}

pub fn run_history(app: &App, point: &str, format: &OutputFormat, use_color: bool) -> Result<()> {
    let kp = app.find_point(point)?;
    let practices = app.store.practices_for(kp.id)?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "knowledgePoint": kp,
                "practices": practices,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!(
                "{} (mastery {}%, {} review(s))",
                kp.title, kp.mastery, kp.review_count
            );
            if practices.is_empty() {
                println!("  No practice yet.");
                return Ok(());
            }
            for p in &practices {
                println!(
                    "  {}  {}  {}",
                    dim(&p.created_at.format("%Y-%m-%d %H:%M").to_string(), use_color),
                    paint(&format!("{:>3}", p.score), score_color(p.score), use_color),
                    truncate(&p.question, 70)
                );
                if !p.feedback.is_empty() {
                    println!("        {}", dim(&truncate(&p.feedback, 90), use_color));
                }
            }
        }
    }
    Ok(())
}
