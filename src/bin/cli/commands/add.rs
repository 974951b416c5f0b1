use anyhow::Result;

use crate::app::App;
use crate::render::terminal::{bold, dim, short_id};
use crate::OutputFormat;

pub async fn run(
    app: &App,
    title: &str,
    content: &str,
    no_extract: bool,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let (points, source) = if no_extract || content.trim().is_empty() {
        (Vec::new(), None)
    } else {
        let extracted = app
            .assistant()?
            .extract_knowledge_points(title, content)
            .await?;
        (extracted.value, Some(extracted.source))
    };

    let (topic, created) = app.store.add_topic_with_points(title, content, points)?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "topic": topic,
                "knowledgePoints": created,
                "source": source,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Added topic \"{}\"", bold(&topic.title, use_color));
            if let Some(source) = source {
                println!(
                    "  {} knowledge point(s) extracted by {}",
                    created.len(),
                    source
                );
            }
            for kp in &created {
                println!("  {} {}", dim(&short_id(&kp.id), use_color), kp.title);
            }
            println!("  ID: {}", topic.id);
        }
    }

    Ok(())
}
