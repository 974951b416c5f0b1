use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::app::App;
use crate::OutputFormat;

pub fn run_export(app: &App, output: Option<&Path>) -> Result<()> {
    let json = app.store.export_json()?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Exported to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub fn run_import(app: &App, file: &Path, format: &OutputFormat) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let data = app
        .store
        .import_json(&raw)
        .with_context(|| format!("Failed to import {}", file.display()))?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "topics": data.topics.len(),
                "knowledgePoints": data.knowledge_points.len(),
                "practices": data.practices.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => println!(
            "Imported {} topic(s), {} knowledge point(s), {} practice(s)",
            data.topics.len(),
            data.knowledge_points.len(),
            data.practices.len()
        ),
    }
    Ok(())
}

pub fn run_reset(app: &App, yes: bool) -> Result<()> {
    if !yes {
        bail!("This deletes all topics, knowledge points and practices. Re-run with --yes to confirm.");
    }
    app.store.reset()?;
    println!("All learning data deleted.");
    Ok(())
}
