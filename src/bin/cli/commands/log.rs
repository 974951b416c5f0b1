use anyhow::Result;

use studymate_lib::ai::CallLog;

use crate::app::App;
use crate::render::terminal::{dim, paint, Color};
use crate::OutputFormat;

pub fn run(app: &App, limit: usize, format: &OutputFormat, use_color: bool) -> Result<()> {
    let log = CallLog::load(app.backend.as_ref())?;
    let skip = log.len().saturating_sub(limit);
    let entries: Vec<_> = log.entries().skip(skip).collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            if entries.is_empty() {
                println!("No model calls recorded.");
                return Ok(());
            }
            for entry in entries {
                let status = if entry.ok {
                    paint("ok  ", Color::GREEN, use_color)
                } else {
                    paint("fail", Color::RED, use_color)
                };
                println!(
                    "{} {} {:<8} {}/{} {}ms",
                    dim(&entry.at.format("%Y-%m-%d %H:%M:%S").to_string(), use_color),
                    status,
                    entry.task,
                    entry.provider,
                    entry.model,
                    entry.duration_ms
                );
                if let Some(error) = &entry.error {
                    println!("    {}", dim(error, use_color));
                }
            }
        }
    }
    Ok(())
}
