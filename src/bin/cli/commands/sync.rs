use anyhow::{Context, Result};

use studymate_lib::sync::SyncTarget;

use crate::app::App;
use crate::OutputFormat;

pub async fn run(app: &App, format: &OutputFormat) -> Result<()> {
    let target = app.table_sync()?;
    let data = app.store.get_all()?;
    let report = target
        .push(&data)
        .await
        .with_context(|| format!("Push to {} failed", target.name()))?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "deleted": report.deleted,
                "created": report.created,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => println!(
            "Synced: removed {} old record(s), created {}",
            report.deleted, report.created
        ),
    }
    Ok(())
}
