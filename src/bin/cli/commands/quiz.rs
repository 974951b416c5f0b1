use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use chrono::Utc;

use studymate_lib::storage::{KnowledgePoint, NewPractice};

use crate::app::App;
use crate::render::terminal::{bold, dim, due_label, paint, score_color};
use crate::OutputFormat;

/// The most overdue point, else the first one never practiced
fn pick_point(app: &App, key: Option<&str>) -> Result<KnowledgePoint> {
    if let Some(key) = key {
        return app.find_point(key);
    }

    if let Some(kp) = app.store.get_due(Utc::now())?.into_iter().next() {
        return Ok(kp);
    }
    match app
        .store
        .get_all()?
        .knowledge_points
        .into_iter()
        .find(|kp| kp.review_count == 0)
    {
        Some(kp) => Ok(kp),
        None => bail!("Nothing to practice: no knowledge point is due or new."),
    }
}

fn read_answer() -> Result<String> {
    print!("> ");
    std::io::stdout().flush().ok();
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read answer")?;
    Ok(line.trim().to_string())
}

pub async fn run(
    app: &App,
    point: Option<&str>,
    answer: Option<String>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let kp = pick_point(app, point)?;
    let assistant = app.assistant()?;

    let question = assistant.generate_question(&kp).await?;
    let interactive = answer.is_none();

    if interactive && matches!(format, OutputFormat::Plain) {
        println!("{}", bold(&kp.title, use_color));
        println!("{}", question.value);
    }

    let answer = match answer {
        Some(answer) => answer,
        None => read_answer()?,
    };

    let grade = assistant.grade_answer(&kp, &question.value, &answer).await?;
    let practice = app.store.add_practice(NewPractice {
        knowledge_point_id: kp.id,
        question: question.value.clone(),
        answer,
        score: grade.value.score,
        feedback: grade.value.feedback.clone(),
    })?;
    let updated = app.store.get_knowledge_point(kp.id)?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "knowledgePoint": updated,
                "practice": practice,
                "questionSource": question.source,
                "gradeSource": grade.source,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if !interactive {
                println!("{}", bold(&kp.title, use_color));
                println!("{}", question.value);
            }
            println!();
            println!(
                "Score: {}",
                paint(
                    &format!("{}/100", practice.score),
                    score_color(practice.score),
                    use_color
                )
            );
            println!("{}", practice.feedback);
            println!(
                "{}",
                dim(
                    &format!(
                        "Graded by {}. Next review {}.",
                        grade.source,
                        due_label(updated.next_review, Utc::now())
                    ),
                    use_color
                )
            );
        }
    }

    Ok(())
}
