use std::env;
use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use querypilot::services::agent::Agent;
use querypilot::services::chat::{MessageSegment, extract_segments};
use querypilot::services::database::{DatabaseManager, ExecutionReport};
use querypilot::session::SqlSession;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    smol::block_on(run())
}

async fn run() -> Result<()> {
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    let tables: Vec<String> = env::var("QUERYPILOT_TABLES")
        .unwrap_or_else(|_| "dummytable".to_string())
        .split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    let manager = DatabaseManager::new();
    manager.connect_with_options(database_url.parse()?).await?;
    let agent = Agent::new()?;

    let (suggestions_tx, suggestions_rx) =
        async_channel::unbounded::<querypilot::services::sql::SuggestionEvent>();
    smol::spawn(async move {
        while let Ok(event) = suggestions_rx.recv().await {
            if let Some(text) = event.suggestion {
                println!("(suggestion) {}", text);
            }
        }
    })
    .detach();

    let session = SqlSession::new(Arc::new(manager), Arc::new(agent), tables, suggestions_tx);
    session.refresh_schema().await;

    println!("querypilot — SQL workspace. Statements run directly;");
    println!(":chat <msg>, :run, :suggest <partial>, :schema, :quit");

    let stdin = std::io::stdin();
    let mut pending_fence: Option<String> = None;

    loop {
        print!("sql> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        if line.is_empty() {
            continue;
        }
        if line == ":quit" || line == ":q" {
            break;
        }
        if line == ":schema" {
            println!("{}", session.schema_text());
            continue;
        }
        if let Some(partial) = line.strip_prefix(":suggest ") {
            session.edit(partial.to_string(), partial.len());
            session.completion().trigger_now(partial.to_string(), partial.len());
            continue;
        }
        if let Some(message) = line.strip_prefix(":chat ") {
            let reply = session.send_chat(message).await;
            pending_fence = print_reply(&reply.text);
            continue;
        }
        if line == ":run" {
            let Some(code) = pending_fence.take() else {
                println!("no executable fence from the assistant yet");
                continue;
            };
            match session.run_fence(&code).await {
                Ok(report) => print_report(&report),
                Err(error) => println!("Error: {}", error),
            }
            continue;
        }

        session.edit(line.to_string(), line.len());
        match session.execute_editor().await {
            Ok(report) => print_report(&report),
            Err(error) => println!("Error: {}", error),
        }
    }

    Ok(())
}

/// Render an assistant reply, returning the first executable fence so the
/// user can dispatch it with `:run`.
fn print_reply(text: &str) -> Option<String> {
    let mut first_fence = None;

    for segment in extract_segments(text) {
        match segment {
            MessageSegment::Text(prose) => println!("{}", prose.trim_matches('\n')),
            MessageSegment::Fence {
                language,
                code,
                executable,
            } => {
                println!("--- {} ---", language);
                println!("{}", code);
                println!("---");
                if executable && first_fence.is_none() {
                    println!("(run this with :run)");
                    first_fence = Some(code);
                }
            }
        }
    }

    first_fence
}

fn print_report(report: &ExecutionReport) {
    println!("{}", report.human_message);
    if let Some(rows) = &report.rows {
        let columns = report.column_names();
        if !columns.is_empty() {
            println!("{}", columns.join(" | "));
        }
        for row in rows {
            let cells: Vec<String> = row
                .values()
                .map(|value| match value {
                    serde_json::Value::Null => String::new(),
                    serde_json::Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect();
            println!("{}", cells.join(" | "));
        }
    }
}
