//! Foreground CLI commands.

use crate::cli::SessionsCommand;
use crate::state::AppState;
use anyhow::{bail, Context};
use leadscout_db::{businesses, sessions};
use leadscout_scraper::{ScrapeEvent, SessionRequest};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

/// Run a session in this process, logging progress until it ends.
pub async fn run_session(
    state: &AppState,
    name: Option<String>,
    towns: Vec<String>,
    industries: Vec<String>,
) -> anyhow::Result<()> {
    let orchestrator = &state.orchestrator;
    let request = SessionRequest {
        name,
        towns,
        industries,
    };

    let mut events = orchestrator.subscribe();
    let progress = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!("Progress log skipped {} events", missed);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let (session_id, token) = orchestrator.register_session(&request).await?;

    let stop = token.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping session");
            stop.cancel();
        }
    });

    let result = orchestrator.run_session(&session_id, &request, token).await;
    interrupt.abort();
    progress.abort();

    let summary = result.with_context(|| format!("session {session_id} failed"))?;
    print_json(&summary)
}

/// Print stored sessions or businesses.
pub async fn sessions(state: &AppState, command: SessionsCommand) -> anyhow::Result<()> {
    let pool = state.database().pool();

    match command {
        SessionsCommand::List => print_json(&sessions::list_sessions(pool).await?),
        SessionsCommand::Show { id } => match sessions::get_by_id(pool, &id).await? {
            Some(session) => print_json(&session),
            None => bail!("session '{id}' not found"),
        },
        SessionsCommand::Businesses { id } => {
            if sessions::get_by_id(pool, &id).await?.is_none() {
                bail!("session '{id}' not found");
            }
            print_json(&businesses::get_by_session(pool, &id).await?)
        }
    }
}

/// Process the due retry entries of a session.
pub async fn retry(state: &AppState, session_id: &str) -> anyhow::Result<()> {
    let report = state.orchestrator.process_retry_queue(session_id).await?;
    info!(
        "Processed {} retries: {} resolved, {} rescheduled, {} exhausted",
        report.processed,
        report.resolved.len(),
        report.rescheduled,
        report.exhausted.len()
    );
    print_json(&report)
}

fn log_event(event: &ScrapeEvent) {
    match event {
        ScrapeEvent::SessionStarted { towns, industries, .. } => {
            info!("Crawling {} towns for {} industries", towns.len(), industries.len());
        }
        ScrapeEvent::TownStarted { town, .. } => info!("Town {} started", town),
        ScrapeEvent::SearchCompleted {
            town,
            industry,
            listings,
            new_businesses,
            error,
            ..
        } => match error {
            Some(error) => tracing::warn!("{} in {} failed: {}", industry, town, error),
            None => info!(
                "{} in {}: {} listings, {} new businesses",
                industry, town, listings, new_businesses
            ),
        },
        ScrapeEvent::LookupBatchCompleted { stats, .. } => info!(
            "Lookup batch of {}: {} resolved, {} failed, {} deferred{}",
            stats.size,
            stats.resolved,
            stats.failed,
            stats.deferred,
            if stats.captcha { " (CAPTCHA)" } else { "" }
        ),
        ScrapeEvent::TownCompleted {
            town,
            businesses_found,
            ..
        } => info!("Town {} done: {} businesses", town, businesses_found),
        ScrapeEvent::RetriesProcessed {
            resolved,
            rescheduled,
            exhausted,
            ..
        } => info!(
            "Retries: {} resolved, {} rescheduled, {} exhausted",
            resolved, rescheduled, exhausted
        ),
        ScrapeEvent::SessionFinished { status, .. } => info!("Session {}", status),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
