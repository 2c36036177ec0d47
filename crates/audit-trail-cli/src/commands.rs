//! Subcommand implementations.

use std::path::Path;

use anyhow::Context;
use audit_trail_sdk::{
    Action, Actor, ActorType, AuditTrailClient, BatchResponse, Event, EventMetadata,
    EventResponse, PagedResult, Resource, SearchCriteria, StoredEvent,
};
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;

use crate::theme::Theme;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable, colored.
    #[default]
    Pretty,
    /// JSON on stdout.
    Json,
}

/// Fields of a single event given on the command line.
#[derive(Debug, Clone, Args)]
pub(crate) struct LogArgs {
    /// Actor identifier
    #[arg(long)]
    pub(crate) actor_id: String,

    /// Actor type (USER, SYSTEM or SERVICE)
    #[arg(long, default_value = "USER")]
    pub(crate) actor_type: ActorType,

    /// Actor display name
    #[arg(long)]
    pub(crate) actor_name: Option<String>,

    /// Action type (CREATE, READ, UPDATE, DELETE, LOGIN, LOGOUT or custom)
    #[arg(long)]
    pub(crate) action: String,

    /// Action description
    #[arg(long)]
    pub(crate) description: Option<String>,

    /// Resource identifier
    #[arg(long)]
    pub(crate) resource_id: String,

    /// Resource type (DOCUMENT, USER, TRANSACTION, FILE or custom)
    #[arg(long)]
    pub(crate) resource_type: String,

    /// Originating application
    #[arg(long)]
    pub(crate) source: String,

    /// Tenant identifier
    #[arg(long)]
    pub(crate) tenant: String,

    /// Correlation identifier
    #[arg(long)]
    pub(crate) correlation_id: Option<String>,

    /// Session identifier
    #[arg(long)]
    pub(crate) session_id: Option<String>,

    /// Tag as key=value (repeatable)
    #[arg(long = "tag", value_parser = parse_tag)]
    pub(crate) tags: Vec<(String, String)>,
}

/// Query filters for `search`.
#[derive(Debug, Clone, Args)]
pub(crate) struct SearchArgs {
    /// Tenant identifier
    #[arg(long)]
    pub(crate) tenant: String,

    /// Filter by actor identifier
    #[arg(long)]
    pub(crate) actor_id: Option<String>,

    /// Filter by action type
    #[arg(long)]
    pub(crate) action: Option<String>,

    /// Filter by resource identifier
    #[arg(long)]
    pub(crate) resource_id: Option<String>,

    /// Free-text query
    #[arg(short, long)]
    pub(crate) query: Option<String>,

    /// Zero-based page number
    #[arg(long, default_value_t = 0)]
    pub(crate) page: u32,

    /// Page size
    #[arg(long, default_value_t = audit_trail_sdk::DEFAULT_PAGE_SIZE)]
    pub(crate) size: u32,
}

/// Parse a `key=value` tag.
pub(crate) fn parse_tag(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        },
        _ => Err(format!("expected key=value, got {raw:?}")),
    }
}

impl LogArgs {
    /// Assemble and locally validate the event.
    pub(crate) fn to_event(&self) -> anyhow::Result<Event> {
        let mut actor = Actor::new(&self.actor_id, self.actor_type)?;
        if let Some(name) = &self.actor_name {
            actor = actor.with_name(name);
        }

        let mut action = Action::of(&self.action)?;
        if let Some(description) = &self.description {
            action = action.with_description(description);
        }

        let resource = Resource::of(&self.resource_id, &self.resource_type)?;

        let mut metadata = EventMetadata::create(&self.source, &self.tenant)?;
        if let Some(correlation_id) = &self.correlation_id {
            metadata = metadata.with_correlation_id(correlation_id);
        }
        if let Some(session_id) = &self.session_id {
            metadata = metadata.with_session_id(session_id);
        }
        if !self.tags.is_empty() {
            metadata = metadata.with_tags(self.tags.iter().cloned());
        }

        Ok(Event::create(actor, action, resource, metadata)?)
    }
}

impl SearchArgs {
    /// Search criteria for these filters.
    pub(crate) fn to_criteria(&self) -> SearchCriteria {
        let mut criteria = SearchCriteria::for_tenant(&self.tenant)
            .page(self.page)
            .size(self.size);
        if let Some(actor_id) = &self.actor_id {
            criteria = criteria.actor_id(actor_id);
        }
        if let Some(action) = &self.action {
            criteria = criteria.action_type(action);
        }
        if let Some(resource_id) = &self.resource_id {
            criteria = criteria.resource_id(resource_id);
        }
        if let Some(query) = &self.query {
            criteria = criteria.query(query);
        }
        criteria
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_accepted(response: &EventResponse) {
    println!(
        "{}",
        Theme::success(&format!("Logged event {}", Theme::event_id(&response.id)))
    );
    println!("  {}", Theme::kv("status", &response.status));
    println!("  {}", Theme::kv("hash", &Theme::hash(&response.hash)));
    println!(
        "  {}",
        Theme::kv("timestamp", &Theme::timestamp(response.timestamp.as_ref()))
    );
}

/// Log a single event.
pub(crate) async fn log_event(
    client: &AuditTrailClient,
    args: &LogArgs,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let event = args.to_event()?;
    let response = client.log(&event).await?;

    match output {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Pretty => print_accepted(&response),
    }
    Ok(())
}

/// Read a JSON array of events from a file.
pub(crate) fn read_events(path: &Path) -> anyhow::Result<Vec<Event>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array of events", path.display()))
}

fn print_batch(response: &BatchResponse) {
    let summary = format!(
        "{} of {} events logged",
        response.succeeded, response.total
    );
    if response.is_success() {
        println!("{}", Theme::success(&summary));
    } else {
        println!("{}", Theme::warning(&summary));
    }

    for accepted in &response.events {
        println!(
            "  {} {}",
            Theme::event_id(&accepted.id),
            Theme::hash(&accepted.hash)
        );
    }
    for failure in &response.errors {
        println!(
            "  {} {}",
            format!("[{}]", failure.index).red(),
            failure.message
        );
        for violation in &failure.violations {
            println!("      {}", Theme::dimmed(violation));
        }
    }
}

/// Log every event in a JSON file as one batch.
pub(crate) async fn log_batch(
    client: &AuditTrailClient,
    path: &Path,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let events = read_events(path)?;
    let response = client.log_batch(&events).await?;

    match output {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Pretty => print_batch(&response),
    }

    if response.is_success() {
        Ok(())
    } else {
        anyhow::bail!("{} of {} events rejected", response.failed, response.total)
    }
}

fn print_stored(event: &StoredEvent) {
    println!("\n{}", Theme::header(&format!("Event {}", event.id)));
    println!("{}", Theme::separator());
    println!(
        "{}",
        Theme::kv("timestamp", &Theme::timestamp(event.timestamp.as_ref()))
    );
    if let Some(status) = &event.status {
        println!("{}", Theme::kv("status", status));
    }
    if let Some(hash) = &event.hash {
        println!("{}", Theme::kv("hash", hash));
    }
    if let Some(previous) = &event.previous_hash {
        println!("{}", Theme::kv("previous", previous));
    }
    if let Some(actor) = &event.actor {
        println!(
            "{}",
            Theme::kv("actor", &format!("{} ({})", actor.id(), actor.actor_type()))
        );
    }
    if let Some(action) = &event.action {
        let described = action.description().map_or_else(
            || action.action_type().to_string(),
            |d| format!("{} ({d})", action.action_type()),
        );
        println!("{}", Theme::kv("action", &described));
    }
    if let Some(resource) = &event.resource {
        println!(
            "{}",
            Theme::kv(
                "resource",
                &format!("{} ({})", resource.id(), resource.resource_type())
            )
        );
    }
    if let Some(metadata) = &event.metadata {
        println!(
            "{}",
            Theme::kv(
                "source",
                &format!("{} / {}", metadata.source(), metadata.tenant_id())
            )
        );
    }
    println!();
}

/// Fetch one event by ID.
pub(crate) async fn get_event(
    client: &AuditTrailClient,
    id: &str,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let Some(event) = client.get_by_id(id).await? else {
        anyhow::bail!("event not found: {id}");
    };

    match output {
        OutputFormat::Json => print_json(&event)?,
        OutputFormat::Pretty => print_stored(&event),
    }
    Ok(())
}

fn print_page(page: &PagedResult<StoredEvent>) {
    if page.is_empty() {
        println!("{}", Theme::info("No matching events"));
        return;
    }

    println!(
        "\n{}",
        Theme::header(&format!(
            "Events (page {} of {}, {} total)",
            page.page.saturating_add(1),
            page.total_pages.max(1),
            page.total_count
        ))
    );
    println!(
        "{:<20} {:<20} {:<10} {:<16} {}",
        "TIMESTAMP".dimmed(),
        "ID".dimmed(),
        "ACTION".dimmed(),
        "ACTOR".dimmed(),
        "RESOURCE".dimmed()
    );
    println!("{}", Theme::separator());

    for event in &page.items {
        let action = event.action.as_ref().map_or("-", Action::action_type);
        let actor = event.actor.as_ref().map_or("-", Actor::id);
        let resource = event.resource.as_ref().map_or("-", Resource::id);
        println!(
            "{:<20} {:<20} {:<10} {:<16} {}",
            Theme::timestamp(event.timestamp.as_ref()),
            Theme::event_id(&event.id),
            action,
            actor,
            resource
        );
    }

    if page.has_next() {
        println!(
            "{}",
            Theme::dimmed(&format!(
                "more results: --page {}",
                page.page.saturating_add(1)
            ))
        );
    }
    println!();
}

/// Search events.
pub(crate) async fn search_events(
    client: &AuditTrailClient,
    args: &SearchArgs,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let page = client.search(&args.to_criteria()).await?;

    match output {
        OutputFormat::Json => print_json(&page)?,
        OutputFormat::Pretty => print_page(&page),
    }
    Ok(())
}
