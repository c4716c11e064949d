use colored::Colorize;
use tractools_core::tabular::{parse_export, TabularPayload};
use tractools_core::trac::ResultRecord;

use crate::prelude::{println, *};

pub mod changeset;
pub mod info;
pub mod query;
pub mod search;
pub mod ticket;
pub mod timeline;

// Re-export public data functions for external use (e.g., MCP)
pub use changeset::get_changeset_data;
pub use info::get_trac_info_data;
pub use query::run_query_data;
pub use search::search_tickets_data;
pub use ticket::get_ticket_data;
pub use timeline::get_timeline_data;

/// Default upstream instance when neither --base-url nor TRAC_BASE_URL is set.
pub const DEFAULT_BASE_URL: &str = "https://core.trac.wordpress.org";

/// Capacity of the write-through ticket cache shared by MCP tool calls.
pub const CACHE_CAPACITY: usize = 256;

const USER_AGENT: &str = concat!("tractools/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Columns requested from the tabular export. Values are resolved back by
/// header name, never by position.
const EXPORT_COLUMNS: [&str; 7] = [
    "id",
    "summary",
    "status",
    "owner",
    "type",
    "priority",
    "milestone",
];

#[derive(Debug, clap::Parser)]
#[command(name = "trac")]
#[command(about = "Trac ticket, changeset, and timeline operations")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Search tickets in the tabular export
    #[clap(name = "search")]
    Search(search::SearchOptions),

    /// Get a single ticket by id
    #[clap(name = "ticket")]
    Ticket(ticket::TicketOptions),

    /// Get a changeset by revision number
    #[clap(name = "changeset")]
    Changeset(changeset::ChangesetOptions),

    /// List recent activity from the timeline feed
    #[clap(name = "timeline")]
    Timeline(timeline::TimelineOptions),

    /// List distinct metadata values (milestones, priorities, types, statuses)
    #[clap(name = "info")]
    Info(info::InfoOptions),

    /// Route a free-form query to the right fetcher
    #[clap(name = "query")]
    Query(query::QueryOptions),
}

/// Module entry point
pub async fn run(app: App, global: crate::Global) -> Result<()> {
    if global.verbose {
        println!(
            "Trac base URL: {}",
            TracConfig::from_global(&global).base_url
        );
        println!();
    }

    match app.command {
        Commands::Search(options) => search::handler(options, global).await,
        Commands::Ticket(options) => ticket::handler(options, global).await,
        Commands::Changeset(options) => changeset::handler(options, global).await,
        Commands::Timeline(options) => timeline::handler(options, global).await,
        Commands::Info(options) => info::handler(options, global).await,
        Commands::Query(options) => query::handler(options, global).await,
    }
}

/// Trac configuration resolved from the CLI flag, environment, or default.
#[derive(Debug, Clone)]
pub struct TracConfig {
    pub base_url: String,
}

impl TracConfig {
    pub fn from_global(global: &crate::Global) -> Self {
        let base_url = global
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn ticket_url(&self, id: u64) -> String {
        format!("{}/ticket/{id}", self.base_url)
    }

    pub fn changeset_url(&self, revision: u64) -> String {
        format!("{}/changeset/{revision}", self.base_url)
    }

    pub fn timeline_url(&self) -> String {
        format!("{}/timeline", self.base_url)
    }
}

/// Filters and caps for one tabular export request.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExportQuery {
    pub summary: Option<String>,
    pub status: Option<String>,
    pub component: Option<String>,
    pub id: Option<u64>,
    pub max: usize,
}

impl ExportQuery {
    pub fn to_url(&self, config: &TracConfig) -> String {
        let mut url = format!("{}/query?format=csv", config.base_url);
        for col in EXPORT_COLUMNS {
            url.push_str("&col=");
            url.push_str(col);
        }
        url.push_str(&format!("&max={}", self.max));
        if let Some(id) = self.id {
            url.push_str(&format!("&id={id}"));
        }
        if let Some(summary) = &self.summary {
            url.push_str(&format!("&summary=~{}", urlencoding::encode(summary)));
        }
        if let Some(status) = &self.status {
            url.push_str(&format!("&status={}", urlencoding::encode(status)));
        }
        if let Some(component) = &self.component {
            url.push_str(&format!("&component={}", urlencoding::encode(component)));
        }
        url
    }
}

/// HTTP client carrying the identifying header and the request timeout every
/// fetcher uses. Dropping an in-flight future aborts the request.
pub(crate) fn create_trac_client() -> Result<reqwest::Client, Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| Error::Network(format!("Failed to build HTTP client: {e}")))
}

/// Fetch a page or feed body, mapping transport failures and HTTP statuses to
/// the error taxonomy.
pub(crate) async fn fetch_body(
    client: &reqwest::Client,
    url: &str,
    resource: &str,
) -> Result<String, Error> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::Network(format!("Failed to fetch {resource}: {e}")))?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(Error::NotFound(format!("{resource} not found")));
    }
    if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::TOO_MANY_REQUESTS
    {
        return Err(Error::AccessDenied(format!(
            "Upstream refused the {resource} request ({status})"
        )));
    }
    if !status.is_success() {
        return Err(Error::Network(format!(
            "Failed to fetch {resource}: HTTP {status}"
        )));
    }

    response
        .text()
        .await
        .map_err(|e| Error::MalformedUpstream(format!("Failed to read {resource} response: {e}")))
}

/// Fetch a tabular export URL and probe the body.
///
/// Blocked exports answer with an HTML error page, sometimes behind a non-2xx
/// status and sometimes not; both fold into the `NotTabular` branch so the
/// caller makes one explicit fallback decision. Transport failures propagate
/// as errors and are never retried.
pub(crate) async fn fetch_export(
    client: &reqwest::Client,
    url: &str,
) -> Result<TabularPayload, Error> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::Network(format!("Failed to fetch ticket export: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::MalformedUpstream(format!("Failed to read export response: {e}")))?;

    if !status.is_success() {
        return Ok(TabularPayload::NotTabular(body));
    }

    Ok(parse_export(&body))
}

/// Render a result record for the terminal: header, metadata table, body text.
pub fn display_record(record: &ResultRecord) {
    if record.is_error() {
        std::println!("\n{}\n", record.title.bold().red());
        std::println!("{}\n", record.text);
        return;
    }

    std::println!("\n{}\n", record.title.bold().cyan());

    if let Some(object) = record.metadata.as_object() {
        let mut table = new_table();
        for (key, value) in object {
            let rendered = match value {
                serde_json::Value::String(s) => truncate_cell(s),
                serde_json::Value::Array(items) => format!("{} entries", items.len()),
                serde_json::Value::Object(_) => continue,
                other => other.to_string(),
            };
            table.add_row(prettytable::row![key.bold().cyan(), rendered]);
        }
        table.printstd();
    }

    std::println!("\n{}", record.text);
    std::println!("\n{}: {}\n", "URL".bold().cyan(), record.url.cyan().underline());
}

fn truncate_cell(value: &str) -> String {
    const MAX: usize = 60;
    if value.chars().count() <= MAX {
        value.to_string()
    } else {
        let truncated: String = value.chars().take(MAX).collect();
        format!("{truncated}...")
    }
}
