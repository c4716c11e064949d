use serde::{Deserialize, Serialize};
use serde_json::json;
use tractools_core::tabular::{collect_matching_rows, TabularDocument, TabularPayload};
use tractools_core::trac::{render_search_text, ticket_from_row, ResultRecord, TicketSummary};

use super::{create_trac_client, fetch_export, ExportQuery, TracConfig};
use crate::prelude::{println, *};

/// Hard cap on rows requested by a filtered search.
pub const SEARCH_LIMIT_MAX: usize = 50;

/// Row cap for the one-shot unfiltered fallback request.
const FALLBACK_MAX: usize = 100;

/// Options for searching tickets
#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct SearchOptions {
    /// Substring to match against ticket summaries
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Filter by ticket status (e.g. "new", "closed")
    #[arg(short, long)]
    pub status: Option<String>,

    /// Filter by component
    #[arg(short, long)]
    pub component: Option<String>,

    /// Maximum number of tickets to return (capped at 50)
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Public data function - used by both CLI and MCP
///
/// Runs the filtered export request first. When that comes back as markup
/// instead of data (rate limiting, access control), retries once with an
/// unfiltered, larger-capacity export and filters rows client-side; a second
/// markup response becomes an access-denied failure record.
pub async fn search_tickets_data(
    config: &TracConfig,
    query: Option<String>,
    status: Option<String>,
    component: Option<String>,
    limit: usize,
) -> ResultRecord {
    let limit = effective_limit(limit);

    match fetch_search(config, &query, &status, &component, limit).await {
        Ok(record) => record,
        Err(e) => ResultRecord::failure(
            "ticket search",
            &search_page_url(config, &query),
            e.kind(),
            &e.to_string(),
        ),
    }
}

fn effective_limit(limit: usize) -> usize {
    limit.clamp(1, SEARCH_LIMIT_MAX)
}

/// Canonical link to the search on the upstream tracker (HTML view).
fn search_page_url(config: &TracConfig, query: &Option<String>) -> String {
    match query {
        Some(q) => format!(
            "{}/query?summary=~{}",
            config.base_url,
            urlencoding::encode(q)
        ),
        None => format!("{}/query", config.base_url),
    }
}

async fn fetch_search(
    config: &TracConfig,
    query: &Option<String>,
    status: &Option<String>,
    component: &Option<String>,
    limit: usize,
) -> Result<ResultRecord, Error> {
    let client = create_trac_client()?;

    let primary = ExportQuery {
        summary: query.clone(),
        status: status.clone(),
        component: component.clone(),
        id: None,
        max: limit,
    };

    let (tickets, note) = match fetch_export(&client, &primary.to_url(config)).await? {
        TabularPayload::Table(doc) => (summaries(&doc, limit), None),
        TabularPayload::NotTabular(_) => {
            let fallback = ExportQuery {
                max: FALLBACK_MAX,
                ..Default::default()
            };
            match fetch_export(&client, &fallback.to_url(config)).await? {
                TabularPayload::Table(doc) => {
                    let needles: Vec<String> = [query, status, component]
                        .into_iter()
                        .flatten()
                        .cloned()
                        .collect();
                    let rows = collect_matching_rows(&doc, &needles, limit);
                    let tickets: Vec<TicketSummary> = rows
                        .into_iter()
                        .filter_map(|row| ticket_from_row(&doc, row))
                        .collect();
                    (tickets, Some("filtered client-side"))
                }
                TabularPayload::NotTabular(_) => {
                    return Err(Error::AccessDenied(
                        "The ticket export rejected both the filtered and the unfiltered request"
                            .to_string(),
                    ));
                }
            }
        }
    };

    let label = query.clone().unwrap_or_else(|| "all tickets".to_string());
    let mut metadata = json!({
        "total": tickets.len(),
        "tickets": tickets,
    });
    if let Some(note) = note {
        metadata["note"] = json!(note);
    }

    Ok(ResultRecord {
        identifier: label.clone(),
        title: format!("Trac ticket search: {label}"),
        text: render_search_text(&tickets),
        url: search_page_url(config, query),
        metadata,
    })
}

fn summaries(doc: &TabularDocument, limit: usize) -> Vec<TicketSummary> {
    doc.rows
        .iter()
        .filter_map(|row| ticket_from_row(doc, row))
        .take(limit)
        .collect()
}

/// Handle the search command
pub async fn handler(options: SearchOptions, global: crate::Global) -> Result<()> {
    let config = TracConfig::from_global(&global);

    if global.verbose {
        println!("Searching tickets: {:?}", options.query);
    }

    let record = search_tickets_data(
        &config,
        options.query.clone(),
        options.status.clone(),
        options.component.clone(),
        options.limit,
    )
    .await;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        super::display_record(&record);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_limit_caps_at_maximum() {
        assert_eq!(effective_limit(500), SEARCH_LIMIT_MAX);
        assert_eq!(effective_limit(50), 50);
        assert_eq!(effective_limit(10), 10);
    }

    #[test]
    fn test_effective_limit_floors_at_one() {
        assert_eq!(effective_limit(0), 1);
    }

    #[test]
    fn test_search_page_url_encodes_query() {
        let config = TracConfig {
            base_url: "http://example.org".to_string(),
        };
        assert_eq!(
            search_page_url(&config, &Some("editor crash".to_string())),
            "http://example.org/query?summary=~editor%20crash"
        );
        assert_eq!(
            search_page_url(&config, &None),
            "http://example.org/query"
        );
    }
}
