use serde::{Deserialize, Serialize};
use tractools_core::cache::TicketCache;
use tractools_core::query::{classify, Query, DEFAULT_SEARCH_LIMIT};
use tractools_core::trac::ResultRecord;

use super::{changeset, search, ticket, timeline, TracConfig};
use crate::prelude::{println, *};

/// Options for the simplified query entry point
#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct QueryOptions {
    /// Free-form input: a ticket id, "#1234", "r58504", "recent", or keywords
    #[arg(value_name = "INPUT")]
    pub input: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Public data function - used by both CLI and MCP
///
/// Classifies the input and dispatches to the matching fetcher with its
/// default parameters. Classification is pure; every input maps to exactly
/// one fetcher invocation.
pub async fn run_query_data(
    config: &TracConfig,
    cache: &TicketCache,
    input: &str,
) -> ResultRecord {
    match classify(input) {
        Query::Ticket(id) => ticket::get_ticket_data(config, cache, id, false).await,
        Query::Changeset(revision) => {
            changeset::get_changeset_data(config, revision, false, changeset::DIFF_LIMIT_DEFAULT)
                .await
        }
        Query::Timeline => {
            timeline::get_timeline_data(
                config,
                timeline::TIMELINE_DAYS_DEFAULT,
                timeline::TIMELINE_MAX_DEFAULT,
            )
            .await
        }
        Query::Search(text) => {
            let query = if text.is_empty() { None } else { Some(text) };
            search::search_tickets_data(config, query, None, None, DEFAULT_SEARCH_LIMIT).await
        }
    }
}

/// Handle the query command
pub async fn handler(options: QueryOptions, global: crate::Global) -> Result<()> {
    let config = TracConfig::from_global(&global);
    let cache = TicketCache::new(super::CACHE_CAPACITY);

    let record = run_query_data(&config, &cache, &options.input).await;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        super::display_record(&record);
    }

    Ok(())
}
