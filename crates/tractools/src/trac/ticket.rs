use serde::{Deserialize, Serialize};
use serde_json::json;
use tractools_core::cache::TicketCache;
use tractools_core::tabular::TabularPayload;
use tractools_core::trac::{render_ticket_text, ticket_from_row, ResultRecord};

use super::{create_trac_client, fetch_export, ExportQuery, TracConfig};
use crate::prelude::{println, *};

// The id filter should yield a single row, but blocked or odd exports can
// carry extra annotation rows; leave room to scan past them.
const SINGLE_ID_MAX: usize = 10;

/// Options for getting a single ticket
#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct TicketOptions {
    /// Ticket id
    #[arg(value_name = "ID")]
    pub id: u64,

    /// Include a note about where the ticket discussion lives
    #[arg(long)]
    pub comments: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Public data function - used by both CLI and MCP
///
/// The winning row is the one whose id field equals the requested id, not the
/// first row returned. Successful lookups are written through to the cache;
/// hits and misses produce identical output.
pub async fn get_ticket_data(
    config: &TracConfig,
    cache: &TicketCache,
    id: u64,
    include_comments: bool,
) -> ResultRecord {
    match fetch_ticket(config, cache, id, include_comments).await {
        Ok(record) => record,
        Err(e) => ResultRecord::failure(
            &format!("ticket #{id}"),
            &config.ticket_url(id),
            e.kind(),
            &e.to_string(),
        ),
    }
}

async fn fetch_ticket(
    config: &TracConfig,
    cache: &TicketCache,
    id: u64,
    include_comments: bool,
) -> Result<ResultRecord, Error> {
    let client = create_trac_client()?;

    let export = ExportQuery {
        id: Some(id),
        max: SINGLE_ID_MAX,
        ..Default::default()
    };

    match fetch_export(&client, &export.to_url(config)).await? {
        TabularPayload::NotTabular(_) => Err(Error::AccessDenied(format!(
            "The ticket export rejected the request for ticket #{id}"
        ))),
        TabularPayload::Table(doc) => {
            let ticket = doc
                .rows
                .iter()
                .filter_map(|row| ticket_from_row(&doc, row))
                .find(|ticket| ticket.id == id)
                .ok_or_else(|| Error::NotFound(format!("Ticket #{id} not found")))?;

            cache.insert(ticket.clone());

            let url = config.ticket_url(id);
            Ok(ResultRecord {
                identifier: id.to_string(),
                title: format!("#{}: {}", ticket.id, ticket.title),
                text: render_ticket_text(&ticket, &url, include_comments),
                url,
                metadata: json!({
                    "status": ticket.status,
                    "owner": ticket.owner,
                    "type": ticket.ticket_type,
                    "priority": ticket.priority,
                    "milestone": ticket.milestone,
                }),
            })
        }
    }
}

/// Handle the ticket command
pub async fn handler(options: TicketOptions, global: crate::Global) -> Result<()> {
    let config = TracConfig::from_global(&global);
    let cache = TicketCache::new(super::CACHE_CAPACITY);

    let record = get_ticket_data(&config, &cache, options.id, options.comments).await;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        super::display_record(&record);
    }

    Ok(())
}
