//! Domain models and the normalized result envelope

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::markup;
use crate::tabular::{Row, TabularDocument};

/// Marker appended to a diff that was cut at the caller's character limit.
pub const DIFF_TRUNCATION_MARKER: &str = "\n... [diff truncated]";

/// The single normalized unit returned by every fetch operation.
///
/// `title` and `text` are never empty: failure paths produce a record that
/// describes the failure instead of omitting fields.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResultRecord {
    pub identifier: String,
    pub title: String,
    pub text: String,
    pub url: String,
    pub metadata: serde_json::Value,
}

impl ResultRecord {
    /// Build the failure shape: title names the resource, text carries the
    /// error message, metadata flags the error and its kind.
    pub fn failure(resource: &str, url: &str, kind: &str, message: &str) -> Self {
        Self {
            identifier: resource.to_string(),
            title: format!("Error loading {resource}"),
            text: message.to_string(),
            url: url.to_string(),
            metadata: json!({ "error": true, "kind": kind }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.metadata
            .get("error")
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    }
}

/// One ticket row from the tabular export. Constructed fresh per row, never
/// mutated afterwards.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TicketSummary {
    pub id: u64,
    pub title: String,
    pub status: String,
    pub owner: String,
    #[serde(rename = "type")]
    pub ticket_type: String,
    pub priority: String,
    pub milestone: String,
}

/// Build a ticket summary from one export row, resolving every column by
/// header name rather than position so either historical column order maps
/// correctly. Returns `None` when the id column is missing or not an integer
/// (separator and annotation rows in the export).
pub fn ticket_from_row(doc: &TabularDocument, row: &Row) -> Option<TicketSummary> {
    let id = doc
        .field(row, "id")?
        .trim()
        .trim_start_matches('#')
        .parse::<u64>()
        .ok()?;

    Some(TicketSummary {
        id,
        title: field_or(doc, row, "summary", "unknown"),
        status: field_or(doc, row, "status", "unknown"),
        owner: field_or(doc, row, "owner", "unassigned"),
        ticket_type: field_or(doc, row, "type", "unknown"),
        priority: field_or(doc, row, "priority", "unknown"),
        milestone: field_or(doc, row, "milestone", "none"),
    })
}

fn field_or(doc: &TabularDocument, row: &Row, name: &str, default: &str) -> String {
    match doc.field(row, name) {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

/// A single changeset, extracted from its rendered page. Fields the page
/// did not yield stay empty.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChangesetInfo {
    pub revision: u64,
    pub author: String,
    pub date: String,
    pub message: String,
    pub files: Vec<String>,
    pub diff: String,
}

/// One activity event from the timeline feed. `id` is the event link and
/// doubles as the dedup key. Events keep the feed's reverse-chronological
/// order; no re-sorting is performed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TimelineEvent {
    pub id: String,
    pub title: String,
    pub date: String,
    pub author: String,
    pub description: String,
}

/// Build an event from one feed item body.
///
/// Items missing either title or link are malformed and dropped individually;
/// every other field degrades to empty.
pub fn event_from_feed_item(item: &str) -> Option<TimelineEvent> {
    let title = markup::extract_field(item, &markup::FEED_ITEM_TITLE);
    let link = markup::extract_field(item, &markup::FEED_ITEM_LINK);
    if title.is_empty() || link.is_empty() {
        return None;
    }

    Some(TimelineEvent {
        id: link,
        title,
        date: format_feed_date(&markup::extract_field(item, &markup::FEED_ITEM_DATE)),
        author: markup::extract_field(item, &markup::FEED_ITEM_AUTHOR),
        description: markup::extract_field(item, &markup::FEED_ITEM_DESCRIPTION),
    })
}

/// Drop events whose link was already seen, keeping first occurrences in order.
pub fn dedup_events(events: Vec<TimelineEvent>) -> Vec<TimelineEvent> {
    let mut seen = std::collections::HashSet::new();
    events
        .into_iter()
        .filter(|event| seen.insert(event.id.clone()))
        .collect()
}

/// Normalize an RFC 2822 feed timestamp to UTC; feeds that deviate keep the
/// raw string.
pub fn format_feed_date(raw: &str) -> String {
    match chrono::DateTime::parse_from_rfc2822(raw.trim()) {
        Ok(dt) => dt
            .with_timezone(&chrono::Utc)
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        Err(_) => raw.trim().to_string(),
    }
}

/// Metadata categories the tabular export can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoKind {
    Milestones,
    Priorities,
    Types,
    Statuses,
}

impl InfoKind {
    pub const SUPPORTED: &'static str = "milestones, priorities, types, statuses";

    /// Parse a requested metadata type.
    ///
    /// Components and severities are not exposed by the export and fail with
    /// a message naming the supported alternatives, as does any unrecognized
    /// type. Parsing happens before any network call.
    pub fn parse(input: &str) -> Result<Self, String> {
        match input.trim().to_lowercase().as_str() {
            "milestones" => Ok(Self::Milestones),
            "priorities" => Ok(Self::Priorities),
            "types" => Ok(Self::Types),
            "statuses" => Ok(Self::Statuses),
            "components" | "severities" => Err(format!(
                "Info type '{}' is not available from this data source. Supported types: {}",
                input.trim(),
                Self::SUPPORTED
            )),
            other => Err(format!(
                "Unknown info type '{other}'. Valid types: {}",
                Self::SUPPORTED
            )),
        }
    }

    /// Export column holding this category's values.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Milestones => "milestone",
            Self::Priorities => "priority",
            Self::Types => "type",
            Self::Statuses => "status",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Milestones => "milestones",
            Self::Priorities => "priorities",
            Self::Types => "types",
            Self::Statuses => "statuses",
        }
    }
}

/// The distinct values of one metadata category.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TracInfoSet {
    pub kind: InfoKind,
    pub data: Vec<String>,
    pub total: usize,
}

/// Collect the unique, ascending-sorted values of the kind's column.
pub fn collect_info_values(doc: &TabularDocument, kind: InfoKind) -> TracInfoSet {
    let mut values = std::collections::BTreeSet::new();
    for row in &doc.rows {
        if let Some(value) = doc.field(row, kind.column()) {
            let value = value.trim();
            if !value.is_empty() {
                values.insert(value.to_string());
            }
        }
    }

    let data: Vec<String> = values.into_iter().collect();
    let total = data.len();
    TracInfoSet { kind, data, total }
}

/// Truncate a diff to `limit` characters, appending the truncation marker
/// when anything was cut.
pub fn truncate_diff(diff: &str, limit: usize) -> String {
    if diff.chars().count() <= limit {
        diff.to_string()
    } else {
        let mut truncated: String = diff.chars().take(limit).collect();
        truncated.push_str(DIFF_TRUNCATION_MARKER);
        truncated
    }
}

/// Render the multi-line plain-text summary for a single ticket.
pub fn render_ticket_text(ticket: &TicketSummary, url: &str, comments_note: bool) -> String {
    let mut text = format!(
        "Ticket #{}: {}\nStatus: {}\nOwner: {}\nType: {}\nPriority: {}\nMilestone: {}\nURL: {}",
        ticket.id,
        ticket.title,
        ticket.status,
        ticket.owner,
        ticket.ticket_type,
        ticket.priority,
        ticket.milestone,
        url
    );

    if comments_note {
        text.push_str(
            "\n\nNote: the ticket discussion is not available through this data source. \
             Read the full thread on the ticket page above.",
        );
    }

    text
}

/// Render a search result list, one ticket per line.
pub fn render_search_text(tickets: &[TicketSummary]) -> String {
    if tickets.is_empty() {
        return "No matching tickets found.".to_string();
    }

    tickets
        .iter()
        .map(|ticket| {
            format!(
                "#{} [{}] {} ({})",
                ticket.id, ticket.status, ticket.title, ticket.owner
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a changeset summary; tolerates every extracted field being empty.
pub fn render_changeset_text(changeset: &ChangesetInfo, url: &str) -> String {
    let mut text = format!("Changeset r{}", changeset.revision);

    if !changeset.author.is_empty() {
        text.push_str(&format!("\nAuthor: {}", changeset.author));
    }
    if !changeset.date.is_empty() {
        text.push_str(&format!("\nDate: {}", changeset.date));
    }
    if !changeset.message.is_empty() {
        text.push_str(&format!("\nMessage: {}", changeset.message));
    }
    if !changeset.files.is_empty() {
        text.push_str(&format!("\nFiles:\n  {}", changeset.files.join("\n  ")));
    }
    text.push_str(&format!("\nURL: {url}"));
    if !changeset.diff.is_empty() {
        text.push_str(&format!("\n\n{}", changeset.diff));
    }

    text
}

/// Render the timeline event list in feed order.
pub fn render_timeline_text(events: &[TimelineEvent]) -> String {
    if events.is_empty() {
        return "No recent activity found.".to_string();
    }

    events
        .iter()
        .map(|event| {
            let mut line = format!("- {}", event.title);
            if !event.date.is_empty() {
                line.push_str(&format!(" ({})", event.date));
            }
            if !event.author.is_empty() {
                line.push_str(&format!(" by {}", event.author));
            }
            if !event.description.is_empty() {
                line.push_str(&format!("\n  {}", event.description));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a metadata value list.
pub fn render_info_text(info: &TracInfoSet) -> String {
    if info.data.is_empty() {
        return format!("No {} found.", info.kind.label());
    }

    format!(
        "{} {}:\n  {}",
        info.total,
        info.kind.label(),
        info.data.join("\n  ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabular::{parse_export, TabularPayload};

    fn table(body: &str) -> TabularDocument {
        match parse_export(body) {
            TabularPayload::Table(doc) => doc,
            TabularPayload::NotTabular(_) => panic!("fixture must be tabular"),
        }
    }

    #[test]
    fn test_ticket_from_row_full() {
        let doc = table(
            "id,summary,status,owner,type,priority,milestone\n\
             61234,Editor crashes on paste,new,alice,defect,high,6.6",
        );
        let ticket = ticket_from_row(&doc, &doc.rows[0]).unwrap();
        assert_eq!(ticket.id, 61234);
        assert_eq!(ticket.title, "Editor crashes on paste");
        assert_eq!(ticket.status, "new");
        assert_eq!(ticket.owner, "alice");
        assert_eq!(ticket.ticket_type, "defect");
        assert_eq!(ticket.priority, "high");
        assert_eq!(ticket.milestone, "6.6");
    }

    #[test]
    fn test_ticket_from_row_defaults_for_empty_columns() {
        let doc = table("id,summary,status,owner,type,priority,milestone\n7,,,,,,");
        let ticket = ticket_from_row(&doc, &doc.rows[0]).unwrap();
        assert_eq!(ticket.title, "unknown");
        assert_eq!(ticket.status, "unknown");
        assert_eq!(ticket.owner, "unassigned");
        assert_eq!(ticket.ticket_type, "unknown");
        assert_eq!(ticket.priority, "unknown");
        assert_eq!(ticket.milestone, "none");
    }

    #[test]
    fn test_ticket_from_row_non_integer_id_skipped() {
        let doc = table("id,summary\ntotal,42 tickets");
        assert!(ticket_from_row(&doc, &doc.rows[0]).is_none());
    }

    #[test]
    fn test_ticket_from_row_resolves_swapped_columns_by_name() {
        // Same data with the status and owner columns transposed: the header
        // names, not the positions, decide the mapping.
        let doc = table("id,summary,owner,status\n9,Fix it,alice,closed");
        let ticket = ticket_from_row(&doc, &doc.rows[0]).unwrap();
        assert_eq!(ticket.owner, "alice");
        assert_eq!(ticket.status, "closed");
    }

    #[test]
    fn test_truncate_diff_under_limit_untouched() {
        assert_eq!(truncate_diff("short diff", 100), "short diff");
    }

    #[test]
    fn test_truncate_diff_cuts_and_marks() {
        let diff = "a".repeat(50);
        let truncated = truncate_diff(&diff, 10);
        assert_eq!(
            truncated,
            format!("{}{}", "a".repeat(10), DIFF_TRUNCATION_MARKER)
        );
    }

    #[test]
    fn test_truncate_diff_exact_limit_not_marked() {
        let diff = "a".repeat(10);
        assert_eq!(truncate_diff(&diff, 10), diff);
    }

    #[test]
    fn test_event_from_feed_item_full() {
        let item = r#"
<title><![CDATA[Ticket #61234 (Editor crashes) closed]]></title>
<link>http://example.org/ticket/61234</link>
<pubDate>Mon, 01 Jan 2024 10:30:00 GMT</pubDate>
<dc:creator><![CDATA[alice]]></dc:creator>
<description><![CDATA[<p>fixed in r58504</p>]]></description>
"#;
        let event = event_from_feed_item(item).unwrap();
        assert_eq!(event.id, "http://example.org/ticket/61234");
        assert_eq!(event.title, "Ticket #61234 (Editor crashes) closed");
        assert_eq!(event.date, "2024-01-01 10:30:00 UTC");
        assert_eq!(event.author, "alice");
        assert_eq!(event.description, "fixed in r58504");
    }

    #[test]
    fn test_event_from_feed_item_missing_link_dropped() {
        let item = "<title>orphan event</title><pubDate>whenever</pubDate>";
        assert!(event_from_feed_item(item).is_none());
    }

    #[test]
    fn test_event_from_feed_item_missing_title_dropped() {
        let item = "<link>http://example.org/x</link>";
        assert!(event_from_feed_item(item).is_none());
    }

    #[test]
    fn test_feed_event_count_matches_well_formed_items() {
        let feed = r#"
<rss><channel>
<item><title>ok one</title><link>http://example.org/1</link></item>
<item><title>no link here</title></item>
<item><title>ok two</title><link>http://example.org/2</link></item>
</channel></rss>
"#;
        let events: Vec<TimelineEvent> = crate::markup::feed_items(feed)
            .into_iter()
            .filter_map(event_from_feed_item)
            .collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "ok one");
        assert_eq!(events[1].title, "ok two");
    }

    #[test]
    fn test_dedup_events_keeps_first_occurrence() {
        let make = |id: &str, title: &str| TimelineEvent {
            id: id.to_string(),
            title: title.to_string(),
            date: String::new(),
            author: String::new(),
            description: String::new(),
        };
        let events = vec![make("a", "first"), make("b", "second"), make("a", "dup")];
        let deduped = dedup_events(events);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].title, "first");
        assert_eq!(deduped[1].title, "second");
    }

    #[test]
    fn test_format_feed_date_passthrough_on_parse_failure() {
        assert_eq!(format_feed_date("not a date"), "not a date");
    }

    #[test]
    fn test_info_kind_parse_supported() {
        assert_eq!(InfoKind::parse("milestones"), Ok(InfoKind::Milestones));
        assert_eq!(InfoKind::parse("STATUSES"), Ok(InfoKind::Statuses));
    }

    #[test]
    fn test_info_kind_parse_components_names_alternatives() {
        let err = InfoKind::parse("components").unwrap_err();
        assert!(err.contains("milestones, priorities, types, statuses"));
    }

    #[test]
    fn test_info_kind_parse_severities_names_alternatives() {
        let err = InfoKind::parse("severities").unwrap_err();
        assert!(err.contains("milestones, priorities, types, statuses"));
    }

    #[test]
    fn test_info_kind_parse_unknown_names_valid_types() {
        let err = InfoKind::parse("flavors").unwrap_err();
        assert!(err.contains("Valid types"));
        assert!(err.contains("milestones, priorities, types, statuses"));
    }

    #[test]
    fn test_collect_info_values_unique_sorted() {
        let doc = table(
            "id,summary,milestone\n1,a,6.6\n2,b,6.5\n3,c,6.6\n4,d,\n5,e,6.4",
        );
        let info = collect_info_values(&doc, InfoKind::Milestones);
        assert_eq!(info.data, vec!["6.4", "6.5", "6.6"]);
        assert_eq!(info.total, 3);
    }

    #[test]
    fn test_failure_record_shape() {
        let record = ResultRecord::failure(
            "ticket #7",
            "http://example.org/ticket/7",
            "not_found",
            "Not found: Ticket #7 not found",
        );
        assert_eq!(record.title, "Error loading ticket #7");
        assert!(!record.text.is_empty());
        assert!(record.is_error());
        assert_eq!(record.metadata["kind"], "not_found");
    }

    #[test]
    fn test_render_changeset_text_tolerates_empty_fields() {
        let changeset = ChangesetInfo {
            revision: 58504,
            author: String::new(),
            date: String::new(),
            message: String::new(),
            files: Vec::new(),
            diff: String::new(),
        };
        let text = render_changeset_text(&changeset, "http://example.org/changeset/58504");
        assert!(text.starts_with("Changeset r58504"));
        assert!(text.contains("http://example.org/changeset/58504"));
    }

    #[test]
    fn test_render_search_text_empty() {
        assert_eq!(render_search_text(&[]), "No matching tickets found.");
    }

    #[test]
    fn test_render_ticket_text_comments_note() {
        let doc = table("id,summary,status\n7,Fix it,new");
        let ticket = ticket_from_row(&doc, &doc.rows[0]).unwrap();
        let with_note = render_ticket_text(&ticket, "http://example.org/ticket/7", true);
        let without = render_ticket_text(&ticket, "http://example.org/ticket/7", false);
        assert!(with_note.contains("discussion is not available"));
        assert!(!without.contains("discussion is not available"));
    }
}
