use serde::{Deserialize, Serialize};
use serde_json::json;
use tractools_core::markup;
use tractools_core::trac::{
    dedup_events, event_from_feed_item, render_timeline_text, ResultRecord, TimelineEvent,
};

use super::{create_trac_client, fetch_body, TracConfig};
use crate::prelude::{println, *};

/// Default lookback window in days.
pub const TIMELINE_DAYS_DEFAULT: usize = 7;

/// Hard cap on the lookback window.
pub const TIMELINE_DAYS_MAX: usize = 30;

/// Default number of events returned.
pub const TIMELINE_MAX_DEFAULT: usize = 20;

/// Hard cap on the number of events regardless of what the caller asks for.
pub const TIMELINE_MAX_CAP: usize = 100;

/// Options for listing recent activity
#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct TimelineOptions {
    /// Lookback window in days (capped at 30)
    #[arg(short, long, default_value = "7")]
    pub days: usize,

    /// Maximum number of events (capped at 100)
    #[arg(short, long, default_value = "20")]
    pub max: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Public data function - used by both CLI and MCP
///
/// Feed items are extracted independently: an item missing its title or link
/// is dropped on its own, duplicate links are deduped, and the feed's
/// reverse-chronological order is preserved.
pub async fn get_timeline_data(config: &TracConfig, days: usize, max: usize) -> ResultRecord {
    match fetch_timeline(config, days, max).await {
        Ok(record) => record,
        Err(e) => ResultRecord::failure(
            "timeline",
            &config.timeline_url(),
            e.kind(),
            &e.to_string(),
        ),
    }
}

fn effective_window(days: usize, max: usize) -> (usize, usize) {
    (days.clamp(1, TIMELINE_DAYS_MAX), max.clamp(1, TIMELINE_MAX_CAP))
}

async fn fetch_timeline(config: &TracConfig, days: usize, max: usize) -> Result<ResultRecord, Error> {
    let (days, max) = effective_window(days, max);
    let client = create_trac_client()?;

    let feed_url = format!(
        "{}?from={days}+days+ago&max={max}&format=rss",
        config.timeline_url()
    );
    let feed = fetch_body(&client, &feed_url, "timeline").await?;

    let events: Vec<TimelineEvent> = markup::feed_items(&feed)
        .into_iter()
        .filter_map(event_from_feed_item)
        .collect();
    let events: Vec<TimelineEvent> = dedup_events(events).into_iter().take(max).collect();

    Ok(ResultRecord {
        identifier: format!("timeline:{days}d"),
        title: format!("Trac timeline (last {days} days)"),
        text: render_timeline_text(&events),
        url: config.timeline_url(),
        metadata: json!({
            "days": days,
            "count": events.len(),
            "events": events,
        }),
    })
}

/// Handle the timeline command
pub async fn handler(options: TimelineOptions, global: crate::Global) -> Result<()> {
    let config = TracConfig::from_global(&global);

    let record = get_timeline_data(&config, options.days, options.max).await;

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
    fn test_effective_window_caps_days_and_max() {
        assert_eq!(effective_window(90, 500), (TIMELINE_DAYS_MAX, TIMELINE_MAX_CAP));
        assert_eq!(effective_window(7, 20), (7, 20));
    }

    #[test]
    fn test_effective_window_floors_at_one() {
        assert_eq!(effective_window(0, 0), (1, 1));
    }
}
