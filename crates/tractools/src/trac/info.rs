use serde::{Deserialize, Serialize};
use serde_json::json;
use tractools_core::tabular::TabularPayload;
use tractools_core::trac::{collect_info_values, render_info_text, InfoKind, ResultRecord};

use super::{create_trac_client, fetch_export, ExportQuery, TracConfig};
use crate::prelude::{println, *};

/// Row cap for the unfiltered export backing metadata collection.
const INFO_ROWS_MAX: usize = 1000;

/// Options for listing metadata values
#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct InfoOptions {
    /// Metadata type: milestones, priorities, types, statuses
    #[arg(value_name = "TYPE")]
    pub info_type: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Public data function - used by both CLI and MCP
///
/// The requested kind is validated before any network traffic; unsupported
/// and unrecognized kinds fail immediately with a message naming the
/// supported alternatives.
pub async fn get_trac_info_data(config: &TracConfig, info_type: &str) -> ResultRecord {
    let kind = match InfoKind::parse(info_type) {
        Ok(kind) => kind,
        Err(message) => {
            let e = Error::UnsupportedQuery(message);
            return ResultRecord::failure(
                "trac info",
                &format!("{}/query", config.base_url),
                e.kind(),
                &e.to_string(),
            );
        }
    };

    match fetch_info(config, kind).await {
        Ok(record) => record,
        Err(e) => ResultRecord::failure(
            "trac info",
            &format!("{}/query", config.base_url),
            e.kind(),
            &e.to_string(),
        ),
    }
}

async fn fetch_info(config: &TracConfig, kind: InfoKind) -> Result<ResultRecord, Error> {
    let client = create_trac_client()?;

    let export = ExportQuery {
        max: INFO_ROWS_MAX,
        ..Default::default()
    };

    match fetch_export(&client, &export.to_url(config)).await? {
        TabularPayload::NotTabular(_) => Err(Error::AccessDenied(
            "The ticket export rejected the metadata request".to_string(),
        )),
        TabularPayload::Table(doc) => {
            let info = collect_info_values(&doc, kind);
            Ok(ResultRecord {
                identifier: kind.label().to_string(),
                title: format!("Trac {}", kind.label()),
                text: render_info_text(&info),
                url: format!("{}/query", config.base_url),
                metadata: json!({
                    "type": kind.label(),
                    "total": info.total,
                    "data": info.data,
                }),
            })
        }
    }
}

/// Handle the info command
pub async fn handler(options: InfoOptions, global: crate::Global) -> Result<()> {
    let config = TracConfig::from_global(&global);

    let record = get_trac_info_data(&config, &options.info_type).await;

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

    fn config() -> TracConfig {
        // Unroutable on purpose: these tests must not touch the network.
        TracConfig {
            base_url: "http://127.0.0.1:1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_components_fail_before_any_network_call() {
        let record = get_trac_info_data(&config(), "components").await;
        assert!(record.is_error());
        assert_eq!(record.metadata["kind"], "unsupported_query");
        assert!(record.text.contains("milestones, priorities, types, statuses"));
    }

    #[tokio::test]
    async fn test_unknown_kind_fails_naming_valid_types() {
        let record = get_trac_info_data(&config(), "flavors").await;
        assert!(record.is_error());
        assert!(record.text.contains("Valid types"));
    }
}
