use crate::prelude::{eprintln, *};
use serde::Deserialize;
use tractools_core::trac::ResultRecord;

use super::{CallToolResult, Content, JsonRpcError, ServerContext};
use crate::trac::{changeset, TracConfig};

/// Serialize a result record into the MCP result payload.
///
/// Fetchers never raise past their boundary, so every call produces a record;
/// failure-shaped records are in-band results, not protocol errors.
fn record_result(record: &ResultRecord) -> Result<serde_json::Value, JsonRpcError> {
    let json_string = serde_json::to_string_pretty(record).map_err(|e| JsonRpcError {
        code: -32603,
        message: format!("Serialization error: {e}"),
        data: None,
    })?;

    let result = CallToolResult {
        content: vec![Content::Text { text: json_string }],
        is_error: None,
    };

    serde_json::to_value(result).map_err(|e| JsonRpcError {
        code: -32603,
        message: format!("Internal error: {e}"),
        data: None,
    })
}

fn parse_args<T: serde::de::DeserializeOwned>(
    arguments: Option<serde_json::Value>,
) -> Result<T, JsonRpcError> {
    serde_json::from_value(arguments.unwrap_or(serde_json::Value::Null)).map_err(|e| {
        JsonRpcError {
            code: -32602,
            message: format!("Invalid arguments: {e}"),
            data: None,
        }
    })
}

pub async fn handle_search_tickets(
    arguments: Option<serde_json::Value>,
    ctx: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct SearchTicketsArgs {
        query: Option<String>,
        status: Option<String>,
        component: Option<String>,
        limit: Option<usize>,
    }

    let args: SearchTicketsArgs = parse_args(arguments)?;

    if ctx.global.verbose {
        eprintln!(
            "Calling trac_search_tickets: query={:?}, status={:?}, component={:?}, limit={:?}",
            args.query, args.status, args.component, args.limit
        );
    }

    let config = TracConfig::from_global(&ctx.global);
    let record = crate::trac::search_tickets_data(
        &config,
        args.query,
        args.status,
        args.component,
        args.limit.unwrap_or(10),
    )
    .await;

    record_result(&record)
}

pub async fn handle_get_ticket(
    arguments: Option<serde_json::Value>,
    ctx: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct GetTicketArgs {
        id: u64,
        include_comments: Option<bool>,
    }

    let args: GetTicketArgs = parse_args(arguments)?;

    if ctx.global.verbose {
        eprintln!(
            "Calling trac_get_ticket: id={}, include_comments={:?}",
            args.id, args.include_comments
        );
    }

    let config = TracConfig::from_global(&ctx.global);
    let record = crate::trac::get_ticket_data(
        &config,
        &ctx.cache,
        args.id,
        args.include_comments.unwrap_or(false),
    )
    .await;

    record_result(&record)
}

pub async fn handle_get_changeset(
    arguments: Option<serde_json::Value>,
    ctx: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct GetChangesetArgs {
        revision: u64,
        include_diff: Option<bool>,
        diff_limit: Option<usize>,
    }

    let args: GetChangesetArgs = parse_args(arguments)?;

    if ctx.global.verbose {
        eprintln!(
            "Calling trac_get_changeset: revision={}, include_diff={:?}, diff_limit={:?}",
            args.revision, args.include_diff, args.diff_limit
        );
    }

    let config = TracConfig::from_global(&ctx.global);
    let record = crate::trac::get_changeset_data(
        &config,
        args.revision,
        args.include_diff.unwrap_or(false),
        args.diff_limit.unwrap_or(changeset::DIFF_LIMIT_DEFAULT),
    )
    .await;

    record_result(&record)
}

pub async fn handle_get_timeline(
    arguments: Option<serde_json::Value>,
    ctx: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct GetTimelineArgs {
        days: Option<usize>,
        max: Option<usize>,
    }

    let args: GetTimelineArgs = parse_args(arguments)?;

    if ctx.global.verbose {
        eprintln!(
            "Calling trac_get_timeline: days={:?}, max={:?}",
            args.days, args.max
        );
    }

    let config = TracConfig::from_global(&ctx.global);
    let record = crate::trac::get_timeline_data(
        &config,
        args.days.unwrap_or(crate::trac::timeline::TIMELINE_DAYS_DEFAULT),
        args.max.unwrap_or(crate::trac::timeline::TIMELINE_MAX_DEFAULT),
    )
    .await;

    record_result(&record)
}

pub async fn handle_get_info(
    arguments: Option<serde_json::Value>,
    ctx: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct GetInfoArgs {
        #[serde(rename = "type")]
        info_type: String,
    }

    let args: GetInfoArgs = parse_args(arguments)?;

    if ctx.global.verbose {
        eprintln!("Calling trac_get_info: type={}", args.info_type);
    }

    let config = TracConfig::from_global(&ctx.global);
    let record = crate::trac::get_trac_info_data(&config, &args.info_type).await;

    record_result(&record)
}

pub async fn handle_query(
    arguments: Option<serde_json::Value>,
    ctx: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct QueryArgs {
        input: String,
    }

    let args: QueryArgs = parse_args(arguments)?;

    if ctx.global.verbose {
        eprintln!("Calling trac_query: input={}", args.input);
    }

    let config = TracConfig::from_global(&ctx.global);
    let record = crate::trac::run_query_data(&config, &ctx.cache, &args.input).await;

    record_result(&record)
}
