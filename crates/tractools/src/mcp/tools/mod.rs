mod trac;

use serde::{Deserialize, Serialize};

// Re-export types needed by tool handlers
pub use super::{JsonRpcError, ServerContext, Tool};

// MCP Protocol types for tools
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Serialize)]
pub struct ToolsCapability {}

#[derive(Debug, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct ToolsList {
    pub tools: Vec<Tool>,
}

#[derive(Debug, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    pub arguments: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum Content {
    #[serde(rename = "text")]
    Text { text: String },
}

pub fn handle_initialize() -> Result<serde_json::Value, JsonRpcError> {
    let result = InitializeResult {
        protocol_version: "2024-11-05".to_string(),
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability {}),
        },
        server_info: ServerInfo {
            name: "tractools".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    };

    serde_json::to_value(result).map_err(|e| JsonRpcError {
        code: -32603,
        message: format!("Internal error: {e}"),
        data: None,
    })
}

pub fn handle_tools_list() -> Result<serde_json::Value, JsonRpcError> {
    let tools = vec![
        Tool {
            name: "trac_search_tickets".to_string(),
            description: "Search Trac tickets through the tracker's CSV export. Filters by summary substring, status, and component. When the filtered export is blocked, the search falls back to an unfiltered export filtered client-side and says so in the result metadata. Returns a normalized result record with the matching ticket summaries.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Substring to match against ticket summaries"
                    },
                    "status": {
                        "type": "string",
                        "description": "Filter by ticket status (e.g. 'new', 'closed')"
                    },
                    "component": {
                        "type": "string",
                        "description": "Filter by component"
                    },
                    "limit": {
                        "type": "number",
                        "description": "Maximum number of tickets to return (default: 10, max: 50)"
                    }
                },
                "required": []
            }),
        },
        Tool {
            name: "trac_get_ticket".to_string(),
            description: "Get a single Trac ticket by id. Returns the ticket's summary, status, owner, type, priority, and milestone as a normalized result record. The ticket discussion is not available through the CSV export; when include_comments is set the record carries a note pointing at the canonical ticket page.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "number",
                        "description": "Ticket id"
                    },
                    "include_comments": {
                        "type": "boolean",
                        "description": "Append a note about where the ticket discussion lives (default: false)"
                    }
                },
                "required": ["id"]
            }),
        },
        Tool {
            name: "trac_get_changeset".to_string(),
            description: "Get a Trac changeset by revision number. Extracts author, date, commit message, and the changed-file list from the rendered changeset page. Optionally fetches the unified diff, truncated to diff_limit characters with a truncation marker when cut.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "revision": {
                        "type": "number",
                        "description": "Revision number"
                    },
                    "include_diff": {
                        "type": "boolean",
                        "description": "Also fetch the unified diff (default: false)"
                    },
                    "diff_limit": {
                        "type": "number",
                        "description": "Character limit for the fetched diff (default: 2000, max: 10000)"
                    }
                },
                "required": ["revision"]
            }),
        },
        Tool {
            name: "trac_get_timeline".to_string(),
            description: "List recent activity from the Trac timeline RSS feed: ticket changes, changesets, and wiki edits in reverse-chronological feed order. Items missing a title or link are dropped individually and duplicate links are deduped.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "days": {
                        "type": "number",
                        "description": "Lookback window in days (default: 7, max: 30)"
                    },
                    "max": {
                        "type": "number",
                        "description": "Maximum number of events (default: 20, max: 100)"
                    }
                },
                "required": []
            }),
        },
        Tool {
            name: "trac_get_info".to_string(),
            description: "List the distinct values of one Trac metadata category, collected from the ticket export. Supported types: milestones, priorities, types, statuses. Components and severities are not available from this data source and fail immediately with the supported alternatives.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "type": {
                        "type": "string",
                        "description": "Metadata type: milestones, priorities, types, statuses",
                        "enum": ["milestones", "priorities", "types", "statuses"]
                    }
                },
                "required": ["type"]
            }),
        },
        Tool {
            name: "trac_query".to_string(),
            description: "Simplified entry point that routes one free-form input to the right fetcher: an integer (optionally '#'-prefixed) looks up that ticket, 'r' followed by a number looks up that changeset, 'recent'/'timeline'/'latest' lists recent activity, and anything else searches ticket summaries.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "input": {
                        "type": "string",
                        "description": "Free-form input: a ticket id, '#1234', 'r58504', 'recent', or search keywords"
                    }
                },
                "required": ["input"]
            }),
        },
    ];

    let result = ToolsList { tools };

    serde_json::to_value(result).map_err(|e| JsonRpcError {
        code: -32603,
        message: format!("Internal error: {e}"),
        data: None,
    })
}

pub async fn handle_tools_call(
    params: Option<serde_json::Value>,
    ctx: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: CallToolParams = serde_json::from_value(params.unwrap_or(serde_json::Value::Null))
        .map_err(|e| JsonRpcError {
            code: -32602,
            message: format!("Invalid params: {e}"),
            data: None,
        })?;

    match params.name.as_str() {
        "trac_search_tickets" => trac::handle_search_tickets(params.arguments, ctx).await,
        "trac_get_ticket" => trac::handle_get_ticket(params.arguments, ctx).await,
        "trac_get_changeset" => trac::handle_get_changeset(params.arguments, ctx).await,
        "trac_get_timeline" => trac::handle_get_timeline(params.arguments, ctx).await,
        "trac_get_info" => trac::handle_get_info(params.arguments, ctx).await,
        "trac_query" => trac::handle_query(params.arguments, ctx).await,
        _ => Err(JsonRpcError {
            code: -32602,
            message: format!("Unknown tool: {}", params.name),
            data: None,
        }),
    }
}
