use serde::{Deserialize, Serialize};
use serde_json::json;
use tractools_core::markup;
use tractools_core::trac::{render_changeset_text, truncate_diff, ChangesetInfo, ResultRecord};

use super::{create_trac_client, fetch_body, TracConfig};
use crate::prelude::{println, *};

/// Default character limit applied to fetched diffs.
pub const DIFF_LIMIT_DEFAULT: usize = 2000;

/// Hard cap on the diff character limit regardless of what the caller asks for.
pub const DIFF_LIMIT_MAX: usize = 10000;

/// Options for getting a changeset
#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct ChangesetOptions {
    /// Revision number
    #[arg(value_name = "REVISION")]
    pub revision: u64,

    /// Also fetch the unified diff
    #[arg(long)]
    pub diff: bool,

    /// Character limit for the fetched diff (capped at 10000)
    #[arg(long, default_value = "2000")]
    pub diff_limit: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Public data function - used by both CLI and MCP
pub async fn get_changeset_data(
    config: &TracConfig,
    revision: u64,
    include_diff: bool,
    diff_limit: usize,
) -> ResultRecord {
    match fetch_changeset(config, revision, include_diff, diff_limit).await {
        Ok(record) => record,
        Err(e) => ResultRecord::failure(
            &format!("changeset r{revision}"),
            &config.changeset_url(revision),
            e.kind(),
            &e.to_string(),
        ),
    }
}

fn effective_diff_limit(diff_limit: usize) -> usize {
    diff_limit.clamp(1, DIFF_LIMIT_MAX)
}

async fn fetch_changeset(
    config: &TracConfig,
    revision: u64,
    include_diff: bool,
    diff_limit: usize,
) -> Result<ResultRecord, Error> {
    let diff_limit = effective_diff_limit(diff_limit);
    let client = create_trac_client()?;
    let url = config.changeset_url(revision);

    let page = fetch_body(&client, &url, &format!("changeset r{revision}")).await?;

    let mut changeset = ChangesetInfo {
        revision,
        author: markup::extract_field(&page, &markup::CHANGESET_AUTHOR),
        date: markup::extract_field(&page, &markup::CHANGESET_DATE),
        message: markup::extract_field(&page, &markup::CHANGESET_MESSAGE),
        files: markup::extract_files(&page),
        diff: String::new(),
    };

    if include_diff {
        // A missing diff leaves the field empty rather than failing the fetch.
        let diff_url = format!("{url}?format=diff");
        if let Ok(diff) = fetch_body(&client, &diff_url, &format!("diff for r{revision}")).await {
            changeset.diff = truncate_diff(&diff, diff_limit);
        }
    }

    Ok(ResultRecord {
        identifier: format!("r{revision}"),
        title: changeset_title(&changeset),
        text: render_changeset_text(&changeset, &url),
        url,
        metadata: json!({
            "revision": changeset.revision,
            "author": changeset.author,
            "date": changeset.date,
            "files": changeset.files,
            "diff_included": !changeset.diff.is_empty(),
        }),
    })
}

/// First line of the commit message, falling back to the bare revision label.
fn changeset_title(changeset: &ChangesetInfo) -> String {
    let first_line = changeset.message.lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        return format!("Changeset r{}", changeset.revision);
    }

    const MAX_TITLE: usize = 80;
    if first_line.chars().count() <= MAX_TITLE {
        format!("r{}: {first_line}", changeset.revision)
    } else {
        let truncated: String = first_line.chars().take(MAX_TITLE).collect();
        format!("r{}: {truncated}...", changeset.revision)
    }
}

/// Handle the changeset command
pub async fn handler(options: ChangesetOptions, global: crate::Global) -> Result<()> {
    let config = TracConfig::from_global(&global);

    let record =
        get_changeset_data(&config, options.revision, options.diff, options.diff_limit).await;

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
    fn test_effective_diff_limit_caps_at_maximum() {
        assert_eq!(effective_diff_limit(50000), DIFF_LIMIT_MAX);
        assert_eq!(effective_diff_limit(2000), 2000);
    }

    #[test]
    fn test_changeset_title_uses_first_message_line() {
        let changeset = ChangesetInfo {
            revision: 58504,
            author: "alice".to_string(),
            date: String::new(),
            message: "Editor: fix paste handling\n\nLonger body".to_string(),
            files: Vec::new(),
            diff: String::new(),
        };
        assert_eq!(changeset_title(&changeset), "r58504: Editor: fix paste handling");
    }

    #[test]
    fn test_changeset_title_empty_message() {
        let changeset = ChangesetInfo {
            revision: 9,
            author: String::new(),
            date: String::new(),
            message: String::new(),
            files: Vec::new(),
            diff: String::new(),
        };
        assert_eq!(changeset_title(&changeset), "Changeset r9");
    }

    #[test]
    fn test_changeset_title_truncates_long_lines() {
        let changeset = ChangesetInfo {
            revision: 1,
            author: String::new(),
            date: String::new(),
            message: "x".repeat(200),
            files: Vec::new(),
            diff: String::new(),
        };
        let title = changeset_title(&changeset);
        assert!(title.ends_with("..."));
        assert!(title.chars().count() < 200);
    }
}
