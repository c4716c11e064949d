//! Parsing for the tracker's delimited CSV export format

/// Parse result for one upstream export body.
///
/// Blocked or rate-limited exports come back as rendered HTML error pages
/// instead of delimited text. Modeling that branch as an explicit variant keeps
/// the "is this markup instead of data" decision out of the row parser: a
/// `NotTabular` body must never be row-parsed, and the caller decides whether
/// to fall back or fail.
#[derive(Debug, Clone, PartialEq)]
pub enum TabularPayload {
    Table(TabularDocument),
    NotTabular(String),
}

/// A parsed export: one header row naming the fields, then data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularDocument {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

/// One data row, keeping the raw line around for client-side substring filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub fields: Vec<String>,
    pub raw: String,
}

impl TabularDocument {
    /// Look up a row's value by header name (case-insensitive).
    pub fn field<'a>(&self, row: &'a Row, name: &str) -> Option<&'a str> {
        let index = self
            .headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name))?;
        row.fields.get(index).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Check whether an export body is a rendered error page rather than data.
pub fn looks_like_markup(body: &str) -> bool {
    let lowered = body.to_lowercase();
    lowered.contains("<html") || lowered.contains("<!doctype") || body.contains("403 Forbidden")
}

/// Parse a full export body into a tagged payload.
///
/// A leading byte-order mark is stripped before line-splitting; lines are split
/// on both `\n` and `\r\n`. The first line names the fields, every following
/// non-empty line becomes a data row.
pub fn parse_export(body: &str) -> TabularPayload {
    if looks_like_markup(body) {
        return TabularPayload::NotTabular(body.to_string());
    }

    let body = body.strip_prefix('\u{feff}').unwrap_or(body);
    let mut lines = body.lines();

    let headers = match lines.next() {
        Some(line) => split_line(line),
        None => Vec::new(),
    };

    let rows = lines
        .filter(|line| !line.trim().is_empty())
        .map(|line| Row {
            fields: split_line(line),
            raw: line.to_string(),
        })
        .collect();

    TabularPayload::Table(TabularDocument { headers, rows })
}

/// Split one line of delimited text into an ordered sequence of fields.
///
/// Fields are comma-separated. A field wrapped in double quotes may contain
/// literal commas; a doubled quote (`""`) inside a quoted field is an escaped
/// literal quote. A backslash escapes the character that follows it, copied
/// literally with the quote state unaffected. Unquoted fields are trimmed.
pub fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut was_quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                current.push(escaped);
            }
        } else if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else if c == '"' && current.trim().is_empty() {
            in_quotes = true;
            was_quoted = true;
            current.clear();
        } else if c == ',' {
            fields.push(finish_field(&mut current, &mut was_quoted));
        } else {
            current.push(c);
        }
    }

    fields.push(finish_field(&mut current, &mut was_quoted));
    fields
}

fn finish_field(current: &mut String, was_quoted: &mut bool) -> String {
    let raw = std::mem::take(current);
    let value = if *was_quoted {
        raw
    } else {
        raw.trim().to_string()
    };
    *was_quoted = false;
    value
}

/// Filter rows by case-insensitive substring match against the raw row text.
///
/// Every needle must appear in a row for it to match. Collection stops once
/// `limit` rows are gathered, preserving document order. This is the
/// client-side half of the unfiltered-export fallback.
pub fn collect_matching_rows<'a>(
    doc: &'a TabularDocument,
    needles: &[String],
    limit: usize,
) -> Vec<&'a Row> {
    let lowered: Vec<String> = needles.iter().map(|needle| needle.to_lowercase()).collect();
    let mut matches = Vec::new();

    for row in &doc.rows {
        let raw = row.raw.to_lowercase();
        if lowered.iter().all(|needle| raw.contains(needle)) {
            matches.push(row);
            if matches.len() >= limit {
                break;
            }
        }
    }

    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_line_basic() {
        let fields = split_line("123,Fix the widget,new,alice");
        assert_eq!(fields, vec!["123", "Fix the widget", "new", "alice"]);
    }

    #[test]
    fn test_split_line_quoted_comma_round_trip() {
        let fields = split_line(r#"123,"Fix the widget, twice",new"#);
        assert_eq!(fields, vec!["123", "Fix the widget, twice", "new"]);
    }

    #[test]
    fn test_split_line_escaped_quote() {
        let fields = split_line(r#"1,"He said ""hi"" to me",open"#);
        assert_eq!(fields[1], r#"He said "hi" to me"#);
    }

    #[test]
    fn test_split_line_backslash_escape() {
        let fields = split_line(r"1,a\,b,c");
        assert_eq!(fields, vec!["1", "a,b", "c"]);
    }

    #[test]
    fn test_split_line_backslash_inside_quotes() {
        let fields = split_line(r#"1,"a\"b",c"#);
        assert_eq!(fields, vec!["1", "a\"b", "c"]);
    }

    #[test]
    fn test_split_line_trims_unquoted() {
        let fields = split_line("  1 ,  spaced out  , end ");
        assert_eq!(fields, vec!["1", "spaced out", "end"]);
    }

    #[test]
    fn test_split_line_preserves_quoted_whitespace() {
        let fields = split_line(r#"1,"  padded  ",x"#);
        assert_eq!(fields[1], "  padded  ");
    }

    #[test]
    fn test_split_line_empty_fields() {
        let fields = split_line("1,,3");
        assert_eq!(fields, vec!["1", "", "3"]);
    }

    #[test]
    fn test_parse_export_row_and_field_counts() {
        let body = "id,summary,status\n1,First,new\n2,Second,closed\n3,Third,open";
        let TabularPayload::Table(doc) = parse_export(body) else {
            panic!("expected a table");
        };
        assert_eq!(doc.rows.len(), 3);
        for row in &doc.rows {
            assert_eq!(row.fields.len(), doc.headers.len());
        }
    }

    #[test]
    fn test_parse_export_strips_bom_and_crlf() {
        let body = "\u{feff}id,summary\r\n1,First\r\n2,Second\r\n";
        let TabularPayload::Table(doc) = parse_export(body) else {
            panic!("expected a table");
        };
        assert_eq!(doc.headers, vec!["id", "summary"]);
        assert_eq!(doc.rows.len(), 2);
        assert_eq!(doc.field(&doc.rows[0], "summary"), Some("First"));
    }

    #[test]
    fn test_parse_export_header_only_is_empty_table() {
        let TabularPayload::Table(doc) = parse_export("id,summary,status") else {
            panic!("expected a table");
        };
        assert!(doc.is_empty());
    }

    #[test]
    fn test_parse_export_html_body_is_not_tabular() {
        let body = "<html><body><h1>Error</h1></body></html>";
        match parse_export(body) {
            TabularPayload::NotTabular(raw) => assert_eq!(raw, body),
            TabularPayload::Table(_) => panic!("markup must not be row-parsed"),
        }
    }

    #[test]
    fn test_parse_export_forbidden_marker_is_not_tabular() {
        let body = "403 Forbidden\nRequest blocked.";
        assert!(matches!(parse_export(body), TabularPayload::NotTabular(_)));
    }

    #[test]
    fn test_field_lookup_by_header_name() {
        let TabularPayload::Table(doc) = parse_export("id,owner,status\n7,alice,new") else {
            panic!("expected a table");
        };
        assert_eq!(doc.field(&doc.rows[0], "owner"), Some("alice"));
        assert_eq!(doc.field(&doc.rows[0], "Status"), Some("new"));
        assert_eq!(doc.field(&doc.rows[0], "missing"), None);
    }

    #[test]
    fn test_collect_matching_rows_case_insensitive() {
        let TabularPayload::Table(doc) =
            parse_export("id,summary\n1,Editor crash\n2,Media upload\n3,editor freeze")
        else {
            panic!("expected a table");
        };
        let rows = collect_matching_rows(&doc, &["EDITOR".to_string()], 10);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields[0], "1");
        assert_eq!(rows[1].fields[0], "3");
    }

    #[test]
    fn test_collect_matching_rows_stops_at_limit() {
        let TabularPayload::Table(doc) =
            parse_export("id,summary\n1,bug a\n2,bug b\n3,bug c\n4,bug d")
        else {
            panic!("expected a table");
        };
        let rows = collect_matching_rows(&doc, &["bug".to_string()], 2);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_collect_matching_rows_all_needles_required() {
        let TabularPayload::Table(doc) =
            parse_export("id,summary,status\n1,editor bug,new\n2,editor bug,closed")
        else {
            panic!("expected a table");
        };
        let needles = vec!["editor".to_string(), "closed".to_string()];
        let rows = collect_matching_rows(&doc, &needles, 10);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields[0], "2");
    }
}
