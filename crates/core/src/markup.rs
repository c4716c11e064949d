//! Field extraction from changeset pages and RSS feed items
//!
//! Each logical field is an ordered list of candidate patterns covering the
//! known historical variations of the upstream page templates. Patterns are
//! tried in order and the first match wins; a field whose patterns all miss is
//! simply empty in the resulting record.

use regex::Regex;

/// Cap on the number of file entries extracted from a changeset page.
pub const MAX_FILE_ENTRIES: usize = 20;

/// One logical field and its ordered candidate patterns.
///
/// Every pattern must have exactly one capture group for the field value.
/// New upstream template variations are handled by appending a pattern here,
/// not by touching the extraction control flow.
pub struct FieldSpec {
    pub name: &'static str,
    pub patterns: &'static [&'static str],
}

pub const CHANGESET_AUTHOR: FieldSpec = FieldSpec {
    name: "author",
    patterns: &[
        r#"<dd class="author">(?s)(.*?)</dd>"#,
        r#"<td class="author">(?s)(.*?)</td>"#,
        r#"<span class="author">(?s)(.*?)</span>"#,
    ],
};

pub const CHANGESET_DATE: FieldSpec = FieldSpec {
    name: "date",
    patterns: &[
        r#"<dd class="time">(?s)(.*?)</dd>"#,
        r#"<dd class="date">(?s)(.*?)</dd>"#,
        r#"<td class="date">(?s)(.*?)</td>"#,
    ],
};

pub const CHANGESET_MESSAGE: FieldSpec = FieldSpec {
    name: "message",
    patterns: &[
        r#"<dd class="message searchable">(?s)(.*?)</dd>"#,
        r#"<dd class="message"[^>]*>(?s)(.*?)</dd>"#,
        r#"<div class="message"[^>]*>(?s)(.*?)</div>"#,
    ],
};

pub const CHANGESET_FILES: FieldSpec = FieldSpec {
    name: "files",
    patterns: &[
        r#"<li class="(?:add|change|delete|edit|copy|move)[^"]*">\s*(?s)<a[^>]*>(.*?)</a>"#,
        r#"<td class="name">\s*(?s)<a[^>]*>(.*?)</a>"#,
    ],
};

// Feed item fields prefer CDATA-wrapped text; the plain pattern is the
// fallback when CDATA is absent.

pub const FEED_ITEM_TITLE: FieldSpec = FieldSpec {
    name: "title",
    patterns: &[
        r"<title><!\[CDATA\[(?s)(.*?)\]\]></title>",
        r"<title>(?s)(.*?)</title>",
    ],
};

pub const FEED_ITEM_LINK: FieldSpec = FieldSpec {
    name: "link",
    patterns: &[r"<link>(?s)(.*?)</link>"],
};

pub const FEED_ITEM_DESCRIPTION: FieldSpec = FieldSpec {
    name: "description",
    patterns: &[
        r"<description><!\[CDATA\[(?s)(.*?)\]\]></description>",
        r"<description>(?s)(.*?)</description>",
    ],
};

pub const FEED_ITEM_DATE: FieldSpec = FieldSpec {
    name: "date",
    patterns: &[r"<pubDate>(?s)(.*?)</pubDate>"],
};

pub const FEED_ITEM_AUTHOR: FieldSpec = FieldSpec {
    name: "author",
    patterns: &[
        r"<dc:creator><!\[CDATA\[(?s)(.*?)\]\]></dc:creator>",
        r"<dc:creator>(?s)(.*?)</dc:creator>",
        r"<author>(?s)(.*?)</author>",
    ],
};

/// Extract one field from a document, trying each pattern in order.
///
/// Returns an empty string when no pattern matches; callers assemble text
/// renderings that tolerate every field being empty.
pub fn extract_field(document: &str, spec: &FieldSpec) -> String {
    for pattern in spec.patterns {
        let re = Regex::new(pattern).unwrap();
        if let Some(value) = re
            .captures(document)
            .and_then(|caps| caps.get(1))
            .map(|m| strip_tags(m.as_str()))
        {
            if !value.is_empty() {
                return value;
            }
        }
    }
    String::new()
}

/// Extract every occurrence of a field, using the first pattern that matches at all.
pub fn extract_all(document: &str, spec: &FieldSpec) -> Vec<String> {
    for pattern in spec.patterns {
        let re = Regex::new(pattern).unwrap();
        let values: Vec<String> = re
            .captures_iter(document)
            .filter_map(|caps| caps.get(1))
            .map(|m| strip_tags(m.as_str()))
            .filter(|value| !value.is_empty())
            .collect();
        if !values.is_empty() {
            return values;
        }
    }
    Vec::new()
}

/// Extract the changed-file list from a changeset page.
///
/// Decorative entries ("modified", "added", and friends, or anything carrying
/// a parenthesized annotation) are dropped, and the list is capped at
/// [`MAX_FILE_ENTRIES`] in page order.
pub fn extract_files(document: &str) -> Vec<String> {
    extract_all(document, &CHANGESET_FILES)
        .into_iter()
        .filter(|entry| !is_file_annotation(entry))
        .take(MAX_FILE_ENTRIES)
        .collect()
}

fn is_file_annotation(entry: &str) -> bool {
    let lowered = entry.trim().to_lowercase();
    matches!(
        lowered.as_str(),
        "modified" | "added" | "deleted" | "moved" | "copied"
    ) || entry.contains('(')
        || entry.contains(')')
}

/// Split a feed document into its individual item bodies, in feed order.
pub fn feed_items(document: &str) -> Vec<&str> {
    let re = Regex::new(r"(?s)<item>(.*?)</item>").unwrap();
    re.captures_iter(document)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Strip embedded HTML tags, decode entities, and trim the result.
pub fn strip_tags(text: &str) -> String {
    let re = Regex::new(r"<[^>]*>").unwrap();
    let stripped = re.replace_all(text, "");
    html_escape::decode_html_entities(stripped.as_ref())
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANGESET_PAGE: &str = r##"
<dl id="overview">
  <dt class="property author">Author:</dt>
  <dd class="author">alice</dd>
  <dt class="property time">Timestamp:</dt>
  <dd class="time">2024-03-01 12:00:00</dd>
  <dt class="property message">Message:</dt>
  <dd class="message searchable"><p>Fix the <em>widget</em> renderer</p></dd>
</dl>
<ul class="changes">
  <li class="change"><a href="/browser/src/widget.rs">src/widget.rs</a></li>
  <li class="add"><a href="/browser/src/widget_test.rs">src/widget_test.rs</a></li>
  <li class="change"><a href="#mod">(moved)</a></li>
</ul>
"##;

    #[test]
    fn test_extract_field_first_pattern() {
        assert_eq!(extract_field(CHANGESET_PAGE, &CHANGESET_AUTHOR), "alice");
        assert_eq!(
            extract_field(CHANGESET_PAGE, &CHANGESET_DATE),
            "2024-03-01 12:00:00"
        );
    }

    #[test]
    fn test_extract_field_strips_embedded_tags() {
        assert_eq!(
            extract_field(CHANGESET_PAGE, &CHANGESET_MESSAGE),
            "Fix the widget renderer"
        );
    }

    #[test]
    fn test_extract_field_fallback_pattern() {
        let page = r#"<td class="author">bob</td>"#;
        assert_eq!(extract_field(page, &CHANGESET_AUTHOR), "bob");
    }

    #[test]
    fn test_extract_field_no_match_is_empty() {
        assert_eq!(extract_field("<p>nothing here</p>", &CHANGESET_AUTHOR), "");
    }

    #[test]
    fn test_extract_files_filters_annotations() {
        let files = extract_files(CHANGESET_PAGE);
        assert_eq!(files, vec!["src/widget.rs", "src/widget_test.rs"]);
    }

    #[test]
    fn test_extract_files_drops_status_words() {
        let page = r##"
<li class="add"><a href="#">added</a></li>
<li class="add"><a href="#">src/new.rs</a></li>
"##;
        assert_eq!(extract_files(page), vec!["src/new.rs"]);
    }

    #[test]
    fn test_extract_files_caps_entries() {
        let mut page = String::new();
        for i in 0..30 {
            page.push_str(&format!(
                "<li class=\"change\"><a href=\"#\">src/file{i}.rs</a></li>\n"
            ));
        }
        let files = extract_files(&page);
        assert_eq!(files.len(), MAX_FILE_ENTRIES);
        assert_eq!(files[0], "src/file0.rs");
    }

    #[test]
    fn test_feed_item_cdata_preferred() {
        let item = "<title><![CDATA[Ticket #1 closed]]></title><title>plain</title>";
        assert_eq!(extract_field(item, &FEED_ITEM_TITLE), "Ticket #1 closed");
    }

    #[test]
    fn test_feed_item_plain_fallback() {
        let item = "<title>Changeset [100]</title>";
        assert_eq!(extract_field(item, &FEED_ITEM_TITLE), "Changeset [100]");
    }

    #[test]
    fn test_feed_items_split_in_order() {
        let feed = r#"
<rss><channel>
<item><title>first</title><link>http://example.org/1</link></item>
<item><title>second</title><link>http://example.org/2</link></item>
</channel></rss>
"#;
        let items = feed_items(feed);
        assert_eq!(items.len(), 2);
        assert!(items[0].contains("first"));
        assert!(items[1].contains("second"));
    }

    #[test]
    fn test_strip_tags_decodes_entities() {
        assert_eq!(
            strip_tags("<p>1 &lt; 2 &amp; &quot;quoted&quot;</p>"),
            "1 < 2 & \"quoted\""
        );
    }
}
