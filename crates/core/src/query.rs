//! Classification of free-form queries into fetcher invocations

/// Default result limit when a free-form query falls through to keyword search.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// The fetcher a free-form input routes to, with its extracted identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Ticket(u64),
    Changeset(u64),
    Timeline,
    Search(String),
}

/// Classify one free-form input string.
///
/// Deterministic and total: every input maps to exactly one variant, applying
/// these rules in order:
///
/// 1. an integer, optionally prefixed with `#`, is a ticket id lookup
/// 2. an integer prefixed with `r` (case-insensitive) is a changeset lookup
/// 3. `recent`, `timeline`, or `latest` asks for the activity timeline
/// 4. anything else is a keyword search
pub fn classify(input: &str) -> Query {
    let trimmed = input.trim();

    if let Ok(id) = trimmed.strip_prefix('#').unwrap_or(trimmed).parse::<u64>() {
        return Query::Ticket(id);
    }

    let lowered = trimmed.to_lowercase();

    if let Some(rest) = lowered.strip_prefix('r') {
        if let Ok(revision) = rest.parse::<u64>() {
            return Query::Changeset(revision);
        }
    }

    if matches!(lowered.as_str(), "recent" | "timeline" | "latest") {
        return Query::Timeline;
    }

    Query::Search(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_integer_routes_to_ticket() {
        assert_eq!(classify("61234"), Query::Ticket(61234));
    }

    #[test]
    fn test_hash_prefixed_integer_routes_to_ticket() {
        assert_eq!(classify("#61234"), Query::Ticket(61234));
    }

    #[test]
    fn test_revision_prefix_routes_to_changeset() {
        assert_eq!(classify("r58504"), Query::Changeset(58504));
        assert_eq!(classify("R58504"), Query::Changeset(58504));
    }

    #[test]
    fn test_timeline_synonyms() {
        assert_eq!(classify("recent"), Query::Timeline);
        assert_eq!(classify("timeline"), Query::Timeline);
        assert_eq!(classify("LATEST"), Query::Timeline);
    }

    #[test]
    fn test_free_text_falls_through_to_search() {
        assert_eq!(
            classify("editor crash on paste"),
            Query::Search("editor crash on paste".to_string())
        );
    }

    #[test]
    fn test_revision_prefix_without_number_is_search() {
        assert_eq!(classify("rewrite"), Query::Search("rewrite".to_string()));
    }

    #[test]
    fn test_surrounding_whitespace_ignored() {
        assert_eq!(classify("  61234  "), Query::Ticket(61234));
    }

    #[test]
    fn test_classify_is_idempotent() {
        for input in ["61234", "#7", "r58504", "recent", "some words", ""] {
            assert_eq!(classify(input), classify(input));
        }
    }
}
