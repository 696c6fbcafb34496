//! Display shaping for search result payloads.

use chrono::DateTime;
use shared::protocol::{ResultItem, SearchResults};

/// One display-ready result card; only fields actually present survive, so a
/// record with nothing set still yields a minimal card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultCard {
    pub image: Option<String>,
    pub title: Option<String>,
    pub date: Option<String>,
    pub body: Option<String>,
    pub link: Option<String>,
    pub action_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryView {
    pub name: String,
    pub cards: Vec<ResultCard>,
}

/// Projects a raw payload into displayable categories: empty categories and
/// null items disappear, the rest resolve their image, date, and link.
pub fn shape_search_results(results: &SearchResults) -> Vec<CategoryView> {
    results
        .0
        .iter()
        .filter_map(|(name, items)| {
            let cards: Vec<ResultCard> = items
                .iter()
                .flatten()
                .map(|item| shape_item(name, item))
                .collect();
            if cards.is_empty() {
                None
            } else {
                Some(CategoryView {
                    name: name.clone(),
                    cards,
                })
            }
        })
        .collect()
}

fn shape_item(category: &str, item: &ResultItem) -> ResultCard {
    ResultCard {
        image: item.resolved_image().map(str::to_string),
        title: item.title.clone(),
        date: item.resolved_timestamp().and_then(format_result_date),
        body: item.body.clone(),
        link: item.resolved_link().map(str::to_string),
        action_label: action_label(category),
    }
}

fn action_label(category: &str) -> &'static str {
    if category == "videos" {
        "View"
    } else {
        "Read more"
    }
}

/// `D Mon YYYY` with English month abbreviations; unparseable timestamps
/// render as absent.
fn format_result_date(raw: &str) -> Option<String> {
    let parsed = DateTime::parse_from_rfc3339(raw).ok()?;
    Some(parsed.format("%-d %b %Y").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(raw: &str) -> SearchResults {
        serde_json::from_str(raw).expect("payload")
    }

    #[test]
    fn drops_empty_categories_and_labels_actions() {
        let results = payload(r#"{"videos": [], "news": [{"title": "X", "url": "http://x"}]}"#);

        let view = shape_search_results(&results);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].name, "news");
        assert_eq!(view[0].cards.len(), 1);
        assert_eq!(view[0].cards[0].link.as_deref(), Some("http://x"));
        assert_eq!(view[0].cards[0].action_label, "Read more");
    }

    #[test]
    fn videos_get_the_view_label() {
        let results = payload(r#"{"videos": [{"title": "Clip", "link": "http://v"}]}"#);

        let view = shape_search_results(&results);
        assert_eq!(view[0].cards[0].action_label, "View");
        assert_eq!(view[0].cards[0].link.as_deref(), Some("http://v"));
    }

    #[test]
    fn null_items_are_removed() {
        let results = payload(r#"{"web": [null, {"title": "T"}, null]}"#);

        let view = shape_search_results(&results);
        assert_eq!(view[0].cards.len(), 1);
        assert_eq!(view[0].cards[0].title.as_deref(), Some("T"));
    }

    #[test]
    fn formats_date_without_leading_zero() {
        let results = payload(r#"{"news": [{"date": "2024-03-05T00:00:00Z"}]}"#);

        let view = shape_search_results(&results);
        assert_eq!(view[0].cards[0].date.as_deref(), Some("5 Mar 2024"));
    }

    #[test]
    fn publish_time_backfills_a_missing_date() {
        let results = payload(r#"{"videos": [{"publish_time": "2024-07-03T16:25:22+00:00"}]}"#);

        let view = shape_search_results(&results);
        assert_eq!(view[0].cards[0].date.as_deref(), Some("3 Jul 2024"));
    }

    #[test]
    fn unparseable_timestamps_render_as_absent() {
        let results = payload(r#"{"news": [{"date": "yesterday-ish"}]}"#);

        let view = shape_search_results(&results);
        assert!(view[0].cards[0].date.is_none());
    }

    #[test]
    fn first_thumbnail_backfills_a_missing_image() {
        let results = payload(
            r#"{"videos": [{"thumbnails": ["http://thumb/1", "http://thumb/2"]}]}"#,
        );

        let view = shape_search_results(&results);
        assert_eq!(view[0].cards[0].image.as_deref(), Some("http://thumb/1"));
    }

    #[test]
    fn bare_record_yields_minimal_card() {
        let results = payload(r#"{"web": [{}]}"#);

        let view = shape_search_results(&results);
        let card = &view[0].cards[0];
        assert!(card.image.is_none());
        assert!(card.title.is_none());
        assert!(card.date.is_none());
        assert!(card.body.is_none());
        assert!(card.link.is_none());
    }
}
