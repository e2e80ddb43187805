use fbref_scraping_utils::selector;

use crate::{
    query::{inner_text, DocumentQuery},
    schema::MatchUrl,
};

pub const MATCH_REPORT_TEXT: &str = "Match Report";

/// Match-report links of a schedule page, in page order.
///
/// Duplicates are kept.
pub fn parse_match_report_urls<D: DocumentQuery + ?Sized>(html: &D) -> Vec<MatchUrl> {
    html.select_all(selector!(
        r#"table[id^="sched_"] td[data-stat="match_report"] a[href]"#
    ))
    .into_iter()
    .filter(|a| inner_text(*a).trim() == MATCH_REPORT_TEXT)
    .filter_map(|a| a.attr("href").map(MatchUrl::from_href))
    .collect()
}
