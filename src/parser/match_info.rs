use fbref_scraping_utils::selector;
use itertools::Itertools;
use log::warn;

use crate::{
    query::{inner_text, DocumentQuery},
    schema::{Extracted, HomeAway, Kickoff, MatchInfo, Missing},
};

/// Extracts scores, managers, captains and kickoff time from a match page.
///
/// Each pair is filled from the first element found as home and the second
/// as away.  Nothing on the page says which side an element belongs to; the
/// order is taken on trust from the page layout.  Pairs are left out unless
/// exactly two elements match.
pub fn extract_info<D: DocumentQuery + ?Sized>(html: &D) -> Extracted<MatchInfo> {
    let mut missing = vec![];

    let scores = html
        .select_all(selector!("div.score"))
        .into_iter()
        .map(|score| inner_text(score).trim().to_owned())
        .collect_vec();

    let datapoints = html
        .select_all(selector!("div.datapoint"))
        .into_iter()
        .map(|div| (div, inner_text(div)))
        .collect_vec();
    let managers = datapoints
        .iter()
        .filter(|(_, text)| text.contains("Manager"))
        .filter_map(|(_, text)| text.split_once(": ").map(|(_, name)| name.to_owned()))
        .collect_vec();
    let captains = datapoints
        .iter()
        .filter(|(_, text)| text.contains("Captain"))
        .filter_map(|(div, _)| div.select_first(selector!("a")))
        .map(|a| inner_text(a).replace('\u{a0}', " "))
        .collect_vec();

    let kickoff = match html.select_first(selector!("span.venuetime")) {
        Some(span) => Some(Kickoff {
            date: span.attr("data-venue-date").map(ToOwned::to_owned),
            hour: span.attr("data-venue-time").map(ToOwned::to_owned),
        }),
        None => {
            warn!("{}", Missing::VenueTime);
            missing.push(Missing::VenueTime);
            None
        }
    };

    Extracted {
        value: MatchInfo {
            goals: HomeAway::from_exactly_two(scores),
            managers: HomeAway::from_exactly_two(managers),
            captains: HomeAway::from_exactly_two(captains),
            kickoff,
        },
        missing,
    }
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::extract_info;
    use crate::schema::{HomeAway, Kickoff, MatchInfo, Missing};

    const SCOREBOX: &str = r#"
        <div class="scorebox">
          <div>
            <strong><a href="/en/squads/53a2f082/Real-Madrid-Stats">Real Madrid</a></strong>
            <div class="scores"><div class="score">2</div><div class="score_xg">1.9</div></div>
            <div class="datapoint"><strong>Manager</strong>: Carlo Ancelotti</div>
            <div class="datapoint"><strong>Captain</strong>: <a href="/en/players/x">Dani&nbsp;Carvajal</a></div>
          </div>
          <div>
            <strong><a href="/en/squads/206d90db/Barcelona-Stats">Barcelona</a></strong>
            <div class="scores"><div class="score"> 1 </div><div class="score_xg">0.8</div></div>
            <div class="datapoint"><strong>Manager</strong>: Hansi Flick</div>
            <div class="datapoint"><strong>Captain</strong>: <a href="/en/players/y">Marc-André&nbsp;ter&nbsp;Stegen</a></div>
          </div>
          <div class="scorebox_meta">
            <div><span class="venuetime" data-venue-date="2024-03-10" data-venue-time="20:00" data-venue-epoch="1710097200">20:00</span></div>
          </div>
        </div>"#;

    #[test]
    fn test_full_scorebox() {
        let html = Html::parse_document(SCOREBOX);
        let extracted = extract_info(&html);
        assert!(extracted.missing.is_empty());
        assert_eq!(
            extracted.value,
            MatchInfo {
                goals: Some(HomeAway {
                    home: "2".to_owned(),
                    away: "1".to_owned()
                }),
                managers: Some(HomeAway {
                    home: "Carlo Ancelotti".to_owned(),
                    away: "Hansi Flick".to_owned()
                }),
                captains: Some(HomeAway {
                    home: "Dani Carvajal".to_owned(),
                    away: "Marc-André ter Stegen".to_owned()
                }),
                kickoff: Some(Kickoff {
                    date: Some("2024-03-10".to_owned()),
                    hour: Some("20:00".to_owned()),
                }),
            }
        );
    }

    #[test]
    fn test_pairs_need_exactly_two_elements() {
        let html = Html::parse_document(
            r#"<div class="score">3</div>
            <div class="datapoint"><strong>Manager</strong>: Only One</div>
            <div class="datapoint"><strong>Captain</strong>: <a>A</a></div>
            <div class="datapoint"><strong>Captain</strong>: <a>B</a></div>
            <div class="datapoint"><strong>Captain</strong>: <a>C</a></div>"#,
        );
        let info = extract_info(&html).value;
        assert_eq!(info.goals, None);
        assert_eq!(info.managers, None);
        assert_eq!(info.captains, None);

        let fields = info.scalar_fields();
        assert!(fields.iter().all(|(key, _)| !key.starts_with("goals")));
    }

    #[test]
    fn test_missing_venue_time() {
        let html = Html::parse_document(
            r#"<div class="score">2</div><div class="score">1</div>"#,
        );
        let extracted = extract_info(&html);
        assert_eq!(extracted.missing, [Missing::VenueTime]);
        assert_eq!(extracted.value.kickoff, None);
        assert_eq!(
            extracted.value.scalar_fields(),
            [("goals_home", Some("2")), ("goals_away", Some("1"))]
        );
    }

    #[test]
    fn test_datapoints_without_separator_or_link_are_skipped() {
        let html = Html::parse_document(
            r#"<div class="datapoint">Manager unknown</div>
            <div class="datapoint">Manager: Home Boss</div>
            <div class="datapoint">Manager: Away Boss</div>
            <div class="datapoint">Captain: nobody</div>
            <div class="datapoint">Captain: <a>Home Captain</a></div>
            <div class="datapoint">Captain: <a>Away Captain</a></div>"#,
        );
        let info = extract_info(&html).value;
        assert_eq!(
            info.managers,
            Some(HomeAway {
                home: "Home Boss".to_owned(),
                away: "Away Boss".to_owned()
            })
        );
        assert_eq!(
            info.captains,
            Some(HomeAway {
                home: "Home Captain".to_owned(),
                away: "Away Captain".to_owned()
            })
        );
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let html = Html::parse_document(SCOREBOX);
        assert_eq!(extract_info(&html), extract_info(&html));
    }
}
