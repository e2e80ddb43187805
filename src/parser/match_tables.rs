use fbref_scraping_utils::selector;
use log::{debug, warn};
use scraper::Selector;
use strum::IntoEnumIterator;

use crate::{
    parser::html_table::read_table,
    query::DocumentQuery,
    schema::{CellValue, Extracted, MatchTables, Missing, TableCategory, Team, TEAM_COLUMN},
};

pub fn table_selector(category: TableCategory) -> &'static Selector {
    use TableCategory::*;
    match category {
        Summary => selector!(r#"table[id^="stats"][id$="summary"]"#),
        Passing => selector!(r#"table[id^="stats"][id$="passing"]"#),
        PassingTypes => selector!(r#"table[id^="stats"][id$="passing_types"]"#),
        Defense => selector!(r#"table[id^="stats"][id$="defense"]"#),
        Keeper => selector!(r#"table[id^="keeper_stats"]"#),
        Possession => selector!(r#"table[id^="stats"][id$="possession"]"#),
        Misc => selector!(r#"table[id^="stats"][id$="misc"]"#),
        Shots => selector!("table#shots_all"),
    }
}

/// Reads every category table of a match page into rows tagged with a team.
///
/// The page lists one table per team and category, home team first, so the
/// first match is tagged `Home` and any later one `Away`.  This is purely
/// positional; table contents are not consulted.
///
/// Rows are appended to the category, so the result of one call must not be
/// fed back into another.
pub fn extract_tables<D: DocumentQuery + ?Sized>(html: &D) -> Extracted<MatchTables> {
    let mut tables = MatchTables::default();
    let mut missing = vec![];
    for category in TableCategory::iter() {
        let found = html.select_all(table_selector(category));
        if found.is_empty() {
            warn!("{}", Missing::Table(category));
            missing.push(Missing::Table(category));
            continue;
        }
        for (idx, table) in found.into_iter().enumerate() {
            let team = Team::from_position(idx);
            let records = read_table(table).into_records();
            debug!(
                "Table {:?} ({category}, {team}): {} rows",
                table.attr("id").unwrap_or_default(),
                records.len()
            );
            tables.extend(
                category,
                records.into_iter().map(|mut row| {
                    row.insert(TEAM_COLUMN.to_owned(), CellValue::from(team));
                    row
                }),
            );
        }
    }
    Extracted {
        value: tables,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use scraper::Html;
    use strum::IntoEnumIterator;

    use super::extract_tables;
    use crate::schema::{CellValue, Missing, TableCategory, TEAM_COLUMN};

    fn stats_table(id: &str, players: &[(&str, u32)]) -> String {
        let rows = players
            .iter()
            .map(|(player, goals)| format!("<tr><th>{player}</th><td>{goals}</td></tr>"))
            .join("");
        format!(
            r#"<table id="{id}">
            <thead>
              <tr class="over_header"><th></th><th>Performance</th></tr>
              <tr><th>Player</th><th>Gls</th></tr>
            </thead>
            <tbody>{rows}</tbody>
            </table>"#
        )
    }

    #[test]
    fn test_home_and_away_summary() {
        let html = Html::parse_document(&format!(
            "{}{}",
            stats_table("stats_53a2f082_summary", &[("Vinicius Júnior", 1), ("Rodrygo", 1)]),
            stats_table("stats_206d90db_summary", &[("Lamine Yamal", 1)]),
        ));
        let extracted = extract_tables(&html);
        let summary = extracted.value.get(TableCategory::Summary).unwrap();
        assert_eq!(summary.len(), 3);
        assert_eq!(
            summary
                .iter()
                .map(|row| row[TEAM_COLUMN].clone())
                .collect_vec(),
            [
                CellValue::Text("Home".to_owned()),
                CellValue::Text("Home".to_owned()),
                CellValue::Text("Away".to_owned()),
            ]
        );
        assert_eq!(
            summary[2].keys().collect_vec(),
            ["Player", "Performance Gls", "Team"]
        );
        assert_eq!(summary[2]["Performance Gls"], CellValue::Integer(1));
        // Only the summary category was on the page.
        assert_eq!(extracted.missing.len(), 7);
        assert!(extracted.value.get(TableCategory::Keeper).is_none());
    }

    #[test]
    fn test_lookup_rules() {
        let html = Html::parse_document(&format!(
            "{}{}{}{}{}",
            stats_table("stats_aaa_passing", &[("A", 0)]),
            stats_table("stats_aaa_passing_types", &[("B", 0)]),
            stats_table("keeper_stats_aaa", &[("C", 0)]),
            stats_table("shots_all", &[("D", 0)]),
            stats_table("shots_aaa", &[("E", 0)]),
        ));
        let tables = extract_tables(&html).value;
        let players = |category| {
            tables
                .get(category)
                .unwrap_or_default()
                .iter()
                .map(|row| row["Player"].clone())
                .collect_vec()
        };
        let text = |s: &str| vec![CellValue::Text(s.to_owned())];
        assert_eq!(players(TableCategory::Passing), text("A"));
        assert_eq!(players(TableCategory::PassingTypes), text("B"));
        assert_eq!(players(TableCategory::Keeper), text("C"));
        assert_eq!(players(TableCategory::Shots), text("D"));
        assert_eq!(
            tables.iter().map(|(category, _)| category).collect_vec(),
            [
                TableCategory::Passing,
                TableCategory::PassingTypes,
                TableCategory::Keeper,
                TableCategory::Shots
            ]
        );
    }

    #[test]
    fn test_missing_keeper_table() {
        let html = Html::parse_document(&stats_table("stats_aaa_summary", &[("A", 0)]));
        let extracted = extract_tables(&html);
        assert!(extracted.missing.contains(&Missing::Table(TableCategory::Keeper)));
        assert!(extracted.value.get(TableCategory::Keeper).is_none());
        assert!(serde_json::to_value(&extracted.value)
            .unwrap()
            .get("keeper")
            .is_none());
    }

    #[test]
    fn test_nothing_found() {
        let extracted = extract_tables(&Html::parse_document("<p>Not a match page</p>"));
        assert!(extracted.value.is_empty());
        assert_eq!(
            extracted.missing,
            TableCategory::iter().map(Missing::Table).collect_vec()
        );
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let html = Html::parse_document(&format!(
            "{}{}",
            stats_table("stats_x_misc", &[("A", 2)]),
            stats_table("stats_y_misc", &[("B", 3)]),
        ));
        assert_eq!(extract_tables(&html), extract_tables(&html));
    }
}
