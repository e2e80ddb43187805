use std::collections::{hash_map::Entry, HashMap};

use fbref_scraping_utils::selector;
use itertools::Itertools;
use scraper::ElementRef;

use crate::{
    query::{inner_text, DocumentQuery},
    schema::{CellValue, StatRow},
};

/// A `<table>` read into flattened column names and typed cells.
///
/// Every row has exactly `columns.len()` cells.
#[derive(Clone, PartialEq, Debug)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}
impl Table {
    pub fn into_records(self) -> Vec<StatRow> {
        let Table { columns, rows } = self;
        rows.into_iter()
            .map(|row| columns.iter().cloned().zip(row).collect())
            .collect()
    }
}

/// Reads a table the way a dataframe reader would.
///
/// * Each `thead` row is one header level; the labels of a column are joined
///   with a space, so `("Performance", "Gls")` becomes `"Performance Gls"`.
///   Empty labels (typically the unlabeled part of a group header row)
///   contribute nothing.
/// * `colspan` repeats a cell over the columns it spans.
/// * Body rows come from `tbody` followed by `tfoot`; rows repeating the
///   header and rows with no content at all are dropped.
pub fn read_table(table: ElementRef) -> Table {
    let levels = table
        .select_all(selector!("thead tr"))
        .into_iter()
        .map(|row| expand_cells(row, |cell| normalize_label(&inner_text(cell))))
        .collect_vec();
    let mut rows = table
        .select_all(selector!("tbody tr"))
        .into_iter()
        .chain(table.select_all(selector!("tfoot tr")))
        .filter(|row| !is_repeated_header(*row))
        .map(|row| expand_cells(row, |cell| CellValue::parse(&inner_text(cell))))
        .filter(|cells| !cells.iter().all(CellValue::is_null))
        .collect_vec();

    let width = levels
        .iter()
        .map(Vec::len)
        .chain(rows.iter().map(Vec::len))
        .max()
        .unwrap_or(0);
    for row in &mut rows {
        row.resize(width, CellValue::Null);
    }
    Table {
        columns: flatten_header(&levels, width),
        rows,
    }
}

fn expand_cells<T: Clone>(row: ElementRef, mut read: impl FnMut(ElementRef) -> T) -> Vec<T> {
    let mut cells = vec![];
    for cell in row.select_all(selector!("th, td")) {
        let span = cell
            .attr("colspan")
            .and_then(|span| span.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .max(1);
        let value = read(cell);
        cells.extend(std::iter::repeat(value).take(span));
    }
    cells
}

fn is_repeated_header(row: ElementRef) -> bool {
    row.value()
        .classes()
        .any(|class| class == "thead" || class == "over_header")
}

fn normalize_label(text: &str) -> String {
    text.split_whitespace().join(" ")
}

// Blank group labels are dropped, so an unlabeled over-header yields `Player`
// where a pandas-style reader would name it `Unnamed: 0_level_0 Player`.
fn flatten_header(levels: &[Vec<String>], width: usize) -> Vec<String> {
    let mut seen = HashMap::new();
    (0..width)
        .map(|i| {
            let name = if levels.is_empty() {
                i.to_string()
            } else {
                let joined = levels
                    .iter()
                    .filter_map(|level| level.get(i))
                    .filter(|label| !label.is_empty())
                    .join(" ");
                if joined.is_empty() {
                    format!("Unnamed: {i}")
                } else {
                    joined
                }
            };
            disambiguate(&mut seen, name)
        })
        .collect()
}

/// Later occurrences of an already used name get a `.1`, `.2`, ... suffix.
fn disambiguate(seen: &mut HashMap<String, usize>, name: String) -> String {
    match seen.entry(name) {
        Entry::Vacant(entry) => {
            let name = entry.key().clone();
            entry.insert(0);
            name
        }
        Entry::Occupied(mut entry) => {
            *entry.get_mut() += 1;
            format!("{}.{}", entry.key(), entry.get())
        }
    }
}
