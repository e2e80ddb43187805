use std::fmt;

use derive_more::{AsRef, Display, From};
use fbref_scraping_utils::regex;
use indexmap::IndexMap;
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use strum::{EnumIter, IntoStaticStr};

pub const SITE_ORIGIN: &str = "https://fbref.com";

/// Absolute URL of a single match report; the key of a loaded match.
#[derive(Clone, PartialEq, Eq, Hash, Debug, From, AsRef, Display, Serialize, Deserialize)]
#[as_ref(forward)]
#[serde(transparent)]
pub struct MatchUrl(String);
impl MatchUrl {
    /// Relative hrefs (starting with `/`) are resolved against the site origin.
    pub fn from_href(href: &str) -> Self {
        if href.starts_with('/') {
            Self(format!("{SITE_ORIGIN}{href}"))
        } else {
            Self(href.to_owned())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, IntoStaticStr, Serialize, Deserialize)]
pub enum Team {
    Home,
    Away,
}
impl Team {
    /// The first table of a category on the page belongs to the home side.
    pub fn from_position(idx: usize) -> Self {
        if idx == 0 {
            Self::Home
        } else {
            Self::Away
        }
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}
impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Debug,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TableCategory {
    Summary,
    Passing,
    PassingTypes,
    Defense,
    Keeper,
    Possession,
    Misc,
    Shots,
}
impl TableCategory {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}
impl fmt::Display for TableCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A single table cell, typed the way a dataframe reader would infer it.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}
impl CellValue {
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim();
        if text.is_empty() {
            return Self::Null;
        }
        if regex!(r"^[+-]?(\d+|\d{1,3}(,\d{3})+)$").is_match(text) {
            if let Ok(value) = text.replace(',', "").parse() {
                return Self::Integer(value);
            }
        } else if regex!(r"^[+-]?(\d*|\d{1,3}(,\d{3})+)\.\d+([eE][+-]?\d+)?$").is_match(text) {
            if let Ok(value) = text.replace(',', "").parse() {
                return Self::Float(value);
            }
        }
        Self::Text(text.to_owned())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}
impl From<Team> for CellValue {
    fn from(team: Team) -> Self {
        Self::Text(team.as_str().to_owned())
    }
}

/// One row of a statistics table keyed by flattened column name,
/// plus the injected [`TEAM_COLUMN`].
pub type StatRow = IndexMap<String, CellValue>;

pub const TEAM_COLUMN: &str = "Team";

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct HomeAway<T> {
    pub home: T,
    pub away: T,
}
impl<T> HomeAway<T> {
    /// Pairs up the values only if there are exactly two of them.
    pub fn from_exactly_two(values: Vec<T>) -> Option<Self> {
        let [home, away] = <[T; 2]>::try_from(values).ok()?;
        Some(Self { home, away })
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Kickoff {
    pub date: Option<String>,
    pub hour: Option<String>,
}

/// Scalar facts of a match.  Each pair is present only when the page had
/// exactly two matching elements.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct MatchInfo {
    pub goals: Option<HomeAway<String>>,
    pub managers: Option<HomeAway<String>>,
    pub captains: Option<HomeAway<String>>,
    pub kickoff: Option<Kickoff>,
}
impl MatchInfo {
    /// Flat `(field, value)` view of the fields that are present.
    pub fn scalar_fields(&self) -> Vec<(&'static str, Option<&str>)> {
        let mut fields = vec![];
        for (home, away, pair) in [
            ("goals_home", "goals_away", &self.goals),
            ("manager_home", "manager_away", &self.managers),
            ("captain_home", "captain_away", &self.captains),
        ] {
            if let Some(pair) = pair {
                fields.push((home, Some(pair.home.as_str())));
                fields.push((away, Some(pair.away.as_str())));
            }
        }
        if let Some(kickoff) = &self.kickoff {
            fields.push(("date", kickoff.date.as_deref()));
            fields.push(("hour", kickoff.hour.as_deref()));
        }
        fields
    }
}
impl Serialize for MatchInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.scalar_fields();
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for (key, value) in fields {
            map.serialize_entry(key, &value)?;
        }
        map.end()
    }
}

/// Rows of every category table found on a match page, in category order.
/// A category is absent when no table matched it.
#[derive(Clone, PartialEq, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct MatchTables(IndexMap<TableCategory, Vec<StatRow>>);
impl MatchTables {
    pub fn extend<I: IntoIterator<Item = StatRow>>(&mut self, category: TableCategory, rows: I) {
        self.0.entry(category).or_default().extend(rows);
    }

    pub fn get(&self, category: TableCategory) -> Option<&[StatRow]> {
        self.0.get(&category).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TableCategory, &[StatRow])> {
        self.0.iter().map(|(&category, rows)| (category, rows.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything extracted from one match page, keyed by its URL.
#[derive(Clone, PartialEq, Debug)]
pub struct MatchRecord {
    pub url: MatchUrl,
    pub info: MatchInfo,
    pub tables: MatchTables,
}
impl MatchRecord {
    pub fn new(url: MatchUrl, info: MatchInfo, tables: MatchTables) -> Self {
        Self { url, info, tables }
    }
}
impl Serialize for MatchRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.info.scalar_fields();
        let mut map = serializer.serialize_map(Some(1 + fields.len() + self.tables.len()))?;
        map.serialize_entry("url", &self.url)?;
        for (key, value) in fields {
            map.serialize_entry(key, &value)?;
        }
        for (category, rows) in self.tables.iter() {
            map.serialize_entry(category.as_str(), rows)?;
        }
        map.end()
    }
}

/// Something the extractors expected on the page but did not find.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Missing {
    VenueTime,
    Table(TableCategory),
}
impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::VenueTime => write!(f, "The 'venuetime' element was not found."),
            Missing::Table(category) => write!(f, "The table '{category}' was not found."),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Extracted<T> {
    pub value: T,
    pub missing: Vec<Missing>,
}
