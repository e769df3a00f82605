// Football seasons split at July 1: a date in July or later belongs to the
// season starting that year, anything earlier to the one before.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "String")]
pub struct Season {
    start_year: i32,
}

impl Season {
    pub fn of(date: NaiveDate) -> Self {
        let start_year = if date.month() >= 7 {
            date.year()
        } else {
            date.year() - 1
        };
        Self { start_year }
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Season::of(date) == *self
    }

    /// Parse a `"YYYY/YYYY"` label.
    pub fn parse(label: &str) -> Option<Self> {
        let (a, b) = label.trim().split_once('/')?;
        let start: i32 = a.trim().parse().ok()?;
        let end: i32 = b.trim().parse().ok()?;
        (end == start + 1).then_some(Self { start_year: start })
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start_year, self.start_year + 1)
    }
}

impl From<Season> for String {
    fn from(s: Season) -> Self {
        s.to_string()
    }
}

pub fn season_label(date: NaiveDate) -> String {
    Season::of(date).to_string()
}

/// Distinct seasons present in `dates`, most recent first.
pub fn seasons_desc<I>(dates: I) -> Vec<Season>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut seasons: Vec<Season> = dates.into_iter().map(Season::of).collect();
    seasons.sort_unstable_by(|a, b| b.cmp(a));
    seasons.dedup();
    seasons
}
