//! Date buckets for the grid headers. Derived on demand, never stored.

use crate::photo::Photo;
use chrono::{Datelike, NaiveDate, TimeZone};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Day,
    Month,
}

impl GroupBy {
    pub fn from_group_by_day(group_by_day: bool) -> Self {
        if group_by_day {
            GroupBy::Day
        } else {
            GroupBy::Month
        }
    }

    fn bucket(self, date: NaiveDate) -> NaiveDate {
        match self {
            GroupBy::Day => date,
            GroupBy::Month => date.with_day(1).unwrap_or(date),
        }
    }

    fn label(self, date: NaiveDate) -> String {
        match self {
            GroupBy::Day => date.format("%-d %B %Y").to_string(),
            GroupBy::Month => date.format("%B %Y").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Header text, e.g. `March 2024` or `7 March 2024`.
    pub key: String,
    /// Day or first day of the month the group represents.
    pub date: NaiveDate,
    /// Newest first.
    pub photos: Vec<Photo>,
}

impl Group {
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.photos.iter().map(|p| p.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}

/// Bucket `photos` by calendar day or month in `tz`, newest group first.
pub fn group_photos<Tz: TimeZone>(photos: &[Photo], by: GroupBy, tz: &Tz) -> Vec<Group> {
    let mut buckets: BTreeMap<NaiveDate, Vec<Photo>> = BTreeMap::new();
    for photo in photos {
        let local = photo.creation_time.with_timezone(tz).date_naive();
        buckets.entry(by.bucket(local)).or_default().push(photo.clone());
    }

    buckets
        .into_iter()
        .rev()
        .map(|(date, mut photos)| {
            photos.sort_by(|a, b| {
                b.creation_time
                    .cmp(&a.creation_time)
                    .then_with(|| a.id.cmp(&b.id))
            });
            Group {
                key: by.label(date),
                date,
                photos,
            }
        })
        .collect()
}
