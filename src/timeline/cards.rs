use super::labels::bucket_label;
use super::types::{BucketKey, BucketLabel, ZoomLevel};
use crate::cache::{CacheKind, CachePaths};
use crate::media::{Handle, MediaItem};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateCard {
    /// First item of the bucket, shown as the card cover.
    pub item: MediaItem,
    pub key: BucketKey,
    pub label: BucketLabel,
    pub date: NaiveDate,
    pub item_count: usize,
    pub preview: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DateCards {
    pub days: Vec<DateCard>,
    pub months: Vec<DateCard>,
    pub years: Vec<DateCard>,
    /// Card covers without a cached preview, each listed once.
    #[serde(skip)]
    pub missing_previews: Vec<MediaItem>,
}

impl DateCards {
    pub fn cards(&self, zoom: ZoomLevel) -> &[DateCard] {
        match zoom {
            ZoomLevel::Day => &self.days,
            ZoomLevel::Month => &self.months,
            ZoomLevel::Year => &self.years,
        }
    }
}

/// Groups media into day, month and year cards.
pub struct DateCardsProvider<'a> {
    paths: &'a CachePaths,
    today: NaiveDate,
}

impl<'a> DateCardsProvider<'a> {
    pub fn new(paths: &'a CachePaths) -> Self {
        Self {
            paths,
            today: Utc::now().date_naive(),
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Extract the three card lists from items sorted newest first.
    pub fn extract(&self, items: &[MediaItem]) -> DateCards {
        let mut cards = DateCards {
            days: self.group(items, ZoomLevel::Day),
            months: self.group(items, ZoomLevel::Month),
            years: self.group(items, ZoomLevel::Year),
            missing_previews: Vec::new(),
        };

        let mut seen = HashSet::new();
        for card in cards.days.iter().chain(&cards.months).chain(&cards.years) {
            if card.preview.is_none() && seen.insert(card.item.handle) {
                cards.missing_previews.push(card.item.clone());
            }
        }

        cards
    }

    fn group(&self, items: &[MediaItem], zoom: ZoomLevel) -> Vec<DateCard> {
        let mut cards: Vec<DateCard> = Vec::new();

        for item in items {
            let date = item.modified_date();
            let key = zoom.bucket_key(date);

            if let Some(card) = cards.last_mut()
                && card.key == key
            {
                card.item_count += 1;
                continue;
            }

            cards.push(DateCard {
                item: item.clone(),
                key,
                label: bucket_label(zoom, date, self.today),
                date,
                item_count: 1,
                preview: self.paths.existing(CacheKind::Preview, item.handle),
            });
        }

        cards
    }
}

/// Returns the day card at `position` if it still shows `handle`.
pub fn day_clicked(position: usize, handle: Handle, days: &[DateCard]) -> Option<&DateCard> {
    card_at(position, handle, days)
}

/// Position of the day card to show after clicking a month card: today's
/// day of that month, else the closest day available.
pub fn month_clicked(
    position: usize,
    card: &DateCard,
    days: &[DateCard],
    months: &[DateCard],
    today: NaiveDate,
) -> Option<usize> {
    card_at(position, card.item.handle, months)?;

    closest_position(
        days,
        |day| day.date.year() == card.date.year() && day.date.month() == card.date.month(),
        |day| day.date.day(),
        today.day(),
    )
}

/// Position of the month card to show after clicking a year card: today's
/// month of that year, else the closest month available.
pub fn year_clicked(
    position: usize,
    card: &DateCard,
    months: &[DateCard],
    years: &[DateCard],
    today: NaiveDate,
) -> Option<usize> {
    card_at(position, card.item.handle, years)?;

    closest_position(
        months,
        |month| month.date.year() == card.date.year(),
        |month| month.date.month(),
        today.month(),
    )
}

fn card_at(position: usize, handle: Handle, cards: &[DateCard]) -> Option<&DateCard> {
    cards.get(position).filter(|card| card.item.handle == handle)
}

fn closest_position(
    cards: &[DateCard],
    in_range: impl Fn(&DateCard) -> bool,
    unit: impl Fn(&DateCard) -> u32,
    target: u32,
) -> Option<usize> {
    cards
        .iter()
        .enumerate()
        .filter(|(_, card)| in_range(card))
        .min_by_key(|(_, card)| unit(card).abs_diff(target))
        .map(|(position, _)| position)
}
