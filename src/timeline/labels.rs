use super::types::{BucketLabel, ZoomLevel};
use chrono::{Datelike, NaiveDate};

/// Label of a bucket whose first item was modified on `date`.
pub fn bucket_label(zoom: ZoomLevel, date: NaiveDate, today: NaiveDate) -> BucketLabel {
    let year = (date.year() != today.year()).then(|| date.format("%Y").to_string());

    match zoom {
        ZoomLevel::Year => BucketLabel {
            primary: date.format("%Y").to_string(),
            year: None,
        },
        ZoomLevel::Month => BucketLabel {
            primary: date.format("%B").to_string(),
            year,
        },
        ZoomLevel::Day => BucketLabel {
            primary: date.format("%d %B").to_string(),
            year,
        },
    }
}

/// Month and year shown on every media entry, e.g. "March 2024".
pub fn date_label(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}
