use super::cards::{day_clicked, month_clicked, year_clicked};
use super::*;
use crate::cache::CachePaths;
use crate::media::MediaItem;
use crate::selection::SelectionSet;
use chrono::NaiveDate;
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn timestamp(y: i32, m: u32, d: u32) -> i64 {
    date(y, m, d)
        .and_hms_opt(12, 0, 0)
        .unwrap()
        .and_utc()
        .timestamp()
}

fn item(handle: u64, name: &str, y: i32, m: u32, d: u32) -> MediaItem {
    MediaItem::new(handle, name, timestamp(y, m, d))
}

fn sample_items() -> Vec<MediaItem> {
    vec![
        item(1, "a.jpg", 2024, 3, 5),
        item(2, "b.mp4", 2024, 3, 5),
        item(3, "c.jpg", 2024, 2, 20),
        item(4, "d.jpg", 2023, 12, 1),
    ]
}

fn setup() -> (TempDir, CachePaths) {
    let temp_dir = TempDir::new().unwrap();
    let paths = CachePaths::under(temp_dir.path());
    std::fs::create_dir_all(paths.directory(crate::cache::CacheKind::Thumbnail)).unwrap();
    std::fs::create_dir_all(paths.directory(crate::cache::CacheKind::Preview)).unwrap();
    (temp_dir, paths)
}

fn separator_positions(timeline: &Timeline) -> Vec<(usize, String)> {
    timeline
        .entries
        .iter()
        .enumerate()
        .filter_map(|(position, entry)| {
            entry
                .as_separator()
                .map(|bucket| (position, bucket.label.to_string()))
        })
        .collect()
}

#[test]
fn test_month_zoom_separators() {
    let (_temp_dir, paths) = setup();
    let timeline = TimelineBuilder::new(&paths, ZoomLevel::Month)
        .with_today(date(2024, 6, 1))
        .build(&sample_items(), &SelectionSet::new());

    assert_eq!(
        separator_positions(&timeline),
        vec![
            (0, "March".to_string()),
            (3, "February".to_string()),
            (5, "December 2023".to_string()),
        ]
    );

    // Items keep their input order
    let handles: Vec<u64> = timeline.media().map(|node| node.item.handle).collect();
    assert_eq!(handles, vec![1, 2, 3, 4]);
    assert_eq!(timeline.real_count(), 4);
}

#[test]
fn test_year_and_day_zoom_separators() {
    let (_temp_dir, paths) = setup();
    let items = sample_items();
    let today = date(2024, 6, 1);

    let years = TimelineBuilder::new(&paths, ZoomLevel::Year)
        .with_today(today)
        .build(&items, &SelectionSet::new());
    assert_eq!(
        separator_positions(&years),
        vec![(0, "2024".to_string()), (4, "2023".to_string())]
    );

    let days = TimelineBuilder::new(&paths, ZoomLevel::Day)
        .with_today(today)
        .build(&items, &SelectionSet::new());
    assert_eq!(
        separator_positions(&days),
        vec![
            (0, "05 March".to_string()),
            (3, "20 February".to_string()),
            (5, "01 December 2023".to_string()),
        ]
    );
}

#[test]
fn test_same_day_of_year_in_different_years() {
    let (_temp_dir, paths) = setup();
    let items = vec![item(1, "a.jpg", 2024, 3, 1), item(2, "b.jpg", 2023, 3, 2)];

    // 2024-03-01 and 2023-03-02 share a day of year; they are still different days
    let timeline = TimelineBuilder::new(&paths, ZoomLevel::Day)
        .with_today(date(2024, 6, 1))
        .build(&items, &SelectionSet::new());
    assert_eq!(timeline.separators().count(), 2);
}

#[test]
fn test_empty_input() {
    let (_temp_dir, paths) = setup();
    for zoom in [ZoomLevel::Year, ZoomLevel::Month, ZoomLevel::Day] {
        let timeline = TimelineBuilder::new(&paths, zoom).build(&[], &SelectionSet::new());
        assert!(timeline.is_empty());
        assert_eq!(timeline.separators().count(), 0);
        assert!(timeline.missing_thumbnails.is_empty());
        assert!(timeline.missing_previews.is_empty());
    }
}

#[test]
fn test_year_label_around_rollover() {
    let (_temp_dir, paths) = setup();
    let items = vec![item(1, "a.jpg", 2025, 1, 1), item(2, "b.jpg", 2024, 12, 31)];

    let timeline = TimelineBuilder::new(&paths, ZoomLevel::Month)
        .with_today(date(2025, 1, 1))
        .build(&items, &SelectionSet::new());
    let labels: Vec<_> = timeline.separators().map(|b| b.label.clone()).collect();
    assert_eq!(labels[0].year, None);
    assert_eq!(labels[1].year.as_deref(), Some("2024"));

    let timeline = TimelineBuilder::new(&paths, ZoomLevel::Month)
        .with_today(date(2024, 12, 31))
        .build(&items, &SelectionSet::new());
    let labels: Vec<_> = timeline.separators().map(|b| b.label.clone()).collect();
    assert_eq!(labels[0].year.as_deref(), Some("2025"));
    assert_eq!(labels[1].year, None);
}

#[test]
fn test_running_indexes() {
    let (_temp_dir, paths) = setup();
    let timeline = TimelineBuilder::new(&paths, ZoomLevel::Month).build(&sample_items(), &SelectionSet::new());

    let indexes: Vec<(usize, Option<usize>)> = timeline
        .media()
        .map(|node| (node.index, node.photo_index))
        .collect();
    assert_eq!(
        indexes,
        vec![(0, Some(0)), (1, None), (2, Some(1)), (3, Some(2))]
    );
    assert_eq!(timeline.photo_count(), 3);
    assert_eq!(timeline.photo_handles(), vec![1, 3, 4]);
}

#[test]
fn test_missing_side_channel() {
    let (_temp_dir, paths) = setup();
    std::fs::write(paths.thumbnail_path(1), b"x").unwrap();
    std::fs::write(paths.preview_path(3), b"x").unwrap();

    let month = TimelineBuilder::new(&paths, ZoomLevel::Month).build(&sample_items(), &SelectionSet::new());
    let missing: Vec<u64> = month.missing_thumbnails.iter().map(|i| i.handle).collect();
    assert_eq!(missing, vec![2, 3, 4]);
    assert!(month.missing_previews.is_empty());
    assert_eq!(
        month.media().next().unwrap().image_path,
        Some(paths.thumbnail_path(1))
    );

    let day = TimelineBuilder::new(&paths, ZoomLevel::Day).build(&sample_items(), &SelectionSet::new());
    let missing: Vec<u64> = day.missing_previews.iter().map(|i| i.handle).collect();
    assert_eq!(missing, vec![1, 2, 4]);
    let node = day.media().find(|n| n.item.handle == 3).unwrap();
    assert_eq!(node.image_path, Some(paths.preview_path(3)));

    // The side channel does not change the entries
    assert_eq!(month.real_count(), day.real_count());
}

#[test]
fn test_selection_and_query() {
    let (_temp_dir, paths) = setup();
    let mut selection = SelectionSet::new();
    selection.insert(item(3, "c.jpg", 2024, 2, 20));

    let timeline = TimelineBuilder::new(&paths, ZoomLevel::Month)
        .with_query(Some("  C.JPG ".to_string()))
        .build(&sample_items(), &selection);

    assert_eq!(timeline.real_count(), 1);
    let node = timeline.media().next().unwrap();
    assert_eq!(node.item.handle, 3);
    assert_eq!(node.index, 0);
    assert!(node.selected);
    assert_eq!(node.date_label, "February 2024");
    assert_eq!(timeline.position_of(3), Some(1));
    assert_eq!(timeline.position_of(1), None);
}

#[test]
fn test_date_cards() {
    let (_temp_dir, paths) = setup();
    std::fs::write(paths.preview_path(1), b"x").unwrap();

    let cards = DateCardsProvider::new(&paths)
        .with_today(date(2024, 6, 1))
        .extract(&sample_items());

    assert_eq!(cards.days.len(), 3);
    assert_eq!(cards.days[0].item_count, 2);
    assert_eq!(cards.days[0].preview, Some(paths.preview_path(1)));
    assert_eq!(cards.months.len(), 3);
    assert_eq!(cards.years.len(), 2);
    assert_eq!(cards.years[0].item_count, 3);
    assert_eq!(cards.years[1].label.to_string(), "2023");
    assert_eq!(cards.cards(ZoomLevel::Month)[2].label.to_string(), "December 2023");

    let missing: Vec<u64> = cards.missing_previews.iter().map(|i| i.handle).collect();
    assert_eq!(missing, vec![3, 4]);
}

#[test]
fn test_card_clicks() {
    let (_temp_dir, paths) = setup();
    let items = vec![
        item(1, "a.jpg", 2024, 5, 28),
        item(2, "b.jpg", 2024, 5, 3),
        item(3, "c.jpg", 2024, 1, 9),
        item(4, "d.jpg", 2023, 11, 2),
        item(5, "e.jpg", 2023, 6, 15),
    ];
    let today = date(2024, 6, 15);
    let cards = DateCardsProvider::new(&paths).with_today(today).extract(&items);

    // 2023 has a June card, which matches today's month
    let year_2023 = &cards.years[1];
    assert_eq!(
        year_clicked(1, year_2023, &cards.months, &cards.years, today),
        Some(3)
    );

    // 2024 has no June, May is closest
    let year_2024 = &cards.years[0];
    assert_eq!(
        year_clicked(0, year_2024, &cards.months, &cards.years, today),
        Some(0)
    );

    // May 2024: the 15th is closer to the 3rd than the 28th
    let may = &cards.months[0];
    assert_eq!(
        month_clicked(0, may, &cards.days, &cards.months, today),
        Some(1)
    );

    // Stale position
    assert_eq!(
        month_clicked(1, may, &cards.days, &cards.months, today),
        None
    );

    assert_eq!(day_clicked(2, 3, &cards.days).map(|c| c.item.handle), Some(3));
    assert!(day_clicked(2, 4, &cards.days).is_none());
}
