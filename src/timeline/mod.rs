// Timeline module - date separators and cards over a sorted media list
mod builder;
pub mod cards;
mod labels;
mod types;

pub use builder::TimelineBuilder;
pub use cards::{
    DateCard, DateCards, DateCardsProvider, day_clicked, month_clicked, year_clicked,
};
pub use labels::{bucket_label, date_label};
pub use types::*;

#[cfg(test)]
mod tests;
