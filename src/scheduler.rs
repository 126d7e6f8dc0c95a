//! SM-2 spaced repetition scheduling.
//!
//! Everything here is pure: callers pass in the card or note and the
//! reference date and get a new one back. Persisting the result is up to the store.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::models::{Card, Quality, Reviewable, Schedule, MIN_EASE_FACTOR};

/// Upper bound on a scheduled interval (100 years).
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Grade recall of a card or note and return its updated scheduling state.
///
/// `quality` must be in 0..=5; anything else is rejected with
/// `Error::InvalidInput` and the item is left untouched.
pub fn grade<T: Reviewable>(item: &T, quality: i64, today: NaiveDate) -> Result<T> {
    let quality = Quality::new(quality)?;
    Ok(apply(item, quality, today))
}

/// Grade with an already validated quality.
pub fn apply<T: Reviewable>(item: &T, quality: Quality, today: NaiveDate) -> T {
    let next = next_schedule(&item.schedule(), quality, today);

    debug!(
        item_id = item.id(),
        quality = quality.value(),
        repetitions = next.repetitions,
        interval_days = next.interval_days,
        ease_factor = next.ease_factor,
        "graded item"
    );

    item.clone().with_schedule(next)
}

/// The SM-2 step on bare scheduling state.
pub fn next_schedule(current: &Schedule, quality: Quality, today: NaiveDate) -> Schedule {
    let ease_factor = next_ease_factor(current.ease_factor, quality);

    let (repetitions, interval_days) = if quality.is_pass() {
        let repetitions = current.repetitions.saturating_add(1);
        let interval = match repetitions {
            1 => 1,
            2 => 6,
            _ => scale_interval(current.interval_days, ease_factor),
        };
        (repetitions, interval)
    } else {
        (0, 1)
    };

    let due_date = today
        .checked_add_days(Days::new(interval_days as u64))
        .unwrap_or(NaiveDate::MAX);

    Schedule {
        repetitions,
        ease_factor,
        interval_days,
        due_date,
        last_reviewed: Some(today),
    }
}

/// `ef + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02))`, floored at 1.3.
pub fn next_ease_factor(ease_factor: f64, quality: Quality) -> f64 {
    let miss = f64::from(5 - quality.value());
    let ef = ease_factor + (0.1 - miss * (0.08 + miss * 0.02));
    ef.max(MIN_EASE_FACTOR)
}

fn scale_interval(previous: u32, ease_factor: f64) -> u32 {
    let scaled = (f64::from(previous) * ease_factor).round();
    if scaled >= f64::from(MAX_INTERVAL_DAYS) {
        MAX_INTERVAL_DAYS.max(previous)
    } else {
        scaled as u32
    }
}

/// Cards due on or before `as_of`, ordered by due date then id.
///
/// The input is never mutated, so calling this again with the same cards
/// yields the same sequence.
pub fn due_cards<'a, I>(cards: I, as_of: NaiveDate) -> DueCards<'a>
where
    I: IntoIterator<Item = &'a Card>,
{
    let mut due: Vec<&'a Card> = cards.into_iter().filter(|c| c.is_due(as_of)).collect();
    due.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id)));
    DueCards {
        inner: due.into_iter(),
    }
}

#[derive(Debug, Clone)]
pub struct DueCards<'a> {
    inner: std::vec::IntoIter<&'a Card>,
}

impl<'a> Iterator for DueCards<'a> {
    type Item = &'a Card;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for DueCards<'_> {}

/// What one review button would do to a card.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Projection {
    pub quality: Quality,
    pub interval_days: u32,
    pub ease_factor: f64,
    pub due_date: NaiveDate,
}

/// Outcome of each of the Again/Hard/Good/Easy buttons, without grading.
pub fn preview<T: Reviewable>(item: &T, today: NaiveDate) -> [Projection; 4] {
    let current = item.schedule();
    [Quality::AGAIN, Quality::HARD, Quality::GOOD, Quality::EASY].map(|quality| {
        let next = next_schedule(&current, quality, today);
        Projection {
            quality,
            interval_days: next.interval_days,
            ease_factor: next.ease_factor,
            due_date: next.due_date,
        }
    })
}

/// Compact interval label shown next to review buttons.
pub fn format_interval_short(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        d if d < 30 => format!("{}d", d),
        d if d < 365 => format!("{}mo", d / 30),
        d => format!("{:.1}y", f64::from(d) / 365.0),
    }
}
