use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ease factor given to every new card.
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// SM-2 floor for the ease factor.
pub const MIN_EASE_FACTOR: f64 = 1.3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deck {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    pub card_count: i64,
}

/// SM-2 state shared by every reviewable item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Schedule {
    pub repetitions: u32,
    pub ease_factor: f64,
    pub interval_days: u32,
    pub due_date: NaiveDate,
    pub last_reviewed: Option<NaiveDate>,
}

impl Schedule {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            repetitions: 0,
            ease_factor: INITIAL_EASE_FACTOR,
            interval_days: 0,
            due_date: today,
            last_reviewed: None,
        }
    }
}

/// Something the scheduler can grade: cards and notes.
pub trait Reviewable: Clone {
    fn id(&self) -> i64;
    fn schedule(&self) -> Schedule;
    fn with_schedule(self, schedule: Schedule) -> Self;
}

fn check_ease_factor(ease_factor: f64) -> std::result::Result<(), String> {
    if !ease_factor.is_finite() {
        return Err(format!("ease factor {} is not a finite number", ease_factor));
    }
    if ease_factor < MIN_EASE_FACTOR {
        return Err(format!(
            "ease factor {} is below the {} floor",
            ease_factor, MIN_EASE_FACTOR
        ));
    }
    Ok(())
}

// Constructed through `Card::new` or a validated database row only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub id: i64,
    pub deck_id: i64,
    pub front: String,
    pub back: String,
    /// Source excerpt the card was generated from, if any.
    pub source: Option<String>,
    pub repetitions: u32,
    pub ease_factor: f64,
    pub interval_days: u32,
    pub due_date: NaiveDate,
    pub last_reviewed: Option<NaiveDate>,
}

impl Card {
    /// A freshly created card, due immediately.
    pub fn new(
        id: i64,
        deck_id: i64,
        front: impl Into<String>,
        back: impl Into<String>,
        today: NaiveDate,
    ) -> Self {
        Self {
            id,
            deck_id,
            front: front.into(),
            back: back.into(),
            source: None,
            repetitions: 0,
            ease_factor: INITIAL_EASE_FACTOR,
            interval_days: 0,
            due_date: today,
            last_reviewed: None,
        }
    }

    /// Reject scheduling state that the scheduler must never see.
    pub fn validate(self) -> Result<Self> {
        match check_ease_factor(self.ease_factor) {
            Ok(()) => Ok(self),
            Err(reason) => Err(Error::InvalidCard { id: self.id, reason }),
        }
    }

    pub fn is_due(&self, as_of: NaiveDate) -> bool {
        self.due_date <= as_of
    }

    pub fn is_new(&self) -> bool {
        self.last_reviewed.is_none()
    }
}

impl Reviewable for Card {
    fn id(&self) -> i64 {
        self.id
    }

    fn schedule(&self) -> Schedule {
        Schedule {
            repetitions: self.repetitions,
            ease_factor: self.ease_factor,
            interval_days: self.interval_days,
            due_date: self.due_date,
            last_reviewed: self.last_reviewed,
        }
    }

    fn with_schedule(self, s: Schedule) -> Self {
        Card {
            repetitions: s.repetitions,
            ease_factor: s.ease_factor,
            interval_days: s.interval_days,
            due_date: s.due_date,
            last_reviewed: s.last_reviewed,
            ..self
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notebook {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    pub note_count: i64,
}

/// A titled study note, scheduled with the same SM-2 rules as a card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub id: i64,
    pub notebook_id: i64,
    pub title: String,
    pub content: String,
    pub source: Option<String>,
    pub repetitions: u32,
    pub ease_factor: f64,
    pub interval_days: u32,
    pub due_date: NaiveDate,
    pub last_reviewed: Option<NaiveDate>,
}

impl Note {
    pub fn new(
        id: i64,
        notebook_id: i64,
        title: impl Into<String>,
        content: impl Into<String>,
        today: NaiveDate,
    ) -> Self {
        let s = Schedule::new(today);
        Self {
            id,
            notebook_id,
            title: title.into(),
            content: content.into(),
            source: None,
            repetitions: s.repetitions,
            ease_factor: s.ease_factor,
            interval_days: s.interval_days,
            due_date: s.due_date,
            last_reviewed: s.last_reviewed,
        }
    }

    pub fn validate(self) -> Result<Self> {
        match check_ease_factor(self.ease_factor) {
            Ok(()) => Ok(self),
            Err(reason) => Err(Error::InvalidNote { id: self.id, reason }),
        }
    }

    pub fn is_due(&self, as_of: NaiveDate) -> bool {
        self.due_date <= as_of
    }

    pub fn is_new(&self) -> bool {
        self.last_reviewed.is_none()
    }
}

impl Reviewable for Note {
    fn id(&self) -> i64 {
        self.id
    }

    fn schedule(&self) -> Schedule {
        Schedule {
            repetitions: self.repetitions,
            ease_factor: self.ease_factor,
            interval_days: self.interval_days,
            due_date: self.due_date,
            last_reviewed: self.last_reviewed,
        }
    }

    fn with_schedule(self, s: Schedule) -> Self {
        Note {
            repetitions: s.repetitions,
            ease_factor: s.ease_factor,
            interval_days: s.interval_days,
            due_date: s.due_date,
            last_reviewed: s.last_reviewed,
            ..self
        }
    }
}

/// Recall quality on the SM-2 0..=5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const AGAIN: Quality = Quality(0);
    pub const HARD: Quality = Quality(3);
    pub const GOOD: Quality = Quality(4);
    pub const EASY: Quality = Quality(5);

    /// Grades below this count as a failed recall.
    pub const PASS_THRESHOLD: u8 = 3;

    pub fn new(value: i64) -> Result<Self> {
        if (0..=5).contains(&value) {
            Ok(Quality(value as u8))
        } else {
            Err(Error::InvalidInput(format!(
                "quality {} is outside 0..=5",
                value
            )))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_pass(self) -> bool {
        self.0 >= Self::PASS_THRESHOLD
    }

    /// Accepts a number or one of the review button names.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "again" | "a" => Ok(Quality::AGAIN),
            "hard" | "h" => Ok(Quality::HARD),
            "good" | "g" => Ok(Quality::GOOD),
            "easy" | "e" => Ok(Quality::EASY),
            other => match other.parse::<i64>() {
                Ok(v) => Quality::new(v),
                Err(_) => Err(Error::InvalidInput(format!(
                    "'{}' is not a grade. Use 0-5 or again/hard/good/easy",
                    s
                ))),
            },
        }
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            0 => "Blackout",
            1 => "Wrong",
            2 => "Almost",
            3 => "Hard",
            4 => "Good",
            _ => "Easy",
        }
    }
}

impl TryFrom<i64> for Quality {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Quality::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> u8 {
        q.0
    }
}

/// One grading event for a card or a note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: i64,
    pub item_id: i64,
    pub quality: u8,
    pub reviewed_on: NaiveDate,
    pub interval_days: u32,
    pub ease_factor: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckStats {
    /// Never reviewed.
    pub new: i64,
    /// Reviewed before and not yet due.
    pub learning: i64,
    /// Reviewed before and due now.
    pub due: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckWithStats {
    pub deck: Deck,
    pub stats: DeckStats,
}

/// Notebooks are counted the same way as decks.
pub type NotebookStats = DeckStats;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotebookWithStats {
    pub notebook: Notebook,
    pub stats: NotebookStats,
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
