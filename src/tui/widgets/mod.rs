pub mod dashboard;
pub mod deck_detail;
pub mod decks;
pub mod review;

use chrono::NaiveDate;
use ratatui::style::Color;

fn due_color(due: NaiveDate, today: NaiveDate) -> Color {
    if due < today {
        Color::Red
    } else if due == today {
        Color::Yellow
    } else {
        Color::White
    }
}

fn format_due(due: NaiveDate, today: NaiveDate) -> String {
    let days = (due - today).num_days();
    match days {
        0 => "today".to_string(),
        d if d < 0 => format!("{} !", due.format("%b %d")),
        _ => due.format("%b %d").to_string(),
    }
}
