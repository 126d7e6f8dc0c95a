use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{dashboard, deck_detail, decks, review};
use super::{App, View};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Help bar
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_help_bar(f, app, chunks[2]);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let tab_titles = vec!["Dashboard", "Decks", "Review"];
    let selected = match app.view {
        View::Dashboard => 0,
        View::Decks | View::DeckDetail => 1,
        View::Review => 2,
    };

    let tabs = Tabs::new(tab_titles)
        .block(Block::default().borders(Borders::ALL).title(" EduForge "))
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Dashboard => dashboard::draw(f, app, area),
        View::Decks => decks::draw(f, app, area),
        View::DeckDetail => deck_detail::draw(f, app, area),
        View::Review => review::draw(f, app, area),
    }
}

fn key(k: &str) -> Span<'_> {
    Span::styled(k, Style::default().fg(Color::Cyan))
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();

    match app.view {
        View::Dashboard => {
            spans.extend(vec![
                key("h/l"),
                Span::raw(" Views  "),
                key("r"),
                Span::raw(" Review due  "),
                key("^r"),
                Span::raw(" Refresh  "),
            ]);
        }
        View::Decks => {
            spans.extend(vec![
                key("h/l"),
                Span::raw(" Views  "),
                key("j/k"),
                Span::raw(" Nav  "),
                key("g/G"),
                Span::raw(" Top/Bot  "),
                key("<CR>"),
                Span::raw(" Open  "),
                key("r"),
                Span::raw(" Review deck  "),
            ]);
        }
        View::DeckDetail => {
            spans.extend(vec![
                key("h/<Esc>"),
                Span::raw(" Back  "),
                key("j/k"),
                Span::raw(" Nav  "),
                key("r"),
                Span::raw(" Review deck  "),
                key("^r"),
                Span::raw(" Refresh  "),
            ]);
        }
        View::Review => {
            let revealed = app.review.as_ref().is_some_and(|s| s.show_back);
            let finished = app.review.as_ref().map_or(true, |s| s.is_finished());
            if finished {
                spans.extend(vec![key("<Space>"), Span::raw(" Done  ")]);
            } else if revealed {
                spans.extend(vec![
                    key("0-5"),
                    Span::raw(" Grade  "),
                    key("a/h/g/e"),
                    Span::raw(" Again/Hard/Good/Easy  "),
                ]);
            } else {
                spans.extend(vec![key("<Space>"), Span::raw(" Show answer  ")]);
            }
            spans.extend(vec![key("<Esc>"), Span::raw(" End session")]);
        }
    }

    if app.view != View::Review {
        spans.extend(vec![key("q"), Span::raw(" Quit")]);
    }

    if let Some(msg) = &app.message {
        spans.extend(vec![
            Span::raw("  |  "),
            Span::styled(msg.as_str(), Style::default().fg(Color::Yellow)),
        ]);
    }

    let help = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));

    f.render_widget(help, area);
}
