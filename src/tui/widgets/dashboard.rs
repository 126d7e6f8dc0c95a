use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use super::{due_color, format_due};
use crate::scheduler::format_interval_short;
use crate::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(10), // Stats + deck summary
            Constraint::Min(0),    // Due cards
        ])
        .split(area);

    let top_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    draw_stats(f, app, top_chunks[0]);
    draw_deck_summary(f, app, top_chunks[1]);
    draw_due_cards(f, app, chunks[1]);
}

fn stat_line(label: &str, value: String, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", label), Style::default().fg(Color::Gray)),
        Span::styled(value, Style::default().fg(color)),
    ])
}

fn draw_stats(f: &mut Frame, app: &App, area: Rect) {
    let stats = &app.stats;

    let text = vec![
        Line::from(vec![
            Span::styled("Cards: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", stats.total_cards),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        stat_line("Decks", stats.total_decks.to_string(), Color::White),
        stat_line("Reviews", stats.total_reviews.to_string(), Color::White),
        stat_line("New", stats.new_cards.to_string(), Color::Blue),
        stat_line(
            "Due",
            stats.due_now.to_string(),
            if stats.due_now > 0 {
                Color::Yellow
            } else {
                Color::White
            },
        ),
        stat_line("Avg Ease", format!("{:.2}", stats.avg_ease_factor), Color::Cyan),
        stat_line(
            "Notes",
            format!("{} ({} due)", stats.total_notes, stats.notes_due),
            Color::White,
        ),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Stats ")
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(text).block(block);
    f.render_widget(paragraph, area);
}

fn draw_deck_summary(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .decks
        .items
        .iter()
        .filter(|d| d.stats.due + d.stats.new > 0)
        .map(|d| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<22}", truncate(&d.deck.name, 20)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>4} new ", d.stats.new),
                    Style::default().fg(Color::Blue),
                ),
                Span::styled(
                    format!("{:>4} due", d.stats.due),
                    Style::default().fg(Color::Yellow),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Decks To Study ")
        .title_style(Style::default().fg(Color::Magenta));

    let list = List::new(items).block(block);
    f.render_widget(list, area);
}

fn draw_due_cards(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .due_cards
        .iter()
        .enumerate()
        .map(|(i, card)| {
            let interval = if card.is_new() {
                "new".to_string()
            } else {
                format_interval_short(card.interval_days)
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!("{:>2}. ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format!("{:<42}", truncate(&card.front, 40)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:<10}", format_due(card.due_date, app.today)),
                    Style::default().fg(due_color(card.due_date, app.today)),
                ),
                Span::styled(interval, Style::default().fg(Color::Cyan)),
            ]))
        })
        .collect();

    let title = if app.stats.due_now as usize > app.due_cards.len() {
        format!(" Due Cards ({} of {}) ", app.due_cards.len(), app.stats.due_now)
    } else {
        " Due Cards ".to_string()
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Yellow));

    if items.is_empty() {
        let paragraph = Paragraph::new("Nothing due. Come back tomorrow.")
            .style(Style::default().fg(Color::Green))
            .block(block);
        f.render_widget(paragraph, area);
    } else {
        f.render_widget(List::new(items).block(block), area);
    }
}
