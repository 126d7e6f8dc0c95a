use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::{due_color, format_due};
use crate::models::DeckWithStats;
use crate::scheduler::format_interval_short;
use crate::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(dws) = &app.selected_deck else {
        let block = Block::default().borders(Borders::ALL).title(" Deck ");
        let paragraph = Paragraph::new("No deck selected").block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Counts
            Constraint::Min(0),    // Cards
            Constraint::Length(6), // Selected card
        ])
        .split(area);

    draw_header(f, dws, chunks[0]);
    draw_cards(f, app, chunks[1]);
    draw_selected(f, app, chunks[2]);
}

fn draw_header(f: &mut Frame, dws: &DeckWithStats, area: Rect) {
    let stats = &dws.stats;
    let text = vec![
        Line::from(vec![
            Span::styled("Cards: ", Style::default().fg(Color::Gray)),
            Span::styled(stats.total.to_string(), Style::default().fg(Color::White)),
            Span::raw("   "),
            Span::styled("New: ", Style::default().fg(Color::Gray)),
            Span::styled(stats.new.to_string(), Style::default().fg(Color::Blue)),
            Span::raw("   "),
            Span::styled("Learning: ", Style::default().fg(Color::Gray)),
            Span::styled(stats.learning.to_string(), Style::default().fg(Color::Green)),
            Span::raw("   "),
            Span::styled("Due: ", Style::default().fg(Color::Gray)),
            Span::styled(stats.due.to_string(), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            Span::styled("Created: ", Style::default().fg(Color::Gray)),
            Span::styled(
                dws.deck.created_at.chars().take(10).collect::<String>(),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", dws.deck.name))
        .title_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_cards(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .cards
        .items
        .iter()
        .map(|card| {
            let interval = if card.is_new() {
                "new".to_string()
            } else {
                format_interval_short(card.interval_days)
            };

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:>5} ", card.id),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{:<40}", truncate(&card.front, 38)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>5}", card.repetitions),
                    Style::default().fg(Color::Green),
                ),
                Span::styled(
                    format!("{:>6.2}", card.ease_factor),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(format!("{:>8}  ", interval), Style::default().fg(Color::White)),
                Span::styled(
                    format_due(card.due_date, app.today),
                    Style::default().fg(due_color(card.due_date, app.today)),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Cards ")
        .title_style(Style::default().fg(Color::Yellow));

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.cards.selected);
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_selected(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Answer ")
        .title_style(Style::default().fg(Color::Magenta));

    let text = match app.cards.selected_item() {
        Some(card) => {
            let mut lines = vec![Line::from(card.back.as_str())];
            if let Some(source) = &card.source {
                lines.push(Line::from(Span::styled(
                    format!("Source: {}", source),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            lines
        }
        None => vec![Line::from(Span::styled(
            "Deck is empty",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let paragraph = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}
