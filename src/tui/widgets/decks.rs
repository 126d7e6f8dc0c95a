use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .decks
        .items
        .iter()
        .map(|d| {
            let due_style = if d.stats.due > 0 {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<30}", truncate(&d.deck.name, 28)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>6}", d.stats.total),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>6}", d.stats.new),
                    Style::default().fg(Color::Blue),
                ),
                Span::styled(
                    format!("{:>8}", d.stats.learning),
                    Style::default().fg(Color::Green),
                ),
                Span::styled(format!("{:>6}", d.stats.due), due_style),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Decks ")
        .title_style(Style::default().fg(Color::Cyan));

    if items.is_empty() {
        let paragraph = Paragraph::new("No decks yet. Add one with `eduforge deck add <name>`.")
            .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let header_style = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::BOLD);
    let header = Line::from(vec![
        Span::styled(format!("  {:<30}", "Name"), header_style),
        Span::styled(format!("{:>6}", "Cards"), header_style),
        Span::styled(format!("{:>6}", "New"), header_style),
        Span::styled(format!("{:>8}", "Learning"), header_style),
        Span::styled(format!("{:>6}", "Due"), header_style),
    ]);

    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    f.render_widget(Paragraph::new(header), rows[0]);

    let list = List::new(items)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.decks.selected);
    f.render_stateful_widget(list, rows[1], &mut state);
}
