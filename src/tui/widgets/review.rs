use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::models::{Card, Quality};
use crate::scheduler::{self, format_interval_short};
use crate::tui::{App, ReviewSession};

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(session) = &app.review else {
        let block = Block::default().borders(Borders::ALL).title(" Review ");
        f.render_widget(Paragraph::new("No review in progress").block(block), area);
        return;
    };

    let Some(card) = session.current() else {
        draw_finished(f, session, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40), // Front
            Constraint::Min(0),         // Back
            Constraint::Length(4),      // Grade buttons
        ])
        .split(area);

    let progress = format!(
        " {} | card {} of {} ",
        session.title,
        session.position + 1,
        session.queue.len()
    );
    let front = Paragraph::new(card.front.as_str())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(progress)
                .title_style(Style::default().fg(Color::Cyan)),
        );
    f.render_widget(front, chunks[0]);

    draw_back(f, session, card, chunks[1]);
    draw_buttons(f, session, card, app, chunks[2]);
}

fn draw_back(f: &mut Frame, session: &ReviewSession, card: &Card, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Answer ")
        .title_style(Style::default().fg(Color::Magenta));

    let text = if session.show_back {
        let mut lines = vec![Line::from(card.back.as_str())];
        if let Some(source) = &card.source {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                source.as_str(),
                Style::default().fg(Color::DarkGray),
            )));
        }
        lines
    } else {
        vec![Line::from(Span::styled(
            "Press <Space> to show the answer",
            Style::default().fg(Color::DarkGray),
        ))]
    };

    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block);
    f.render_widget(paragraph, area);
}

fn button_color(quality: Quality) -> Color {
    match quality.value() {
        0..=2 => Color::Red,
        3 => Color::Yellow,
        4 => Color::Green,
        _ => Color::Blue,
    }
}

fn draw_buttons(f: &mut Frame, session: &ReviewSession, card: &Card, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Grade ");

    if !session.show_back {
        let hint = Paragraph::new(format!("{} left in this session", session.remaining()))
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(hint, area);
        return;
    }

    let mut labels = Vec::new();
    let mut intervals = Vec::new();
    for (projection, shortcut) in scheduler::preview(card, app.today)
        .iter()
        .zip(["a", "h", "g", "e"])
    {
        let color = button_color(projection.quality);
        labels.push(Span::styled(
            format!("[{}/{}] {:<8}", shortcut, projection.quality.value(), label(projection.quality)),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        intervals.push(Span::styled(
            format!("      {:<10}", format_interval_short(projection.interval_days)),
            Style::default().fg(color),
        ));
    }

    let paragraph = Paragraph::new(vec![Line::from(labels), Line::from(intervals)])
        .alignment(Alignment::Center)
        .block(block);
    f.render_widget(paragraph, area);
}

fn label(quality: Quality) -> &'static str {
    match quality {
        Quality::AGAIN => "Again",
        Quality::HARD => "Hard",
        Quality::GOOD => "Good",
        Quality::EASY => "Easy",
        other => other.label(),
    }
}

fn draw_finished(f: &mut Frame, session: &ReviewSession, area: Rect) {
    let mut text = vec![
        Line::from(Span::styled(
            format!("Session complete: {} cards reviewed", session.queue.len()),
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    if let Some((quality, card)) = &session.last_result {
        text.push(Line::from(vec![
            Span::styled("Last card: ", Style::default().fg(Color::Gray)),
            Span::raw(format!(
                "graded {} ({}), next in {} on {}",
                quality.value(),
                quality.label(),
                format_interval_short(card.interval_days),
                card.due_date
            )),
        ]));
    }
    text.push(Line::from(""));
    text.push(Line::from(Span::styled(
        "Press <Space> to return",
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", session.title))
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(block);
    f.render_widget(paragraph, area);
}
