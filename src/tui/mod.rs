mod ui;
mod widgets;

use std::io;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::warn;

use crate::db::{Database, Stats};
use crate::models::{Card, DeckWithStats, Quality};
use crate::scheduler;

const DASHBOARD_DUE_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Decks,
    DeckDetail,
    Review,
}

impl View {
    fn toggle(&self) -> Self {
        match self {
            View::Dashboard => View::Decks,
            View::Decks | View::DeckDetail => View::Dashboard,
            View::Review => View::Review,
        }
    }
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.selected = Some(match self.selected {
            Some(i) => (i + 1) % self.items.len(),
            None => 0,
        });
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.selected = Some(match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        });
    }

    fn first(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(0);
        }
    }

    fn last(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(self.items.len() - 1);
        }
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

/// Cards queued for one sitting, graded front to back.
pub struct ReviewSession {
    pub title: String,
    pub queue: Vec<Card>,
    pub position: usize,
    pub show_back: bool,
    pub last_result: Option<(Quality, Card)>,
    return_to: View,
}

impl ReviewSession {
    pub fn current(&self) -> Option<&Card> {
        self.queue.get(self.position)
    }

    pub fn remaining(&self) -> usize {
        self.queue.len().saturating_sub(self.position)
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.queue.len()
    }
}

pub struct App {
    db: Database,
    pub today: NaiveDate,
    pub view: View,
    pub decks: StatefulList<DeckWithStats>,
    pub selected_deck: Option<DeckWithStats>,
    pub cards: StatefulList<Card>,
    pub stats: Stats,
    pub due_cards: Vec<Card>,
    pub review: Option<ReviewSession>,
    pub message: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(db: Database, today: NaiveDate) -> Result<Self, Box<dyn std::error::Error>> {
        let mut app = Self {
            db,
            today,
            view: View::Dashboard,
            decks: StatefulList::with_items(Vec::new()),
            selected_deck: None,
            cards: StatefulList::with_items(Vec::new()),
            stats: Stats::default(),
            due_cards: Vec::new(),
            review: None,
            message: None,
            should_quit: false,
        };
        app.refresh_data()?;
        Ok(app)
    }

    pub fn refresh_data(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.stats = self.db.get_stats(self.today)?;
        self.decks = StatefulList::with_items(self.db.list_decks_with_stats(self.today)?);
        self.due_cards = self.db.due_cards(None, self.today)?;
        self.due_cards.truncate(DASHBOARD_DUE_LIMIT);

        if let Some(current) = &self.selected_deck {
            let id = current.deck.id;
            self.selected_deck = self.decks.items.iter().find(|d| d.deck.id == id).cloned();
            match &self.selected_deck {
                Some(_) => self.cards = StatefulList::with_items(self.db.list_cards(id)?),
                None => {
                    self.cards = StatefulList::with_items(Vec::new());
                    if self.view == View::DeckDetail {
                        self.view = View::Decks;
                    }
                }
            }
        }
        Ok(())
    }

    fn open_deck(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(dws) = self.decks.selected_item() {
            let dws = dws.clone();
            self.cards = StatefulList::with_items(self.db.list_cards(dws.deck.id)?);
            self.selected_deck = Some(dws);
            self.view = View::DeckDetail;
        }
        Ok(())
    }

    fn start_review(&mut self, deck: Option<&DeckWithStats>) -> Result<(), Box<dyn std::error::Error>> {
        let (title, queue) = match deck {
            Some(dws) => {
                let cards = self.db.list_cards(dws.deck.id)?;
                let due: Vec<Card> = scheduler::due_cards(&cards, self.today).cloned().collect();
                (dws.deck.name.clone(), due)
            }
            None => ("All decks".to_string(), self.db.due_cards(None, self.today)?),
        };

        if queue.is_empty() {
            self.message = Some(format!("Nothing due in {}", title));
            return Ok(());
        }

        self.review = Some(ReviewSession {
            title,
            queue,
            position: 0,
            show_back: false,
            last_result: None,
            return_to: self.view,
        });
        self.message = None;
        self.view = View::Review;
        Ok(())
    }

    fn end_review(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(session) = self.review.take() {
            self.view = session.return_to;
        }
        self.refresh_data()
    }

    fn grade_current(&mut self, quality: Quality) {
        let Some(session) = self.review.as_mut() else {
            return;
        };
        if !session.show_back {
            return;
        }
        let Some(card_id) = session.current().map(|c| c.id) else {
            return;
        };

        match self
            .db
            .review_card(card_id, i64::from(quality.value()), self.today)
        {
            Ok(next) => {
                session.last_result = Some((quality, next));
                session.position += 1;
                session.show_back = false;
                self.message = None;
            }
            Err(e) => {
                warn!(card_id, error = %e, "review failed");
                self.message = Some(format!("Review failed: {}", e));
            }
        }
    }

    fn handle_review_key(&mut self, key: KeyCode) -> Result<(), Box<dyn std::error::Error>> {
        let (finished, show_back) = match &self.review {
            Some(s) => (s.is_finished(), s.show_back),
            None => return Ok(()),
        };

        match key {
            KeyCode::Esc | KeyCode::Char('q') => self.end_review()?,
            KeyCode::Enter | KeyCode::Char(' ') if finished => self.end_review()?,
            KeyCode::Enter | KeyCode::Char(' ') if !show_back => {
                if let Some(s) = self.review.as_mut() {
                    s.show_back = true;
                }
            }
            KeyCode::Char(c) if show_back => {
                let quality = match c {
                    'a' => Some(Quality::AGAIN),
                    'h' => Some(Quality::HARD),
                    'g' => Some(Quality::GOOD),
                    'e' => Some(Quality::EASY),
                    d => d
                        .to_digit(10)
                        .and_then(|v| Quality::new(i64::from(v)).ok()),
                };
                if let Some(q) = quality {
                    self.grade_current(q);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_key(
        &mut self,
        key: KeyCode,
        modifiers: KeyModifiers,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if self.view == View::Review {
            return self.handle_review_key(key);
        }

        match key {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.today = Local::now().date_naive();
                self.refresh_data()?;
            }

            // Start a review session for whatever is in focus
            KeyCode::Char('r') => match self.view {
                View::Dashboard => self.start_review(None)?,
                View::Decks => {
                    let deck = self.decks.selected_item().cloned();
                    if let Some(deck) = deck {
                        self.start_review(Some(&deck))?;
                    }
                }
                View::DeckDetail => {
                    let deck = self.selected_deck.clone();
                    self.start_review(deck.as_ref())?;
                }
                View::Review => {}
            },

            KeyCode::Esc | KeyCode::Char('h') | KeyCode::Left if self.view == View::DeckDetail => {
                self.view = View::Decks;
                self.selected_deck = None;
            }

            KeyCode::Char('h') | KeyCode::Left | KeyCode::Tab | KeyCode::BackTab => {
                self.view = self.view.toggle();
            }
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => match self.view {
                View::Decks => self.open_deck()?,
                View::Dashboard if key != KeyCode::Enter => self.view = self.view.toggle(),
                _ => {}
            },

            KeyCode::Char('j') | KeyCode::Down => match self.view {
                View::Decks => self.decks.next(),
                View::DeckDetail => self.cards.next(),
                _ => {}
            },
            KeyCode::Char('k') | KeyCode::Up => match self.view {
                View::Decks => self.decks.previous(),
                View::DeckDetail => self.cards.previous(),
                _ => {}
            },
            KeyCode::Char('g') => match self.view {
                View::Decks => self.decks.first(),
                View::DeckDetail => self.cards.first(),
                _ => {}
            },
            KeyCode::Char('G') => match self.view {
                View::Decks => self.decks.last(),
                View::DeckDetail => self.cards.last(),
                _ => {}
            },

            _ => {}
        }
        Ok(())
    }
}

pub fn run(db: Database) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::new(db, Local::now().date_naive())?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code, key.modifiers)?;
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
