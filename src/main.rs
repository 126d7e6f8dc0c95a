mod config;
mod db;
mod error;
mod import;
mod models;
mod scheduler;
mod tui;

use std::path::Path;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::Config;
use db::Database;
use error::Error;
use models::{Card, JsonOutput, Note, Quality};
use scheduler::Projection;

#[derive(Parser)]
#[command(name = "eduforge")]
#[command(about = "Flashcard study CLI with SM-2 spaced repetition")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Manage decks
    #[command(subcommand)]
    Deck(DeckCommands),

    /// Manage cards
    #[command(subcommand)]
    Card(CardCommands),

    /// Manage notebooks
    #[command(subcommand)]
    Notebook(NotebookCommands),

    /// Manage and review notes
    #[command(subcommand)]
    Note(NoteCommands),

    /// Import a generated flashcard set (JSON)
    Import {
        /// Path to the generated JSON file
        file: std::path::PathBuf,

        /// Deck to import into (defaults to the set header)
        #[arg(long, short)]
        deck: Option<String>,
    },

    /// List cards due for review
    Due {
        /// Only cards in this deck
        #[arg(long, short)]
        deck: Option<i64>,

        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Grade your recall of a card
    Review {
        /// Card ID
        id: i64,

        /// Recall quality: 0-5, or again/hard/good/easy
        #[arg(long, short, allow_hyphen_values = true)]
        quality: String,
    },

    /// Show the interval each grade would schedule
    Preview {
        /// Card ID
        id: i64,
    },

    /// Show study statistics
    Stats,

    /// Launch interactive terminal UI
    Tui,
}

#[derive(Subcommand)]
enum DeckCommands {
    /// List all decks
    List,

    /// Create a deck
    Add {
        /// Deck name
        name: String,
    },

    /// Rename a deck
    Rename {
        /// Deck ID
        id: i64,

        /// New name
        name: String,
    },

    /// Delete a deck and all its cards
    Delete {
        /// Deck ID
        id: i64,
    },

    /// Reset the review schedule of every card in a deck
    Reset {
        /// Deck ID
        id: i64,
    },

    /// Show new/learning/due counts for a deck
    Stats {
        /// Deck ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum CardCommands {
    /// List cards in a deck
    List {
        /// Deck ID
        deck_id: i64,
    },

    /// Add a card to a deck
    Add {
        /// Deck ID
        deck_id: i64,

        /// Question side
        front: String,

        /// Answer side
        back: String,
    },

    /// Show card details and review history
    Show {
        /// Card ID
        id: i64,
    },

    /// Edit card text (scheduling is kept)
    Edit {
        /// Card ID
        id: i64,

        #[arg(long, short)]
        front: Option<String>,

        #[arg(long, short)]
        back: Option<String>,
    },

    /// Delete a card
    Delete {
        /// Card ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum NotebookCommands {
    /// List all notebooks
    List,

    /// Create a notebook
    Add {
        /// Notebook name
        name: String,
    },

    /// Rename a notebook
    Rename {
        /// Notebook ID
        id: i64,

        /// New name
        name: String,
    },

    /// Delete a notebook and all its notes
    Delete {
        /// Notebook ID
        id: i64,
    },

    /// Show new/learning/due counts for a notebook
    Stats {
        /// Notebook ID
        id: i64,
    },

    /// Import a generated note set (JSON)
    Import {
        /// Path to the generated JSON file
        file: std::path::PathBuf,

        /// Notebook to import into (defaults to the set header)
        #[arg(long, short)]
        name: Option<String>,
    },
}

#[derive(Subcommand)]
enum NoteCommands {
    /// List notes in a notebook
    List {
        /// Notebook ID
        notebook_id: i64,
    },

    /// Add a note to a notebook
    Add {
        /// Notebook ID
        notebook_id: i64,

        /// Note title
        title: String,

        /// Note body
        content: String,
    },

    /// Show a note and its review history
    Show {
        /// Note ID
        id: i64,
    },

    /// Edit note text (scheduling is kept)
    Edit {
        /// Note ID
        id: i64,

        #[arg(long, short)]
        title: Option<String>,

        #[arg(long, short)]
        content: Option<String>,
    },

    /// Delete a note
    Delete {
        /// Note ID
        id: i64,
    },

    /// List notes due for review
    Due {
        /// Only notes in this notebook
        #[arg(long, short)]
        notebook: Option<i64>,

        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Grade your recall of a note
    Review {
        /// Note ID
        id: i64,

        /// Recall quality: 0-5, or again/hard/good/easy
        #[arg(long, short, allow_hyphen_values = true)]
        quality: String,
    },

    /// Show the interval each grade would schedule
    Preview {
        /// Note ID
        id: i64,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(config.log_level());

    let json = cli.json;
    if let Err(e) = run(cli, &config) {
        if json {
            if let Ok(out) = serde_json::to_string(&JsonOutput::<()>::err(e.to_string())) {
                println!("{}", out);
            }
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn print_json<T: serde::Serialize>(data: T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string(&JsonOutput::ok(data))?);
    Ok(())
}

fn run(cli: Cli, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = config.db_path();
    let db = Database::open(&db_path)?;
    tracing::debug!(path = %db_path.display(), "opened database");
    execute(cli, db, &db_path)
}

fn execute(cli: Cli, db: Database, db_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Init => {
            db.init()?;
            if cli.json {
                print_json(())?;
            } else {
                println!("Database initialized at: {}", db_path.display());
            }
        }

        Commands::Deck(deck_cmd) => match deck_cmd {
            DeckCommands::List => {
                let decks = db.list_decks_with_stats(today())?;
                if cli.json {
                    print_json(&decks)?;
                } else if decks.is_empty() {
                    println!("No decks found.");
                } else {
                    println!("{:<5} {:<40} {:>5} {:>5} {:>5}", "ID", "NAME", "NEW", "LEARN", "DUE");
                    println!("{}", "-".repeat(64));
                    for d in decks {
                        println!(
                            "{:<5} {:<40} {:>5} {:>5} {:>5}",
                            d.deck.id,
                            truncate(&d.deck.name, 38),
                            d.stats.new,
                            d.stats.learning,
                            d.stats.due
                        );
                    }
                }
            }

            DeckCommands::Add { name } => {
                let id = db.add_deck(&name)?;
                if cli.json {
                    print_json(serde_json::json!({ "id": id, "name": name }))?;
                } else {
                    println!("Created deck '{}' with ID: {}", name, id);
                }
            }

            DeckCommands::Rename { id, name } => {
                if !db.rename_deck(id, &name)? {
                    return Err(Error::deck_not_found(id).into());
                }
                if cli.json {
                    print_json(())?;
                } else {
                    println!("Deck {} renamed to '{}'.", id, name);
                }
            }

            DeckCommands::Delete { id } => {
                if !db.delete_deck(id)? {
                    return Err(Error::deck_not_found(id).into());
                }
                if cli.json {
                    print_json(())?;
                } else {
                    println!("Deck {} deleted.", id);
                }
            }

            DeckCommands::Reset { id } => {
                let n = db.reset_deck(id, today())?;
                if cli.json {
                    print_json(serde_json::json!({ "reset": n }))?;
                } else {
                    println!("Reset {} card(s) in deck {}.", n, id);
                }
            }

            DeckCommands::Stats { id } => {
                let deck = db.get_deck(id)?.ok_or_else(|| Error::deck_not_found(id))?;
                let stats = db.deck_stats(id, today())?;
                if cli.json {
                    print_json(serde_json::json!({ "deck": deck, "stats": stats }))?;
                } else {
                    println!("=== {} ===", deck.name);
                    println!("New: {}", stats.new);
                    println!("Learning: {}", stats.learning);
                    println!("Due: {}", stats.due);
                    println!("Total: {}", stats.total);
                }
            }
        },

        Commands::Card(card_cmd) => match card_cmd {
            CardCommands::List { deck_id } => {
                if db.get_deck(deck_id)?.is_none() {
                    return Err(Error::deck_not_found(deck_id).into());
                }
                let cards = db.list_cards(deck_id)?;
                if cli.json {
                    print_json(&cards)?;
                } else if cards.is_empty() {
                    println!("No cards in this deck.");
                } else {
                    print_card_table(&cards);
                }
            }

            CardCommands::Add {
                deck_id,
                front,
                back,
            } => {
                let id = db.add_card(deck_id, &front, &back, None, today())?;
                if cli.json {
                    print_json(serde_json::json!({ "id": id, "deck_id": deck_id }))?;
                } else {
                    println!("Added card {} to deck {}.", id, deck_id);
                }
            }

            CardCommands::Show { id } => {
                let card = db.get_card(id)?.ok_or_else(|| Error::card_not_found(id))?;
                let history = db.review_history(id)?;
                if cli.json {
                    print_json(serde_json::json!({ "card": card, "history": history }))?;
                } else {
                    println!("Card {} (deck {})", card.id, card.deck_id);
                    println!("Front: {}", card.front);
                    println!("Back: {}", card.back);
                    if let Some(source) = &card.source {
                        println!("Source: {}", source);
                    }
                    println!();
                    println!("--- Schedule ---");
                    println!("Repetitions: {}", card.repetitions);
                    println!("Ease factor: {:.2}", card.ease_factor);
                    println!("Interval: {} day(s)", card.interval_days);
                    println!("Due: {}", card.due_date);
                    match card.last_reviewed {
                        Some(d) => println!("Last reviewed: {}", d),
                        None => println!("Last reviewed: never"),
                    }
                    if !history.is_empty() {
                        println!();
                        println!("--- History ---");
                        for r in history {
                            println!(
                                "{}  q={}  -> {}d (EF {:.2})",
                                r.reviewed_on, r.quality, r.interval_days, r.ease_factor
                            );
                        }
                    }
                }
            }

            CardCommands::Edit { id, front, back } => {
                if front.is_none() && back.is_none() {
                    let msg = "nothing to edit: pass --front and/or --back";
                    return Err(Error::InvalidInput(msg.into()).into());
                }
                if !db.update_card_text(id, front.as_deref(), back.as_deref())? {
                    return Err(Error::card_not_found(id).into());
                }
                if cli.json {
                    print_json(())?;
                } else {
                    println!("Card {} updated.", id);
                }
            }

            CardCommands::Delete { id } => {
                if !db.delete_card(id)? {
                    return Err(Error::card_not_found(id).into());
                }
                if cli.json {
                    print_json(())?;
                } else {
                    println!("Card {} deleted.", id);
                }
            }
        },

        Commands::Import { file, deck } => {
            let set = import::load_set(&file)?;
            let (deck_id, count) = db.import_set(&set, deck.as_deref(), today())?;
            if cli.json {
                print_json(serde_json::json!({ "deck_id": deck_id, "imported": count }))?;
            } else {
                println!("Imported {} card(s) into deck {}.", count, deck_id);
            }
        }

        Commands::Due { deck, date } => {
            if let Some(id) = deck {
                if db.get_deck(id)?.is_none() {
                    return Err(Error::deck_not_found(id).into());
                }
            }
            let as_of = date.unwrap_or_else(today);
            let cards = db.due_cards(deck, as_of)?;
            if cli.json {
                print_json(&cards)?;
            } else if cards.is_empty() {
                println!("Nothing due on {}.", as_of);
            } else {
                println!("{} card(s) due on {}:", cards.len(), as_of);
                print_card_table(&cards);
            }
        }

        Commands::Review { id, quality } => {
            let quality = Quality::parse(&quality)?;
            let card = db.review_card(id, i64::from(quality.value()), today())?;
            if cli.json {
                print_json(&card)?;
            } else {
                println!("Review recorded for card {} ({}).", id, quality.label());
                println!(
                    "Next review: {} (in {} day(s), EF {:.2})",
                    card.due_date, card.interval_days, card.ease_factor
                );
            }
        }

        Commands::Preview { id } => {
            let card = db.get_card(id)?.ok_or_else(|| Error::card_not_found(id))?;
            let projections = scheduler::preview(&card, today());
            if cli.json {
                print_json(projections)?;
            } else {
                println!("Card {}: {}", card.id, truncate(&card.front, 60));
                print_projections(&projections);
            }
        }

        Commands::Stats => {
            let stats = db.get_stats(today())?;
            if cli.json {
                print_json(&stats)?;
            } else {
                println!("=== Study Statistics ===");
                println!("Decks: {}", stats.total_decks);
                println!("Cards: {}", stats.total_cards);
                println!("New cards: {}", stats.new_cards);
                println!("Due today: {}", stats.due_now);
                println!("Total reviews: {}", stats.total_reviews);
                println!("Average ease factor: {:.2}", stats.avg_ease_factor);
                println!("Notebooks: {}", stats.total_notebooks);
                println!("Notes: {}", stats.total_notes);
                println!("Notes due today: {}", stats.notes_due);
            }
        }

        Commands::Notebook(notebook_cmd) => run_notebook(notebook_cmd, &db, cli.json)?,

        Commands::Note(note_cmd) => run_note(note_cmd, &db, cli.json)?,

        Commands::Tui => {
            tui::run(db)?;
        }
    }

    Ok(())
}

fn run_notebook(
    cmd: NotebookCommands,
    db: &Database,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        NotebookCommands::List => {
            let notebooks = db.list_notebooks_with_stats(today())?;
            if json {
                print_json(&notebooks)?;
            } else if notebooks.is_empty() {
                println!("No notebooks found.");
            } else {
                println!("{:<5} {:<40} {:>5} {:>5} {:>5}", "ID", "NAME", "NEW", "LEARN", "DUE");
                println!("{}", "-".repeat(64));
                for n in notebooks {
                    println!(
                        "{:<5} {:<40} {:>5} {:>5} {:>5}",
                        n.notebook.id,
                        truncate(&n.notebook.name, 38),
                        n.stats.new,
                        n.stats.learning,
                        n.stats.due
                    );
                }
            }
        }

        NotebookCommands::Add { name } => {
            let id = db.add_notebook(&name)?;
            if json {
                print_json(serde_json::json!({ "id": id, "name": name }))?;
            } else {
                println!("Created notebook '{}' with ID: {}", name, id);
            }
        }

        NotebookCommands::Rename { id, name } => {
            if !db.rename_notebook(id, &name)? {
                return Err(Error::notebook_not_found(id).into());
            }
            if json {
                print_json(())?;
            } else {
                println!("Notebook {} renamed to '{}'.", id, name);
            }
        }

        NotebookCommands::Delete { id } => {
            if !db.delete_notebook(id)? {
                return Err(Error::notebook_not_found(id).into());
            }
            if json {
                print_json(())?;
            } else {
                println!("Notebook {} deleted.", id);
            }
        }

        NotebookCommands::Stats { id } => {
            let notebook = db
                .get_notebook(id)?
                .ok_or_else(|| Error::notebook_not_found(id))?;
            let stats = db.notebook_stats(id, today())?;
            if json {
                print_json(serde_json::json!({ "notebook": notebook, "stats": stats }))?;
            } else {
                println!("=== {} ===", notebook.name);
                println!("New: {}", stats.new);
                println!("Learning: {}", stats.learning);
                println!("Due: {}", stats.due);
                println!("Total: {}", stats.total);
            }
        }

        NotebookCommands::Import { file, name } => {
            let set = import::load_notes(&file)?;
            let (notebook_id, count) = db.import_notes(&set, name.as_deref(), today())?;
            if json {
                print_json(serde_json::json!({ "notebook_id": notebook_id, "imported": count }))?;
            } else {
                println!("Imported {} note(s) into notebook {}.", count, notebook_id);
            }
        }
    }
    Ok(())
}

fn run_note(cmd: NoteCommands, db: &Database, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        NoteCommands::List { notebook_id } => {
            if db.get_notebook(notebook_id)?.is_none() {
                return Err(Error::notebook_not_found(notebook_id).into());
            }
            let notes = db.list_notes(notebook_id)?;
            if json {
                print_json(&notes)?;
            } else if notes.is_empty() {
                println!("No notes in this notebook.");
            } else {
                print_note_table(&notes);
            }
        }

        NoteCommands::Add {
            notebook_id,
            title,
            content,
        } => {
            let id = db.add_note(notebook_id, &title, &content, None, today())?;
            if json {
                print_json(serde_json::json!({ "id": id, "notebook_id": notebook_id }))?;
            } else {
                println!("Added note {} to notebook {}.", id, notebook_id);
            }
        }

        NoteCommands::Show { id } => {
            let note = db.get_note(id)?.ok_or_else(|| Error::note_not_found(id))?;
            let history = db.note_review_history(id)?;
            if json {
                print_json(serde_json::json!({ "note": note, "history": history }))?;
            } else {
                println!("# {}", note.title);
                println!();
                println!("{}", note.content);
                if let Some(source) = &note.source {
                    println!();
                    println!("Source: {}", source);
                }
                println!();
                println!("--- Schedule ---");
                println!("Repetitions: {}", note.repetitions);
                println!("Ease factor: {:.2}", note.ease_factor);
                println!("Interval: {} day(s)", note.interval_days);
                println!("Due: {}", note.due_date);
                for r in history {
                    println!(
                        "{}  q={}  -> {}d (EF {:.2})",
                        r.reviewed_on, r.quality, r.interval_days, r.ease_factor
                    );
                }
            }
        }

        NoteCommands::Edit { id, title, content } => {
            if title.is_none() && content.is_none() {
                let msg = "nothing to edit: pass --title and/or --content";
                return Err(Error::InvalidInput(msg.into()).into());
            }
            if !db.update_note(id, title.as_deref(), content.as_deref())? {
                return Err(Error::note_not_found(id).into());
            }
            if json {
                print_json(())?;
            } else {
                println!("Note {} updated.", id);
            }
        }

        NoteCommands::Delete { id } => {
            if !db.delete_note(id)? {
                return Err(Error::note_not_found(id).into());
            }
            if json {
                print_json(())?;
            } else {
                println!("Note {} deleted.", id);
            }
        }

        NoteCommands::Due { notebook, date } => {
            if let Some(id) = notebook {
                if db.get_notebook(id)?.is_none() {
                    return Err(Error::notebook_not_found(id).into());
                }
            }
            let as_of = date.unwrap_or_else(today);
            let notes = db.due_notes(notebook, as_of)?;
            if json {
                print_json(&notes)?;
            } else if notes.is_empty() {
                println!("No notes due on {}.", as_of);
            } else {
                println!("{} note(s) due on {}:", notes.len(), as_of);
                print_note_table(&notes);
            }
        }

        NoteCommands::Review { id, quality } => {
            let quality = Quality::parse(&quality)?;
            let note = db.review_note(id, i64::from(quality.value()), today())?;
            if json {
                print_json(&note)?;
            } else {
                println!("Review recorded for note {} ({}).", id, quality.label());
                println!(
                    "Next review: {} (in {} day(s), EF {:.2})",
                    note.due_date, note.interval_days, note.ease_factor
                );
            }
        }

        NoteCommands::Preview { id } => {
            let note = db.get_note(id)?.ok_or_else(|| Error::note_not_found(id))?;
            let projections = scheduler::preview(&note, today());
            if json {
                print_json(projections)?;
            } else {
                println!("Note {}: {}", note.id, truncate(&note.title, 60));
                print_projections(&projections);
            }
        }
    }
    Ok(())
}

fn print_projections(projections: &[Projection]) {
    for p in projections {
        println!(
            "  {:<6} ({}) -> {:<6} {}",
            p.quality.label(),
            p.quality.value(),
            scheduler::format_interval_short(p.interval_days),
            p.due_date
        );
    }
}

fn print_note_table(notes: &[Note]) {
    println!("{:<6} {:<40} {:>4} {:>6} {:>5} DUE", "ID", "TITLE", "REPS", "EF", "IVL");
    println!("{}", "-".repeat(76));
    for n in notes {
        println!(
            "{:<6} {:<40} {:>4} {:>6.2} {:>5} {}",
            n.id,
            truncate(&n.title, 38),
            n.repetitions,
            n.ease_factor,
            n.interval_days,
            n.due_date
        );
    }
}

fn print_card_table(cards: &[Card]) {
    println!("{:<6} {:<40} {:>4} {:>6} {:>5} DUE", "ID", "FRONT", "REPS", "EF", "IVL");
    println!("{}", "-".repeat(76));
    for c in cards {
        println!(
            "{:<6} {:<40} {:>4} {:>6.2} {:>5} {}",
            c.id,
            truncate(&c.front, 38),
            c.repetitions,
            c.ease_factor,
            c.interval_days,
            c.due_date
        );
    }
}

pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
