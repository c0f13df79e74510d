mod knowledge;
mod models;
mod review;
mod stats;
mod store;
mod stream;
mod view;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use knowledge::KnowledgeManager;
use models::JsonOutput;
use stats::Aggregator;
use store::SlotStore;
use view::{KnowledgeFeed, KnowledgePointView, ReviewSession};

#[derive(Parser)]
#[command(name = "ebbinghaus")]
#[command(about = "A local-first spaced repetition CLI for question/answer knowledge points")]
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
    /// Manage knowledge points
    #[command(subcommand)]
    Point(PointCommands),

    /// Work through today's due reviews
    #[command(subcommand)]
    Review(ReviewCommands),

    /// Show store statistics
    Stats,

    /// Write a full backup of the store
    Export {
        /// Destination file (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Restore a backup, replacing all current data
    Import {
        /// Backup file produced by export
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum PointCommands {
    /// List knowledge points, newest first
    List {
        /// Page size
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Keep loading pages until the listing is exhausted
        #[arg(long)]
        all: bool,
    },

    /// Add a new knowledge point
    Add {
        /// The question side
        question: String,

        /// The answer side
        #[arg(long, short)]
        answer: String,

        /// Create without adding it to the review plan
        #[arg(long)]
        no_plan: bool,
    },

    /// Show one knowledge point
    Show {
        /// Knowledge point ID
        id: String,
    },

    /// Rewrite a knowledge point
    Edit {
        /// Knowledge point ID
        id: String,

        /// New question text
        #[arg(long, short)]
        question: String,

        /// New answer text
        #[arg(long, short)]
        answer: String,

        /// Set review plan membership (omit to keep as-is)
        #[arg(long)]
        plan: Option<bool>,
    },

    /// Delete a knowledge point and its schedules
    Delete {
        /// Knowledge point ID
        id: String,
    },
}

#[derive(Subcommand)]
enum ReviewCommands {
    /// Show the current due review
    Next {
        /// Skip past the first N due items
        #[arg(long, default_value_t = 0)]
        skip: usize,

        /// Print the answer as well
        #[arg(long)]
        reveal: bool,
    },

    /// Mark a review completed
    Done {
        /// Review schedule ID
        id: String,

        /// What you recalled, recorded with the completion
        #[arg(long, short)]
        recall: Option<String>,
    },
}

fn get_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var("EBBINGHAUS_DATA") {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ebbinghaus")
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let store = SlotStore::open(get_data_dir())?;

    if !store.has_launched() {
        if !cli.json {
            println!("Welcome to ebbinghaus. Your knowledge stays on this device.");
            println!();
        }
        store.mark_launched();
    }

    match cli.command {
        Commands::Point(point_cmd) => match point_cmd {
            PointCommands::List { limit, all } => {
                let mut feed = KnowledgeFeed::new(&store, limit);
                feed.load_more();
                if all {
                    while feed.has_more() {
                        feed.load_more();
                    }
                }

                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&feed.items))?);
                } else if feed.items.is_empty() {
                    println!("No knowledge points yet.");
                } else {
                    println!("{:<38} {:<40} PLAN", "ID", "QUESTION");
                    println!("{}", "-".repeat(84));
                    for item in &feed.items {
                        println!(
                            "{:<38} {:<40} {}",
                            item.id,
                            truncate(&item.question, 38),
                            if item.is_in_review_plan { "yes" } else { "-" }
                        );
                    }
                    if feed.has_more() {
                        println!();
                        println!("More available; rerun with --all or a larger --limit.");
                    }
                }
            }

            PointCommands::Add {
                question,
                answer,
                no_plan,
            } => {
                let manager = KnowledgeManager::new(&store);
                let point = manager.create(question.trim(), answer.trim(), !no_plan);

                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(KnowledgePointView::from(&point)))?
                    );
                } else {
                    println!("Added knowledge point {}", point.id);
                    if point.is_in_review_plan {
                        println!(
                            "Scheduled {} reviews starting tomorrow.",
                            review::REVIEW_INTERVAL_DAYS.len()
                        );
                    }
                }
            }

            PointCommands::Show { id } => {
                let id = parse_id(&id)?;
                match KnowledgeManager::new(&store).get(id) {
                    Some(point) => {
                        let view = KnowledgePointView::from(&point);
                        if cli.json {
                            println!("{}", serde_json::to_string(&JsonOutput::ok(&view))?);
                        } else {
                            println!("Question: {}", view.question);
                            println!("Answer: {}", view.answer);
                            println!("ID: {}", view.id);
                            println!("Created: {}", view.created_at);
                            println!("Updated: {}", view.updated_at);
                            println!(
                                "Review plan: {}",
                                if view.is_in_review_plan { "yes" } else { "no" }
                            );
                        }
                    }
                    None => print_not_found(cli.json, "Knowledge point not found")?,
                }
            }

            PointCommands::Edit {
                id,
                question,
                answer,
                plan,
            } => {
                let id = parse_id(&id)?;
                let manager = KnowledgeManager::new(&store);
                match manager.update(id, question.trim(), answer.trim(), plan) {
                    Ok(point) => {
                        if cli.json {
                            println!(
                                "{}",
                                serde_json::to_string(&JsonOutput::ok(KnowledgePointView::from(
                                    &point
                                )))?
                            );
                        } else {
                            println!("Updated knowledge point {}", point.id);
                        }
                    }
                    Err(store::StoreError::NotFound) => {
                        print_not_found(cli.json, "Knowledge point not found")?
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            PointCommands::Delete { id } => {
                let id = parse_id(&id)?;
                KnowledgeManager::new(&store).delete(id);

                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
                } else {
                    println!("Deleted knowledge point {} and its reviews.", id);
                }
            }
        },

        Commands::Review(review_cmd) => match review_cmd {
            ReviewCommands::Next { skip, reveal } => {
                let mut session = ReviewSession::start(&store);
                for _ in 0..skip {
                    session.skip();
                }

                match session.current() {
                    Some(card) => {
                        if cli.json {
                            println!("{}", serde_json::to_string(&JsonOutput::ok(card))?);
                        } else {
                            println!(
                                "Review {} of {} due today (pass {}/{})",
                                skip + 1,
                                session.total(),
                                card.review_number,
                                review::REVIEW_INTERVAL_DAYS.len()
                            );
                            println!();
                            println!("Q: {}", card.knowledge_point.question);
                            if reveal {
                                println!("A: {}", card.knowledge_point.answer);
                            } else {
                                println!();
                                println!("(rerun with --reveal to see the answer)");
                            }
                            println!();
                            println!("When done:");
                            println!("  ebbinghaus review done {} --recall \"...\"", card.id);
                        }
                    }
                    None => {
                        if cli.json {
                            println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
                        } else if session.total() == 0 {
                            println!("Nothing due today. Come back tomorrow.");
                        } else {
                            println!("Only {} reviews due today.", session.total());
                        }
                    }
                }
            }

            ReviewCommands::Done { id, recall } => {
                let id = parse_id(&id)?;
                let scheduler = review::ReviewScheduler::new(&store);
                if scheduler.all().iter().any(|s| s.id == id) {
                    scheduler.complete(id, recall.as_deref());
                    if cli.json {
                        println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
                    } else {
                        println!("Review completed.");
                        let (total, _) = scheduler.due_today(0);
                        if total > 0 {
                            println!("{} still due today.", total);
                        } else {
                            println!("That was the last one for today.");
                        }
                    }
                } else {
                    print_not_found(cli.json, "Review not found")?;
                }
            }
        },

        Commands::Stats => {
            let statistics = Aggregator::new(&store).statistics();
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&statistics))?);
            } else {
                println!("=== Knowledge Statistics ===");
                println!("Knowledge points: {}", statistics.total_knowledge_points);
                println!("In review plan: {}", statistics.points_in_review_plan);
                println!("Due today: {}", statistics.pending_reviews_today);
                println!("Completed today: {}", statistics.completed_reviews_today);
            }
        }

        Commands::Export { output } => {
            let payload = Aggregator::new(&store).export()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &payload)?;
                    if cli.json {
                        println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
                    } else {
                        println!("Exported to {}", path.display());
                    }
                }
                None => println!("{}", payload),
            }
        }

        Commands::Import { file } => {
            let payload = std::fs::read_to_string(&file)?;
            Aggregator::new(&store).import(&payload)?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                let statistics = Aggregator::new(&store).statistics();
                println!(
                    "Imported {} knowledge points.",
                    statistics.total_knowledge_points
                );
            }
        }
    }

    Ok(())
}

fn parse_id(raw: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw).map_err(|_| format!("Invalid id '{}'", raw))
}

fn print_not_found(json: bool, message: &str) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(&JsonOutput::<()>::err(message))?);
    } else {
        println!("{}.", message);
    }
    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}
