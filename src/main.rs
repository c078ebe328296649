use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use eventfolio::catalog::{export, RatingSummary};
use eventfolio::{App, Config, Item};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable overriding `logging.level`.
const LOG_ENV: &str = "EVENTFOLIO_LOG";

#[derive(Parser, Debug)]
#[command(name = "eventfolio", version, about = "Local event catalog with accounts and reviews")]
struct Cli {
    /// Path to the config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override storage.data_dir
    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in
    Login {
        #[arg(long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Browse and manage catalog items
    Items {
        #[command(subcommand)]
        action: ItemsCommand,
    },
    /// Write and read reviews
    Reviews {
        #[command(subcommand)]
        action: ReviewsCommand,
    },
    /// Export the catalog as CSV
    Export {
        what: ExportKind,
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
    /// Print shell completions
    Completions { shell: clap_complete::Shell },
}

#[derive(Subcommand, Debug)]
enum ItemsCommand {
    /// List items, most recent first
    List,
    /// Show one item with its reviews
    Show { id: String },
    /// Add an item (admin)
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        description: String,
    },
    /// Remove an item and its reviews (admin)
    Remove { id: String },
    /// Restore the starter catalog (admin)
    Reset,
}

#[derive(Subcommand, Debug)]
enum ReviewsCommand {
    /// Review an item
    Submit {
        item_id: String,
        #[arg(long, allow_negative_numbers = true)]
        rating: i64,
        #[arg(long)]
        comment: String,
    },
    /// List your reviews, newest first
    Mine,
    /// Rating summary for an item
    Summary { item_id: String },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ExportKind {
    Items,
    Reviews,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the JSON Schema of the config file
    Schema,
    /// Print the effective configuration
    Show,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = Some(dir);
    }
    init_logging(&config);

    match cli.command {
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "eventfolio", &mut std::io::stdout());
            Ok(())
        }
        Command::Config { action } => run_config(action, &config),
        command => {
            let app = App::open(&config)?;
            run(command, &app)
        }
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_config(action: ConfigCommand, config: &Config) -> Result<()> {
    match action {
        ConfigCommand::Schema => {
            println!("{}", serde_json::to_string_pretty(&Config::json_schema())?);
        }
        ConfigCommand::Show => {
            println!("{}", toml::to_string_pretty(config)?);
            println!("# database: {}", config.db_path()?.display());
        }
    }
    Ok(())
}

fn run(command: Command, app: &App) -> Result<()> {
    match command {
        Command::Register {
            name,
            email,
            password,
        } => {
            let password = match password {
                Some(p) => p,
                None => dialoguer::Password::new()
                    .with_prompt("Password")
                    .with_confirmation("Confirm password", "Passwords do not match")
                    .interact()?,
            };
            let session = app.credentials.register(&name, &email, &password)?;
            println!("Registered {} <{}> as {}", session.display_name, session.email, session.role);
        }
        Command::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => dialoguer::Password::new().with_prompt("Password").interact()?,
            };
            let session = app.credentials.login(&email, &password)?;
            println!("Signed in as {} ({})", session.display_name, session.role);
        }
        Command::Logout => {
            app.sessions.logout()?;
            println!("Signed out");
        }
        Command::Whoami => {
            match app.sessions.current() {
                Some(s) => println!("{} <{}> [{}]", s.display_name, s.email, s.role),
                None => println!("Not signed in"),
            }
            if app.lockout.is_locked() {
                println!("Login locked for {}s", app.lockout.retry_after_secs());
            }
        }
        Command::Items { action } => run_items(action, app)?,
        Command::Reviews { action } => run_reviews(action, app)?,
        Command::Export { what, out } => {
            let items = app.items.list_items();
            let (base, body) = match what {
                ExportKind::Items => ("items", export::items_csv(&items)?),
                ExportKind::Reviews => ("reviews", export::reviews_csv(&items)?),
            };
            std::fs::create_dir_all(&out)
                .with_context(|| format!("Failed to create {}", out.display()))?;
            let path = out.join(export::export_file_name(base, chrono::Utc::now()));
            std::fs::write(&path, body)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}", path.display());
        }
        Command::Config { .. } | Command::Completions { .. } => {}
    }
    Ok(())
}

fn run_items(action: ItemsCommand, app: &App) -> Result<()> {
    match action {
        ItemsCommand::List => {
            for item in app.items.list_items() {
                print_item_line(&item);
            }
        }
        ItemsCommand::Show { id } => {
            let item = app
                .items
                .get_item(&id)
                .with_context(|| format!("No item with id {id}"))?;
            print_item_line(&item);
            println!("  {}", item.description);
            for r in &item.reviews {
                println!(
                    "  {}★ {} - {} ({})",
                    r.rating,
                    r.comment,
                    r.by_name,
                    r.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        ItemsCommand::Add {
            title,
            category,
            description,
        } => {
            let item = app.items.add_item(&title, &category, &description)?;
            println!("Added {}", item.id);
        }
        ItemsCommand::Remove { id } => {
            if app.items.remove_item(&id)? {
                println!("Removed {id}");
            } else {
                println!("No item with id {id}");
            }
        }
        ItemsCommand::Reset => {
            let items = app.items.reset_items()?;
            println!("Catalog reset to {} items", items.len());
        }
    }
    Ok(())
}

fn run_reviews(action: ReviewsCommand, app: &App) -> Result<()> {
    match action {
        ReviewsCommand::Submit {
            item_id,
            rating,
            comment,
        } => {
            let review = app.reviews.submit_review(&item_id, rating, &comment)?;
            println!("Saved review {}", review.id);
        }
        ReviewsCommand::Mine => {
            let titles: std::collections::HashMap<String, String> = app
                .items
                .list_items()
                .into_iter()
                .map(|i| (i.id, i.title))
                .collect();
            for r in app.reviews.reviews_by_current_user() {
                let title = titles.get(&r.item_id).map(String::as_str).unwrap_or("?");
                println!(
                    "{} {}★ {}: {}",
                    r.created_at.format("%Y-%m-%d %H:%M"),
                    r.rating,
                    title,
                    r.comment
                );
            }
        }
        ReviewsCommand::Summary { item_id } => {
            let summary = app.reviews.rating_summary(&item_id)?;
            print_summary(&summary);
        }
    }
    Ok(())
}

fn print_item_line(item: &Item) {
    println!(
        "{}  {} [{}]  {:.1} ({} reviews)",
        item.id,
        item.title,
        item.category,
        eventfolio::catalog::average_rating(item),
        item.reviews.len()
    );
}

fn print_summary(summary: &RatingSummary) {
    println!("count: {}", summary.count);
    println!("average: {:.2}", summary.avg);
    if let (Some(min), Some(max)) = (summary.min, summary.max) {
        println!("range: {min}-{max}");
    }
    for (stars, n) in summary.buckets.iter().enumerate().skip(1) {
        println!("{stars}★ {n}");
    }
}
