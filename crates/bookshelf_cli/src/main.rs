//! Bookshelf CLI
//!
//! Terminal client for a remote book collection.
//!
//! # Commands
//!
//! - `list` - Print the collection
//! - `show` - Print a single book
//! - `add` - Add a book
//! - `rename` - Rename a book
//! - `remove` - Remove a book
//! - `shell` - Interactive session with live re-rendering
//! - `serve` - Run the reference server

mod commands;
mod render;

use bookshelf_protocol::{BookId, ValidationError};
use bookshelf_sync::DEFAULT_BASE_URL;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Bookshelf command-line client.
#[derive(Parser)]
#[command(name = "bookshelf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the book server
    #[arg(global = true, short, long, env = "BOOKSHELF_URL", default_value = DEFAULT_BASE_URL)]
    url: String,

    /// Request timeout in seconds (transport default if unset)
    #[arg(global = true, long)]
    timeout_secs: Option<u64>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the collection
    List,

    /// Print a single book, fetched from the server
    Show {
        /// Book id
        #[arg(value_parser = parse_id)]
        id: BookId,
    },

    /// Add a book
    Add {
        /// Title of the new book
        title: String,
    },

    /// Rename a book
    Rename {
        /// Book id
        #[arg(value_parser = parse_id)]
        id: BookId,

        /// New title
        title: String,
    },

    /// Remove a book
    Remove {
        /// Book id
        #[arg(value_parser = parse_id)]
        id: BookId,
    },

    /// Interactive session; the collection is re-printed on every change
    Shell,

    /// Run the reference book server
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:3001")]
        bind: SocketAddr,

        /// JSON database file (kept in memory if unset)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

/// Trims the id and rejects a blank one.
fn parse_id(raw: &str) -> Result<BookId, ValidationError> {
    raw.parse()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let timeout = cli.timeout_secs.map(Duration::from_secs);
    let connect = || commands::connect(&cli.url, timeout);

    let output = match cli.command {
        Commands::List => commands::list::run(&connect()?).await?,
        Commands::Show { id } => commands::show::run(&connect()?, &id).await?,
        Commands::Add { title } => commands::add::run(&connect()?, &title).await?,
        Commands::Rename { id, title } => commands::rename::run(&connect()?, &id, &title).await?,
        Commands::Remove { id } => commands::remove::run(&connect()?, &id).await?,
        Commands::Shell => {
            commands::shell::run(Arc::new(connect()?)).await?;
            return Ok(());
        }
        Commands::Serve { bind, db } => {
            commands::serve::run(bind, db).await?;
            return Ok(());
        }
    };
    println!("{output}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "bookshelf",
            "rename",
            "7",
            "Dune Messiah",
            "--url",
            "http://books.test:8080",
            "--timeout-secs",
            "3",
        ])
        .unwrap();

        assert_eq!(cli.url, "http://books.test:8080");
        assert_eq!(cli.timeout_secs, Some(3));
        match cli.command {
            Commands::Rename { id, title } => {
                assert_eq!(id, BookId::from(7u64));
                assert_eq!(title, "Dune Messiah");
            }
            _ => panic!("expected rename"),
        }
    }

    #[test]
    fn blank_id_is_rejected() {
        assert!(Cli::try_parse_from(["bookshelf", "remove", " "]).is_err());
        assert!(Cli::try_parse_from(["bookshelf", "show", ""]).is_err());
        assert!(Cli::try_parse_from(["bookshelf", "rename", "  ", "Emma"]).is_err());
    }

    #[test]
    fn ids_are_trimmed() {
        let cli = Cli::try_parse_from(["bookshelf", "remove", " 12 "]).unwrap();
        match cli.command {
            Commands::Remove { id } => assert_eq!(id, BookId::from(12u64)),
            _ => panic!("expected remove"),
        }
    }

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["bookshelf", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { bind, db } => {
                assert_eq!(bind.port(), 3001);
                assert!(db.is_none());
            }
            _ => panic!("expected serve"),
        }
    }
}
