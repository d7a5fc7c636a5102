//! Interactive shell.
//!
//! A render task subscribed to the store reprints the collection on every
//! change; the input loop only turns lines into intents.

use crate::render::render;
use bookshelf_protocol::{BookId, ValidationError};
use bookshelf_sync::{CollectionStore, RemoteCollectionClient, Snapshot, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;

const HELP: &str = "\
commands:
  add <title>        add a book
  edit <id> <title>  rename a book
  rm <id>            remove a book
  list               print the collection
  help               show this help
  quit               leave the shell";

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// `add <title>`
    Add(String),
    /// `edit <id> <title>`
    Edit(BookId, String),
    /// `rm <id>`
    Remove(BookId),
    /// `list`
    List,
    /// `help`
    Help,
    /// `quit`
    Quit,
}

/// A line the shell could not understand.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Known command, wrong arguments.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// Unknown command word.
    #[error("unknown command {0:?}, try `help`")]
    Unknown(String),

    /// The id argument was blank.
    #[error(transparent)]
    Id(#[from] ValidationError),
}

/// Parses one input line. Blank lines parse to `None`.
///
/// Titles are passed through untrimmed; the store decides whether they
/// are acceptable.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, ParseError> {
    let line = line.trim_start();
    if line.trim().is_empty() {
        return Ok(None);
    }
    let (word, rest) = split_word(line);

    let command = match word {
        "add" | "a" => ShellCommand::Add(rest.to_string()),
        "edit" | "e" => {
            let (id, title) = split_word(rest);
            if id.is_empty() {
                return Err(ParseError::Usage("edit <id> <title>"));
            }
            ShellCommand::Edit(id.parse()?, title.to_string())
        }
        "rm" | "remove" => {
            let (id, extra) = split_word(rest);
            if id.is_empty() || !extra.trim().is_empty() {
                return Err(ParseError::Usage("rm <id>"));
            }
            ShellCommand::Remove(id.parse()?)
        }
        "list" | "ls" => ShellCommand::List,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    }
}

/// Runs one command against the store and returns the text to print.
///
/// Changes to the collection are printed by the render task, so a
/// successful intent prints nothing here.
pub async fn execute<C: RemoteCollectionClient>(
    store: &CollectionStore<C>,
    command: ShellCommand,
) -> Option<String> {
    match command {
        ShellCommand::Add(title) => match store.create(&title).await {
            // A blank title is dropped without a word, like an empty submit.
            Ok(_) | Err(StoreError::Validation(_)) => None,
            Err(e) => Some(format!("could not add {:?}: {}", title.trim(), e)),
        },
        ShellCommand::Edit(id, title) => match store.update(&id, &title).await {
            Ok(outcome) if outcome.is_applied() => None,
            Ok(_) => Some(format!(
                "[{}] was renamed on the server but is not listed here",
                id
            )),
            Err(StoreError::Validation(e)) => Some(e.to_string()),
            Err(e) => Some(format!(
                "could not rename [{}] to {:?}: {}",
                id,
                title.trim(),
                e
            )),
        },
        ShellCommand::Remove(id) => match store.remove(&id).await {
            Ok(outcome) if outcome.is_applied() => None,
            Ok(_) => Some(format!("[{}] was already gone", id)),
            Err(e) => Some(format!("could not remove [{}]: {}", id, e)),
        },
        ShellCommand::List => Some(render(&store.books())),
        ShellCommand::Help => Some(HELP.to_string()),
        ShellCommand::Quit => None,
    }
}

/// Runs the shell over stdin until `quit` or end of input.
pub async fn run<C>(store: Arc<CollectionStore<C>>) -> std::io::Result<()>
where
    C: RemoteCollectionClient + 'static,
{
    run_with(store, tokio::io::stdin()).await
}

async fn run_with<C, R>(store: Arc<CollectionStore<C>>, input: R) -> std::io::Result<()>
where
    C: RemoteCollectionClient + 'static,
    R: AsyncRead + Unpin,
{
    let renderer = Renderer::spawn(store.subscribe(), |frame| println!("{frame}"));

    if let Err(e) = store.initialize().await {
        eprintln!("could not load books: {e}");
    }
    println!("type `help` for commands");

    let mut lines = BufReader::new(input).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        debug!(?command, "shell command");
        if command == ShellCommand::Quit {
            break;
        }
        if let Some(message) = execute(&store, command).await {
            println!("{message}");
        }
    }

    renderer.finish().await;
    Ok(())
}

/// Background task that renders every new snapshot.
struct Renderer {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Renderer {
    fn spawn<F>(mut rx: watch::Receiver<Snapshot>, mut show: F) -> Self
    where
        F: FnMut(String) + Send + 'static,
    {
        let (stop, mut stopped) = oneshot::channel();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = &mut stopped => {
                        // A change that landed before the stop is still shown.
                        if rx.has_changed().unwrap_or(false) {
                            let books = rx.borrow_and_update().clone();
                            show(render(&books));
                        }
                        break;
                    }
                }
                let books = rx.borrow_and_update().clone();
                show(render(&books));
            }
        });
        Self { stop, task }
    }

    /// Stops the task once the latest snapshot has been shown.
    async fn finish(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            debug!(error = %e, "renderer did not finish cleanly");
        }
    }
}
