use std::{future::Future, io::BufRead, path::PathBuf, sync::Arc};

use tokio::sync::mpsc;

use solochat_core::{callbacks::HostCallbacks, errors::Error, ChatDispatcher};

pub const HELP: &str = "\
Type a message and press enter to send it. Commands:
  /location <lat> <lon>
  /document <path> [caption]
  /photo <path>      (.png, .jpg)
  /video <path>      (.mp4)
  /audio <path>      (.mp3, .m4a)
  /status
  /quit";

/// Prints inbound messages and errors to the terminal.
pub struct ConsoleHost;

impl HostCallbacks for ConsoleHost {
    fn on_received(&self, username: &str, message: &str) {
        println!("{username}: {message}");
    }

    fn on_error(&self, error: &Error) {
        eprintln!("error: {error}");
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Text(String),
    Location { latitude: f64, longitude: f64 },
    Document { path: PathBuf, caption: Option<String> },
    Photo(PathBuf),
    Video(PathBuf),
    Audio(PathBuf),
    Status,
    Help,
    Quit,
    Invalid(String),
}

/// Parse one stdin line. Blank lines yield `None`.
pub fn parse(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if !line.starts_with('/') {
        return Some(Command::Text(line.to_string()));
    }

    let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let cmd = match name {
        "/quit" | "/exit" => Command::Quit,
        "/status" => Command::Status,
        "/help" => Command::Help,
        "/location" => parse_location(rest),
        "/document" => {
            let (path, caption) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if path.is_empty() {
                Command::Invalid("usage: /document <path> [caption]".to_string())
            } else {
                let caption = caption.trim();
                Command::Document {
                    path: PathBuf::from(path),
                    caption: (!caption.is_empty()).then(|| caption.to_string()),
                }
            }
        }
        "/photo" => path_command(rest, "/photo", Command::Photo),
        "/video" => path_command(rest, "/video", Command::Video),
        "/audio" => path_command(rest, "/audio", Command::Audio),
        other => Command::Invalid(format!("unknown command: {other}")),
    };
    Some(cmd)
}

fn parse_location(rest: &str) -> Command {
    let mut parts = rest.split_whitespace();
    let lat = parts.next().and_then(|s| s.parse::<f64>().ok());
    let lon = parts.next().and_then(|s| s.parse::<f64>().ok());
    match (lat, lon, parts.next()) {
        (Some(latitude), Some(longitude), None) => Command::Location {
            latitude,
            longitude,
        },
        _ => Command::Invalid("usage: /location <lat> <lon>".to_string()),
    }
}

fn path_command(rest: &str, name: &str, make: fn(PathBuf) -> Command) -> Command {
    if rest.is_empty() {
        return Command::Invalid(format!("usage: {name} <path>"));
    }
    make(PathBuf::from(rest))
}

/// Read commands from stdin until `/quit`, EOF or Ctrl-C.
pub async fn run(dispatcher: Arc<ChatDispatcher>) -> anyhow::Result<()> {
    drive(spawn_stdin_reader(), tokio::signal::ctrl_c(), |cmd| {
        execute(&dispatcher, cmd)
    })
    .await
}

/// Feed parsed lines to `handle` until it returns false, the lines end, or
/// `interrupt` completes.
async fn drive<F>(
    mut lines: mpsc::UnboundedReceiver<String>,
    interrupt: F,
    mut handle: impl FnMut(Command) -> bool,
) -> anyhow::Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    // Polled across iterations so an interrupt between lines is not lost.
    tokio::pin!(interrupt);
    loop {
        let line = tokio::select! {
            res = &mut interrupt => {
                res?;
                break;
            }
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            break; // EOF
        };
        let Some(cmd) = parse(&line) else {
            continue;
        };
        if !handle(cmd) {
            break;
        }
    }
    Ok(())
}

/// Blocking stdin reads live on their own thread so they never hold up runtime shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Returns `false` when the console should stop.
fn execute(dispatcher: &ChatDispatcher, cmd: Command) -> bool {
    let accepted = match cmd {
        Command::Quit => return false,
        Command::Help => {
            println!("{HELP}");
            return true;
        }
        Command::Status => {
            match dispatcher.chat_id() {
                Some(chat) => println!("chat: {chat}"),
                None => println!("chat: (waiting for the first message)"),
            }
            println!(
                "queued: {}, busy: {}",
                dispatcher.pending(),
                dispatcher.is_busy()
            );
            return true;
        }
        Command::Invalid(msg) => {
            eprintln!("{msg}");
            return true;
        }
        Command::Text(text) => dispatcher.send_text(&text),
        Command::Location {
            latitude,
            longitude,
        } => dispatcher.send_location(latitude, longitude),
        Command::Document { path, caption } => {
            dispatcher.send_document(&path, caption.as_deref())
        }
        Command::Photo(path) => dispatcher.send_photo(&path),
        Command::Video(path) => dispatcher.send_video(&path),
        Command::Audio(path) => dispatcher.send_audio(&path),
    };

    if !accepted {
        eprintln!("rejected (no chat yet, bad input, or missing file)");
    }
    true
}
