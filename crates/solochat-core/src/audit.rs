use std::{
    fs::OpenOptions,
    io::Write,
    path::PathBuf,
    sync::Mutex,
};

use chrono::Local;
use serde::Serialize;

use crate::{domain::ChatId, Result};

const AUDIT_MAX_TEXT: usize = 500;

/// Local timestamp used as the line prefix (`[2026-01-31 18:04:05] ...`).
fn line_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Audit representation of one accepted inbound message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InboundRecord {
    pub chat_id: ChatId,
    pub username: String,
    pub text: String,
}

#[derive(Debug)]
pub enum AuditEvent<'a> {
    Started,
    Stopped { discarded: usize },
    Inbound(&'a InboundRecord),
    BotDropped { chat_id: ChatId, username: &'a str },
    Sent { seq: u64, kind: &'a str, chat_id: ChatId, summary: &'a str },
    Failed { seq: u64, kind: &'a str, chat_id: ChatId, error: &'a str },
}

impl AuditEvent<'_> {
    pub fn render(&self) -> Result<String> {
        let line = match self {
            AuditEvent::Started => "Dispatcher started".to_string(),
            AuditEvent::Stopped { discarded } => {
                format!("Dispatcher stopped ({discarded} queued work item(s) discarded)")
            }
            AuditEvent::Inbound(record) => {
                format!("Received: {}", serde_json::to_string(record)?)
            }
            AuditEvent::BotDropped { chat_id, username } => {
                format!(
                    "Dropped message from bot {} in chat {chat_id}",
                    single_line(username)
                )
            }
            AuditEvent::Sent {
                seq,
                kind,
                chat_id,
                summary,
            } => format!(
                "Sent {kind} #{seq} to chat {chat_id}: {}",
                truncate_text(&single_line(summary), AUDIT_MAX_TEXT)
            ),
            AuditEvent::Failed {
                seq,
                kind,
                chat_id,
                error,
            } => format!(
                "Failed to send {kind} #{seq} to chat {chat_id}: {}",
                truncate_text(&single_line(error), AUDIT_MAX_TEXT)
            ),
        };
        Ok(line)
    }
}

/// Append-only text sink, one `[timestamp] message` line per event.
///
/// Without a path every write is a no-op.
#[derive(Debug, Default)]
pub struct AuditLog {
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn write(&self, event: AuditEvent<'_>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let line = format!("[{}] {}\n", line_timestamp(), event.render()?);

        // Serialize writers so lines from the receiver and the dispatch loop never interleave.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Best-effort write: failures are reported through tracing only.
    pub fn record(&self, event: AuditEvent<'_>) {
        if let Err(e) = self.write(event) {
            tracing::warn!("audit log write failed: {e}");
        }
    }
}

/// Escape line breaks so free text cannot start a new, unstamped log line.
fn single_line(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.log"))
    }

    #[test]
    fn truncate_text_adds_ellipsis() {
        let s = "a".repeat(AUDIT_MAX_TEXT + 10);
        let t = truncate_text(&s, AUDIT_MAX_TEXT);
        assert!(t.ends_with("..."));
        assert_eq!(t.chars().count(), AUDIT_MAX_TEXT + 3);
        assert_eq!(truncate_text("short", AUDIT_MAX_TEXT), "short");
    }

    #[test]
    fn writes_one_timestamped_line_per_event() {
        let path = tmp_file("solochat-audit-test");
        let log = AuditLog::new(Some(path.clone()));
        log.write(AuditEvent::Started).unwrap();
        let record = InboundRecord {
            chat_id: ChatId(42),
            username: "Ada Lovelace".to_string(),
            text: "hi".to_string(),
        };
        log.write(AuditEvent::Inbound(&record)).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let lines = written.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.starts_with('[') && l.contains("] ")));
        assert!(lines[0].ends_with("Dispatcher started"));
        assert!(lines[1].ends_with(
            r#"Received: {"chat_id":42,"username":"Ada Lovelace","text":"hi"}"#
        ));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn disabled_log_is_a_noop() {
        let log = AuditLog::disabled();
        log.write(AuditEvent::Stopped { discarded: 3 }).unwrap();
    }

    #[test]
    fn multi_line_payloads_stay_on_one_line() {
        let path = tmp_file("solochat-audit-multiline");
        let log = AuditLog::new(Some(path.clone()));
        log.write(AuditEvent::Sent {
            seq: 1,
            kind: "text",
            chat_id: ChatId(1),
            summary: "line one\nline two\r\nline three",
        })
        .unwrap();
        log.write(AuditEvent::Failed {
            seq: 2,
            kind: "document",
            chat_id: ChatId(1),
            error: "bad request\ncaption too long",
        })
        .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let lines = written.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.starts_with('[')));
        assert!(lines[0].ends_with(r"line one\nline two\r\nline three"));
        assert!(lines[1].ends_with(r"bad request\ncaption too long"));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn failure_lines_truncate_long_errors() {
        let err = "e".repeat(AUDIT_MAX_TEXT * 2);
        let line = AuditEvent::Failed {
            seq: 7,
            kind: "text",
            chat_id: ChatId(1),
            error: &err,
        }
        .render()
        .unwrap();
        assert!(line.starts_with("Failed to send text #7 to chat 1: "));
        assert!(line.ends_with("..."));
    }
}
