use std::{env, fs, path::Path, path::PathBuf, str::FromStr, time::Duration};

use crate::{errors::Error, Result};

/// Update kinds the inbound receiver subscribes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    Message,
    EditedMessage,
}

impl UpdateKind {
    pub const DEFAULT: [UpdateKind; 2] = [UpdateKind::Message, UpdateKind::EditedMessage];

    pub fn as_str(self) -> &'static str {
        match self {
            UpdateKind::Message => "message",
            UpdateKind::EditedMessage => "edited_message",
        }
    }
}

impl FromStr for UpdateKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "message" => Ok(UpdateKind::Message),
            "edited_message" | "edited-message" => Ok(UpdateKind::EditedMessage),
            other => Err(Error::Config(format!("unknown update kind: {other}"))),
        }
    }
}

/// Typed configuration for the dispatcher and its Telegram adapter.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,

    /// Audit log file. `None` disables the audit file entirely.
    pub log_path: Option<PathBuf>,

    pub accept_bot_messages: bool,
    pub subscribed_updates: Vec<UpdateKind>,

    // Runtime constants
    pub shutdown_settle: Duration,
    pub outbound_min_interval: Duration,
}

impl Config {
    /// Defaults for everything except the token.
    pub fn new(telegram_bot_token: impl Into<String>) -> Self {
        Self {
            telegram_bot_token: telegram_bot_token.into(),
            log_path: None,
            accept_bot_messages: false,
            subscribed_updates: UpdateKind::DEFAULT.to_vec(),
            shutdown_settle: Duration::from_millis(1000),
            outbound_min_interval: Duration::ZERO,
        }
    }

    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let log_path = env_str("SOLOCHAT_LOG_PATH")
            .and_then(non_empty)
            .map(PathBuf::from);
        let accept_bot_messages = env_bool("ACCEPT_BOT_MESSAGES").unwrap_or(false);
        let subscribed_updates = parse_update_kinds(env_str("SUBSCRIBED_UPDATES"))?;

        let shutdown_settle =
            Duration::from_millis(env_u64("SHUTDOWN_SETTLE_MS").unwrap_or(1000));
        let outbound_min_interval =
            Duration::from_millis(env_u64("OUTBOUND_MIN_INTERVAL_MS").unwrap_or(0));

        Ok(Self {
            telegram_bot_token,
            log_path,
            accept_bot_messages,
            subscribed_updates,
            shutdown_settle,
            outbound_min_interval,
        })
    }
}

/// Parse a comma-separated update kind list; unset or blank means the defaults.
pub fn parse_update_kinds(v: Option<String>) -> Result<Vec<UpdateKind>> {
    let items = parse_csv_lower(v);
    if items.is_empty() {
        return Ok(UpdateKind::DEFAULT.to_vec());
    }

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let kind = item.parse::<UpdateKind>()?;
        if !out.contains(&kind) {
            out.push(kind);
        }
    }
    Ok(out)
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| parse_bool(&s))
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn parse_csv_lower(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_kinds_default_when_unset_or_blank() {
        assert_eq!(parse_update_kinds(None).unwrap(), UpdateKind::DEFAULT);
        assert_eq!(
            parse_update_kinds(Some(" , ".to_string())).unwrap(),
            UpdateKind::DEFAULT
        );
    }

    #[test]
    fn update_kinds_parse_and_dedupe() {
        let kinds = parse_update_kinds(Some("Message, message".to_string())).unwrap();
        assert_eq!(kinds, vec![UpdateKind::Message]);

        let kinds = parse_update_kinds(Some("edited_message,message".to_string())).unwrap();
        assert_eq!(kinds, vec![UpdateKind::EditedMessage, UpdateKind::Message]);
    }

    #[test]
    fn unknown_update_kind_is_config_error() {
        let err = parse_update_kinds(Some("message,channel_post".to_string())).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("channel_post")));
    }

    #[test]
    fn dotenv_strips_quotes_and_skips_comments() {
        let parsed = parse_dotenv(
            "# comment\nTELEGRAM_BOT_TOKEN=\"abc\"\n\nACCEPT_BOT_MESSAGES='yes'\nbroken line\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("TELEGRAM_BOT_TOKEN".to_string(), "abc".to_string()),
                ("ACCEPT_BOT_MESSAGES".to_string(), "yes".to_string()),
            ]
        );
    }

    #[test]
    fn bool_parsing_accepts_common_truthy_values() {
        for v in ["1", "true", "YES", " on "] {
            assert!(parse_bool(v), "{v}");
        }
        assert!(!parse_bool("off"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn new_uses_documented_defaults() {
        let cfg = Config::new("token");
        assert!(cfg.log_path.is_none());
        assert!(!cfg.accept_bot_messages);
        assert_eq!(cfg.subscribed_updates, UpdateKind::DEFAULT.to_vec());
        assert_eq!(cfg.shutdown_settle, Duration::from_millis(1000));
        assert_eq!(cfg.outbound_min_interval, Duration::ZERO);
    }
}
