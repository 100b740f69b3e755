use std::{env, fs, path::Path, path::PathBuf};

use crate::{
    errors::Error,
    matcher::{LowestIdPicker, PartnerPicker, RandomPicker},
    relay::RelayPolicy,
    Result,
};

const DEFAULT_DOCUMENT_MIME_TYPES: &str = "image/gif,video/mp4,video/quicktime";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchStrategy {
    #[default]
    Random,
    /// Always the waiting user with the lowest id.
    First,
}

/// Typed configuration, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,

    // Transcript
    pub transcript_path: PathBuf,
    pub transcript_timestamps: bool,

    // Relay
    /// `None` forwards every document type.
    pub document_mime_types: Option<Vec<String>>,

    // Matching
    pub match_strategy: MatchStrategy,
    pub match_seed: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process environment in production).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN")
            .and_then(non_empty)
            .or_else(|| get("BOT_API_TOKEN").and_then(non_empty))
            .ok_or_else(|| {
                Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
            })?;

        let transcript_path = get("TRANSCRIPT_PATH")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("chat_logs.txt"));
        let transcript_timestamps = get("TRANSCRIPT_TIMESTAMPS")
            .map(|s| parse_bool(&s))
            .unwrap_or(false);

        let mime_csv = get("RELAY_DOCUMENT_MIME_TYPES")
            .unwrap_or_else(|| DEFAULT_DOCUMENT_MIME_TYPES.to_string());
        let document_mime_types = parse_mime_list(&mime_csv);

        let match_strategy = match get("MATCH_STRATEGY")
            .map(|s| s.trim().to_lowercase())
            .as_deref()
        {
            None | Some("") | Some("random") => MatchStrategy::Random,
            Some("first") => MatchStrategy::First,
            Some(other) => {
                return Err(Error::Config(format!(
                    "MATCH_STRATEGY must be `random` or `first`, got `{other}`"
                )))
            }
        };

        let match_seed = match get("MATCH_SEED").and_then(non_empty) {
            Some(s) => Some(
                s.trim()
                    .parse::<u64>()
                    .map_err(|e| Error::Config(format!("MATCH_SEED: {e}")))?,
            ),
            None => None,
        };

        Ok(Self {
            telegram_bot_token,
            transcript_path,
            transcript_timestamps,
            document_mime_types,
            match_strategy,
            match_seed,
        })
    }

    pub fn relay_policy(&self) -> RelayPolicy {
        RelayPolicy {
            document_mime_types: self.document_mime_types.clone(),
        }
    }

    pub fn partner_picker(&self) -> Box<dyn PartnerPicker> {
        match (self.match_strategy, self.match_seed) {
            (MatchStrategy::First, _) => Box::new(LowestIdPicker),
            (MatchStrategy::Random, Some(seed)) => Box::new(RandomPicker::seeded(seed)),
            (MatchStrategy::Random, None) => Box::new(RandomPicker::new()),
        }
    }
}

/// `*` (or an empty list) means "any type".
fn parse_mime_list(csv: &str) -> Option<Vec<String>> {
    let items: Vec<String> = csv
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() || items.iter().any(|s| s == "*") {
        None
    } else {
        Some(items)
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() || env::var_os(key).is_some() {
            continue;
        }

        let mut val = v.trim();
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = &val[1..val.len() - 1];
        }

        env::set_var(key, val);
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
