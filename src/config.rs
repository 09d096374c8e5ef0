use crate::error::{config_error, Result};
use chrono_tz::Tz;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Toronto;
pub const DEFAULT_OUTPUT_PATH: &str = "widgets/calendar/events.json";
pub const DEFAULT_ALL_DAY_LABEL: &str = "Toute la journée";
pub const DEFAULT_INDENT: usize = 2;

/// Settings for a single run of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Published iCalendar feed to fetch
    pub ical_url: String,
    /// Zone in which "today" and event times are evaluated
    pub timezone: Tz,
    /// JSON file that receives today's events
    pub output_path: PathBuf,
    /// Rendered in place of a time for whole-day events
    pub all_day_label: String,
    /// Spaces per indentation level in the JSON output
    pub indent: usize,
}

impl Config {
    pub fn new(ical_url: impl Into<String>) -> Self {
        Config {
            ical_url: ical_url.into(),
            timezone: DEFAULT_TIMEZONE,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            all_day_label: DEFAULT_ALL_DAY_LABEL.to_string(),
            indent: DEFAULT_INDENT,
        }
    }

    /// Load configuration from the environment, reading `.env` first if present.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ical_url = lookup("ICAL_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| config_error("Missing environment variable: ICAL_URL"))?;

        let mut config = Config::new(ical_url.trim());

        if let Some(name) = lookup("CALENDAR_TIMEZONE") {
            config.timezone = name
                .trim()
                .parse::<Tz>()
                .map_err(|_| config_error(&format!("Unknown timezone: {}", name)))?;
        }

        if let Some(path) = lookup("CALENDAR_OUTPUT") {
            config.output_path = PathBuf::from(path);
        }

        if let Some(label) = lookup("CALENDAR_ALL_DAY_LABEL") {
            config.all_day_label = label;
        }

        Ok(config)
    }
}
