use chrono::prelude::*;
use serde::Serialize;
use tracing::info;

pub mod calendar;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod writer;

pub use config::Config;
pub use error::{Error, Result};

/// An event as shown by the calendar widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Local `HH:MM`, or the all-day label
    pub time: String,
    pub summary: String,
}

/// Today's events from an iCalendar document, sorted by time.
pub fn events_from_ical(ical: &str, today: NaiveDate, config: &Config) -> Result<Vec<Event>> {
    let components = calendar::parse_calendar(ical)?;
    Ok(filter::events_on(&components, today, config))
}

/// Fetch the feed and write today's events to the configured output file.
pub fn run(config: &Config) -> Result<Vec<Event>> {
    run_at(config, Utc::now)
}

/// Like [`run`], with "now" supplied by `clock`, read once right after the fetch.
pub fn run_at<F>(config: &Config, clock: F) -> Result<Vec<Event>>
where
    F: FnOnce() -> DateTime<Utc>,
{
    let ical = fetch::fetch_calendar(&config.ical_url)?;
    let today = filter::today_in(config.timezone, clock());

    let events = events_from_ical(&ical, today, config)?;
    writer::write_events(&config.output_path, &events, config.indent)?;

    info!(
        count = events.len(),
        %today,
        path = %config.output_path.display(),
        "Wrote today's events"
    );
    Ok(events)
}
