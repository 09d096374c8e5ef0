use crate::calendar::{event_start, event_summary, Component, EventStart};
use crate::config::Config;
use crate::Event;
use chrono::prelude::*;
use chrono_tz::Tz;
use tracing::warn;

/// The calendar date of `now` in `timezone`.
pub fn today_in(timezone: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&timezone).date_naive()
}

/// Events from `components` that fall on `today`, sorted by rendered time.
///
/// The sort compares the rendered strings, so where the all-day label lands
/// depends on the label itself. With the default label it sorts after every
/// `HH:MM` value. VEVENTs without a usable DTSTART are skipped.
pub fn events_on(components: &[Component], today: NaiveDate, config: &Config) -> Vec<Event> {
    let mut events: Vec<Event> = components
        .iter()
        .filter_map(|component| match component {
            Component::Event(event) => Some(event),
            _ => None,
        })
        .filter_map(|event| {
            let start = match event_start(event, config.timezone) {
                Ok(start) => start,
                Err(e) => {
                    warn!(summary = %event_summary(event), "Skipping event: {}", e);
                    return None;
                }
            };

            let (day, time) = match start {
                EventStart::Timed(instant) => {
                    let local = instant.with_timezone(&config.timezone);
                    (local.date_naive(), local.format("%H:%M").to_string())
                }
                EventStart::AllDay(date) => (date, config.all_day_label.clone()),
            };

            if day != today {
                return None;
            }
            Some(Event {
                time,
                summary: event_summary(event),
            })
        })
        .collect();

    events.sort_by(|a, b| a.time.cmp(&b.time));
    events
}
