use crate::error::{Error, Result};
use tracing::debug;

/// Download the raw iCalendar document behind `ical_url`.
///
/// Errors never carry the URL, which may hold a private feed token.
pub fn fetch_calendar(ical_url: &str) -> Result<String> {
    debug!("Fetching calendar feed");
    let response = reqwest::blocking::get(ical_url).map_err(|e| Error::Http(e.without_url()))?;

    let status = response.status();
    debug!(%status, "Calendar feed responded");
    if !status.is_success() {
        return Err(Error::Status { status });
    }

    response.text().map_err(|e| Error::Http(e.without_url()))
}
