use crate::error::{start_error, Error, Result};
use chrono::prelude::*;
use chrono::LocalResult;
use chrono_tz::Tz;
use ical::parser::ical::component::{
    IcalAlarm, IcalCalendar, IcalEvent, IcalFreeBusy, IcalJournal, IcalTimeZone, IcalTodo,
};
use ical::property::Property;
use std::io::BufReader;
use tracing::{debug, warn};

/// Component kinds `ical` knows how to parse.
const KNOWN_COMPONENTS: &[&str] = &[
    "VCALENDAR",
    "VEVENT",
    "VTODO",
    "VJOURNAL",
    "VFREEBUSY",
    "VTIMEZONE",
    "STANDARD",
    "DAYLIGHT",
    "VALARM",
];

/// One component of a parsed iCalendar document.
#[derive(Debug)]
pub enum Component {
    Event(IcalEvent),
    Timezone(IcalTimeZone),
    Alarm(IcalAlarm),
    Todo(IcalTodo),
    Journal(IcalJournal),
    FreeBusy(IcalFreeBusy),
}

/// Parse every VCALENDAR in `text` into a flat list of components.
///
/// Alarms nested in an event follow it in the list. Components of any other
/// kind (`X-` extensions, `VAVAILABILITY`, ...) are dropped before parsing.
pub fn parse_calendar(text: &str) -> Result<Vec<Component>> {
    let text = strip_unknown_components(text);
    let reader = ical::IcalParser::new(BufReader::new(text.as_bytes()));

    let mut components = Vec::new();
    let mut calendars = 0;
    for calendar in reader {
        let calendar = calendar.map_err(|e| Error::Parse(e.to_string()))?;
        calendars += 1;
        flatten(calendar, &mut components);
    }

    if calendars == 0 {
        return Err(Error::Parse(String::from("no VCALENDAR found")));
    }
    Ok(components)
}

fn component_name<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let (name, value) = line.split_at(line.find(':')?);
    if name.trim_end().eq_ignore_ascii_case(keyword) {
        Some(value[1..].trim())
    } else {
        None
    }
}

fn strip_unknown_components(text: &str) -> String {
    let mut kept = String::with_capacity(text.len());
    // Name of the unknown block being skipped and how deeply it nests in itself
    let mut skipping: Option<(String, usize)> = None;

    for line in text.lines() {
        if let Some((name, depth)) = skipping.as_mut() {
            if component_name(line, "BEGIN").map_or(false, |n| n.eq_ignore_ascii_case(name)) {
                *depth += 1;
            } else if component_name(line, "END").map_or(false, |n| n.eq_ignore_ascii_case(name)) {
                *depth -= 1;
                if *depth == 0 {
                    skipping = None;
                }
            }
            continue;
        }

        if let Some(name) = component_name(line, "BEGIN") {
            if !KNOWN_COMPONENTS.iter().any(|k| k.eq_ignore_ascii_case(name)) {
                debug!(component = name, "Ignoring unsupported component");
                skipping = Some((name.to_string(), 1));
                continue;
            }
        }
        kept.push_str(line);
        kept.push_str("\r\n");
    }
    kept
}

fn flatten(calendar: IcalCalendar, components: &mut Vec<Component>) {
    components.extend(calendar.timezones.into_iter().map(Component::Timezone));
    for mut event in calendar.events {
        let alarms = std::mem::take(&mut event.alarms);
        components.push(Component::Event(event));
        components.extend(alarms.into_iter().map(Component::Alarm));
    }
    components.extend(calendar.todos.into_iter().map(Component::Todo));
    components.extend(calendar.alarms.into_iter().map(Component::Alarm));
    components.extend(calendar.journals.into_iter().map(Component::Journal));
    components.extend(calendar.free_busys.into_iter().map(Component::FreeBusy));
}

/// Start of an event, either an instant or a whole calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStart {
    Timed(DateTime<Utc>),
    AllDay(NaiveDate),
}

impl EventStart {
    /// Interpret a DTSTART property. Floating times, and times whose TZID is not
    /// an IANA zone name, are read in `floating_tz`.
    pub fn from_property(start: &Property, floating_tz: Tz) -> Result<EventStart> {
        let value = start
            .value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| start_error("DTSTART has no value"))?;

        let date_only = match param(start, "VALUE") {
            Some(kind) => kind.eq_ignore_ascii_case("DATE"),
            None => value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()),
        };
        if date_only {
            return NaiveDate::parse_from_str(value, "%Y%m%d")
                .map(EventStart::AllDay)
                .map_err(|e| start_error(&format!("{}: {}", value, e)));
        }

        //UTC times carry a trailing Z
        if let Some(utc_value) = value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) {
            let naive = parse_naive(utc_value)?;
            return Ok(EventStart::Timed(Utc.from_utc_datetime(&naive)));
        }

        let timezone = match param(start, "TZID") {
            Some(tzid) => tzid.parse::<Tz>().unwrap_or_else(|_| {
                warn!(tzid, fallback = %floating_tz, "Unknown TZID, reading start in fallback zone");
                floating_tz
            }),
            None => floating_tz,
        };
        let naive = parse_naive(value)?;
        let local = match timezone.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => {
                return Err(start_error(&format!(
                    "{} does not exist in {}",
                    value, timezone
                )))
            }
        };
        Ok(EventStart::Timed(local.with_timezone(&Utc)))
    }
}

fn parse_naive(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
        .map_err(|e| start_error(&format!("{}: {}", value, e)))
}

fn param<'a>(property: &'a Property, name: &str) -> Option<&'a str> {
    property
        .params
        .as_ref()?
        .iter()
        .find(|(param_name, _)| param_name.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .map(|value| value.trim().trim_matches('"'))
}

pub fn property<'a>(event: &'a IcalEvent, name: &str) -> Option<&'a Property> {
    event
        .properties
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Read the DTSTART of an event.
pub fn event_start(event: &IcalEvent, floating_tz: Tz) -> Result<EventStart> {
    let start = property(event, "DTSTART").ok_or_else(|| start_error("missing DTSTART"))?;
    EventStart::from_property(start, floating_tz)
}

/// SUMMARY as display text; empty when the event has none.
pub fn event_summary(event: &IcalEvent) -> String {
    property(event, "SUMMARY")
        .and_then(|p| p.value.as_deref())
        .map(unescape_text)
        .unwrap_or_default()
}

fn unescape_text(value: &str) -> String {
    let mut text = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            text.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => text.push('\n'),
            Some(other) => text.push(other),
            None => text.push('\\'),
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dtstart(params: Option<Vec<(&str, &str)>>, value: &str) -> Property {
        Property {
            name: String::from("DTSTART"),
            params: params.map(|params| {
                params
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), vec![v.to_string()]))
                    .collect()
            }),
            value: Some(String::from(value)),
        }
    }

    #[test]
    fn utc_start() {
        assert_eq!(
            EventStart::from_property(&dtstart(None, "20200121T200000Z"), Tz::UTC).unwrap(),
            EventStart::Timed(Utc.with_ymd_and_hms(2020, 1, 21, 20, 0, 0).unwrap())
        );
    }

    #[test]
    fn start_with_tzid() {
        let start = dtstart(Some(vec![("TZID", "America/New_York")]), "20200110T150000");
        assert_eq!(
            EventStart::from_property(&start, Tz::UTC).unwrap(),
            EventStart::Timed(Utc.with_ymd_and_hms(2020, 1, 10, 20, 0, 0).unwrap())
        );
    }

    #[test]
    fn quoted_tzid_is_accepted() {
        let start = dtstart(Some(vec![("TZID", "\"Europe/Paris\"")]), "20240601T090000");
        assert_eq!(
            EventStart::from_property(&start, Tz::UTC).unwrap(),
            EventStart::Timed(Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap())
        );
    }

    #[test]
    fn floating_start_uses_given_zone() {
        let start = dtstart(None, "20240601T143000");
        assert_eq!(
            EventStart::from_property(&start, chrono_tz::America::Toronto).unwrap(),
            EventStart::Timed(Utc.with_ymd_and_hms(2024, 6, 1, 18, 30, 0).unwrap())
        );
    }

    #[test]
    fn unknown_tzid_falls_back_to_given_zone() {
        let start = dtstart(Some(vec![("TZID", "Eastern Standard Time")]), "20240601T143000");
        assert_eq!(
            EventStart::from_property(&start, chrono_tz::America::Toronto).unwrap(),
            EventStart::Timed(Utc.with_ymd_and_hms(2024, 6, 1, 18, 30, 0).unwrap())
        );
    }

    #[test]
    fn date_values_are_all_day() {
        let explicit = dtstart(Some(vec![("VALUE", "DATE")]), "20240601");
        let bare = dtstart(None, "20240601");
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        assert_eq!(
            EventStart::from_property(&explicit, Tz::UTC).unwrap(),
            EventStart::AllDay(day)
        );
        assert_eq!(
            EventStart::from_property(&bare, Tz::UTC).unwrap(),
            EventStart::AllDay(day)
        );
    }

    #[test]
    fn ambiguous_local_time_takes_earliest() {
        // 01:30 happens twice in Toronto on 2024-11-03
        let start = dtstart(Some(vec![("TZID", "America/Toronto")]), "20241103T013000");
        assert_eq!(
            EventStart::from_property(&start, Tz::UTC).unwrap(),
            EventStart::Timed(Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap())
        );
    }

    #[test]
    fn bad_starts_are_errors() {
        let gap = dtstart(Some(vec![("TZID", "America/Toronto")]), "20240310T023000");
        let garbage = dtstart(None, "tomorrow-ish");
        let empty = Property {
            name: String::from("DTSTART"),
            params: None,
            value: None,
        };

        for start in &[gap, garbage, empty] {
            assert!(matches!(
                EventStart::from_property(start, Tz::UTC),
                Err(Error::Start(_))
            ));
        }
    }

    #[test]
    fn summary_is_unescaped() {
        let event = IcalEvent {
            alarms: vec![],
            properties: vec![Property {
                name: String::from("SUMMARY"),
                params: None,
                value: Some(String::from("Lunch\\, then \\;review\\nnotes \\\\ done")),
            }],
        };
        assert_eq!(event_summary(&event), "Lunch, then ;review\nnotes \\ done");
    }

    #[test]
    fn missing_summary_is_empty() {
        let event = IcalEvent {
            alarms: vec![],
            properties: vec![dtstart(None, "20240601")],
        };
        assert_eq!(event_summary(&event), "");
        assert!(event_start(&event, Tz::UTC).is_ok());
    }

    #[test]
    fn components_are_tagged_by_kind() {
        let text = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:America/Toronto\r\n\
END:VTIMEZONE\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20240601T120000Z\r\n\
SUMMARY:Lunch\r\n\
BEGIN:VALARM\r\n\
ACTION:DISPLAY\r\n\
TRIGGER:-PT15M\r\n\
END:VALARM\r\n\
END:VEVENT\r\n\
BEGIN:VTODO\r\n\
SUMMARY:Chores\r\n\
END:VTODO\r\n\
END:VCALENDAR\r\n";

        let kinds: Vec<&str> = parse_calendar(text)
            .unwrap()
            .iter()
            .map(|c| match c {
                Component::Event(_) => "event",
                Component::Timezone(_) => "timezone",
                Component::Alarm(_) => "alarm",
                Component::Todo(_) => "todo",
                Component::Journal(_) => "journal",
                Component::FreeBusy(_) => "freebusy",
            })
            .collect();

        assert_eq!(kinds, vec!["timezone", "event", "alarm", "todo"]);
    }

    #[test]
    fn unsupported_components_are_ignored() {
        let text = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:X-FOO\r\n\
A:b\r\n\
BEGIN:X-FOO\r\n\
END:X-FOO\r\n\
END:X-FOO\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20240601T180000Z\r\n\
SUMMARY:Kept\r\n\
BEGIN:X-NOTE\r\n\
SUMMARY:Not an event\r\n\
END:X-NOTE\r\n\
END:VEVENT\r\n\
BEGIN:VAVAILABILITY\r\n\
DTSTART:20240601T080000Z\r\n\
BEGIN:AVAILABLE\r\n\
DTSTART:20240601T090000Z\r\n\
END:AVAILABLE\r\n\
END:VAVAILABILITY\r\n\
END:VCALENDAR\r\n";

        let components = parse_calendar(text).unwrap();
        assert_eq!(components.len(), 1);
        match &components[0] {
            Component::Event(event) => {
                assert_eq!(event_summary(event), "Kept");
                assert_eq!(
                    event_start(event, Tz::UTC).unwrap(),
                    EventStart::Timed(Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap())
                );
            }
            other => panic!("expected an event, got {:?}", other),
        }
    }

    #[test]
    fn malformed_documents_are_errors() {
        assert!(matches!(parse_calendar(""), Err(Error::Parse(_))));
        assert!(matches!(
            parse_calendar("BEGIN:VEVENT\r\nEND:VEVENT\r\n"),
            Err(Error::Parse(_))
        ));
    }
}
