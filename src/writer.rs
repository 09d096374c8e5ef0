use crate::error::Result;
use crate::Event;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::path::Path;

/// Serialize `events` as indented JSON, leaving non-ASCII text unescaped.
pub fn to_json(events: &[Event], indent: usize) -> Result<Vec<u8>> {
    let indent = " ".repeat(indent);
    let mut json = Vec::new();
    {
        let formatter = PrettyFormatter::with_indent(indent.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut json, formatter);
        events.serialize(&mut serializer)?;
    }
    Ok(json)
}

/// Replace the file at `path` with `events`, creating missing parent directories.
pub fn write_events(path: &Path, events: &[Event], indent: usize) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, to_json(events, indent)?)?;
    Ok(())
}
