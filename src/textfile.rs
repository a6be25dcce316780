// Pacekeeper - Pedal pace monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Metrics textfile
//!
//! The sensor side publishes its counter as a single line
//! `<metric_name> <integer>\n`, overwritten on every update, in a directory
//! scraped by a node exporter textfile collector. The watch side reads it
//! back with a literal-prefix match on the metric name.
//!
//! Writes go through a temporary file in the destination directory followed
//! by a rename, so readers see either the old or the new line, never a
//! partial one.

use crate::error::TextfileError;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Check a metric name: `[a-zA-Z_][a-zA-Z0-9_]*`.
pub fn validate_metric_name(name: &str) -> Result<(), TextfileError> {
    if is_metric_name(name) {
        Ok(())
    } else {
        Err(TextfileError::InvalidMetricName(name.to_string()))
    }
}

fn is_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Whether `line` is `<metric_name> <number>` with an optional decimal part.
/// Timestamps and labels are not supported.
pub fn is_metric_line(line: &str) -> bool {
    let Some((name, value)) = line.split_once(' ') else {
        return false;
    };
    if !is_metric_name(name) {
        return false;
    }
    match value.split_once('.') {
        Some((int, frac)) => is_digits(int) && is_digits(frac),
        None => is_digits(value),
    }
}

/// Format a counter line, including the trailing newline.
pub fn format_line(metric_name: &str, value: u64) -> String {
    format!("{} {}\n", metric_name, value)
}

/// Parse `<metric_name> <digits>` from one line (surrounding whitespace ignored).
pub fn parse_counter(line: &str, metric_name: &str) -> Option<u64> {
    let value = line.trim().strip_prefix(metric_name)?.strip_prefix(' ')?;
    if !is_digits(value) {
        return None;
    }
    value.parse().ok()
}

/// First counter value for `metric_name` found in `contents`.
pub fn find_counter(contents: &str, metric_name: &str) -> Option<u64> {
    contents
        .lines()
        .find_map(|line| parse_counter(line, metric_name))
}

/// Read the textfile and extract the counter. `Ok(None)` when the file has
/// no matching line.
pub fn read_counter(path: &Path, metric_name: &str) -> Result<Option<u64>, TextfileError> {
    let contents = fs::read_to_string(path)?;
    Ok(find_counter(&contents, metric_name))
}

/// Replace the file at `path` with `contents` atomically.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), TextfileError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| TextfileError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Overwrite the textfile with a single counter line.
pub fn write_counter(path: &Path, metric_name: &str, value: u64) -> Result<(), TextfileError> {
    validate_metric_name(metric_name)?;
    write_atomic(path, &format_line(metric_name, value))
}

/// Overwrite the textfile with a line relayed from upstream.
pub fn write_line(path: &Path, line: &str) -> Result<(), TextfileError> {
    if !is_metric_line(line) {
        return Err(TextfileError::InvalidLine(line.to_string()));
    }
    write_atomic(path, &format!("{}\n", line))
}

/// Whether files can be created in `dir`.
pub fn is_writable_dir(dir: &Path) -> bool {
    dir.is_dir() && NamedTempFile::new_in(dir).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_metric_names() {
        assert!(validate_metric_name("bike_sensor_pedal_count").is_ok());
        assert!(validate_metric_name("_x9").is_ok());
        assert!(validate_metric_name("9lives").is_err());
        assert!(validate_metric_name("has-dash").is_err());
        assert!(validate_metric_name("").is_err());
    }

    #[test]
    fn test_is_metric_line() {
        assert!(is_metric_line("bike_sensor_pedal_count 42"));
        assert!(is_metric_line("temp_c 21.5"));
        assert!(!is_metric_line("temp_c 21."));
        assert!(!is_metric_line("temp_c -3"));
        assert!(!is_metric_line("temp_c 3 1700000000"));
        assert!(!is_metric_line("Color = 1, 2, 3, Proximity = 4"));
        assert!(!is_metric_line("count{label=\"a\"} 3"));
    }

    #[test]
    fn test_parse_counter_literal_prefix() {
        let name = "bike_sensor_pedal_count";
        assert_eq!(parse_counter("bike_sensor_pedal_count 17", name), Some(17));
        assert_eq!(parse_counter("  bike_sensor_pedal_count 17 \n", name), Some(17));
        assert_eq!(parse_counter("bike_sensor_pedal_count_total 17", name), None);
        assert_eq!(parse_counter("bike_sensor_pedal_count 1.5", name), None);
        assert_eq!(parse_counter("bike_sensor_pedal_count ", name), None);
        assert_eq!(parse_counter("other 17", name), None);
    }

    #[test]
    fn test_find_counter_first_match_wins() {
        let contents = "# HELP foo\nfoo 1\nbar 2\nfoo 3\n";
        assert_eq!(find_counter(contents, "foo"), Some(1));
        assert_eq!(find_counter(contents, "bar"), Some(2));
        assert_eq!(find_counter(contents, "baz"), None);
    }

    #[test]
    fn test_write_then_read_counter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bike_sensor.prom");

        write_counter(&path, "pedals", 7).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "pedals 7\n");

        write_counter(&path, "pedals", 8).unwrap();
        assert_eq!(read_counter(&path, "pedals").unwrap(), Some(8));
    }

    #[test]
    fn test_write_line_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("relay.prom");

        assert!(matches!(
            write_line(&path, "not a metric"),
            Err(TextfileError::InvalidLine(_))
        ));
        assert!(!path.exists());

        write_line(&path, "temp_c 21.5").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "temp_c 21.5\n");
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = read_counter(&dir.path().join("missing.prom"), "x").unwrap_err();
        assert!(matches!(err, TextfileError::Io(_)));
    }

    #[test]
    fn test_is_writable_dir() {
        let dir = tempdir().unwrap();
        assert!(is_writable_dir(dir.path()));
        assert!(!is_writable_dir(&dir.path().join("nope")));
    }
}
