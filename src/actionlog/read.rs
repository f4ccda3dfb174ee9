//! Parsing of action log files.

use std::path::Path;

use crate::capture::Action;
use crate::error::LogError;

use super::{BASE_PREFIX, HEADER};

/// Parse log text into stored actions numbered from `first_seq`.
///
/// Blank lines and `#` comments are skipped. A final line without a
/// terminating newline is a torn append and is dropped.
pub fn parse_actions(text: &str, first_seq: u64) -> Vec<Action> {
    complete_lines(text)
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .zip(first_seq..)
        .map(|(line, seq)| Action::stored(line, seq))
        .collect()
}

/// The base commit recorded in a journal, if any.
pub fn parse_base(text: &str) -> Option<&str> {
    complete_lines(text)
        .find_map(|line| line.strip_prefix(BASE_PREFIX))
        .map(str::trim)
        .filter(|base| !base.is_empty())
}

/// Lines terminated by `\n`, without their terminator.
fn complete_lines(text: &str) -> std::str::Lines<'_> {
    let complete = text.rfind('\n').map_or("", |end| &text[..=end]);
    complete.lines()
}

/// Read a log file. A missing file reads as empty.
///
/// # Errors
/// Returns [`LogError`] if the file cannot be read, is not UTF-8, or is
/// non-empty without the header line.
pub fn read_log_file(path: &Path) -> Result<String, LogError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(String::new()),
        Err(e) => return Err(LogError::io(path, e)),
    };
    let text = String::from_utf8(bytes).map_err(|_| LogError::Encoding {
        path: path.to_owned(),
    })?;
    check_header(&text).then_some(text).ok_or_else(|| LogError::MissingHeader {
        path: path.to_owned(),
    })
}

/// An empty log, a torn header, or a log starting with the header line.
fn check_header(text: &str) -> bool {
    match text.split_once('\n') {
        Some((first, _)) => first.trim_end() == HEADER,
        None => HEADER.starts_with(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(actions: &[Action]) -> Vec<&str> {
        actions.iter().map(Action::text).collect()
    }

    #[test]
    fn skips_header_comments_and_blank_lines() {
        let text = format!("{HEADER}\n\nbpy.ops.a()\n# note\nbpy.ops.b()\n");
        let actions = parse_actions(&text, 0);
        assert_eq!(texts(&actions), ["bpy.ops.a()", "bpy.ops.b()"]);
        assert_eq!(actions[1].seq(), 1);
        assert!(actions[0].captured_at().is_none());
    }

    #[test]
    fn drops_torn_final_line() {
        let text = format!("{HEADER}\nbpy.ops.a()\nbpy.ops.b(");
        assert_eq!(texts(&parse_actions(&text, 0)), ["bpy.ops.a()"]);
    }

    #[test]
    fn single_torn_line_is_empty() {
        assert!(parse_actions("bpy.ops.a()", 0).is_empty());
        assert!(parse_actions("", 0).is_empty());
    }

    #[test]
    fn numbering_starts_at_offset() {
        let actions = parse_actions("bpy.ops.a()\nbpy.ops.b()\n", 5);
        assert_eq!(actions[0].seq(), 5);
        assert_eq!(actions[1].seq(), 6);
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let actions = parse_actions("bpy.ops.a()\r\nbpy.ops.b()\r\n", 0);
        assert_eq!(texts(&actions), ["bpy.ops.a()", "bpy.ops.b()"]);
    }

    #[test]
    fn base_is_read_from_comment() {
        let text = format!("{HEADER}\n{BASE_PREFIX}abc123\nbpy.ops.a()\n");
        assert_eq!(parse_base(&text), Some("abc123"));
        assert_eq!(parse_base(&format!("{HEADER}\n")), None);
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_log_file(&dir.path().join("none.actions")).unwrap(), "");
    }

    #[test]
    fn file_without_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.actions");
        std::fs::write(&path, "bpy.ops.a()\n").unwrap();
        assert!(matches!(
            read_log_file(&path),
            Err(LogError::MissingHeader { .. })
        ));
    }

    #[test]
    fn file_with_torn_header_reads_as_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.actions");
        std::fs::write(&path, "# scene").unwrap();
        let text = read_log_file(&path).unwrap();
        assert!(parse_actions(&text, 0).is_empty());
    }
}
