//! Byte-level diff: text content goes through the line diff, anything else
//! is summarized.

use crate::lcs::{diff_text, DiffLine, LineDiff};

/// Diff working-copy bytes against staged bytes.
///
/// Both sides are interpreted as UTF-8 text. If either is not valid UTF-8 the
/// result is a synthetic script describing the byte sizes instead of lines.
pub fn diff_blobs(current: &[u8], staged: &[u8]) -> LineDiff {
    match (std::str::from_utf8(current), std::str::from_utf8(staged)) {
        (Ok(current), Ok(staged)) => diff_text(current, staged),
        _ => make_binary_diff(current, staged),
    }
}

fn binary_summary(data: &[u8]) -> String {
    format!("(binary content, {} bytes)", data.len())
}

/// Create a synthetic diff for binary content.
fn make_binary_diff(current: &[u8], staged: &[u8]) -> LineDiff {
    if current == staged {
        return LineDiff {
            lines: vec![DiffLine::Unchanged(binary_summary(current))],
        };
    }

    let mut lines = Vec::new();
    if !staged.is_empty() {
        lines.push(DiffLine::Removed(binary_summary(staged)));
    }
    if !current.is_empty() {
        lines.push(DiffLine::Added(binary_summary(current)));
    }
    LineDiff { lines }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_goes_through_line_diff() {
        let diff = diff_blobs(b"a\nx\nc\n", b"a\nb\nc\n");
        assert_eq!(diff.additions(), 1);
        assert_eq!(diff.deletions(), 1);
        assert_eq!(diff.current_lines(), ["a", "x", "c"]);
    }

    #[test]
    fn binary_content_is_summarized() {
        let diff = diff_blobs(&[0xff, 0xfe, 0x00], b"plain");
        assert_eq!(
            diff.lines,
            vec![
                DiffLine::Removed("(binary content, 5 bytes)".into()),
                DiffLine::Added("(binary content, 3 bytes)".into()),
            ]
        );
    }

    #[test]
    fn identical_binary_is_unchanged() {
        let data = [0x80u8, 0x81, 0x82];
        let diff = diff_blobs(&data, &data);
        assert!(diff.is_unchanged());
        assert_eq!(diff.lines.len(), 1);
    }

    #[test]
    fn binary_against_empty_has_one_side() {
        let diff = diff_blobs(&[0xc3], b"");
        assert_eq!(diff.lines, vec![DiffLine::Added("(binary content, 1 bytes)".into())]);
    }
}
