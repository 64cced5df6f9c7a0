//! Longest-common-subsequence line diff.
//!
//! The score table is filled from the bottom-right corner: `table[i][j]` is
//! the LCS length of `current[i..]` and `staged[j..]`. The edit script is
//! then recovered by walking from the last line of each side back toward the
//! first, so lines are collected in reverse and flipped at the end.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single line of an edit script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum DiffLine {
    /// Present on both sides.
    Unchanged(String),
    /// Present only in the working copy.
    Added(String),
    /// Present only in the staged version.
    Removed(String),
}

impl DiffLine {
    /// Two-character rendering prefix.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Unchanged(_) => "  ",
            Self::Added(_) => "+ ",
            Self::Removed(_) => "- ",
        }
    }

    /// The line text without prefix.
    pub fn text(&self) -> &str {
        match self {
            Self::Unchanged(text) | Self::Added(text) | Self::Removed(text) => text,
        }
    }
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix(), self.text())
    }
}

/// An edit script in top-to-bottom order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDiff {
    pub lines: Vec<DiffLine>,
}

impl LineDiff {
    /// Returns `true` if every line is unchanged.
    pub fn is_unchanged(&self) -> bool {
        self.lines
            .iter()
            .all(|line| matches!(line, DiffLine::Unchanged(_)))
    }

    /// Number of added lines.
    pub fn additions(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| matches!(l, DiffLine::Added(_)))
            .count()
    }

    /// Number of removed lines.
    pub fn deletions(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| matches!(l, DiffLine::Removed(_)))
            .count()
    }

    /// The working-copy side: unchanged and added lines in order.
    pub fn current_lines(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| !matches!(l, DiffLine::Removed(_)))
            .map(DiffLine::text)
            .collect()
    }

    /// The staged side: unchanged and removed lines in order.
    pub fn staged_lines(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| !matches!(l, DiffLine::Added(_)))
            .map(DiffLine::text)
            .collect()
    }
}

/// One rendered line per entry, each terminated by a newline.
impl fmt::Display for LineDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Diff the working-copy lines against the staged lines.
///
/// When the walk has to choose between the two sides it prefers emitting the
/// current line as an addition if stepping back on the current side keeps at
/// least as high a score. On the first row or column it removes from the
/// staged side first.
pub fn diff_lines<S: AsRef<str>>(current: &[S], staged: &[S]) -> LineDiff {
    let (n, m) = (current.len(), staged.len());
    let same = |i: usize, j: usize| current[i].as_ref() == staged[j].as_ref();

    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if same(i, j) {
                1 + table[i + 1][j + 1]
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let added = |i: usize| DiffLine::Added(current[i].as_ref().to_string());
    let removed = |j: usize| DiffLine::Removed(staged[j].as_ref().to_string());

    // `i` and `j` count the lines not yet consumed on each side.
    let mut lines = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        if i == 0 {
            lines.push(removed(j - 1));
            j -= 1;
        } else if j == 0 {
            lines.push(added(i - 1));
            i -= 1;
        } else if same(i - 1, j - 1) {
            lines.push(DiffLine::Unchanged(current[i - 1].as_ref().to_string()));
            i -= 1;
            j -= 1;
        } else if i == 1 {
            lines.push(removed(j - 1));
            j -= 1;
        } else if j == 1 || table[i - 2][j - 1] >= table[i - 1][j - 2] {
            lines.push(added(i - 1));
            i -= 1;
        } else {
            lines.push(removed(j - 1));
            j -= 1;
        }
    }

    lines.reverse();
    LineDiff { lines }
}

/// Diff two texts split into lines.
pub fn diff_text(current: &str, staged: &str) -> LineDiff {
    let current: Vec<&str> = current.lines().collect();
    let staged: Vec<&str> = staged.lines().collect();
    diff_lines(&current, &staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn render(diff: &LineDiff) -> Vec<String> {
        diff.lines.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn substitution_in_the_middle() {
        let diff = diff_lines(&["a", "x", "c"], &["a", "b", "c"]);
        assert_eq!(render(&diff), ["  a", "- b", "+ x", "  c"]);
        assert_eq!(diff.current_lines(), ["a", "x", "c"]);
        assert_eq!(diff.staged_lines(), ["a", "b", "c"]);
    }

    #[test]
    fn identical_inputs_are_all_unchanged() {
        let diff = diff_lines(&["one", "two"], &["one", "two"]);
        assert!(diff.is_unchanged());
        assert_eq!(render(&diff), ["  one", "  two"]);
    }

    #[test]
    fn empty_staged_side_is_all_additions() {
        let diff = diff_lines(&["new1", "new2"], &[]);
        assert_eq!(render(&diff), ["+ new1", "+ new2"]);
        assert_eq!(diff.additions(), 2);
        assert_eq!(diff.deletions(), 0);
    }

    #[test]
    fn empty_current_side_is_all_removals() {
        let diff = diff_lines::<&str>(&[], &["old"]);
        assert_eq!(render(&diff), ["- old"]);
    }

    #[test]
    fn both_empty() {
        let diff = diff_lines::<&str>(&[], &[]);
        assert!(diff.lines.is_empty());
        assert!(diff.is_unchanged());
        assert_eq!(diff.to_string(), "");
    }

    #[test]
    fn appended_line() {
        let diff = diff_text("a\nb\nc\n", "a\nb\n");
        assert_eq!(render(&diff), ["  a", "  b", "+ c"]);
    }

    #[test]
    fn first_line_changed() {
        let diff = diff_lines(&["z", "b"], &["a", "b"]);
        assert_eq!(render(&diff), ["+ z", "- a", "  b"]);
    }

    #[test]
    fn display_renders_one_line_each() {
        let diff = diff_lines(&["a", "x"], &["a"]);
        assert_eq!(diff.to_string(), "  a\n+ x\n");
    }

    #[test]
    fn serializes_with_kind_tags() {
        let diff = diff_lines(&["x"], &["y"]);
        let json = serde_json::to_string(&diff.lines).unwrap();
        assert_eq!(
            json,
            r#"[{"kind":"added","text":"x"},{"kind":"removed","text":"y"}]"#
        );
    }

    proptest! {
        #[test]
        fn replay_reconstructs_both_sides(
            current in proptest::collection::vec("[a-d]", 0..12),
            staged in proptest::collection::vec("[a-d]", 0..12),
        ) {
            let diff = diff_lines(&current, &staged);
            prop_assert_eq!(diff.current_lines(), current.iter().map(String::as_str).collect::<Vec<_>>());
            prop_assert_eq!(diff.staged_lines(), staged.iter().map(String::as_str).collect::<Vec<_>>());
        }

        #[test]
        fn unchanged_count_is_bounded_by_lcs(
            current in proptest::collection::vec("[a-c]", 0..10),
            staged in proptest::collection::vec("[a-c]", 0..10),
        ) {
            let diff = diff_lines(&current, &staged);
            let unchanged = diff.lines.len() - diff.additions() - diff.deletions();
            prop_assert!(unchanged <= current.len().min(staged.len()));
            prop_assert_eq!(diff.additions() + unchanged, current.len());
            prop_assert_eq!(diff.deletions() + unchanged, staged.len());
        }
    }
}
