//! Text cleanup applied to source files before chunking and to queries
//! before embedding. Removes noise without touching meaningful content
//! (links and punctuation stay).

use std::path::Path;

/// Normalize whitespace and strip control characters.
///
/// Line endings become `\n`, tabs become spaces, runs of horizontal
/// whitespace collapse to one space, and three or more consecutive
/// newlines collapse to a single blank line. The result is trimmed.
pub fn clean_text(raw: &str) -> String {
    // Normalize line endings; drop control characters other than \n.
    let mut text = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                text.push('\n');
            }
            '\n' => text.push('\n'),
            '\t' => text.push(' '),
            c if c.is_control() => {}
            c => text.push(c),
        }
    }

    // Collapse horizontal whitespace runs to a single space.
    let mut collapsed = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c == '\n' {
            collapsed.push('\n');
            in_space = false;
        } else if c.is_whitespace() {
            if !in_space {
                collapsed.push(' ');
                in_space = true;
            }
        } else {
            collapsed.push(c);
            in_space = false;
        }
    }

    // Cap consecutive newlines at two (one blank line).
    let mut out = String::with_capacity(collapsed.len());
    let mut newline_run = 0usize;
    for c in collapsed.chars() {
        if c == '\n' {
            newline_run += 1;
            if newline_run <= 2 {
                out.push('\n');
            }
        } else {
            newline_run = 0;
            out.push(c);
        }
    }

    out.trim().to_string()
}

/// Flatten text to a single line for the embedding API: cleaned, with
/// all whitespace squeezed to single spaces.
pub fn normalize_for_embedding(text: &str) -> String {
    clean_text(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Files skipped during document collection (macOS resource forks and
/// similar artifacts).
pub fn should_skip_path(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.starts_with("._") || name == ".DS_Store",
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn crlf_cleans_like_lf() {
        assert_eq!(clean_text("a\r\nb"), clean_text("a\nb"));
        assert_eq!(clean_text("a\rb"), "a\nb");
    }

    #[test]
    fn control_chars_stripped_blank_runs_collapsed() {
        let cleaned = clean_text("one\u{0}\u{7}two\n\n\n\nthree\t\tfour");
        assert_eq!(cleaned, "onetwo\n\nthree four");
    }

    #[test]
    fn horizontal_whitespace_collapses_inside_lines() {
        assert_eq!(clean_text("a   b\u{a0}\u{a0}c"), "a b c");
    }

    #[test]
    fn normalize_flattens_to_one_line() {
        assert_eq!(normalize_for_embedding("  a\nb\n\n c  "), "a b c");
    }

    #[test]
    fn skips_resource_forks_and_ds_store() {
        assert!(should_skip_path(&PathBuf::from("kb/._notes.md")));
        assert!(should_skip_path(&PathBuf::from("kb/.DS_Store")));
        assert!(!should_skip_path(&PathBuf::from("kb/notes.md")));
    }
}
