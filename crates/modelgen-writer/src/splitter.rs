//! Multi-file output.
//!
//! A backend that produces several files renders them into one text, each
//! file preceded by a snip marker line naming its path. [`split`] cuts such
//! a text back into `(path, content)` pairs.

use crate::error::WriteError;

const MARKER_START: &str = "8< ---[";
const MARKER_END: &str = "]---";

/// The marker line introducing the file at `path`.
pub fn snip_marker(path: &str) -> String {
    format!("{MARKER_START}{path}{MARKER_END}")
}

fn marker_path(line: &str) -> Option<&str> {
    line.trim_end()
        .strip_prefix(MARKER_START)?
        .strip_suffix(MARKER_END)
}

/// Splits marked output into files, in order. Text before the first marker
/// must be blank. A file's content has no trailing newline.
pub fn split(text: &str) -> Result<Vec<(String, String)>, WriteError> {
    let mut files: Vec<(String, Vec<&str>)> = Vec::new();
    for (number, line) in text.lines().enumerate() {
        if let Some(path) = marker_path(line) {
            if path.is_empty() {
                return Err(WriteError::Split {
                    reason: format!("empty path in marker on line {}", number + 1),
                });
            }
            files.push((path.to_string(), Vec::new()));
            continue;
        }
        match files.last_mut() {
            Some((_, lines)) => lines.push(line),
            None if line.trim().is_empty() => {}
            None => {
                return Err(WriteError::Split {
                    reason: format!("text before the first marker on line {}", number + 1),
                })
            }
        }
    }
    Ok(files
        .into_iter()
        .map(|(path, lines)| (path, lines.join("\n").trim_end_matches('\n').to_string()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_markers() {
        let text = format!(
            "\n{}\n@module a\n@end\n{}\n@module b\n\n@end\n",
            snip_marker("a.model"),
            snip_marker("pkg/b.model")
        );
        let files = split(&text).unwrap();
        assert_eq!(
            files,
            vec![
                ("a.model".to_string(), "@module a\n@end".to_string()),
                ("pkg/b.model".to_string(), "@module b\n\n@end".to_string()),
            ]
        );
    }

    #[test]
    fn text_before_first_marker_is_rejected() {
        match split("stray\n8< ---[a]---\n") {
            Err(WriteError::Split { reason }) => assert!(reason.contains("line 1")),
            other => panic!("Expected Split, got {:?}", other),
        }
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(matches!(split(&snip_marker("")), Err(WriteError::Split { .. })));
    }

    #[test]
    fn no_markers_no_files() {
        assert!(split("").unwrap().is_empty());
    }
}
