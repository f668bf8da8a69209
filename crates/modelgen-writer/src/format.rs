//! Nested text fragments and their indentation.
//!
//! Handlers return plain strings. A handler that nests other output builds a
//! tree of [`Fragment`]s and flattens it with [`format`], which indents every
//! physical line of a nested fragment, so child output that already spans
//! several indented lines nests correctly.

/// A piece of output: a line of text (which may itself contain newlines) or
/// a block indented one level deeper than its surroundings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Line(String),
    Block(Vec<Fragment>),
}

impl Fragment {
    pub fn line(text: impl Into<String>) -> Self {
        Fragment::Line(text.into())
    }

    pub fn block(children: Vec<Fragment>) -> Self {
        Fragment::Block(children)
    }
}

impl From<String> for Fragment {
    fn from(text: String) -> Self {
        Fragment::Line(text)
    }
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Fragment::Line(text.to_string())
    }
}

/// Flattens `fragments`, prefixing each line with `indent` once per nesting
/// level. Empty lines stay empty and empty fragments vanish.
pub fn format(fragments: &[Fragment], indent: &str) -> String {
    let mut lines = Vec::new();
    flatten(fragments, 0, indent, &mut lines);
    lines.join("\n")
}

fn flatten(fragments: &[Fragment], level: usize, indent: &str, out: &mut Vec<String>) {
    for fragment in fragments {
        match fragment {
            Fragment::Line(text) => {
                for line in text.lines() {
                    if line.is_empty() {
                        out.push(String::new());
                    } else {
                        out.push(format!("{}{line}", indent.repeat(level)));
                    }
                }
            }
            Fragment::Block(children) => flatten(children, level + 1, indent, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_blocks_indent_each_line() {
        let fragments = vec![
            Fragment::line("@class A"),
            Fragment::block(vec![
                Fragment::line("@method f ()\n\treturn 1\n@end"),
                Fragment::line(""),
                Fragment::block(vec!["deep".into()]),
            ]),
            Fragment::line("@end"),
        ];
        assert_eq!(
            format(&fragments, "  "),
            "@class A\n  @method f ()\n  \treturn 1\n  @end\n    deep\n@end"
        );
    }

    #[test]
    fn blank_lines_are_not_indented() {
        let fragments = vec![Fragment::block(vec![Fragment::line("a\n\nb")])];
        assert_eq!(format(&fragments, "\t"), "\ta\n\n\tb");
    }
}
