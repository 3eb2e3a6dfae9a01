//! CST-to-source formatter (C14).
//!
//! Tries a flat single-line rendering of each top-level form first; if that
//! exceeds `max_width` (default 80), it renders vertically with one child
//! per line, indenting by two spaces per level. Closing parens stay on the
//! same line as the last child (Lisp style). Original comments are kept at
//! their anchoring trivia position: leading trivia of the nearest following
//! token, trailing trivia of the preceding token on the same line.

use crate::cst::{CstElement, CstTree, SyntaxKind};
use crate::token::TriviaKind;

pub struct FormatterConfig {
    pub max_width: usize,
    pub indent: usize,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            max_width: 80,
            indent: 2,
        }
    }
}

pub struct Formatter<'a> {
    tree: &'a CstTree,
    config: FormatterConfig,
}

impl<'a> Formatter<'a> {
    #[must_use]
    pub fn new(tree: &'a CstTree) -> Self {
        Self {
            tree,
            config: FormatterConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(tree: &'a CstTree, config: FormatterConfig) -> Self {
        Self { tree, config }
    }

    /// Formats the whole program: each top-level form rendered on its own
    /// block, separated by a single trailing newline.
    #[must_use]
    pub fn format(&self) -> String {
        let root = self.tree.root();
        let mut out = String::new();
        for child in self.tree.children(root) {
            if let CstElement::Node(id) = child {
                self.format_leading_comments(*id, &mut out);
                out.push_str(&self.render(*id, 0));
                out.push('\n');
            }
        }
        out
    }

    fn format_leading_comments(&self, id: u32, out: &mut String) {
        if let Some(first) = self.tree.descendant_tokens(id).first() {
            for t in &self.tree.token(*first).leading_trivia {
                if t.kind == TriviaKind::LineComment {
                    out.push_str(t.text.trim_end());
                    out.push('\n');
                }
            }
        }
    }

    fn render(&self, id: u32, depth: usize) -> String {
        let flat = self.render_flat(id);
        if flat.len() <= self.config.max_width.saturating_sub(depth * self.config.indent) {
            flat
        } else {
            self.render_vertical(id, depth)
        }
    }

    fn render_flat(&self, id: u32) -> String {
        let node = self.tree.node(id);
        let head = Self::head_text(node.kind, self.tree, id);
        let children: Vec<String> = node
            .children
            .iter()
            .filter_map(|c| match c {
                CstElement::Node(n) => Some(self.render_flat(*n)),
                CstElement::Token(_) => None,
            })
            .collect();
        Self::compose_line(&head, &children)
    }

    fn render_vertical(&self, id: u32, depth: usize) -> String {
        let node = self.tree.node(id);
        let head = Self::head_text(node.kind, self.tree, id);
        let child_nodes: Vec<u32> = node
            .children
            .iter()
            .filter_map(|c| match c {
                CstElement::Node(n) => Some(*n),
                CstElement::Token(_) => None,
            })
            .collect();
        if child_nodes.is_empty() {
            return format!("({head})");
        }
        let pad = " ".repeat((depth + 1) * self.config.indent);
        let mut out = format!("({head}\n");
        for (i, child) in child_nodes.iter().enumerate() {
            out.push_str(&pad);
            out.push_str(&self.render(*child, depth + 1));
            if i + 1 == child_nodes.len() {
                out.push(')');
            } else {
                out.push('\n');
            }
        }
        out
    }

    fn compose_line(head: &str, children: &[String]) -> String {
        if children.is_empty() {
            format!("({head})")
        } else {
            format!("({head} {})", children.join(" "))
        }
    }

    /// Keyword (and, for leaves, literal text) that opens/labels a node.
    fn head_text(kind: SyntaxKind, tree: &CstTree, id: u32) -> String {
        match kind {
            SyntaxKind::Selector => "select".into(),
            SyntaxKind::Sequence => "seq".into(),
            SyntaxKind::Parallel => "parallel".into(),
            SyntaxKind::Guard => "guard".into(),
            SyntaxKind::If => "if".into(),
            SyntaxKind::Invert => "invert".into(),
            SyntaxKind::Repeat => "repeat".into(),
            SyntaxKind::Timeout => "timeout".into(),
            SyntaxKind::Cooldown => "cooldown".into(),
            SyntaxKind::While => "while".into(),
            SyntaxKind::Reactive => "reactive".into(),
            SyntaxKind::ReactiveSelect => "reactive-select".into(),
            SyntaxKind::Check => "check".into(),
            SyntaxKind::TreeDef => "tree".into(),
            SyntaxKind::Defdec => "defdec".into(),
            SyntaxKind::Defmacro => "defmacro".into(),
            SyntaxKind::Import => "import".into(),
            SyntaxKind::Ref => "ref".into(),
            _ => tree.text(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn format(src: &str) -> String {
        let (tokens, _) = Lexer::new(src).tokenize();
        let (tree, _) = Parser::new(&tokens).parse();
        Formatter::new(&tree).format()
    }

    #[test]
    fn fits_on_one_line_when_short() {
        let out = format("(tree T (select (.Patrol) (.Flee)))");
        assert_eq!(out.trim_end(), "(tree T (select (.Patrol) (.Flee)))");
    }

    #[test]
    fn wraps_vertically_past_max_width() {
        let long = "(tree VeryLongTreeNameIndeed (select (.DoSomethingReallyLong) (.DoAnotherLongThing) (.YetAnotherVeryLongActionNameHere)))";
        let out = format(long);
        assert!(out.contains('\n'));
    }
}
