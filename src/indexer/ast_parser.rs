use crate::error::{ExtractionError, ParseError};
use std::ops::Range;
use tree_sitter::{Node, Parser, Tree};

/// Read-only view of a node in a parsed syntax tree.
///
/// The visitor and normalizer only see nodes through this trait, so any
/// grammar front end that can answer these questions can feed the chunker.
pub trait SyntaxNode: Sized + Clone {
    /// Grammar kind of the node (`"method_declaration"`, `"identifier"`, `"public"`, ...)
    fn kind(&self) -> &str;

    /// Direct children, named and anonymous, in source order
    fn children(&self) -> Vec<Self>;

    fn parent(&self) -> Option<Self>;

    /// Byte span of the node within the source text
    fn byte_range(&self) -> Range<usize>;

    /// 0-based first row
    fn start_row(&self) -> usize;

    /// 0-based last row
    fn end_row(&self) -> usize;

    /// Whether the subtree contains syntax errors
    fn has_error(&self) -> bool {
        false
    }

    /// First direct child of the given kind
    fn child_of_kind(&self, kind: &str) -> Option<Self> {
        self.children().into_iter().find(|c| c.kind() == kind)
    }

    /// Verbatim text of the node
    fn text<'s>(&self, source: &SourceText<'s>) -> Result<&'s str, ExtractionError> {
        source.slice(self.byte_range(), self.kind())
    }
}

impl<'tree> SyntaxNode for Node<'tree> {
    fn kind(&self) -> &str {
        Node::kind(self)
    }

    fn children(&self) -> Vec<Self> {
        let mut cursor = self.walk();
        Node::children(self, &mut cursor).collect()
    }

    fn parent(&self) -> Option<Self> {
        Node::parent(self)
    }

    fn byte_range(&self) -> Range<usize> {
        Node::byte_range(self)
    }

    fn start_row(&self) -> usize {
        self.start_position().row
    }

    fn end_row(&self) -> usize {
        self.end_position().row
    }

    fn has_error(&self) -> bool {
        Node::has_error(self)
    }
}

/// Source text with a precomputed line table
#[derive(Debug, Clone)]
pub struct SourceText<'s> {
    text: &'s str,
    lines: Vec<&'s str>,
}

impl<'s> SourceText<'s> {
    pub fn new(text: &'s str) -> Self {
        Self {
            text,
            lines: text.split('\n').collect(),
        }
    }

    pub fn as_str(&self) -> &'s str {
        self.text
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Checked byte slice; fails on out-of-range or non-char-boundary spans
    pub fn slice(&self, range: Range<usize>, kind: &str) -> Result<&'s str, ExtractionError> {
        self.text
            .get(range.clone())
            .ok_or_else(|| ExtractionError::SpanOutOfBounds {
                kind: kind.to_string(),
                start: range.start,
                end: range.end,
            })
    }

    /// Rows `start..end` (0-based, end exclusive) joined with `\n`
    pub fn rows(&self, rows: Range<usize>, kind: &str) -> Result<String, ExtractionError> {
        if rows.start >= self.lines.len() {
            return Err(ExtractionError::LineOutOfBounds {
                kind: kind.to_string(),
                row: rows.start,
            });
        }
        let end = rows.end.min(self.lines.len());
        Ok(self.lines[rows.start..end]
            .iter()
            .map(|line| line.trim_end_matches('\r'))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// tree-sitter parser bound to the Java grammar
pub struct JavaParser {
    parser: Parser,
}

impl JavaParser {
    pub fn new() -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| ParseError::GrammarUnavailable(e.to_string()))?;
        Ok(Self { parser })
    }

    /// Parse one source unit. Malformed input still yields a tree containing error nodes.
    pub fn parse(&mut self, source: &str, source_file: &str) -> Result<Tree, ParseError> {
        self.parser
            .parse(source, None)
            .ok_or_else(|| ParseError::NoTree(source_file.to_string()))
    }
}
