//! Chunk normalization: one declaration node to one `CodeChunk`
//!
//! Metadata is derived from the immediate children of the declaration only.
//! Lists (`modifiers`, `parameters`, `annotations`, ...) are always present for the
//! chunk types that carry them; optional scalars are present only when found.

use super::ast_parser::{SourceText, SyntaxNode};
use crate::error::ExtractionError;
use crate::types::{
    ANNOTATIONS, ChunkMetadata, ChunkType, CodeChunk, EXTENDS, FIELD_TYPE, IMPLEMENTS,
    MODIFIERS, MetadataValue, PARAMETERS, RETURN_TYPE,
};

/// Fixed modifier vocabulary
pub const MODIFIER_VOCABULARY: [&str; 6] =
    ["public", "private", "protected", "static", "final", "abstract"];

/// Lines a class chunk claims beyond its start line
pub const CLASS_SPAN_LINES: usize = 10;

const TYPE_KINDS: [&str; 8] = [
    "type_identifier",
    "scoped_type_identifier",
    "generic_type",
    "array_type",
    "void_type",
    "integral_type",
    "floating_point_type",
    "boolean_type",
];

const ANNOTATION_KINDS: [&str; 2] = ["annotation", "marker_annotation"];
const PARAMETER_KINDS: [&str; 2] = ["formal_parameter", "spread_parameter"];

fn is_type_kind(kind: &str) -> bool {
    TYPE_KINDS.contains(&kind)
}

/// Convert a declaration node into a chunk
pub fn normalize<N: SyntaxNode>(
    node: &N,
    chunk_type: ChunkType,
    source: &SourceText<'_>,
    source_file: &str,
) -> Result<CodeChunk, ExtractionError> {
    let start_line = node.start_row() + 1;

    let (content, end_line) = match chunk_type {
        ChunkType::Class => (class_header(node, source)?, start_line + CLASS_SPAN_LINES),
        _ => (node.text(source)?.to_string(), node.end_row() + 1),
    };

    let (class_name, method_name) = match chunk_type {
        ChunkType::Class | ChunkType::Interface => (declared_name(node, source)?, None),
        ChunkType::Method => (
            enclosing_class_name(node, source)?,
            declared_name(node, source)?,
        ),
        ChunkType::Field => (enclosing_class_name(node, source)?, field_name(node, source)?),
    };

    let metadata = match chunk_type {
        ChunkType::Method => method_metadata(node, source)?,
        ChunkType::Class => class_metadata(node, source)?,
        ChunkType::Interface => interface_metadata(node, source)?,
        ChunkType::Field => field_metadata(node, source)?,
    };

    Ok(CodeChunk {
        content,
        source_file: source_file.to_string(),
        class_name,
        method_name,
        start_line,
        end_line,
        chunk_type,
        metadata,
    })
}

/// Header text from the start line up to, not including, the line where the body opens
fn class_header<N: SyntaxNode>(
    node: &N,
    source: &SourceText<'_>,
) -> Result<String, ExtractionError> {
    let start = node.start_row();
    let end = match node.child_of_kind("class_body") {
        Some(body) => body.start_row().max(start + 1),
        None => start + 1,
    };
    Ok(source.rows(start..end, node.kind())?.trim().to_string())
}

/// First `identifier` child, if any
fn declared_name<N: SyntaxNode>(
    node: &N,
    source: &SourceText<'_>,
) -> Result<Option<String>, ExtractionError> {
    node.child_of_kind("identifier")
        .map(|ident| ident.text(source).map(str::to_string))
        .transpose()
}

/// Name of the first declarator of a field
fn field_name<N: SyntaxNode>(
    node: &N,
    source: &SourceText<'_>,
) -> Result<Option<String>, ExtractionError> {
    match node.child_of_kind("variable_declarator") {
        Some(declarator) => declared_name(&declarator, source),
        None => declared_name(node, source),
    }
}

/// Walk parent links up to the nearest class declaration
fn enclosing_class_name<N: SyntaxNode>(
    node: &N,
    source: &SourceText<'_>,
) -> Result<Option<String>, ExtractionError> {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if ancestor.kind() == "class_declaration" {
            return declared_name(&ancestor, source);
        }
        current = ancestor.parent();
    }
    Ok(None)
}

fn texts<N: SyntaxNode>(
    nodes: impl IntoIterator<Item = N>,
    source: &SourceText<'_>,
) -> Result<Vec<String>, ExtractionError> {
    nodes
        .into_iter()
        .map(|n| n.text(source).map(str::to_string))
        .collect()
}

fn modifiers<N: SyntaxNode>(node: &N) -> Vec<String> {
    node.child_of_kind("modifiers")
        .map(|mods| {
            mods.children()
                .iter()
                .map(|m| m.kind())
                .filter(|kind| MODIFIER_VOCABULARY.contains(kind))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Annotations directly on the declaration, including those grouped under `modifiers`
fn annotations<N: SyntaxNode>(
    node: &N,
    source: &SourceText<'_>,
) -> Result<Vec<String>, ExtractionError> {
    let mut found = Vec::new();
    for child in node.children() {
        if ANNOTATION_KINDS.contains(&child.kind()) {
            found.push(child);
        } else if child.kind() == "modifiers" {
            found.extend(
                child
                    .children()
                    .into_iter()
                    .filter(|m| ANNOTATION_KINDS.contains(&m.kind())),
            );
        }
    }
    texts(found, source)
}

fn first_type<N: SyntaxNode>(
    node: &N,
    source: &SourceText<'_>,
) -> Result<Option<String>, ExtractionError> {
    node.children()
        .into_iter()
        .find(|c| is_type_kind(c.kind()))
        .map(|t| t.text(source).map(str::to_string))
        .transpose()
}

/// Types listed under `wrapper > type_list`
fn type_list<N: SyntaxNode>(
    node: &N,
    wrapper: &str,
    source: &SourceText<'_>,
) -> Result<Vec<String>, ExtractionError> {
    let Some(list) = node
        .child_of_kind(wrapper)
        .and_then(|w| w.child_of_kind("type_list"))
    else {
        return Ok(Vec::new());
    };
    texts(
        list.children().into_iter().filter(|c| is_type_kind(c.kind())),
        source,
    )
}

fn method_metadata<N: SyntaxNode>(
    node: &N,
    source: &SourceText<'_>,
) -> Result<ChunkMetadata, ExtractionError> {
    let parameters = match node.child_of_kind("formal_parameters") {
        Some(params) => texts(
            params
                .children()
                .into_iter()
                .filter(|p| PARAMETER_KINDS.contains(&p.kind())),
            source,
        )?,
        None => Vec::new(),
    };

    let mut metadata = ChunkMetadata::new();
    metadata.insert(MODIFIERS.into(), MetadataValue::List(modifiers(node)));
    metadata.insert(PARAMETERS.into(), MetadataValue::List(parameters));
    metadata.insert(
        ANNOTATIONS.into(),
        MetadataValue::List(annotations(node, source)?),
    );
    if let Some(return_type) = first_type(node, source)? {
        metadata.insert(RETURN_TYPE.into(), MetadataValue::Scalar(return_type));
    }
    Ok(metadata)
}

fn class_metadata<N: SyntaxNode>(
    node: &N,
    source: &SourceText<'_>,
) -> Result<ChunkMetadata, ExtractionError> {
    let mut metadata = ChunkMetadata::new();
    metadata.insert(MODIFIERS.into(), MetadataValue::List(modifiers(node)));
    metadata.insert(
        IMPLEMENTS.into(),
        MetadataValue::List(type_list(node, "super_interfaces", source)?),
    );
    metadata.insert(
        ANNOTATIONS.into(),
        MetadataValue::List(annotations(node, source)?),
    );
    if let Some(superclass) = node.child_of_kind("superclass")
        && let Some(extends) = first_type(&superclass, source)?
    {
        metadata.insert(EXTENDS.into(), MetadataValue::Scalar(extends));
    }
    Ok(metadata)
}

fn interface_metadata<N: SyntaxNode>(
    node: &N,
    source: &SourceText<'_>,
) -> Result<ChunkMetadata, ExtractionError> {
    let mut metadata = ChunkMetadata::new();
    metadata.insert(MODIFIERS.into(), MetadataValue::List(modifiers(node)));
    metadata.insert(
        EXTENDS.into(),
        MetadataValue::List(type_list(node, "extends_interfaces", source)?),
    );
    metadata.insert(
        ANNOTATIONS.into(),
        MetadataValue::List(annotations(node, source)?),
    );
    Ok(metadata)
}

fn field_metadata<N: SyntaxNode>(
    node: &N,
    source: &SourceText<'_>,
) -> Result<ChunkMetadata, ExtractionError> {
    let mut metadata = ChunkMetadata::new();
    metadata.insert(MODIFIERS.into(), MetadataValue::List(modifiers(node)));
    metadata.insert(
        ANNOTATIONS.into(),
        MetadataValue::List(annotations(node, source)?),
    );
    if let Some(field_type) = first_type(node, source)? {
        metadata.insert(FIELD_TYPE.into(), MetadataValue::Scalar(field_type));
    }
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::ast_parser::JavaParser;
    use tree_sitter::Node;

    fn find<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
        if SyntaxNode::kind(&node) == kind {
            return Some(node);
        }
        SyntaxNode::children(&node)
            .into_iter()
            .find_map(|child| find(child, kind))
    }

    fn normalize_first(src: &str, kind: &str, chunk_type: ChunkType) -> CodeChunk {
        let mut parser = JavaParser::new().unwrap();
        let tree = parser.parse(src, "Test.java").unwrap();
        let node = find(tree.root_node(), kind).unwrap();
        normalize(&node, chunk_type, &SourceText::new(src), "Test.java").unwrap()
    }

    fn list(chunk: &CodeChunk, key: &str) -> Vec<String> {
        match chunk.metadata.get(key) {
            Some(MetadataValue::List(items)) => items.clone(),
            other => panic!("expected list for {key}, got {other:?}"),
        }
    }

    fn scalar(chunk: &CodeChunk, key: &str) -> Option<String> {
        match chunk.metadata.get(key) {
            Some(MetadataValue::Scalar(s)) => Some(s.clone()),
            None => None,
            other => panic!("expected scalar for {key}, got {other:?}"),
        }
    }

    #[test]
    fn test_method_metadata() {
        let src = "class Repo {\n    @Override\n    public static final List<String> find(int id, String... names) {\n        return null;\n    }\n}\n";
        let chunk = normalize_first(src, "method_declaration", ChunkType::Method);

        assert_eq!(chunk.class_name.as_deref(), Some("Repo"));
        assert_eq!(chunk.method_name.as_deref(), Some("find"));
        assert_eq!(chunk.start_line, 2);
        assert_eq!(chunk.end_line, 5);
        assert!(chunk.content.starts_with("@Override"));
        assert!(chunk.content.ends_with('}'));
        assert_eq!(list(&chunk, MODIFIERS), vec!["public", "static", "final"]);
        assert_eq!(
            list(&chunk, PARAMETERS),
            vec!["int id", "String... names"]
        );
        assert_eq!(list(&chunk, ANNOTATIONS), vec!["@Override"]);
        assert_eq!(scalar(&chunk, RETURN_TYPE).as_deref(), Some("List<String>"));
        assert!(!chunk.metadata.contains_key(EXTENDS));
    }

    #[test]
    fn test_void_method_without_modifiers() {
        let src = "class A { void run() {} }";
        let chunk = normalize_first(src, "method_declaration", ChunkType::Method);

        assert_eq!(scalar(&chunk, RETURN_TYPE).as_deref(), Some("void"));
        assert!(list(&chunk, MODIFIERS).is_empty());
        assert!(list(&chunk, PARAMETERS).is_empty());
    }

    #[test]
    fn test_class_header_and_span() {
        let src = "@Entity\npublic abstract class Order extends Base implements Serializable, Comparable<Order>\n{\n    int id;\n}\n";
        let chunk = normalize_first(src, "class_declaration", ChunkType::Class);

        assert_eq!(chunk.class_name.as_deref(), Some("Order"));
        assert_eq!(chunk.method_name, None);
        assert_eq!(chunk.start_line, 1);
        assert_eq!(chunk.end_line, 11);
        assert_eq!(
            chunk.content,
            "@Entity\npublic abstract class Order extends Base implements Serializable, Comparable<Order>"
        );
        assert_eq!(list(&chunk, MODIFIERS), vec!["public", "abstract"]);
        assert_eq!(list(&chunk, ANNOTATIONS), vec!["@Entity"]);
        assert_eq!(scalar(&chunk, EXTENDS).as_deref(), Some("Base"));
        assert_eq!(
            list(&chunk, IMPLEMENTS),
            vec!["Serializable", "Comparable<Order>"]
        );
    }

    #[test]
    fn test_class_body_on_same_line_keeps_start_line() {
        let src = "public class Foo {\n    void a() {}\n}\n";
        let chunk = normalize_first(src, "class_declaration", ChunkType::Class);

        assert_eq!(chunk.content, "public class Foo {");
        assert_eq!(chunk.end_line, chunk.start_line + CLASS_SPAN_LINES);
        assert!(!chunk.metadata.contains_key(EXTENDS));
        assert!(list(&chunk, IMPLEMENTS).is_empty());
    }

    #[test]
    fn test_nested_class_header_is_trimmed() {
        let src = "class Outer {\n    static final class Inner {\n        int x;\n    }\n}\n";
        let mut parser = JavaParser::new().unwrap();
        let tree = parser.parse(src, "Test.java").unwrap();
        let body = find(tree.root_node(), "class_body").unwrap();
        let inner = find(body, "class_declaration").unwrap();
        let chunk = normalize(&inner, ChunkType::Class, &SourceText::new(src), "Test.java").unwrap();

        assert_eq!(chunk.content, "static final class Inner {");
        assert_eq!(chunk.class_name.as_deref(), Some("Inner"));
        assert_eq!(chunk.start_line, 2);
    }

    #[test]
    fn test_interface_is_whole() {
        let src = "public interface Shape extends Comparable<Shape>, Cloneable {\n    double area();\n}\n";
        let chunk = normalize_first(src, "interface_declaration", ChunkType::Interface);

        assert_eq!(chunk.class_name.as_deref(), Some("Shape"));
        assert_eq!(chunk.start_line, 1);
        assert_eq!(chunk.end_line, 3);
        assert!(chunk.content.ends_with('}'));
        assert_eq!(list(&chunk, EXTENDS), vec!["Comparable<Shape>", "Cloneable"]);
    }

    #[test]
    fn test_field_metadata() {
        let src = "class Cfg {\n    @Inject private static final Map<String, Integer> LIMITS = null;\n}\n";
        let chunk = normalize_first(src, "field_declaration", ChunkType::Field);

        assert_eq!(chunk.class_name.as_deref(), Some("Cfg"));
        assert_eq!(chunk.method_name.as_deref(), Some("LIMITS"));
        assert_eq!(list(&chunk, MODIFIERS), vec!["private", "static", "final"]);
        assert_eq!(list(&chunk, ANNOTATIONS), vec!["@Inject"]);
        assert_eq!(
            scalar(&chunk, FIELD_TYPE).as_deref(),
            Some("Map<String, Integer>")
        );
    }

    #[test]
    fn test_interface_method_has_no_class() {
        let src = "interface Api { String name(); }";
        let chunk = normalize_first(src, "method_declaration", ChunkType::Method);

        assert_eq!(chunk.class_name, None);
        assert_eq!(chunk.method_name.as_deref(), Some("name"));
    }

    #[test]
    fn test_nested_method_uses_nearest_class() {
        let src = "class Outer {\n  class Inner {\n    void go() {}\n  }\n}\n";
        let chunk = normalize_first(src, "method_declaration", ChunkType::Method);
        assert_eq!(chunk.class_name.as_deref(), Some("Inner"));
    }
}
