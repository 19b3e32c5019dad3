use crate::types::CodeChunk;

/// Metadata key never repeated in the summary line
const CONTENT_KEY: &str = "content";

/// Render a chunk into the text that gets embedded.
///
/// Parts, in fixed order and separated by a blank line: class context, method
/// context, type label, code, metadata summary.
pub fn compose_document(chunk: &CodeChunk) -> String {
    let mut parts = Vec::with_capacity(5);

    if let Some(class_name) = &chunk.class_name {
        parts.push(format!("Class: {}", class_name));
    }
    if let Some(method_name) = &chunk.method_name {
        parts.push(format!("Method: {}", method_name));
    }
    parts.push(format!("Type: {}", chunk.chunk_type));
    parts.push(format!("Code:\n{}", chunk.content));

    let summary = metadata_summary(chunk);
    if !summary.is_empty() {
        parts.push(format!("Metadata: {}", summary));
    }

    parts.join("\n\n")
}

/// `key: value` pairs in key order, skipping empty values
fn metadata_summary(chunk: &CodeChunk) -> String {
    chunk
        .metadata
        .iter()
        .filter(|(key, value)| key.as_str() != CONTENT_KEY && !value.is_empty())
        .map(|(key, value)| format!("{}: {}", key, value.to_stored()))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkMetadata, ChunkType, MetadataValue};

    fn method_chunk() -> CodeChunk {
        let mut metadata = ChunkMetadata::new();
        metadata.insert(
            "modifiers".into(),
            MetadataValue::List(vec!["public".into(), "static".into()]),
        );
        metadata.insert(
            "parameters".into(),
            MetadataValue::List(vec!["int a".into(), "int b".into()]),
        );
        metadata.insert("annotations".into(), MetadataValue::List(vec![]));
        metadata.insert("return_type".into(), MetadataValue::from("int"));

        CodeChunk {
            content: "public static int add(int a, int b) { return a + b; }".into(),
            source_file: "MathUtil.java".into(),
            class_name: Some("MathUtil".into()),
            method_name: Some("add".into()),
            start_line: 2,
            end_line: 2,
            chunk_type: ChunkType::Method,
            metadata,
        }
    }

    #[test]
    fn test_compose_method_document() {
        let doc = compose_document(&method_chunk());
        assert_eq!(
            doc,
            "Class: MathUtil\n\nMethod: add\n\nType: method\n\nCode:\npublic static int add(int a, int b) { return a + b; }\n\nMetadata: modifiers: public, static; parameters: int a, int b; return_type: int"
        );
    }

    #[test]
    fn test_compose_is_reproducible() {
        assert_eq!(
            compose_document(&method_chunk()),
            compose_document(&method_chunk())
        );
    }

    #[test]
    fn test_compose_without_context_or_metadata() {
        let mut chunk = method_chunk();
        chunk.class_name = None;
        chunk.method_name = None;
        chunk.metadata.clear();
        chunk.content = "int x;".into();

        assert_eq!(compose_document(&chunk), "Type: method\n\nCode:\nint x;");
    }

    #[test]
    fn test_content_key_is_skipped() {
        let mut chunk = method_chunk();
        chunk.metadata.clear();
        chunk
            .metadata
            .insert("content".into(), MetadataValue::from("dup"));
        assert!(!compose_document(&chunk).contains("Metadata:"));
    }
}
