use crate::types::CodeChunk;
use uuid::Uuid;

/// Namespace for chunk identities. Changing it changes every stored id.
pub const CHUNK_NAMESPACE: Uuid = Uuid::NAMESPACE_DNS;

/// Colon-joined identity key: `source:start:end:type[:class][:method]`
pub fn identity_key(chunk: &CodeChunk) -> String {
    let mut parts = vec![
        chunk.source_file.clone(),
        chunk.start_line.to_string(),
        chunk.end_line.to_string(),
        chunk.chunk_type.as_str().to_string(),
    ];
    if let Some(class_name) = &chunk.class_name {
        parts.push(class_name.clone());
    }
    if let Some(method_name) = &chunk.method_name {
        parts.push(method_name.clone());
    }
    parts.join(":")
}

/// Deterministic chunk identity (name-based UUIDv5)
pub fn chunk_id(chunk: &CodeChunk) -> String {
    Uuid::new_v5(&CHUNK_NAMESPACE, identity_key(chunk).as_bytes()).to_string()
}
