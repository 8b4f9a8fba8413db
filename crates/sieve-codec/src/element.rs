use bson::spec::ElementType;

/// Documents and arrays share the same length-prefixed layout.
pub fn is_container(tag: ElementType) -> bool {
    matches!(tag, ElementType::EmbeddedDocument | ElementType::Array)
}

/// Payload size for types whose encoding has no length prefix.
/// `None` for variable-length types.
pub(crate) fn fixed_size(tag: ElementType) -> Option<usize> {
    match tag {
        ElementType::Double
        | ElementType::DateTime
        | ElementType::Timestamp
        | ElementType::Int64 => Some(8),
        ElementType::Int32 => Some(4),
        ElementType::Boolean => Some(1),
        ElementType::ObjectId => Some(12),
        ElementType::Decimal128 => Some(16),
        ElementType::Undefined | ElementType::Null | ElementType::MinKey | ElementType::MaxKey => {
            Some(0)
        }
        ElementType::String
        | ElementType::EmbeddedDocument
        | ElementType::Array
        | ElementType::Binary
        | ElementType::RegularExpression
        | ElementType::DbPointer
        | ElementType::JavaScriptCode
        | ElementType::Symbol
        | ElementType::JavaScriptCodeWithScope => None,
    }
}
