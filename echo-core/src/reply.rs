//! # Reply Builder
//!
//! Pure helpers shared by both handlers: read the `text` field of a request, and build the
//! encoded reply for it.
use crate::{
    codec::{CodecError, FieldMap, MessageCodec},
    error::DecodeError,
};
use bytes::Bytes;

/// The single field of interest in both echo messages.
pub const TEXT_FIELD: &str = "text";

/// Builds the encoded `schema` reply whose `text` is `prefix` followed by `field_value`.
pub fn build_reply<C>(
    codec: &C,
    schema: &str,
    field_value: &str,
    prefix: &str,
) -> Result<Bytes, CodecError>
where
    C: MessageCodec + ?Sized,
{
    let mut fields = FieldMap::new();
    fields.insert(
        TEXT_FIELD.to_string(),
        serde_json::Value::String(format!("{prefix}{field_value}")),
    );
    codec.encode(schema, fields)
}

/// Decodes `payload` as `schema` and extracts its `text` field.
pub fn decode_text<C>(codec: &C, schema: &str, payload: &[u8]) -> Result<String, DecodeError>
where
    C: MessageCodec + ?Sized,
{
    let mut fields = codec.decode(schema, payload)?;

    match fields.remove(TEXT_FIELD) {
        Some(serde_json::Value::String(text)) => Ok(text),
        _ => Err(DecodeError::MissingField {
            schema: schema.to_string(),
            field: TEXT_FIELD.to_string(),
        }),
    }
}
