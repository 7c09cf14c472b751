//! # Message Codec
//!
//! Handlers never see generated structs. They ask a [`MessageCodec`] to turn a payload into a
//! [`FieldMap`] (field name → typed value) for a given schema name, and to turn a `FieldMap` back
//! into bytes.
//!
//! ## DescriptorCodec
//!
//! The provided implementation resolves schemas in a `prost_reflect::DescriptorPool`:
//!
//! 1. **Decode (Proto -> Fields)**:
//!    - Decodes the bytes into a `DynamicMessage` of the requested schema.
//!    - Serializes it into a `serde_json::Map`, keeping default valued fields so that an empty
//!      string is still reported as present.
//!
//! 2. **Encode (Fields -> Proto)**:
//!    - Validates the map against the schema through `DynamicMessage::deserialize`.
//!    - Encodes the message into Protobuf bytes.
use bytes::Bytes;
use prost::Message;
use prost_reflect::{
    DescriptorError, DescriptorPool, DynamicMessage, MessageDescriptor, SerializeOptions,
};

/// Decoded message fields, keyed by their proto field name.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Message schema '{0}' not found in the descriptor pool")]
    UnknownSchema(String),
    #[error("Failed to decode '{schema}' from Protobuf bytes: {source}")]
    Decode {
        schema: String,
        #[source]
        source: prost::DecodeError,
    },
    #[error("Failed to map '{schema}' to fields: {source}")]
    Fields {
        schema: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Fields do not match the '{schema}' schema: {source}")]
    Encode {
        schema: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Message '{0}' does not map to a set of fields")]
    NotAnObject(String),
}

/// Generic field access to schema typed messages.
pub trait MessageCodec: Send + Sync + 'static {
    /// Decodes `payload` as a message of type `schema`.
    fn decode(&self, schema: &str, payload: &[u8]) -> Result<FieldMap, CodecError>;

    /// Encodes `fields` as a message of type `schema`.
    fn encode(&self, schema: &str, fields: FieldMap) -> Result<Bytes, CodecError>;
}

/// A [`MessageCodec`] backed by a descriptor pool.
#[derive(Debug, Clone)]
pub struct DescriptorCodec {
    pool: DescriptorPool,
}

impl DescriptorCodec {
    pub fn new(pool: DescriptorPool) -> Self {
        Self { pool }
    }

    /// Builds a codec from an encoded `FileDescriptorSet`.
    pub fn from_file_descriptor_set(bytes: &[u8]) -> Result<Self, DescriptorError> {
        let pool = DescriptorPool::decode(bytes)?;
        Ok(Self::new(pool))
    }

    /// Looks up a message by its fully qualified name, falling back to its short name
    /// (`EchoRequest` resolves to `echo.EchoRequest`).
    pub fn message_descriptor(&self, schema: &str) -> Result<MessageDescriptor, CodecError> {
        self.pool
            .get_message_by_name(schema)
            .or_else(|| self.pool.all_messages().find(|m| m.name() == schema))
            .ok_or_else(|| CodecError::UnknownSchema(schema.to_string()))
    }
}

impl MessageCodec for DescriptorCodec {
    fn decode(&self, schema: &str, payload: &[u8]) -> Result<FieldMap, CodecError> {
        let desc = self.message_descriptor(schema)?;

        let msg = DynamicMessage::decode(desc, payload).map_err(|source| CodecError::Decode {
            schema: schema.to_string(),
            source,
        })?;

        let options = SerializeOptions::new()
            .skip_default_fields(false)
            .use_proto_field_name(true);

        let value = msg
            .serialize_with_options(serde_json::value::Serializer, &options)
            .map_err(|source| CodecError::Fields {
                schema: schema.to_string(),
                source,
            })?;

        match value {
            serde_json::Value::Object(fields) => Ok(fields),
            _ => Err(CodecError::NotAnObject(schema.to_string())),
        }
    }

    fn encode(&self, schema: &str, fields: FieldMap) -> Result<Bytes, CodecError> {
        let desc = self.message_descriptor(schema)?;

        // serde_json::Value implements Deserializer, so the map can be validated directly.
        let msg = DynamicMessage::deserialize(desc, serde_json::Value::Object(fields)).map_err(
            |source| CodecError::Encode {
                schema: schema.to_string(),
                source,
            },
        )?;

        Ok(Bytes::from(msg.encode_to_vec()))
    }
}
