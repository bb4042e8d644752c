//! # Fudge Codec - Self-Describing Binary Messages
//!
//! ## Purpose
//!
//! This crate contains the "Rules" layer of the Fudge message format:
//! - Field type registry mapping wire type ids to native values
//! - Hierarchical messages of named and/or ordinal fields
//! - Envelope encoding with taxonomy-driven name compression
//! - Streaming, element-at-a-time decoding with lazy sub-messages
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → applications
//!     ↑           ↓            ↓
//! Pure Data   Wire Rules    Messages over
//! Date/Time   Registry      files, sockets,
//! Values      Read/Write    queues
//! ```
//!
//! ## Encoding Pipeline
//!
//! ```text
//! Message ──SizeCalculator──> sizes ──MessageWriter──> bytes
//! bytes ──ByteSource──> StreamReader ──elements──> MessageReader ──> MessageEnvelope
//! ```
//!
//! ## What This Crate Contains
//! - [`TypeRegistry`]: lock-free registry of standard and custom field types
//! - [`Message`] / [`Field`] / [`FieldValue`]: the in-memory message model
//! - [`MessageWriter`] and [`SizeCalculator`]: envelope encoding
//! - [`StreamReader`] and [`MessageReader`]: envelope decoding
//! - [`Taxonomy`] / [`TaxonomyResolver`]: ordinal and name mappings
//! - [`CodecContext`] and [`CodecConfig`]: shared encoding environment
//!
//! ## What This Crate Does NOT Contain
//! - Date and time value types (belong in libs/types)
//! - Transport, framing beyond envelopes, or connection handling
//! - Taxonomy discovery or distribution; taxonomies are supplied by callers
//!
//! ## Quick Start
//!
//! ```
//! use codec::{CodecContext, EnvelopeHeader, Message, MessageEnvelope};
//!
//! let context = CodecContext::new();
//!
//! let mut meta = Message::new();
//! meta.add_named("source", "feedA");
//! let mut quote = Message::new();
//! quote.add_named("ask", 101.5).add_ordinal(2, 250).add_named("meta", meta);
//!
//! let envelope = MessageEnvelope::with_header(EnvelopeHeader::default(), quote);
//! let bytes = context.to_bytes(&envelope)?;
//! let decoded = context.decode(bytes)?;
//!
//! assert_eq!(decoded, envelope);
//! assert_eq!(decoded.message().value_by_ordinal(2).and_then(|v| v.as_i32()), Some(250));
//! # Ok::<(), codec::CodecError>(())
//! ```

pub mod builder;
pub mod config;
pub mod constants;
pub mod context;
pub mod encoded;
pub mod envelope;
pub mod error;
pub mod field_type;
pub mod message;
pub mod reader;
pub mod registry;
pub mod size;
pub mod source;
pub mod taxonomy;
pub mod value;
pub mod writer;

pub use builder::MessageReader;
pub use config::CodecConfig;
pub use constants::{
    FieldPrefix, StandardTypeId, ENVELOPE_HEADER_SIZE, MAX_NAME_LENGTH, MAX_VARIABLE_SIZE,
    NO_TAXONOMY, SUB_MESSAGE_TYPE_ID,
};
pub use context::CodecContext;
pub use encoded::EncodedMessage;
pub use envelope::{EnvelopeHeader, MessageEnvelope};
pub use error::{CodecError, CodecResult, ErrorCategory};
pub use field_type::{FieldCodec, FieldType, StandardKind, ValueCodec, Width};
pub use message::{Field, Message};
pub use reader::{StreamElement, StreamReader};
pub use registry::{RegistrySnapshot, TypeRegistry};
pub use size::SizeCalculator;
pub use source::{ByteSource, BytesSource, StreamSource};
pub use taxonomy::{MapTaxonomy, MapTaxonomyResolver, Taxonomy, TaxonomyResolver};
pub use value::{CustomValue, FieldValue, NativeType};

pub use types::{DateTimeAccuracy, FudgeDate, FudgeDateTime, FudgeTime, ValueError};
