//! # Codec Context - Shared Encoding Environment
//!
//! ## Purpose
//!
//! Bundles what every encode and decode needs: the [`TypeRegistry`], an
//! optional [`TaxonomyResolver`] and the [`CodecConfig`]. A context is cheap
//! to clone and is the entry point for one-shot encoding and decoding.
//!
//! ```text
//! CodecContext ──> MessageWriter  (Write)
//!              ──> StreamReader   (ByteSource, element at a time)
//!              ──> MessageReader  (ByteSource, whole envelopes)
//!              ──> SizeCalculator (sizes only)
//! ```

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::builder::MessageReader;
use crate::config::CodecConfig;
use crate::constants::NO_TAXONOMY;
use crate::envelope::MessageEnvelope;
use crate::error::{CodecError, CodecResult};
use crate::reader::StreamReader;
use crate::registry::TypeRegistry;
use crate::size::SizeCalculator;
use crate::source::{ByteSource, BytesSource};
use crate::taxonomy::{Taxonomy, TaxonomyResolver};
use crate::writer::MessageWriter;

/// Registry, taxonomy resolver and configuration for encoding and decoding
#[derive(Clone, Default)]
pub struct CodecContext {
    registry: Arc<TypeRegistry>,
    resolver: Option<Arc<dyn TaxonomyResolver>>,
    config: CodecConfig,
}

impl CodecContext {
    /// Standard types, no taxonomies, default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard types with configuration read from the environment
    pub fn from_env() -> Self {
        Self::default().with_config(CodecConfig::from_env())
    }

    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn TaxonomyResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> Option<&Arc<dyn TaxonomyResolver>> {
        self.resolver.as_ref()
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode one envelope into a new buffer
    pub fn to_bytes(&self, envelope: &MessageEnvelope) -> CodecResult<Bytes> {
        let size = self.encoded_size(envelope)?;
        let mut buffer = Vec::with_capacity(size as usize);
        self.encode_into(envelope, &mut buffer)?;
        Ok(Bytes::from(buffer))
    }

    /// Encode one envelope onto `output`, returning its total size
    pub fn encode_into<W: Write>(&self, envelope: &MessageEnvelope, output: W) -> CodecResult<u32> {
        MessageWriter::new(output, self.clone()).write_envelope(envelope)
    }

    /// Decode the first envelope in `bytes`
    pub fn decode(&self, bytes: impl Into<Bytes>) -> CodecResult<MessageEnvelope> {
        self.message_reader(BytesSource::new(bytes))
            .read_envelope()?
            .ok_or_else(|| CodecError::framing(0, "input holds no envelope"))
    }

    /// Total encoded size of an envelope, header included
    pub fn encoded_size(&self, envelope: &MessageEnvelope) -> CodecResult<u32> {
        self.size_calculator(envelope.taxonomy_id())
            .envelope_size(envelope.message())
    }

    pub fn size_calculator(&self, taxonomy_id: i16) -> SizeCalculator<'_> {
        SizeCalculator::new(self, taxonomy_id)
    }

    pub fn stream_reader<S: ByteSource>(&self, source: S) -> StreamReader<S> {
        StreamReader::new(source, self.clone())
    }

    pub fn message_reader<S: ByteSource>(&self, source: S) -> MessageReader<S> {
        MessageReader::new(source, self.clone())
    }

    pub fn message_writer<W: Write>(&self, output: W) -> MessageWriter<W> {
        MessageWriter::new(output, self.clone())
    }

    /// Taxonomy for an envelope's id; misses are logged and yield `None`
    pub(crate) fn resolve_taxonomy(&self, taxonomy_id: i16) -> Option<Arc<dyn Taxonomy>> {
        if taxonomy_id == NO_TAXONOMY {
            return None;
        }
        let taxonomy = self
            .resolver
            .as_ref()
            .and_then(|resolver| resolver.resolve(taxonomy_id));
        if taxonomy.is_none() {
            debug!("No taxonomy for id {}; names pass through unchanged", taxonomy_id);
        }
        taxonomy
    }
}

impl fmt::Debug for CodecContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecContext")
            .field("registry", &self.registry)
            .field("has_resolver", &self.resolver.is_some())
            .field("config", &self.config)
            .finish()
    }
}
