//! Lazy sub-message tests
//!
//! Sub-messages read lazily keep their encoded bytes. Writing them back under
//! the same taxonomy must reproduce the input exactly; writing them under a
//! different taxonomy must decode and re-encode so names are not lost.

use std::sync::Arc;

use codec::{
    BytesSource, CodecConfig, CodecContext, CodecError, EncodedMessage, EnvelopeHeader, Field,
    FieldValue, MapTaxonomy, MapTaxonomyResolver, Message, MessageEnvelope, NO_TAXONOMY,
};

fn lazy_context() -> CodecContext {
    let resolver = MapTaxonomyResolver::new()
        .with_taxonomy(5, [(1, "source")].into_iter().collect::<MapTaxonomy>())
        .with_taxonomy(6, [(3, "other")].into_iter().collect::<MapTaxonomy>());
    CodecContext::new()
        .with_resolver(Arc::new(resolver))
        .with_config(CodecConfig::default().with_lazy_reads(true))
}

fn order(taxonomy_id: i16) -> MessageEnvelope {
    let mut venue = Message::new();
    venue.add_named("mic", "XLON");
    let mut meta = Message::new();
    meta.add_named("source", "feedA").add_named("venue", venue);
    let mut message = Message::new();
    message
        .add_named("qty", 100i64)
        .add_named("meta", meta)
        .add_named("price", 99.5);
    MessageEnvelope::with_header(EnvelopeHeader::with_taxonomy(taxonomy_id), message)
}

#[test]
fn test_pass_through_is_byte_identical() {
    let context = lazy_context();
    for taxonomy_id in [NO_TAXONOMY, 5] {
        let original = context.to_bytes(&order(taxonomy_id)).unwrap();
        let lazy = context.decode(original.clone()).unwrap();

        let meta = lazy.message().value_by_name("meta").unwrap();
        assert!(matches!(meta, FieldValue::Encoded(encoded) if !encoded.is_decoded()));

        let rewritten = context.to_bytes(&lazy).unwrap();
        assert_eq!(rewritten, original, "taxonomy {taxonomy_id}");
    }
}

fn volume_resolver() -> Arc<MapTaxonomyResolver> {
    let taxonomy: MapTaxonomy = [(1, "source"), (2, "volume"), (4, "meta")].into_iter().collect();
    Arc::new(MapTaxonomyResolver::new().with_taxonomy(7, taxonomy))
}

#[test]
fn test_pass_through_keeps_ordinals_and_names_as_read() {
    // Written without compression: ordinal-only and name+ordinal fields side by side
    let writer = CodecContext::new()
        .with_resolver(volume_resolver())
        .with_config(CodecConfig::default().with_compress_names(false));
    let mut meta = Message::new();
    meta.add_ordinal(1, "feedA")
        .add_field(Field::new(Some("source".into()), Some(1), "feedB"));
    let mut message = Message::new();
    message
        .add_ordinal(2, 250)
        .add_field(Field::new(Some("volume".into()), Some(2), 251))
        .add_ordinal(4, meta)
        .add_named("price", 99.5);
    let original = writer
        .to_bytes(&MessageEnvelope::with_header(EnvelopeHeader::with_taxonomy(7), message))
        .unwrap();

    for compress_names in [false, true] {
        for lazy_reads in [false, true] {
            let context = CodecContext::new().with_resolver(volume_resolver()).with_config(
                CodecConfig::default()
                    .with_compress_names(compress_names)
                    .with_lazy_reads(lazy_reads),
            );
            let decoded = context.decode(original.clone()).unwrap();

            let volumes: Vec<_> = decoded.message().fields_by_ordinal(2).collect();
            assert_eq!(volumes.len(), 2);
            assert_eq!(volumes[0].name(), Some("volume"));
            assert!(volumes[0].is_name_from_taxonomy());
            assert!(!volumes[1].is_name_from_taxonomy());

            let rewritten = context.to_bytes(&decoded).unwrap();
            assert_eq!(
                rewritten, original,
                "compress_names {compress_names}, lazy_reads {lazy_reads}"
            );
        }
    }
}

#[test]
fn test_decoded_fields_follow_the_new_taxonomy_when_moved() {
    let context = CodecContext::new().with_resolver(volume_resolver());
    let mut message = Message::new();
    message.add_ordinal(2, 250);
    let bytes = context
        .to_bytes(&MessageEnvelope::with_header(EnvelopeHeader::with_taxonomy(7), message))
        .unwrap();
    let decoded = context.decode(bytes.clone()).unwrap();

    // Without a taxonomy the filled-in name is written out in full
    let moved = MessageEnvelope::new(decoded.message().clone());
    let rewritten = context.to_bytes(&moved).unwrap();
    assert!(rewritten.len() > bytes.len());
    let reread = context.decode(rewritten).unwrap();
    let field = reread.message().get(0).unwrap();
    assert_eq!((field.name(), field.ordinal()), (Some("volume"), Some(2)));
    assert!(!field.is_name_from_taxonomy());
}

fn chain(levels: usize) -> Message {
    let mut level = Message::new();
    level.add_named("leaf", 1);
    for _ in 0..levels {
        let mut parent = Message::new();
        parent.add_named("child", level);
        level = parent;
    }
    level
}

#[test]
fn test_lazy_handle_decodes_from_its_capture_depth() {
    // Sub-messages at levels 1, 2 and 3
    let bytes = CodecContext::new()
        .to_bytes(&MessageEnvelope::new(chain(3)))
        .unwrap();
    let strict = CodecContext::new().with_config(
        CodecConfig::default()
            .with_lazy_reads(true)
            .with_max_nesting_depth(2),
    );

    // Only the level 1 header is checked while skipping
    let lazy = strict.decode(bytes).unwrap();
    let handle = lazy
        .message()
        .value_by_name("child")
        .and_then(FieldValue::as_encoded)
        .unwrap();
    assert_eq!(handle.depth(), 1);

    // An eager decode walks every level below the handle
    let eager = CodecContext::new().with_config(CodecConfig::default().with_max_nesting_depth(2));
    let error = handle.decode(&eager).unwrap_err();
    assert!(matches!(error, CodecError::Framing { .. }), "{error}");
    assert!(handle.decode(&CodecContext::new()).is_ok());
}

#[test]
fn test_nested_lazy_handles_record_their_level() {
    let context = CodecContext::new().with_config(CodecConfig::default().with_lazy_reads(true));
    let bytes = context.to_bytes(&MessageEnvelope::new(chain(3))).unwrap();
    let lazy = context.decode(bytes).unwrap();

    let outer = lazy
        .message()
        .value_by_name("child")
        .and_then(FieldValue::as_encoded)
        .unwrap();
    let inner = outer
        .decoded(&context)
        .unwrap()
        .value_by_name("child")
        .and_then(FieldValue::as_encoded)
        .unwrap();
    assert_eq!(outer.depth(), 1);
    assert_eq!(inner.depth(), 2);
}

#[test]
fn test_lazy_handle_written_deeper_is_checked_against_the_limit() {
    let context = CodecContext::new().with_config(
        CodecConfig::default()
            .with_lazy_reads(true)
            .with_max_nesting_depth(4),
    );
    let original = context.to_bytes(&MessageEnvelope::new(chain(3))).unwrap();
    let lazy = context.decode(original.clone()).unwrap();

    // Same position: written verbatim
    assert_eq!(context.to_bytes(&lazy).unwrap(), original);

    // Two levels further down its deepest sub-message lands at level 5
    let handle = lazy.message().value_by_name("child").cloned().unwrap();
    let mut inner = Message::new();
    inner.add_named("child", handle);
    let mut middle = Message::new();
    middle.add_named("wrap", inner);
    let mut outer = Message::new();
    outer.add_named("wrap", middle);

    let error = context.to_bytes(&MessageEnvelope::new(outer)).unwrap_err();
    assert!(matches!(error, CodecError::Framing { .. }), "{error}");
}

#[test]
fn test_lazy_and_eager_decodes_agree() {
    let context = lazy_context();
    let bytes = context.to_bytes(&order(NO_TAXONOMY)).unwrap();

    let eager_context = context
        .clone()
        .with_config(CodecConfig::default().with_lazy_reads(false));
    let eager = eager_context.decode(bytes.clone()).unwrap();
    let lazy = context.decode(bytes).unwrap();

    let encoded = lazy
        .message()
        .value_by_name("meta")
        .and_then(FieldValue::as_encoded)
        .unwrap();
    let meta = encoded.decoded(&eager_context).unwrap();
    assert_eq!(Some(meta), eager.message().message_by_name("meta"));
}

#[test]
fn test_moving_to_another_taxonomy_keeps_names() {
    let context = lazy_context();
    let bytes = context.to_bytes(&order(5)).unwrap();
    let lazy = context.decode(bytes).unwrap();

    // Same message, now under taxonomy 6 where "source" has no ordinal
    let moved = MessageEnvelope::with_header(
        EnvelopeHeader::with_taxonomy(6),
        lazy.message().clone(),
    );
    let rewritten = context.to_bytes(&moved).unwrap();

    let eager = context
        .clone()
        .with_config(CodecConfig::default())
        .decode(rewritten)
        .unwrap();
    let meta = eager.message().message_by_name("meta").unwrap();
    assert_eq!(meta.value_by_name("source").and_then(FieldValue::as_str), Some("feedA"));
    assert_eq!(
        meta.message_by_name("venue")
            .and_then(|venue| venue.value_by_name("mic"))
            .and_then(FieldValue::as_str),
        Some("XLON")
    );
}

#[test]
fn test_caller_built_encoded_value() {
    let context = CodecContext::new();
    let mut inner = Message::new();
    inner.add_named("leg", 1).add_named("leg", 2);
    let inner_bytes = context.to_bytes(&MessageEnvelope::new(inner.clone())).unwrap();

    let mut outer = Message::new();
    outer.add_named(
        "legs",
        EncodedMessage::new(inner_bytes.slice(8..), NO_TAXONOMY),
    );
    let decoded = context
        .decode(context.to_bytes(&MessageEnvelope::new(outer)).unwrap())
        .unwrap();
    assert_eq!(decoded.message().message_by_name("legs"), Some(&inner));
}

#[test]
fn test_lazy_message_can_be_edited_before_rewrite() {
    let context = lazy_context();
    let bytes = context.to_bytes(&order(NO_TAXONOMY)).unwrap();
    let mut lazy = context.decode(bytes).unwrap();

    lazy.message_mut().remove_by_name(Some("price"));
    lazy.message_mut().add_named("price", 101.0);
    let rewritten = context.to_bytes(&lazy).unwrap();

    let eager = CodecContext::new().decode(rewritten).unwrap();
    assert_eq!(
        eager.message().value_by_name("price").and_then(FieldValue::as_f64),
        Some(101.0)
    );
    assert!(eager.message().message_by_name("meta").is_some());
}

#[test]
fn test_lazy_reader_over_several_envelopes() {
    let context = lazy_context();
    let mut stream = Vec::new();
    for taxonomy_id in [NO_TAXONOMY, 5, 6] {
        context.encode_into(&order(taxonomy_id), &mut stream).unwrap();
    }

    let envelopes: Vec<_> = context
        .message_reader(BytesSource::new(stream))
        .collect::<Result<_, _>>()
        .unwrap();
    let taxonomies: Vec<_> = envelopes
        .iter()
        .map(|envelope| {
            envelope
                .message()
                .value_by_name("meta")
                .and_then(FieldValue::as_encoded)
                .map(EncodedMessage::taxonomy_id)
        })
        .collect();
    assert_eq!(taxonomies, vec![Some(NO_TAXONOMY), Some(5), Some(6)]);
}
