//! Stream reader integration tests
//!
//! Exercises element-at-a-time decoding over forward-only sources: readers
//! that return a few bytes per call, early exit from an envelope, and lazy
//! reads falling back when the source cannot skip.

use std::io::{self, Read};

use codec::{
    ByteSource, BytesSource, CodecConfig, CodecContext, CodecError, FieldValue, Message,
    MessageEnvelope, StreamElement, StreamSource,
};

/// Reader handing out at most `chunk` bytes per call
struct Trickle {
    data: Vec<u8>,
    position: usize,
    chunk: usize,
}

impl Read for Trickle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = buf.len().min(self.chunk).min(self.data.len() - self.position);
        buf[..count].copy_from_slice(&self.data[self.position..self.position + count]);
        self.position += count;
        Ok(count)
    }
}

fn book() -> Message {
    let mut bids = Message::new();
    for level in 0..3 {
        let mut entry = Message::new();
        entry.add_named("price", 100.0 - level as f64).add_named("size", 10 * level);
        bids.add_named("level", entry);
    }
    let mut message = Message::new();
    message
        .add_named("symbol", "VOD.L")
        .add_named("bids", bids)
        .add_named("sequence", 42i64);
    message
}

fn encoded_stream(context: &CodecContext, count: usize) -> Vec<u8> {
    let mut stream = Vec::new();
    for _ in 0..count {
        context
            .encode_into(&MessageEnvelope::new(book()), &mut stream)
            .unwrap();
    }
    stream
}

#[test]
fn test_trickling_source_decodes_everything() {
    let context = CodecContext::new();
    let data = encoded_stream(&context, 3);
    let source = StreamSource::new(Trickle {
        data,
        position: 0,
        chunk: 3,
    });

    let messages: Vec<_> = context
        .message_reader(source)
        .map(|envelope| envelope.unwrap().into_message())
        .collect();
    assert_eq!(messages, vec![book(), book(), book()]);
}

#[test]
fn test_element_counts_and_depth() {
    let context = CodecContext::new();
    let data = encoded_stream(&context, 1);
    let mut reader = context.stream_reader(StreamSource::new(&data[..]));

    let mut starts = 0;
    let mut ends = 0;
    let mut simple = 0;
    let mut max_depth = 0;
    while let Some(element) = reader.next_element().unwrap() {
        match element {
            StreamElement::EnvelopeStart { total_size, .. } => {
                assert_eq!(total_size as usize, data.len())
            }
            StreamElement::SubMessageStart { .. } => starts += 1,
            StreamElement::SubMessageEnd => ends += 1,
            StreamElement::SimpleField(_) => simple += 1,
        }
        max_depth = max_depth.max(reader.depth());
    }
    assert_eq!((starts, ends, simple), (4, 4, 8));
    assert_eq!(max_depth, 2);
    assert!(reader.next_element().unwrap().is_none());
    assert_eq!(reader.offset() as usize, data.len());
}

#[test]
fn test_early_exit_then_next_envelope_needs_draining() {
    let context = CodecContext::new();
    let data = encoded_stream(&context, 2);
    let mut reader = context.stream_reader(BytesSource::new(data));

    // Read only the header and first field of the first envelope
    assert!(matches!(
        reader.next_element().unwrap(),
        Some(StreamElement::EnvelopeStart { .. })
    ));
    match reader.next_element().unwrap() {
        Some(StreamElement::SimpleField(field)) => {
            assert_eq!(field.value(), &FieldValue::from("VOD.L"))
        }
        other => panic!("expected symbol, got {other:?}"),
    }

    // Skip the order book without decoding it
    assert!(matches!(
        reader.next_element().unwrap(),
        Some(StreamElement::SubMessageStart { .. })
    ));
    let bids = reader.skip_sub_message().unwrap();
    assert!(!bids.is_empty());

    // Drain the rest; the second envelope follows
    while reader.next_element().unwrap().is_some() {}
    assert!(matches!(
        reader.next_element().unwrap(),
        Some(StreamElement::EnvelopeStart { .. })
    ));
}

#[test]
fn test_lazy_config_over_stream_falls_back_once() {
    let context = CodecContext::new().with_config(CodecConfig::default().with_lazy_reads(true));
    let data = encoded_stream(&context, 2);
    let mut reader = context.message_reader(StreamSource::new(&data[..]));
    assert!(reader.is_lazy_reads());
    assert!(!reader.stream_reader().supports_skip());

    let first = reader.read_message().unwrap().unwrap();
    assert!(!reader.is_lazy_reads());
    assert_eq!(first, book());
    assert_eq!(reader.read_message().unwrap(), Some(book()));
    assert_eq!(reader.read_message().unwrap(), None);
}

#[test]
fn test_stream_truncated_mid_envelope() {
    let context = CodecContext::new();
    let mut data = encoded_stream(&context, 1);
    data.truncate(data.len() / 2);

    let mut reader = context.message_reader(StreamSource::new(&data[..]));
    let error = reader.read_envelope().unwrap_err();
    assert!(matches!(error, CodecError::Framing { .. }));
    assert!(reader.stream_reader().is_closed());
    assert!(matches!(reader.read_envelope(), Err(CodecError::ReaderClosed)));
}

#[test]
fn test_stream_source_exhaustion() {
    let mut source = StreamSource::new(io::empty());
    assert!(source.is_exhausted().unwrap());
    let context = CodecContext::new();
    assert!(context.message_reader(source).read_envelope().unwrap().is_none());
}
