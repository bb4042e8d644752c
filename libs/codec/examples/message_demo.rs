//! # Fudge Message Demo
//!
//! Encodes a quote under a taxonomy, decodes it eagerly and lazily, and walks
//! the element stream. Run with `RUST_LOG=codec=debug` to see codec logging.

use std::sync::Arc;

use codec::{
    BytesSource, CodecConfig, CodecContext, CodecResult, EnvelopeHeader, FieldValue, MapTaxonomy,
    MapTaxonomyResolver, Message, MessageEnvelope, StreamElement,
};
use tracing_subscriber::EnvFilter;

fn main() -> CodecResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Fudge Message Demo");
    println!("==================\n");

    let taxonomy: MapTaxonomy = [(1, "bid"), (2, "volume")].into_iter().collect();
    let resolver = MapTaxonomyResolver::new().with_taxonomy(7, taxonomy);
    let context = CodecContext::from_env().with_resolver(Arc::new(resolver));

    let mut meta = Message::new();
    meta.add_named("source", "feedA");
    let mut quote = Message::new();
    quote
        .add_named("bid", 101.25)
        .add_named("ask", 101.5)
        .add_named("volume", 250)
        .add_named("meta", meta);
    let envelope = MessageEnvelope::with_header(EnvelopeHeader::with_taxonomy(7), quote);

    // 1. Encode
    let bytes = context.to_bytes(&envelope)?;
    println!("Encoded {} bytes under taxonomy 7", bytes.len());

    // 2. Eager decode restores names from the taxonomy
    let decoded = context.decode(bytes.clone())?;
    for field in decoded.message() {
        println!(
            "  {:<8} ordinal={:<6} {:?}",
            field.name().unwrap_or("-"),
            field.ordinal().map_or("-".to_string(), |o| o.to_string()),
            field.value()
        );
    }

    // 3. Lazy decode keeps the sub-message encoded and passes it through
    let lazy_context = context
        .clone()
        .with_config(CodecConfig::default().with_lazy_reads(true));
    let lazy = lazy_context.decode(bytes.clone())?;
    if let Some(FieldValue::Encoded(meta)) = lazy.message().value_by_name("meta") {
        println!("\nLazy meta holds {} undecoded bytes", meta.len());
    }
    let rewritten = lazy_context.to_bytes(&lazy)?;
    println!("Pass-through identical: {}", rewritten == bytes);

    // 4. Element stream
    println!("\nElements:");
    let mut reader = context.stream_reader(BytesSource::new(bytes));
    while let Some(element) = reader.next_element()? {
        let indent = "  ".repeat(reader.depth() + 1);
        match element {
            StreamElement::EnvelopeStart { total_size, .. } => {
                println!("{indent}envelope ({total_size} bytes)")
            }
            StreamElement::SimpleField(field) => {
                println!("{indent}field {}", field.name().unwrap_or("-"))
            }
            StreamElement::SubMessageStart { name, .. } => {
                println!("{indent}begin {}", name.as_deref().unwrap_or("-"))
            }
            StreamElement::SubMessageEnd => println!("{indent}end"),
        }
    }

    Ok(())
}
