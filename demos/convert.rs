//! Streaming conversion between formats without building a tree.
//!
//! Run with: cargo run --example convert

use std::error::Error;
use valuestream::tree::convert;
use valuestream::{cbor, from_cbor, from_csv, json, msgpack, to_json, Limits};

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    let text = r#"{"order_id":12345,"items":["WIDGET-001","GADGET-002"],"total":60.48,"huge":1e400}"#;
    println!("JSON input:\n{}\n", text);

    // JSON events go straight into the CBOR writer
    let mut parser = json::Parser::new(text);
    let writer = convert(&mut parser, cbor::Writer::new(Vec::new()), &Limits::default())?;
    let bytes = writer.into_inner();
    println!("CBOR ({} bytes): {}", bytes.len(), hex(&bytes));

    // and back again, through MessagePack
    let mut parser = cbor::Parser::new(&bytes);
    let writer = convert(&mut parser, msgpack::Writer::new(Vec::new()), &Limits::default())?;
    let packed = writer.into_inner();
    println!("MessagePack ({} bytes): {}\n", packed.len(), hex(&packed));

    let value = from_cbor(&bytes)?;
    println!("Back to JSON:\n{}\n", to_json(&value)?);

    let rows = from_csv("sku,price\nWIDGET-001,29.99\nGADGET-002,0.5\n")?;
    println!("CSV as JSON:\n{}", to_json(&rows)?);

    Ok(())
}
