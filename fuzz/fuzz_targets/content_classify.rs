//! Fuzz target for MessageContent::classify and the decoder behind it
//!
//! Arbitrary strings arrive as message content from the backend, so every
//! one of them must classify and decode without panicking.
//!
//! # Invariants
//!
//! - `classify` is total
//! - Re-classifying the wire form of classified content gives the same
//!   variant
//! - Plaintext decodes to exactly the input
//! - Encrypted content never panics the decoder, whatever it claims to be

#![no_main]

use libfuzzer_sys::fuzz_target;
use quill_core::{Decode, MessageDecoder};
use quill_crypto::PrivateKey;
use quill_proto::{Identity, MessageContent};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let content = MessageContent::classify(raw);
    if let Ok(wire) = content.to_wire() {
        let again = MessageContent::classify(&wire);
        assert_eq!(
            std::mem::discriminant(&content),
            std::mem::discriminant(&again),
            "wire form changed the content format"
        );
    }

    let decoder = MessageDecoder::new(Identity::new("fuzz"), PrivateKey::from_bytes([7; 32]));
    let decoded = decoder.decode(raw);
    if let MessageContent::Plaintext(_) = content {
        assert_eq!(decoded.as_deref(), Ok(raw), "plaintext must pass through");
    }
});
