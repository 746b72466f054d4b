//! Fuzz target for tampered envelopes
//!
//! Encodes a message for a small set of readers, applies arbitrary edits to
//! the envelope, then decodes as every reader.
//!
//! # Invariants
//!
//! - Untouched envelopes decode to the original text for every reader
//! - Edited envelopes either fail or decode to the original text; a
//!   different plaintext is never produced
//! - Decoding never panics

#![no_main]

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use quill_core::{Environment, decode, encode};
use quill_crypto::KeyPair;
use quill_harness::SimEnv;
use quill_proto::{Identity, MessageContent};

#[derive(Debug, Clone, Arbitrary)]
struct Scenario {
    seed: u64,
    plaintext: String,
    reader_count: u8,
    edits: Vec<Edit>,
}

#[derive(Debug, Clone, Arbitrary)]
enum Edit {
    FlipCiphertext { index: u16, mask: u8 },
    FlipNonce { index: u8, mask: u8 },
    FlipWrappedKey { reader: u8, index: u8, mask: u8 },
    TruncateCiphertext(u16),
    DropKey(u8),
    SwapKeys(u8, u8),
    Version(u32),
}

fuzz_target!(|scenario: Scenario| {
    let env = SimEnv::with_seed(scenario.seed);
    let count = usize::from(scenario.reader_count % 4) + 1;

    let readers: Vec<(Identity, KeyPair)> = (0..count)
        .map(|i| (Identity::new(format!("admin{i}")), KeyPair::generate(env.random_array())))
        .collect();
    let recipients: BTreeMap<_, _> =
        readers.iter().map(|(id, pair)| (id.clone(), *pair.public_key())).collect();

    let Ok(mut envelope) = encode(&scenario.plaintext, &recipients, &env) else {
        return;
    };

    let content = MessageContent::Envelope(envelope.clone());
    for (identity, pair) in &readers {
        let text = decode(&content, identity, pair.private_key());
        assert_eq!(text.as_deref(), Ok(scenario.plaintext.as_str()));
    }

    for edit in &scenario.edits {
        apply(&mut envelope, &readers, edit);
    }

    let content = MessageContent::Envelope(envelope);
    for (identity, pair) in &readers {
        if let Ok(text) = decode(&content, identity, pair.private_key()) {
            assert_eq!(text, scenario.plaintext, "tampered envelope decoded to new text");
        }
    }
});

fn apply(envelope: &mut quill_proto::Envelope, readers: &[(Identity, KeyPair)], edit: &Edit) {
    let pick = |i: u8| &readers[usize::from(i) % readers.len()].0;

    match *edit {
        Edit::FlipCiphertext { index, mask } => {
            let len = envelope.ciphertext.len();
            if len > 0 {
                envelope.ciphertext[usize::from(index) % len] ^= mask;
            }
        },
        Edit::FlipNonce { index, mask } => {
            let len = envelope.nonce.len();
            if len > 0 {
                envelope.nonce[usize::from(index) % len] ^= mask;
            }
        },
        Edit::FlipWrappedKey { reader, index, mask } => {
            if let Some(key) = envelope.keys.get_mut(pick(reader)) {
                let len = key.0.len();
                if len > 0 {
                    key.0[usize::from(index) % len] ^= mask;
                }
            }
        },
        Edit::TruncateCiphertext(len) => envelope.ciphertext.truncate(usize::from(len)),
        Edit::DropKey(reader) => {
            envelope.keys.remove(pick(reader));
        },
        Edit::SwapKeys(a, b) => {
            let (a, b) = (pick(a).clone(), pick(b).clone());
            if let (Some(ka), Some(kb)) = (envelope.keys.remove(&a), envelope.keys.remove(&b)) {
                envelope.keys.insert(a, kb);
                envelope.keys.insert(b, ka);
            }
        },
        Edit::Version(version) => envelope.version = version,
    }
}
