//! Property-based tests for sealing and AEAD
//!
//! These tests verify the invariants the envelope codec relies on:
//!
//! 1. **Round-trip**: open(seal(m)) == m for all messages and keys
//! 2. **Tamper evidence**: any flipped byte is rejected, never mis-decrypted
//! 3. **Recipient isolation**: a payload sealed for one key fails for another

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, reason = "Test helpers")]

use proptest::prelude::*;
use quill_crypto::{
    KEY_SIZE, KeyPair, NONCE_SIZE, SESSION_KEY_SIZE, SessionKey, aead_decrypt, aead_encrypt,
    open, seal, unwrap, wrap,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_seal_open_roundtrip(
        plaintext in prop::collection::vec(any::<u8>(), 0..512),
        recipient_secret in any::<[u8; KEY_SIZE]>(),
        ephemeral in any::<[u8; KEY_SIZE]>(),
        nonce in any::<[u8; NONCE_SIZE]>(),
    ) {
        let pair = KeyPair::generate(recipient_secret);
        let sealed = seal(pair.public_key(), &plaintext, ephemeral, nonce).unwrap();

        prop_assert_eq!(open(pair.private_key(), &sealed).unwrap(), plaintext);
    }

    #[test]
    fn prop_wrapped_key_tamper_is_rejected(
        session in any::<[u8; SESSION_KEY_SIZE]>(),
        ephemeral in any::<[u8; KEY_SIZE]>(),
        position in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let pair = KeyPair::generate([0x42; KEY_SIZE]);
        let mut wrapped =
            wrap(pair.public_key(), &SessionKey::from_bytes(session), ephemeral, [0x11; NONCE_SIZE])
                .unwrap();

        let index = position.index(wrapped.len());
        wrapped[index] ^= mask;

        // Flipping only the ignored top bit of the ephemeral key leaves the
        // agreement unchanged, but the salt still covers the raw bytes.
        prop_assert!(unwrap(pair.private_key(), &wrapped).is_err());
    }

    #[test]
    fn prop_aead_tamper_is_rejected(
        plaintext in prop::collection::vec(any::<u8>(), 1..256),
        key in any::<[u8; SESSION_KEY_SIZE]>(),
        position in any::<prop::sample::Index>(),
    ) {
        let key = SessionKey::from_bytes(key);
        let nonce = [0x33; NONCE_SIZE];
        let mut ciphertext = aead_encrypt(&key, &nonce, &plaintext);

        let index = position.index(ciphertext.len());
        ciphertext[index] ^= 0x80;

        prop_assert!(aead_decrypt(&key, &nonce, &ciphertext).is_err());
    }

    #[test]
    fn prop_other_recipient_cannot_open(
        plaintext in prop::collection::vec(any::<u8>(), 0..128),
        a in any::<[u8; KEY_SIZE]>(),
        b in any::<[u8; KEY_SIZE]>(),
    ) {
        let alice = KeyPair::generate(a);
        let bob = KeyPair::generate(b);
        prop_assume!(alice.public_key() != bob.public_key());

        let sealed = seal(alice.public_key(), &plaintext, [0x01; KEY_SIZE], [0x02; NONCE_SIZE])
            .unwrap();

        prop_assert!(open(bob.private_key(), &sealed).is_err());
    }
}
