// This file is part of REGISTRAR.
//
// Copyright (C) 2022 Veredictum Ltd.
//
// REGISTRAR is free software: you can redistribute it and/or modify it under
// the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// REGISTRAR is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with REGISTRAR. If not, see <https://www.gnu.org/licenses/>.

//! Call data encoding for the registration entry point.
//!
//! Contract ABI convention: a 4-byte selector followed by 32-byte words.
//! Static arguments are placed in the head section; dynamic arrays are
//! referenced by offset and laid out in a trailing section, each prefixed
//! with its element count.

use super::RegisterCall;
use sha3::{Digest, Keccak256};

/// Word size of the encoding.
const WORD_LEN: usize = 32;

/// Head section size: offsets for the two arrays plus three static words.
const HEAD_WORDS: usize = 5;

/// Signature of the registration entry point.
const REGISTER_SIGNATURE: &str = "registerContent(address[],uint8[],bytes8,bytes32,bytes32)";

/// First four bytes of the Keccak-256 of the entry point signature.
pub fn selector() -> [u8; 4] {
    let digest = Keccak256::digest(REGISTER_SIGNATURE.as_bytes());
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&digest[..4]);
    sel
}

/// Left-pad a value into a single word. Numeric convention.
fn word_left(bytes: &[u8]) -> [u8; WORD_LEN] {
    let mut word = [0u8; WORD_LEN];
    word[WORD_LEN - bytes.len()..].copy_from_slice(bytes);
    word
}

/// Right-pad a value into a single word. Fixed-bytes convention.
fn word_right(bytes: &[u8]) -> [u8; WORD_LEN] {
    let mut word = [0u8; WORD_LEN];
    word[..bytes.len()].copy_from_slice(bytes);
    word
}

fn uint_word(val: u64) -> [u8; WORD_LEN] {
    word_left(&val.to_be_bytes())
}

/// Encode the full call data for a [`RegisterCall`].
pub fn encode_register_call(call: &RegisterCall) -> Vec<u8> {
    let addresses_offset = HEAD_WORDS * WORD_LEN;
    let shares_offset = addresses_offset + (1 + call.addresses.len()) * WORD_LEN;
    let words = HEAD_WORDS + 2 + call.addresses.len() + call.shares.len();

    let mut buf = Vec::with_capacity(4 + words * WORD_LEN);
    buf.extend_from_slice(&selector());
    buf.extend_from_slice(&uint_word(addresses_offset as u64));
    buf.extend_from_slice(&uint_word(shares_offset as u64));
    buf.extend_from_slice(&word_right(&call.content_id));
    buf.extend_from_slice(call.original_hash.as_bytes());
    buf.extend_from_slice(call.transcoded_hash.as_bytes());
    buf.extend_from_slice(&uint_word(call.addresses.len() as u64));
    for address in &call.addresses {
        buf.extend_from_slice(&word_left(address));
    }
    buf.extend_from_slice(&uint_word(call.shares.len() as u64));
    for share in &call.shares {
        buf.extend_from_slice(&uint_word(u64::from(*share)));
    }
    buf
}
