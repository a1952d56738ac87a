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

//! Fixed-width content digests.
//!
//! Current implementation uses SHA-256. Content identifiers are hashed over
//! their canonical decimal text so that any producer can recompute the same
//! digest without sharing a binary encoding.
//!
//! On the wire a digest travels as a plain hex string.

use crate::{Error, ErrorKind, Result};
use ring::digest;
use serde::{de::Visitor, Deserializer, Serializer};

/// Digest length in bytes.
pub const DIGEST_LEN: usize = 32;

/// Fixed-width deterministic digest.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Compute the digest of arbitrary data.
    pub fn from_data(data: &[u8]) -> Self {
        let digest = digest::digest(&digest::SHA256, data);
        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(digest.as_ref());
        Digest(bytes)
    }

    /// Wrap precomputed digest bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != DIGEST_LEN {
            return Err(Error::new(ErrorKind::MalformedData));
        }
        let mut buf = [0u8; DIGEST_LEN];
        buf.copy_from_slice(bytes);
        Ok(Digest(buf))
    }

    /// Creates a new instance from a hex string.
    /// Mostly used for testing.
    pub fn from_hex(hex: &str) -> Result<Self> {
        match hex::decode(hex) {
            Ok(buf) => Self::from_bytes(&buf),
            Err(_) => Err(Error::new(ErrorKind::MalformedData)),
        }
    }

    /// Digest bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Digest bytes as a new vector.
    #[allow(clippy::wrong_self_convention)]
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

/// Get a reference to the inner bytes array.
impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Digest({})", hex::encode(self.0))
    }
}

impl serde::Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> serde::Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DigestVisitor;

        impl<'v> Visitor<'v> for DigestVisitor {
            type Value = Digest;

            fn expecting(
                &self,
                fmt: &mut std::fmt::Formatter<'_>,
            ) -> std::result::Result<(), std::fmt::Error> {
                write!(fmt, "expecting hex string.")
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Digest::from_hex(value).map_err(|_err| serde::de::Error::custom("Invalid digest"))
            }
        }
        deserializer.deserialize_str(DigestVisitor)
    }
}

/// Digest of the canonical textual form of a content identifier.
pub fn content_digest(content_id: u64) -> Digest {
    Digest::from_data(content_id.to_string().as_bytes())
}

/// Digest of the identifier text concatenated with itself.
///
/// Distinct from [`content_digest`] for any nonzero identifier.
pub fn transcoded_digest(content_id: u64) -> Digest {
    let text = content_id.to_string();
    Digest::from_data(format!("{}{}", text, text).as_bytes())
}
