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

//! Core data model.
//!
//! Wire structures use camelCase field names as exposed on the inbound and
//! outbound topics.

use crate::{
    base::serialize::{json_deserialize_relaxed, json_serialize},
    crypto::hash::{content_digest, transcoded_digest, Digest},
    Result,
};

/// Content registration request.
///
/// One instance is created per inbound message. The file digests are
/// computed by the core from the content identifier; values supplied on the
/// wire for those fields are ignored. After [`enrich`](Self::enrich) the
/// request is complete and treated as immutable.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    /// Platform-wide content identifier.
    pub content_id: u64,
    /// Beneficiary addresses, one per share weight.
    pub addresses: Vec<String>,
    /// Revenue share weights. Pass-through values, parallel to `addresses`.
    pub shares: Vec<u8>,
    /// Digest of the original file.
    #[serde(skip)]
    pub original_file_hash: Digest,
    /// Digest of the transcoded file.
    #[serde(skip)]
    pub transcoded_file_hash: Digest,
}

impl RegistrationRequest {
    /// Decode a request from a raw inbound payload.
    ///
    /// Unquoted object keys are tolerated.
    pub fn from_json(buf: &[u8]) -> Result<Self> {
        json_deserialize_relaxed(buf)
    }

    /// Attach both content digests.
    pub fn enrich(mut self) -> Self {
        self.original_file_hash = content_digest(self.content_id);
        self.transcoded_file_hash = transcoded_digest(self.content_id);
        self
    }
}

/// Confirmation record returned once a submitted transaction has been
/// processed by the ledger.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Transaction identifier assigned by the chain.
    pub tx_hash: String,
    /// Transaction execution outcome.
    pub success: bool,
    /// Raw status code as reported by the chain, when available.
    pub status: Option<String>,
}

/// Acknowledgment published once a registration outcome is known.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AckMessage {
    /// Identifier of the registered content.
    pub content_id: u64,
    /// Transaction identifier, when the transaction reached the chain.
    pub tx_hash: Option<String>,
    /// Registration outcome. Failed submissions produce `false`, never a
    /// missing acknowledgment.
    pub success: bool,
    /// Failure detail, absent on success.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl AckMessage {
    /// Serialize for the outbound topic.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        json_serialize(self)
    }
}
