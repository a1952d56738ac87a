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

//! Chain client boundary.
//!
//! The chain node is an external collaborator: the core builds a
//! [`RegisterCall`] and hands it to a [`ChainClient`], receiving back a
//! [`SubmissionHandle`]. The handle resolves exactly once to the final
//! [`SubmissionOutcome`]; everything past the broadcast acceptance happens
//! off the caller's path.

pub mod abi;

#[cfg(feature = "http-chain")]
pub mod client;
#[cfg(feature = "http-chain")]
pub use client::HttpChainClient;

use crate::{
    base::schema::{AckMessage, Receipt},
    channel::{self, Receiver, Sender},
    crypto::hash::Digest,
    Error, ErrorKind, Result,
};
#[cfg(test)]
use mockall::automock;
use std::{path::PathBuf, time::Duration};

/// Beneficiary address length in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Chain client configuration.
///
/// All parameters are injected at construction and never recomputed.
#[derive(Clone, Debug)]
pub struct ChainConfig {
    /// Chain node endpoint.
    pub node_url: String,
    /// Registrar contract address.
    pub contract_address: String,
    /// Account keystore file.
    pub keystore_file: PathBuf,
    /// Account keystore password.
    pub keystore_password: String,
    /// Gas price in wei.
    pub gas_price: u64,
    /// Gas limit per registration call.
    pub gas_limit: u64,
    /// Max receipt polls before the submission is given up.
    /// Together with `receipt_interval` this bounds the lifetime of every
    /// resolver task.
    pub receipt_attempts: u32,
    /// Pause between receipt polls.
    pub receipt_interval: Duration,
}

/// Registration entry point call parameters.
#[derive(Debug, PartialEq, Clone)]
pub struct RegisterCall {
    /// Beneficiary addresses.
    pub addresses: Vec<[u8; ADDRESS_LEN]>,
    /// Share weights, parallel to `addresses`.
    pub shares: Vec<u8>,
    /// Content identifier, big-endian.
    pub content_id: [u8; 8],
    /// Original file digest.
    pub original_hash: Digest,
    /// Transcoded file digest.
    pub transcoded_hash: Digest,
}

/// Final outcome of a submitted transaction.
#[derive(Debug, PartialEq, Clone)]
pub enum SubmissionOutcome {
    /// The chain processed the transaction and returned a receipt.
    /// A reverted transaction is a receipt with `success` unset.
    Confirmed(Receipt),
    /// The chain client gave up after broadcast.
    Failed {
        /// Transaction identifier, when the broadcast got that far.
        tx_hash: Option<String>,
        /// What went wrong.
        reason: Error,
    },
}

impl SubmissionOutcome {
    /// Fold the outcome into the wire-level acknowledgment.
    ///
    /// Failures become acknowledgments with a failure status, never a
    /// missing acknowledgment.
    pub fn into_ack(self, content_id: u64) -> AckMessage {
        match self {
            SubmissionOutcome::Confirmed(receipt) => AckMessage {
                content_id,
                tx_hash: Some(receipt.tx_hash),
                success: receipt.success,
                error: None,
            },
            SubmissionOutcome::Failed { tx_hash, reason } => AckMessage {
                content_id,
                tx_hash,
                success: false,
                error: Some(reason.to_string_full()),
            },
        }
    }
}

/// Handle to an in-flight transaction.
///
/// Owned exclusively by the resolver task spawned for it. Resolution is
/// exactly-once: [`resolve`](Self::resolve) consumes the handle.
pub struct SubmissionHandle {
    chan: Receiver<SubmissionOutcome>,
}

impl std::fmt::Debug for SubmissionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionHandle").finish_non_exhaustive()
    }
}

impl SubmissionHandle {
    /// Create a handle along with the sender used to resolve it.
    pub fn pair() -> (Sender<SubmissionOutcome>, SubmissionHandle) {
        let (tx_chan, rx_chan) = channel::simple_channel();
        (tx_chan, SubmissionHandle { chan: rx_chan })
    }

    /// Wait for the final outcome.
    ///
    /// Suspends the calling task until the chain client delivers the outcome
    /// or drops its side of the channel.
    pub async fn resolve(self) -> SubmissionOutcome {
        match self.chan.recv().await {
            Ok(outcome) => outcome,
            Err(_) => SubmissionOutcome::Failed {
                tx_hash: None,
                reason: Error::new_ext(
                    ErrorKind::SubmissionFault,
                    "chain client dropped the submission",
                ),
            },
        }
    }
}

/// Interface to the transaction submission endpoint of a chain node.
///
/// The client is shared, read-only state across all submitter invocations
/// and must be safe for concurrent use.
#[cfg_attr(test, automock)]
pub trait ChainClient: Send + Sync + 'static {
    /// Broadcast a registration transaction.
    ///
    /// Returns as soon as the transaction is accepted for broadcast; the
    /// final outcome is delivered through the returned handle.
    ///
    /// # Errors
    ///
    /// `SetupFault` when the call cannot be built or the broadcast is
    /// refused outright. Nothing reaches the chain in that case.
    fn submit(&self, call: RegisterCall) -> Result<SubmissionHandle>;
}
