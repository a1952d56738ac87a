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

//! HTTP JSON-RPC chain client.
//!
//! Transactions are sent through the node-managed account using
//! `personal_sendTransaction` with the configured keystore password: no key
//! material is handled locally. The keystore file is only read to learn the
//! account address.
//!
//! Broadcast acceptance is synchronous; the receipt is then polled on a
//! spawned task until found or until the polling budget is exhausted, which
//! bounds the lifetime of every resolver waiting on the handle.

use super::{
    abi, ChainClient, ChainConfig, RegisterCall, SubmissionHandle, SubmissionOutcome,
};
use crate::{base::schema::Receipt, channel::Sender, Error, ErrorKind, Result};
use async_std::task;
use isahc::{ReadResponseExt, Request, RequestExt};
use serde_json::{json, Value};
use std::sync::Arc;

/// JSON-RPC 2.0 request envelope.
#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

/// JSON-RPC 2.0 response envelope.
#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Hex quantity in the chain node convention.
fn quantity(val: u64) -> String {
    format!("{:#x}", val)
}

/// Extract a [`Receipt`] from a receipt query result.
fn parse_receipt(result: &Value) -> Result<Receipt> {
    let tx_hash = result
        .get("transactionHash")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            Error::new_ext(ErrorKind::SubmissionFault, "receipt without transaction hash")
        })?;
    let status = result.get("status").and_then(Value::as_str).map(str::to_owned);
    let success = matches!(status.as_deref(), Some("0x1") | Some("0x01"));
    Ok(Receipt {
        tx_hash: tx_hash.to_owned(),
        success,
        status,
    })
}

/// Chain client talking JSON-RPC over HTTP.
#[derive(Clone)]
pub struct HttpChainClient {
    config: Arc<ChainConfig>,
}

impl HttpChainClient {
    pub fn new(config: ChainConfig) -> Self {
        HttpChainClient {
            config: Arc::new(config),
        }
    }

    /// Read the account address from the keystore file.
    ///
    /// Unreachable or malformed keystores are setup faults: the submission
    /// fails before anything is broadcast.
    fn load_account(&self) -> Result<String> {
        let buf = std::fs::read(&self.config.keystore_file)
            .map_err(|err| Error::new_ext(ErrorKind::SetupFault, err))?;
        let keystore: Value = serde_json::from_slice(&buf)
            .map_err(|err| Error::new_ext(ErrorKind::SetupFault, err))?;
        match keystore.get("address").and_then(Value::as_str) {
            Some(address) if !address.is_empty() => {
                Ok(format!("0x{}", address.trim_start_matches("0x")))
            }
            _ => Err(Error::new_ext(
                ErrorKind::SetupFault,
                "keystore without account address",
            )),
        }
    }

    /// Perform one JSON-RPC call. Transport and node errors are mapped to
    /// the given error kind.
    fn rpc_call(&self, kind: ErrorKind, method: &str, params: Value) -> Result<Value> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        let body =
            serde_json::to_string(&request).map_err(|err| Error::new_ext(kind, err))?;
        let mut response = Request::post(self.config.node_url.as_str())
            .header("content-type", "application/json")
            .body(body)
            .map_err(|err| Error::new_ext(kind, err))?
            .send()
            .map_err(|err| Error::new_ext(kind, err))?;
        let text = response.text().map_err(|err| Error::new_ext(kind, err))?;
        let response: RpcResponse =
            serde_json::from_str(&text).map_err(|err| Error::new_ext(kind, err))?;
        if let Some(err) = response.error {
            return Err(Error::new_ext(
                kind,
                format!("rpc error {}: {}", err.code, err.message),
            ));
        }
        Ok(response.result)
    }

    /// Poll for the transaction receipt until found or budget exhausted.
    async fn poll_receipt(&self, tx_hash: &str) -> SubmissionOutcome {
        for _attempt in 0..self.config.receipt_attempts {
            match self.rpc_call(
                ErrorKind::SubmissionFault,
                "eth_getTransactionReceipt",
                json!([tx_hash]),
            ) {
                Ok(Value::Null) => (),
                Ok(result) => {
                    return match parse_receipt(&result) {
                        Ok(receipt) => SubmissionOutcome::Confirmed(receipt),
                        Err(reason) => SubmissionOutcome::Failed {
                            tx_hash: Some(tx_hash.to_owned()),
                            reason,
                        },
                    }
                }
                Err(reason) => {
                    return SubmissionOutcome::Failed {
                        tx_hash: Some(tx_hash.to_owned()),
                        reason,
                    }
                }
            }
            task::sleep(self.config.receipt_interval).await;
        }
        SubmissionOutcome::Failed {
            tx_hash: Some(tx_hash.to_owned()),
            reason: Error::new_ext(
                ErrorKind::SubmissionFault,
                "receipt not found within polling budget",
            ),
        }
    }

    /// Receipt polling task body.
    async fn wait_receipt(self, tx_hash: String, tx_chan: Sender<SubmissionOutcome>) {
        let outcome = self.poll_receipt(&tx_hash).await;
        if tx_chan.send(outcome).await.is_err() {
            warn!("[chain] submission handle dropped before resolution");
        }
    }
}

impl ChainClient for HttpChainClient {
    fn submit(&self, call: RegisterCall) -> Result<SubmissionHandle> {
        let from = self.load_account()?;
        let data = abi::encode_register_call(&call);
        let params = json!([
            {
                "from": from,
                "to": self.config.contract_address,
                "gas": quantity(self.config.gas_limit),
                "gasPrice": quantity(self.config.gas_price),
                "data": format!("0x{}", hex::encode(&data)),
            },
            self.config.keystore_password,
        ]);
        let result = self.rpc_call(ErrorKind::SetupFault, "personal_sendTransaction", params)?;
        let tx_hash = result
            .as_str()
            .ok_or_else(|| {
                Error::new_ext(ErrorKind::SetupFault, "node returned no transaction hash")
            })?
            .to_owned();
        debug!("[chain] transaction {} accepted for broadcast", tx_hash);

        let (tx_chan, handle) = SubmissionHandle::pair();
        let client = self.clone();
        task::spawn(client.wait_receipt(tx_hash, tx_chan));
        Ok(handle)
    }
}
