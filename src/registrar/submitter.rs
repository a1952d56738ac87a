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

//! Conversion of registration requests into chain calls.
//!
//! The submitter is the last gate before the chain: every structural check
//! happens here, so a bad request can never produce a partial submission.

use crate::{
    base::schema::RegistrationRequest,
    chain::{ChainClient, RegisterCall, SubmissionHandle, ADDRESS_LEN},
    Error, ErrorKind, Result,
};
use std::sync::Arc;

/// Builds and broadcasts one transaction per registration request.
pub struct TransactionSubmitter {
    /// Shared chain client, safe for concurrent use.
    client: Arc<dyn ChainClient>,
}

impl TransactionSubmitter {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        TransactionSubmitter { client }
    }

    /// Submit the request as a registration transaction.
    ///
    /// Returns once the transaction is accepted for broadcast; the outcome
    /// is delivered later through the handle.
    ///
    /// # Errors
    ///
    /// `SetupFault` on mismatched address/share lists, malformed addresses
    /// or a refused broadcast. Nothing reaches the chain in those cases.
    pub fn submit(&self, request: &RegistrationRequest) -> Result<SubmissionHandle> {
        let call = Self::build_call(request)?;
        self.client.submit(call)
    }

    fn build_call(request: &RegistrationRequest) -> Result<RegisterCall> {
        if request.addresses.len() != request.shares.len() {
            return Err(Error::new_ext(
                ErrorKind::SetupFault,
                format!(
                    "{} addresses against {} shares",
                    request.addresses.len(),
                    request.shares.len()
                ),
            ));
        }
        let addresses = request
            .addresses
            .iter()
            .map(|address| parse_address(address))
            .collect::<Result<Vec<_>>>()?;
        Ok(RegisterCall {
            addresses,
            shares: request.shares.clone(),
            content_id: request.content_id.to_be_bytes(),
            original_hash: request.original_file_hash,
            transcoded_hash: request.transcoded_file_hash,
        })
    }
}

/// Parse a hex beneficiary address, with or without the `0x` prefix.
///
/// Short values are left-padded, numeric convention.
fn parse_address(address: &str) -> Result<[u8; ADDRESS_LEN]> {
    let hex_part = address.strip_prefix("0x").unwrap_or(address);
    let bytes = hex::decode(hex_part)
        .map_err(|err| Error::new_ext(ErrorKind::SetupFault, format!("{}: {}", address, err)))?;
    if bytes.len() > ADDRESS_LEN {
        return Err(Error::new_ext(
            ErrorKind::SetupFault,
            format!("oversized address: {}", address),
        ));
    }
    let mut out = [0u8; ADDRESS_LEN];
    out[ADDRESS_LEN - bytes.len()..].copy_from_slice(&bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::schema::tests::create_test_request;
    use crate::chain::MockChainClient;

    #[test]
    fn submit_valid_request() {
        let request = create_test_request().enrich();
        let expected_original = request.original_file_hash;
        let mut client = MockChainClient::new();
        client
            .expect_submit()
            .withf(move |call| {
                let mut aa = [0u8; ADDRESS_LEN];
                aa[ADDRESS_LEN - 1] = 0xAA;
                call.addresses.len() == 2
                    && call.addresses[0] == aa
                    && call.shares == vec![50, 50]
                    && call.content_id == 42u64.to_be_bytes()
                    && call.original_hash == expected_original
            })
            .times(1)
            .returning(|_| Ok(SubmissionHandle::pair().1));
        let submitter = TransactionSubmitter::new(Arc::new(client));

        let res = submitter.submit(&request);

        assert!(res.is_ok());
    }

    #[test]
    fn mismatched_lists_fail_before_broadcast() {
        let mut request = create_test_request();
        request.addresses.push("0xCC".to_owned());
        let mut client = MockChainClient::new();
        client.expect_submit().times(0);
        let submitter = TransactionSubmitter::new(Arc::new(client));

        let err = submitter.submit(&request).unwrap_err();

        assert_eq!(err.kind, ErrorKind::SetupFault);
        assert_eq!(err.to_string_full(), "setup fault: 3 addresses against 2 shares");
    }

    #[test]
    fn malformed_address_fails_before_broadcast() {
        let mut request = create_test_request();
        request.addresses[1] = "0xZZ".to_owned();
        let mut client = MockChainClient::new();
        client.expect_submit().times(0);
        let submitter = TransactionSubmitter::new(Arc::new(client));

        let err = submitter.submit(&request).unwrap_err();

        assert_eq!(err.kind, ErrorKind::SetupFault);
    }

    #[test]
    fn parse_full_width_address() {
        let address = parse_address("0x00a329c0648769a73afac7f9381e08fb43dbea72").unwrap();

        assert_eq!(address[0], 0x00);
        assert_eq!(address[1], 0xA3);
        assert_eq!(address[ADDRESS_LEN - 1], 0x72);
    }

    #[test]
    fn parse_short_address_is_left_padded() {
        let address = parse_address("0xAA").unwrap();

        assert_eq!(address[..ADDRESS_LEN - 1], [0u8; ADDRESS_LEN - 1]);
        assert_eq!(address[ADDRESS_LEN - 1], 0xAA);
    }

    #[test]
    fn parse_unprefixed_address() {
        let address = parse_address("bb").unwrap();

        assert_eq!(address[ADDRESS_LEN - 1], 0xBB);
    }

    #[test]
    fn parse_oversized_address() {
        let err = parse_address(&format!("0x{}", "cc".repeat(21))).unwrap_err();

        assert_eq!(err.kind, ErrorKind::SetupFault);
    }
}
