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

//! Receipt resolution and acknowledgment dispatch.

use crate::{chain::SubmissionHandle, registrar::publisher::AckPublisher};
use std::sync::Arc;

/// Await the outcome of one submission and publish its acknowledgment.
///
/// One task per submission: the handle is consumed here and the
/// acknowledgment is published exactly once per outcome, failures included.
/// A failed publish is logged and retried at most `retries` times; past that
/// the acknowledgment is dropped, at-most-once delivery.
pub(crate) async fn resolve_and_publish(
    content_id: u64,
    handle: SubmissionHandle,
    publisher: Arc<dyn AckPublisher>,
    retries: u8,
) {
    let outcome = handle.resolve().await;
    let ack = outcome.into_ack(content_id);
    if !ack.success {
        warn!(
            "[registrar] registration {} failed: {}",
            content_id,
            ack.error.as_deref().unwrap_or("transaction reverted")
        );
    }
    let mut attempt = 0;
    loop {
        match publisher.publish(&ack) {
            Ok(_) => {
                debug!("[registrar] ack for content {} published", content_id);
                break;
            }
            Err(err) if attempt < retries => {
                attempt += 1;
                warn!(
                    "[registrar] ack publish retry {} for content {}: {}",
                    attempt,
                    content_id,
                    err.to_string_full()
                );
            }
            Err(err) => {
                error!(
                    "[registrar] dropping ack for content {}: {}",
                    content_id,
                    err.to_string_full()
                );
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::schema::tests::create_test_receipt;
    use crate::chain::SubmissionOutcome;
    use crate::registrar::publisher::MockAckPublisher;
    use crate::{Error, ErrorKind};
    use async_std::task;

    fn resolved_handle(outcome: SubmissionOutcome) -> SubmissionHandle {
        let (tx_chan, handle) = SubmissionHandle::pair();
        tx_chan.send_sync(outcome).unwrap();
        handle
    }

    #[test]
    fn successful_outcome_publishes_one_ack() {
        let handle = resolved_handle(SubmissionOutcome::Confirmed(create_test_receipt()));
        let mut publisher = MockAckPublisher::new();
        publisher
            .expect_publish()
            .withf(|ack| ack.success && ack.content_id == 42)
            .times(1)
            .returning(|_| Ok(()));

        task::block_on(resolve_and_publish(42, handle, Arc::new(publisher), 0));
    }

    #[test]
    fn failed_outcome_still_publishes_one_ack() {
        let handle = resolved_handle(SubmissionOutcome::Failed {
            tx_hash: Some("0xfeedbeef".to_owned()),
            reason: Error::new_ext(ErrorKind::SubmissionFault, "gave up"),
        });
        let mut publisher = MockAckPublisher::new();
        publisher
            .expect_publish()
            .withf(|ack| !ack.success && ack.error.is_some())
            .times(1)
            .returning(|_| Ok(()));

        task::block_on(resolve_and_publish(42, handle, Arc::new(publisher), 0));
    }

    #[test]
    fn publish_fault_is_not_retried_by_default() {
        let handle = resolved_handle(SubmissionOutcome::Confirmed(create_test_receipt()));
        let mut publisher = MockAckPublisher::new();
        publisher
            .expect_publish()
            .times(1)
            .returning(|_| Err(Error::new(ErrorKind::PublishFault)));

        task::block_on(resolve_and_publish(42, handle, Arc::new(publisher), 0));
    }

    #[test]
    fn publish_fault_respects_configured_retries() {
        let handle = resolved_handle(SubmissionOutcome::Confirmed(create_test_receipt()));
        let mut publisher = MockAckPublisher::new();
        publisher
            .expect_publish()
            .times(3)
            .returning(|_| Err(Error::new(ErrorKind::PublishFault)));

        task::block_on(resolve_and_publish(42, handle, Arc::new(publisher), 2));
    }

    #[test]
    fn publish_retry_stops_on_success() {
        let handle = resolved_handle(SubmissionOutcome::Confirmed(create_test_receipt()));
        let mut publisher = MockAckPublisher::new();
        let mut failures = 1;
        publisher.expect_publish().times(2).returning(move |_| {
            if failures > 0 {
                failures -= 1;
                Err(Error::new(ErrorKind::PublishFault))
            } else {
                Ok(())
            }
        });

        task::block_on(resolve_and_publish(42, handle, Arc::new(publisher), 5));
    }
}
