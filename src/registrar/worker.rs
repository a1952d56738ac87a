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

//! Registrar message listener.
//!
//! One message, one pipeline: decode, enrich, broadcast, schedule a resolver
//! task, answer. The listener never waits for a transaction outcome; a slow
//! or stuck confirmation only parks its own resolver task.

use crate::{
    base::schema::RegistrationRequest,
    registrar::{
        message::{Message, RegistrarRequestReceiver, RegistrarResponseSender},
        publisher::AckPublisher,
        resolver::resolve_and_publish,
        scheduler::Scheduler,
        service::RegistrarConfig,
        submitter::TransactionSubmitter,
    },
    ErrorKind, Result,
};
use async_std::task;
use std::sync::Arc;

pub struct RegistrarWorker {
    /// Service configuration.
    config: RegistrarConfig,
    /// Transaction submitter.
    submitter: TransactionSubmitter,
    /// Acknowledgment publisher shared with the resolver tasks.
    publisher: Arc<dyn AckPublisher>,
    /// Resolver task scheduler.
    scheduler: Scheduler,
    /// Registrar requests receiver.
    rx_chan: RegistrarRequestReceiver,
}

impl RegistrarWorker {
    pub fn new(
        config: RegistrarConfig,
        submitter: TransactionSubmitter,
        publisher: Arc<dyn AckPublisher>,
        scheduler: Scheduler,
        rx_chan: RegistrarRequestReceiver,
    ) -> Self {
        RegistrarWorker {
            config,
            submitter,
            publisher,
            scheduler,
            rx_chan,
        }
    }

    /// Handle one inbound registration payload.
    ///
    /// Returns the content identifier once the transaction has been accepted
    /// for broadcast and its resolver task scheduled. Resolution is not
    /// awaited here.
    fn put_registration_internal(&self, buf: &[u8]) -> Result<u64> {
        let request = RegistrationRequest::from_json(buf)?.enrich();
        let handle = self.submitter.submit(&request)?;
        let content_id = request.content_id;
        self.scheduler.spawn(resolve_and_publish(
            content_id,
            handle,
            self.publisher.clone(),
            self.config.ack_retries,
        ));
        Ok(content_id)
    }

    fn put_registration_handler(&self, buf: &[u8]) -> Message {
        match self.put_registration_internal(buf) {
            Ok(content_id) => {
                debug!("[registrar] registration {} accepted", content_id);
                Message::PutRegistrationResponse { content_id }
            }
            Err(err) => {
                warn!("[registrar] registration dropped: {}", err.to_string_full());
                Message::Exception(err)
            }
        }
    }

    fn handle_message(&self, req: Message, res_chan: RegistrarResponseSender) {
        let res = match req {
            Message::PutRegistrationRequest { buf } => self.put_registration_handler(&buf),
            _ => {
                warn!("[registrar] unexpected message: {:?}", req);
                Message::Exception(ErrorKind::Other.into())
            }
        };
        task::spawn(async move {
            if res_chan.send(res).await.is_err() {
                debug!("[registrar] requester gone before response");
            }
        });
    }

    /// Listener asynchronous task.
    /// This can be stopped by submitting a `Stop` message to its input
    /// channel; in-flight resolver tasks are drained before returning.
    pub async fn run(&mut self) {
        loop {
            match self.rx_chan.recv().await {
                Ok((Message::Stop, _)) => break,
                Ok((req, res_chan)) => self.handle_message(req, res_chan),
                Err(_) => {
                    warn!("[registrar] request channel closed, exiting");
                    break;
                }
            }
        }
        self.scheduler.drain().await;
    }

    /// Listener synchronous task.
    pub fn run_sync(&mut self) {
        task::block_on(self.run());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        base::{
            schema::tests::{ORIGINAL_HASH_HEX, TRANSCODED_HASH_HEX},
            schema::{AckMessage, Receipt},
            Mutex,
        },
        chain::{ChainClient, RegisterCall, SubmissionHandle, SubmissionOutcome},
        channel,
        crypto::hash::Digest,
        registrar::message::RegistrarRequestSender,
        Error,
    };
    use std::{
        thread,
        time::{Duration, Instant},
    };

    const REQUEST_JSON: &[u8] = br#"{"contentId":42,"addresses":["0xAA","0xBB"],"shares":[50,50]}"#;

    /// Chain client double resolving every submission after a fixed delay.
    struct TestChainClient {
        delay: Duration,
        fail: bool,
        calls: Arc<Mutex<Vec<RegisterCall>>>,
    }

    impl TestChainClient {
        fn new(delay: Duration, fail: bool) -> Self {
            TestChainClient {
                delay,
                fail,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl ChainClient for TestChainClient {
        fn submit(&self, call: RegisterCall) -> crate::Result<SubmissionHandle> {
            self.calls.lock().push(call);
            let (tx_chan, handle) = SubmissionHandle::pair();
            let delay = self.delay;
            let fail = self.fail;
            task::spawn(async move {
                task::sleep(delay).await;
                let outcome = if fail {
                    SubmissionOutcome::Failed {
                        tx_hash: Some("0xfeedbeef".to_owned()),
                        reason: Error::new_ext(ErrorKind::SubmissionFault, "gave up"),
                    }
                } else {
                    SubmissionOutcome::Confirmed(Receipt {
                        tx_hash: "0xfeedbeef".to_owned(),
                        success: true,
                        status: Some("0x1".to_owned()),
                    })
                };
                let _ = tx_chan.send(outcome).await;
            });
            Ok(handle)
        }
    }

    /// Publisher double collecting every acknowledgment.
    #[derive(Clone, Default)]
    struct RecordingPublisher {
        acks: Arc<Mutex<Vec<AckMessage>>>,
    }

    impl AckPublisher for RecordingPublisher {
        fn publish(&self, ack: &AckMessage) -> crate::Result<()> {
            self.acks.lock().push(ack.clone());
            Ok(())
        }
    }

    fn spawn_worker(
        client: Arc<dyn ChainClient>,
        publisher: Arc<dyn AckPublisher>,
    ) -> (RegistrarRequestSender, thread::JoinHandle<()>) {
        let (tx_chan, rx_chan) = channel::confirmed_channel();
        let submitter = TransactionSubmitter::new(client);
        let mut worker = RegistrarWorker::new(
            RegistrarConfig::default(),
            submitter,
            publisher,
            Scheduler::new(),
            rx_chan,
        );
        let handle = thread::spawn(move || worker.run_sync());
        (tx_chan, handle)
    }

    fn put_registration(tx_chan: &RegistrarRequestSender, buf: &[u8]) -> Message {
        let res_chan = tx_chan
            .send_sync(Message::PutRegistrationRequest { buf: buf.to_vec() })
            .unwrap();
        res_chan.recv_sync().unwrap()
    }

    #[test]
    fn registration_round_trip() {
        let client = Arc::new(TestChainClient::new(Duration::from_millis(0), false));
        let publisher = RecordingPublisher::default();
        let (tx_chan, handle) = spawn_worker(client.clone(), Arc::new(publisher.clone()));

        let res = put_registration(&tx_chan, REQUEST_JSON);

        assert_eq!(res, Message::PutRegistrationResponse { content_id: 42 });

        // Stopping drains the resolver tasks, so after the join every
        // acknowledgment has been recorded.
        tx_chan.send_sync(Message::Stop).unwrap();
        handle.join().unwrap();

        let calls = client.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].addresses.len(), 2);
        assert_eq!(calls[0].addresses[0][19], 0xAA);
        assert_eq!(calls[0].addresses[1][19], 0xBB);
        assert_eq!(calls[0].shares, vec![50, 50]);
        assert_eq!(calls[0].content_id, 42u64.to_be_bytes());
        assert_eq!(
            calls[0].original_hash,
            Digest::from_hex(ORIGINAL_HASH_HEX).unwrap()
        );
        assert_eq!(
            calls[0].transcoded_hash,
            Digest::from_hex(TRANSCODED_HASH_HEX).unwrap()
        );

        let acks = publisher.acks.lock();
        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0].content_id, 42);
        assert_eq!(acks[0].tx_hash.as_deref(), Some("0xfeedbeef"));
        assert!(acks[0].success);
    }

    #[test]
    fn listener_does_not_wait_for_resolution() {
        let delay = Duration::from_millis(400);
        let client = Arc::new(TestChainClient::new(delay, false));
        let publisher = RecordingPublisher::default();
        let (tx_chan, handle) = spawn_worker(client, Arc::new(publisher.clone()));

        let start = Instant::now();
        let res1 = put_registration(&tx_chan, REQUEST_JSON);
        let res2 = put_registration(
            &tx_chan,
            br#"{"contentId":43,"addresses":["0xCC"],"shares":[100]}"#,
        );
        let elapsed = start.elapsed();

        // Both messages went through the intake before the first resolution
        // completed.
        assert_eq!(res1, Message::PutRegistrationResponse { content_id: 42 });
        assert_eq!(res2, Message::PutRegistrationResponse { content_id: 43 });
        assert!(elapsed < delay, "intake blocked for {:?}", elapsed);
        assert!(publisher.acks.lock().is_empty());

        tx_chan.send_sync(Message::Stop).unwrap();
        handle.join().unwrap();

        assert_eq!(publisher.acks.lock().len(), 2);
    }

    #[test]
    fn mismatched_lists_produce_no_submission_and_no_ack() {
        let client = Arc::new(TestChainClient::new(Duration::from_millis(0), false));
        let publisher = RecordingPublisher::default();
        let (tx_chan, handle) = spawn_worker(client.clone(), Arc::new(publisher.clone()));

        let res = put_registration(
            &tx_chan,
            br#"{"contentId":42,"addresses":["0xAA","0xBB","0xCC"],"shares":[50,50]}"#,
        );

        match res {
            Message::Exception(err) => assert_eq!(err.kind, ErrorKind::SetupFault),
            _ => panic!("unexpected"),
        }

        tx_chan.send_sync(Message::Stop).unwrap();
        handle.join().unwrap();

        assert!(client.calls.lock().is_empty());
        assert!(publisher.acks.lock().is_empty());
    }

    #[test]
    fn malformed_payload_is_dropped_and_listener_survives() {
        let client = Arc::new(TestChainClient::new(Duration::from_millis(0), false));
        let publisher = RecordingPublisher::default();
        let (tx_chan, handle) = spawn_worker(client, Arc::new(publisher.clone()));

        let res = put_registration(&tx_chan, b"definitely not json");
        match res {
            Message::Exception(err) => assert_eq!(err.kind, ErrorKind::MalformedData),
            _ => panic!("unexpected"),
        }

        // The listener keeps serving after the bad message.
        let res = put_registration(&tx_chan, REQUEST_JSON);
        assert_eq!(res, Message::PutRegistrationResponse { content_id: 42 });

        tx_chan.send_sync(Message::Stop).unwrap();
        handle.join().unwrap();

        assert_eq!(publisher.acks.lock().len(), 1);
    }

    #[test]
    fn unquoted_keys_are_accepted() {
        let client = Arc::new(TestChainClient::new(Duration::from_millis(0), false));
        let publisher = RecordingPublisher::default();
        let (tx_chan, handle) = spawn_worker(client, Arc::new(publisher.clone()));

        let res = put_registration(
            &tx_chan,
            br#"{contentId:42, addresses:["0xAA","0xBB"], shares:[50,50]}"#,
        );

        assert_eq!(res, Message::PutRegistrationResponse { content_id: 42 });

        tx_chan.send_sync(Message::Stop).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn failed_submission_still_acks_with_failure_status() {
        let client = Arc::new(TestChainClient::new(Duration::from_millis(0), true));
        let publisher = RecordingPublisher::default();
        let (tx_chan, handle) = spawn_worker(client, Arc::new(publisher.clone()));

        let res = put_registration(&tx_chan, REQUEST_JSON);
        assert_eq!(res, Message::PutRegistrationResponse { content_id: 42 });

        tx_chan.send_sync(Message::Stop).unwrap();
        handle.join().unwrap();

        let acks = publisher.acks.lock();
        assert_eq!(acks.len(), 1);
        assert!(!acks[0].success);
        assert_eq!(acks[0].tx_hash.as_deref(), Some("0xfeedbeef"));
        assert_eq!(acks[0].error.as_deref(), Some("submission fault: gave up"));
    }

    #[test]
    fn unexpected_message_is_answered_with_exception() {
        let client = Arc::new(TestChainClient::new(Duration::from_millis(0), false));
        let publisher = RecordingPublisher::default();
        let (tx_chan, handle) = spawn_worker(client, Arc::new(publisher));

        let res_chan = tx_chan
            .send_sync(Message::PutRegistrationResponse { content_id: 1 })
            .unwrap();
        let res = res_chan.recv_sync().unwrap();

        match res {
            Message::Exception(err) => assert_eq!(err.kind, ErrorKind::Other),
            _ => panic!("unexpected"),
        }

        tx_chan.send_sync(Message::Stop).unwrap();
        handle.join().unwrap();
    }
}
