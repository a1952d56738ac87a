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

use super::{
    message::{Message, RegistrarRequestSender},
    publisher::AckPublisher,
    scheduler::Scheduler,
    submitter::TransactionSubmitter,
    worker::RegistrarWorker,
};
use crate::{chain::ChainClient, channel::confirmed_channel};
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

/// Registrar service configuration.
#[derive(Clone, Debug, Default)]
pub struct RegistrarConfig {
    /// Extra acknowledgment publish attempts after a failed one.
    /// Zero keeps the at-most-once default.
    pub ack_retries: u8,
}

/// Registrar service data.
pub struct RegistrarService {
    /// Worker object.
    worker: Option<RegistrarWorker>,
    /// Worker thread handler.
    handler: Option<JoinHandle<RegistrarWorker>>,
    /// To send messages to the worker.
    tx_chan: RegistrarRequestSender,
    /// To check if the worker thread is alive.
    canary: Arc<()>,
}

impl RegistrarService {
    /// Create a new registrar service instance.
    ///
    /// The chain client and the acknowledgment publisher are shared with the
    /// worker and its resolver tasks; both must be safe for concurrent use.
    pub fn new(
        config: RegistrarConfig,
        client: Arc<dyn ChainClient>,
        publisher: Arc<dyn AckPublisher>,
    ) -> Self {
        let (tx_chan, rx_chan) = confirmed_channel::<Message, Message>();

        let submitter = TransactionSubmitter::new(client);
        let scheduler = Scheduler::new();
        let worker = RegistrarWorker::new(config, submitter, publisher, scheduler, rx_chan);

        RegistrarService {
            worker: Some(worker),
            handler: None,
            tx_chan,
            canary: Arc::new(()),
        }
    }

    /// Start registrar service.
    pub fn start(&mut self) {
        debug!("Starting registrar service");
        let mut worker = match self.worker.take() {
            Some(worker) => worker,
            None => {
                warn!("service was already running");
                return;
            }
        };

        let mut canary = Arc::clone(&self.canary);
        let handle = thread::spawn(move || {
            let _ = Arc::get_mut(&mut canary);
            worker.run_sync();
            worker
        });
        self.handler = Some(handle);
    }

    /// Stop registrar service.
    /// In-flight resolver tasks are drained before the worker thread joins.
    pub fn stop(&mut self) {
        debug!("Stopping registrar service");
        match self.handler.take() {
            Some(handle) => {
                if let Err(err) = self.tx_chan.send_sync(Message::Stop) {
                    error!("Error stopping registrar service thread: {:?}", err);
                }
                let worker = handle.join().unwrap();
                self.worker = Some(worker);
            }
            None => {
                debug!("service was not running");
            }
        };
    }

    /// Check if service is running.
    pub fn is_running(&self) -> bool {
        // Hack to intercept crashed subthreads.
        Arc::strong_count(&self.canary) == 2 && self.worker.is_none()
    }

    /// Get a clone of the registrar input channel.
    pub fn request_channel(&self) -> RegistrarRequestSender {
        self.tx_chan.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chain::MockChainClient, registrar::publisher::MockAckPublisher};

    fn create_registrar_service() -> RegistrarService {
        let client = MockChainClient::new();
        let publisher = MockAckPublisher::new();

        let config = RegistrarConfig { ack_retries: 0 };

        RegistrarService::new(config, Arc::new(client), Arc::new(publisher))
    }

    #[test]
    fn start_stop() {
        let mut svc = create_registrar_service();

        svc.start();
        assert!(svc.is_running());

        svc.stop();
        assert!(!svc.is_running());
    }

    #[test]
    fn stopped_subthread() {
        let mut svc = create_registrar_service();

        svc.start();
        assert!(svc.is_running());

        svc.tx_chan.send_sync(Message::Stop).unwrap();
        std::thread::sleep(std::time::Duration::from_secs(1));

        assert!(!svc.is_running());
        svc.stop();
    }
}
