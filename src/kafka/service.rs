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

use super::worker::KafkaWorker;
use crate::registrar::RegistrarRequestSender;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

/// Kafka bridge configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KafkaConfig {
    /// Broker addresses ("host:port").
    pub hosts: Vec<String>,
    /// Consumer group for the inbound topic.
    pub group: String,
    /// Inbound registration topic.
    pub registrar_topic: String,
    /// Outbound acknowledgment topic.
    pub ack_topic: String,
}

/// Kafka service data.
pub struct KafkaService {
    /// Worker object.
    worker: Option<KafkaWorker>,
    /// Worker thread handler.
    handler: Option<JoinHandle<KafkaWorker>>,
    /// Worker stop flag.
    stopping: Arc<AtomicBool>,
    /// To check if the worker thread is alive.
    canary: Arc<()>,
}

impl KafkaService {
    pub fn new(config: KafkaConfig, reg_chan: RegistrarRequestSender) -> Self {
        let worker = KafkaWorker::new(config, reg_chan);
        let stopping = worker.stop_flag();

        KafkaService {
            worker: Some(worker),
            handler: None,
            stopping,
            canary: Arc::new(()),
        }
    }

    /// Start the service.
    pub fn start(&mut self) {
        debug!("Starting KAFKA service");

        let mut worker = match self.worker.take() {
            Some(worker) => worker,
            None => {
                warn!("service was already running");
                return;
            }
        };

        self.stopping.store(false, Ordering::Relaxed);
        let mut canary = Arc::clone(&self.canary);
        let handle = thread::spawn(move || {
            let _ = Arc::get_mut(&mut canary);
            worker.run_sync();
            worker
        });
        self.handler = Some(handle);
    }

    /// Stop the service.
    /// The worker notices the flag on its next consumer poll round.
    pub fn stop(&mut self) {
        debug!("Stopping KAFKA service");
        match self.handler.take() {
            Some(handle) => {
                self.stopping.store(true, Ordering::Relaxed);
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
        // Hack to intercept crashed sub threads.
        Arc::strong_count(&self.canary) == 2 && self.worker.is_none()
    }
}
