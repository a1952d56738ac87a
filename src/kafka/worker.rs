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

use super::service::KafkaConfig;
use crate::{
    base::{schema::AckMessage, Mutex},
    registrar::{AckPublisher, Message, RegistrarRequestSender},
    Error, ErrorKind, Result,
};
use kafka::consumer::{Consumer, FetchOffset, GroupOffsetStorage};
use kafka::producer::{Producer, Record, RequiredAcks};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

/// Time to wait for the listener to answer one forwarded payload.
const FORWARD_TIMEOUT: Duration = Duration::from_secs(5);

pub struct KafkaWorker {
    config: KafkaConfig,
    reg_chan: RegistrarRequestSender,
    stopping: Arc<AtomicBool>,
}

impl KafkaWorker {
    pub fn new(config: KafkaConfig, reg_chan: RegistrarRequestSender) -> Self {
        KafkaWorker {
            config,
            reg_chan,
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stopping.clone()
    }

    /// Hand one raw payload to the registrar and log the answer.
    ///
    /// The answer arrives as soon as the registration is accepted and its
    /// resolver scheduled, so a slow transaction never stalls consumption.
    fn forward(&self, buf: Vec<u8>) {
        let res_chan = match self.reg_chan.send_sync(Message::PutRegistrationRequest { buf }) {
            Ok(chan) => chan,
            Err(_) => {
                warn!("[kafka] registrar service seems down");
                return;
            }
        };
        match res_chan.recv_timeout_sync(FORWARD_TIMEOUT) {
            Ok(Message::PutRegistrationResponse { content_id }) => {
                debug!("[kafka] registration {} accepted", content_id)
            }
            Ok(Message::Exception(err)) => {
                warn!("[kafka] registration dropped: {}", err.to_string_full())
            }
            Ok(msg) => warn!("[kafka] unexpected registrar response: {:?}", msg),
            Err(err) => warn!("[kafka] no response from registrar: {}", err),
        }
    }

    fn run(&mut self) -> Result<()> {
        let mut consumer = Consumer::from_hosts(self.config.hosts.clone())
            .with_topic(self.config.registrar_topic.clone())
            .with_group(self.config.group.clone())
            .with_fallback_offset(FetchOffset::Earliest)
            .with_offset_storage(GroupOffsetStorage::Kafka)
            .create()
            .map_err(|err| Error::new_ext(ErrorKind::Other, err))?;

        while !self.stopping.load(Ordering::Relaxed) {
            let sets = consumer
                .poll()
                .map_err(|err| Error::new_ext(ErrorKind::Other, err))?;
            for ms in sets.iter() {
                for m in ms.messages() {
                    self.forward(m.value.to_vec());
                }
                let _ = consumer.consume_messageset(ms);
            }
            consumer
                .commit_consumed()
                .map_err(|err| Error::new_ext(ErrorKind::Other, err))?;
        }
        Ok(())
    }

    /// Kafka worker synchronous task.
    pub fn run_sync(&mut self) {
        if let Err(err) = self.run() {
            error!("[kafka] worker terminated: {}", err.to_string_full());
        }
    }
}

/// Acknowledgment publisher backed by a shared Kafka producer.
///
/// The producer is created once and reused for every acknowledgment; the
/// lock makes it usable from concurrent resolver tasks.
pub struct KafkaAckPublisher {
    topic: String,
    producer: Mutex<Producer>,
}

impl KafkaAckPublisher {
    pub fn new(hosts: Vec<String>, topic: String) -> Result<Self> {
        let producer = Producer::from_hosts(hosts)
            .with_ack_timeout(Duration::from_secs(1))
            .with_required_acks(RequiredAcks::One)
            .create()
            .map_err(|err| Error::new_ext(ErrorKind::PublishFault, err))?;

        Ok(KafkaAckPublisher {
            topic,
            producer: Mutex::new(producer),
        })
    }
}

impl AckPublisher for KafkaAckPublisher {
    fn publish(&self, ack: &AckMessage) -> Result<()> {
        let buf = ack.to_json()?;
        self.producer
            .lock()
            .send(&Record::from_value(&self.topic, buf))
            .map_err(|err| Error::new_ext(ErrorKind::PublishFault, err))
    }
}
