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

//! Messages used to send notifications to the registrar service.
//!
//! Inbound payloads travel undecoded: decoding is a listener concern, so
//! that a malformed message is answered with an exception instead of
//! poisoning the transport worker.

use crate::{channel, Error};

/// Message types enumeration.
#[derive(Debug, PartialEq, Clone)]
pub enum Message {
    /// Exception response used for the full set of messages.
    Exception(Error),
    /// Raw registration payload received from the inbound transport.
    PutRegistrationRequest {
        /// Undecoded message bytes.
        buf: Vec<u8>,
    },
    /// The registration was accepted: the transaction has been broadcast and
    /// its resolver task scheduled.
    PutRegistrationResponse {
        /// Identifier of the accepted content.
        content_id: u64,
    },
    /// Stop the registrar service.
    Stop,
}

/// Registrar request sender alias.
pub type RegistrarRequestSender = channel::RequestSender<Message, Message>;

/// Registrar request receiver alias.
pub type RegistrarRequestReceiver = channel::RequestReceiver<Message, Message>;

/// Registrar response sender alias.
pub type RegistrarResponseSender = channel::Sender<Message>;

/// Registrar response receiver alias.
pub type RegistrarResponseReceiver = channel::Receiver<Message>;
