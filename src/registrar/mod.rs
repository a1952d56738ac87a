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

//! Registrar service components.
//!
//! This module contains the logic to turn inbound registration payloads into
//! chain transactions and acknowledgments.
//!
//! The service exploits several sub-modules to perform specialized works, in
//! particular:
//! - worker: the message listener loop.
//! - submitter: converts requests into chain calls and broadcasts them.
//! - resolver: awaits transaction outcomes and publishes acknowledgments.
//! - scheduler: tracks the resolver tasks so shutdown can drain them.
//!
//! External components interact with the registrar service via message
//! passing; acknowledgments leave through the injected [`AckPublisher`].

pub(crate) mod resolver;

pub mod message;
pub mod publisher;
pub mod scheduler;
pub mod service;
pub mod submitter;
pub mod worker;

pub use message::{
    Message, RegistrarRequestReceiver, RegistrarRequestSender, RegistrarResponseReceiver,
    RegistrarResponseSender,
};
pub use publisher::AckPublisher;
pub use scheduler::Scheduler;
pub use service::{RegistrarConfig, RegistrarService};
pub use submitter::TransactionSubmitter;
