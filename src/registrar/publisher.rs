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

//! Outbound acknowledgment interface.

use crate::{base::schema::AckMessage, Result};
#[cfg(test)]
use mockall::automock;

/// Interface to the acknowledgment transport.
///
/// Implementations are shared across concurrent resolver tasks and must be
/// safe for concurrent use.
#[cfg_attr(test, automock)]
pub trait AckPublisher: Send + Sync + 'static {
    /// Serialize and emit one acknowledgment.
    ///
    /// # Errors
    ///
    /// `PublishFault` when the outbound transport is unreachable.
    fn publish(&self, ack: &AckMessage) -> Result<()>;
}
