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

//! Cryptographic primitives.

pub mod hash;

pub use hash::{content_digest, transcoded_digest, Digest};
