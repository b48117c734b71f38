// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Hardware-in-the-loop validation of the active cable firmware update path.
//!
//! Each trial assigns a fresh serial number, builds a firmware package with
//! it, flashes the package over DFU and then checks that the cable
//! re-enumerates with the expected USB string descriptors. A run repeats
//! trials until the requested count is reached or one of them fails.

pub mod cable;
pub mod error;
pub mod flash;
pub mod harness;
pub mod output;
pub mod package;
pub mod serial;
pub mod settings;
mod spec;
pub mod tool;
pub mod trial;
pub mod verify;
