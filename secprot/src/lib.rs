/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) ZeroTier, Inc.
 * https://www.zerotier.com/
 */
//#![warn(missing_docs, rust_2018_idioms)]
pub mod crypto;
pub mod crypto_impl;

mod common;
mod eap_tls;
mod eap_tls_lib;
mod gkh;
mod key_frame;
mod kmp;
mod log_event;
mod msg;
mod sec_prot;
mod tls_bridge;
mod tls_data;
mod trickle;

pub mod application;
pub mod eapol;
pub mod gtks;
pub mod kde;
pub mod keys;
pub mod proto;
pub mod radius;
pub mod result;

#[cfg(test)]
mod test_util;

pub use crate::common::SecProtResult;
pub use crate::eap_tls::{EapTlsAuth, EapTlsSupp, RadiusEapTlsRelay};
pub use crate::gkh::{GkhAuth, GkhSupp};
pub use crate::kmp::*;
pub use crate::log_event::*;
pub use crate::msg::MsgSecProt;
pub use crate::sec_prot::{KmpEvent, PeerMessage, ProtocolKind, SecProt, SecProtContext};
pub use crate::tls_bridge::{TlsEngine, TlsIo, TlsProcess};
pub use crate::trickle::TrickleParams;
