/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) ZeroTier, Inc.
 * https://www.zerotier.com/
 */
mod auth;
mod relay;
mod supp;

pub use auth::EapTlsAuth;
pub use relay::RadiusEapTlsRelay;
pub use supp::EapTlsSupp;

use crate::eapol::{EapFrame, EapolPdu};
use crate::result::{fault, FaultType, ReceiveError};

/// Decodes an EAPOL PDU that must carry EAP.
pub(crate) fn eap_frame_parse(data: &[u8]) -> Result<EapFrame, ReceiveError> {
    match EapolPdu::parse(data)? {
        EapolPdu::Eap(frame) => Ok(frame),
        _ => Err(fault!(FaultType::InvalidPacket, true)),
    }
}
