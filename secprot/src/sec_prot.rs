use crate::application::{ApplicationLayer, CryptoLayer, Settings};
use crate::common::SecProtResult;
use crate::eapol::EapolPdu;
use crate::gtks::SecProtGtkKeys;
use crate::keys::SecProtKeys;
use crate::proto::{KMP_ID_80211_GKH, KMP_ID_8021X};
use crate::radius::RadiusShared;
use crate::result::ReceiveError;

/// The security protocols a session can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolKind {
    /// EAP-TLS with a local TLS engine, authenticator or supplicant.
    EapTls,
    /// EAP-TLS authenticator relaying to a RADIUS server.
    RadiusEapTls,
    /// RADIUS client serving a `RadiusEapTls` relay.
    RadiusClient,
    /// Group key handshake.
    Gkh,
    /// Signal to the lower layer.
    Msg,
}

impl ProtocolKind {
    /// The KMP id carried with the protocol's EAPOL PDUs, zero for protocols that do not use
    /// EAPOL.
    pub fn kmp_id(self) -> u8 {
        match self {
            Self::EapTls | Self::RadiusEapTls => KMP_ID_8021X,
            Self::Gkh => KMP_ID_80211_GKH,
            Self::RadiusClient | Self::Msg => 0,
        }
    }

    /// The protocol that exchanges peer messages with this one.
    pub fn sibling(self) -> Option<Self> {
        match self {
            Self::RadiusEapTls => Some(Self::RadiusClient),
            Self::RadiusClient => Some(Self::RadiusEapTls),
            _ => None,
        }
    }
}

/// A message between two protocol instances of the same session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerMessage {
    /// A complete EAP packet.
    Eap(Vec<u8>),
    /// The sending instance was torn down.
    PeerDeleted,
}

/// Requests from a protocol instance to its session, handled after the current call returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KmpEvent {
    CreateConfirm(ProtocolKind, SecProtResult),
    CreateIndication(ProtocolKind),
    FinishedIndication(ProtocolKind, SecProtResult),
    Peer { to: ProtocolKind, msg: PeerMessage },
}

/// Everything a protocol instance may touch during one call.
///
/// The key stores are lent exclusively to the instance being driven, so only one protocol
/// writes session keys at a time.
pub struct SecProtContext<'a, C: CryptoLayer, App: ApplicationLayer<C>> {
    pub app: &'a mut App,
    pub rng: &'a mut C::Rng,
    pub settings: &'a Settings,
    pub keys: &'a mut SecProtKeys,
    pub gtks: &'a mut SecProtGtkKeys,
    pub radius: &'a mut RadiusShared,
    pub local_eui64: &'a [u8; 8],
    pub remote_eui64: &'a [u8; 8],
    pub events: &'a mut Vec<KmpEvent>,
}

impl<'a, C: CryptoLayer, App: ApplicationLayer<C>> SecProtContext<'a, C, App> {
    /// Sends an EAPOL PDU to the remote peer. A refused send is logged and left to the retry
    /// timers.
    pub fn send(&mut self, kind: ProtocolKind, pdu: &EapolPdu) -> bool {
        match pdu.to_bytes() {
            Ok(bytes) => self.send_bytes(kind, &bytes),
            Err(e) => {
                tracing::warn!("{:?} PDU not encoded: {}", kind, e);
                false
            }
        }
    }

    /// Sends an already encoded EAPOL PDU, such as a key frame with its MIC filled in.
    pub fn send_bytes(&mut self, kind: ProtocolKind, pdu: &[u8]) -> bool {
        match self.app.send(self.remote_eui64, kind.kmp_id(), pdu) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("{:?} send failed: {}", kind, e);
                false
            }
        }
    }

    pub fn create_confirm(&mut self, kind: ProtocolKind, result: SecProtResult) {
        self.events.push(KmpEvent::CreateConfirm(kind, result));
    }

    pub fn create_indication(&mut self, kind: ProtocolKind) {
        self.events.push(KmpEvent::CreateIndication(kind));
    }

    pub fn finished_indication(&mut self, kind: ProtocolKind, result: SecProtResult) {
        self.events.push(KmpEvent::FinishedIndication(kind, result));
    }

    pub fn peer_send(&mut self, to: ProtocolKind, msg: PeerMessage) {
        self.events.push(KmpEvent::Peer { to, msg });
    }
}

/// One role of one security protocol.
///
/// Every instance runs the same life cycle: it is started by `create_request` on the side that
/// initiates it, or by a received message and `create_response` on the other side; it ends
/// with exactly one finished indication, after which the session calls `finished_send` and the
/// instance reports itself finished.
pub trait SecProt<C: CryptoLayer, App: ApplicationLayer<C>> {
    fn kind(&self) -> ProtocolKind;

    /// Starts the protocol on the initiating side.
    #[allow(unused)]
    fn create_request(&mut self, ctx: &mut SecProtContext<'_, C, App>) {}

    /// Answer to the create indication this instance raised.
    #[allow(unused)]
    fn create_response(&mut self, ctx: &mut SecProtContext<'_, C, App>, result: SecProtResult) {}

    /// A message from the remote peer: an EAPOL PDU, or a RADIUS message for the RADIUS client.
    fn receive(&mut self, ctx: &mut SecProtContext<'_, C, App>, data: &[u8]) -> Result<(), ReceiveError>;

    /// A message from the sibling protocol of the same session.
    #[allow(unused)]
    fn receive_peer(&mut self, ctx: &mut SecProtContext<'_, C, App>, msg: PeerMessage) {}

    fn timer_timeout(&mut self, ctx: &mut SecProtContext<'_, C, App>, ticks: u16);

    /// The session has processed the finished indication.
    fn finished_send(&mut self, ctx: &mut SecProtContext<'_, C, App>);

    /// The instance is being dropped before finishing.
    #[allow(unused)]
    fn delete(&mut self, ctx: &mut SecProtContext<'_, C, App>) {}

    fn is_finished(&self) -> bool;

    fn result(&self) -> SecProtResult;

    /// The RADIUS identifier of the outstanding Access-Request, if any.
    fn radius_identifier(&self) -> Option<u8> {
        None
    }
}
