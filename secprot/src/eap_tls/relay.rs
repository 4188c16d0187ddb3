use rand_core::RngCore;

use crate::application::{ApplicationLayer, CryptoLayer};
use crate::common::{SecProtCommon, SecProtResult, TimerEvent};
use crate::eap_tls::eap_frame_parse;
use crate::eapol::{EapFrame, EapolPdu};
use crate::log_event::log;
use crate::proto::*;
use crate::result::{fault, DecodeError, FaultType, ReceiveError};
use crate::sec_prot::{PeerMessage, ProtocolKind, SecProt, SecProtContext};
#[cfg(feature = "logging")]
use crate::LogEvent::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    CreateReq,
    ResponseId,
    /// Waiting for the RADIUS server's next EAP message.
    Request,
    /// Waiting for the supplicant's answer to a relayed request.
    Response,
    Finish,
    Finished,
}

/// EAP-TLS authenticator that relays the exchange to a RADIUS server.
///
/// Only the identity exchange is handled here. Every later EAP message is passed unchanged
/// between the supplicant and the `RadiusClient` of the same session.
pub struct RadiusEapTlsRelay {
    common: SecProtCommon<State>,
    eap_id_seq: u8,
    last: Option<EapolPdu>,
}

impl RadiusEapTlsRelay {
    pub fn new() -> Self {
        Self { common: SecProtCommon::new(State::Init), eap_id_seq: 0, last: None }
    }

    fn request_send<C: CryptoLayer, App: ApplicationLayer<C>>(&mut self, ctx: &mut SecProtContext<'_, C, App>, frame: EapFrame) {
        self.eap_id_seq = frame.id_seq;
        let pdu = EapolPdu::Eap(frame);
        ctx.send(ProtocolKind::RadiusEapTls, &pdu);
        self.last = Some(pdu);
        self.common.trickle_start(&ctx.settings.sec_prot_trickle, ctx.rng);
    }

    fn finish<C: CryptoLayer, App: ApplicationLayer<C>>(&mut self, ctx: &mut SecProtContext<'_, C, App>, result: SecProtResult) {
        self.common.result_set(result);
        self.common.timers_stop();
        self.common.state_set(State::Finish);
        ctx.finished_indication(ProtocolKind::RadiusEapTls, result);
    }

    fn is_done(&self) -> bool {
        matches!(self.common.state(), State::Finish | State::Finished)
    }
}

impl Default for RadiusEapTlsRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CryptoLayer, App: ApplicationLayer<C>> SecProt<C, App> for RadiusEapTlsRelay {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::RadiusEapTls
    }

    fn create_request(&mut self, ctx: &mut SecProtContext<'_, C, App>) {
        if self.common.state() != State::Init {
            return;
        }
        self.common.timeout_set(ctx.settings.radius_eap_tls_timeout);
        self.common.state_set(State::CreateReq);
        ctx.create_confirm(ProtocolKind::RadiusEapTls, SecProtResult::Ok);

        let id = ctx.rng.next_u32() as u8;
        self.request_send(ctx, EapFrame::new(EAP_REQ, id, EAP_IDENTITY, Vec::new()));
        self.common.state_set(State::ResponseId);
    }

    fn receive(&mut self, ctx: &mut SecProtContext<'_, C, App>, data: &[u8]) -> Result<(), ReceiveError> {
        let frame = eap_frame_parse(data)?;
        if frame.code != EAP_RESPONSE {
            return Err(fault!(FaultType::InvalidPacket, true));
        }
        if frame.id_seq != self.eap_id_seq {
            return Err(fault!(FaultType::OutOfSequence, false));
        }
        match (self.common.state(), frame.eap_type) {
            (State::ResponseId, EAP_IDENTITY) => {
                log!(ctx.app, ReceivedEapIdentity(ctx.remote_eui64));
            }
            (State::Response, _) => {}
            // Repeats of the response already relayed.
            _ => return Err(fault!(FaultType::OutOfSequence, false)),
        }
        let eap = frame.to_bytes().map_err(|_| DecodeError::LengthMismatch)?;
        self.common.retry_stop();
        self.common.state_set(State::Request);
        ctx.peer_send(ProtocolKind::RadiusClient, PeerMessage::Eap(eap));
        Ok(())
    }

    fn receive_peer(&mut self, ctx: &mut SecProtContext<'_, C, App>, msg: PeerMessage) {
        if self.is_done() {
            return;
        }
        let eap = match msg {
            PeerMessage::Eap(eap) => eap,
            PeerMessage::PeerDeleted => {
                tracing::debug!("RADIUS client gone, relay fails");
                let frame = EapFrame::result(EAP_FAILURE, self.eap_id_seq);
                ctx.send(ProtocolKind::RadiusEapTls, &EapolPdu::Eap(frame));
                let result = if self.common.state() == State::Request { SecProtResult::Error } else { SecProtResult::Timeout };
                self.finish(ctx, result);
                return;
            }
        };
        let frame = match EapFrame::parse(&eap) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!("EAP from RADIUS server dropped: {}", e);
                return;
            }
        };
        match frame.code {
            EAP_REQ => {
                self.request_send(ctx, frame);
                self.common.state_set(State::Response);
            }
            EAP_SUCCESS | EAP_FAILURE => {
                let result = if frame.code == EAP_SUCCESS && ctx.keys.pmk_is_set() {
                    SecProtResult::Ok
                } else {
                    SecProtResult::Error
                };
                ctx.send(ProtocolKind::RadiusEapTls, &EapolPdu::Eap(frame));
                self.finish(ctx, result);
            }
            _ => tracing::debug!("unexpected EAP code {} from RADIUS server", frame.code),
        }
    }

    fn timer_timeout(&mut self, ctx: &mut SecProtContext<'_, C, App>, ticks: u16) {
        if self.is_done() || self.common.state() == State::Init {
            return;
        }
        match self.common.timer_timeout(ticks, ctx.rng) {
            TimerEvent::Retry => {
                if let Some(pdu) = self.last.as_ref() {
                    ctx.send(ProtocolKind::RadiusEapTls, pdu);
                    log!(ctx.app, Resent(ctx.remote_eui64, ProtocolKind::RadiusEapTls));
                }
            }
            TimerEvent::Timeout => {
                log!(ctx.app, TimedOut(ctx.remote_eui64, ProtocolKind::RadiusEapTls));
                self.finish(ctx, SecProtResult::Timeout);
            }
            TimerEvent::None => {}
        }
    }

    fn finished_send(&mut self, _: &mut SecProtContext<'_, C, App>) {
        self.last = None;
        self.common.timers_stop();
        self.common.state_set(State::Finished);
    }

    fn is_finished(&self) -> bool {
        self.common.state() == State::Finished
    }

    fn result(&self) -> SecProtResult {
        self.common.result()
    }
}
