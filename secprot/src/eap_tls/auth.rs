use rand_core::RngCore;

use crate::application::{ApplicationLayer, CryptoLayer};
use crate::common::{SecProtCommon, SecProtResult, TimerEvent};
use crate::eap_tls::eap_frame_parse;
use crate::eap_tls_lib::{message_build, message_handle, EapTlsMsg};
use crate::eapol::{EapFrame, EapolPdu};
use crate::log_event::log;
use crate::proto::*;
use crate::result::{fault, FaultType, ReceiveError};
use crate::sec_prot::{ProtocolKind, SecProt, SecProtContext};
use crate::tls_bridge::{TlsBridge, TlsEngine, TlsProcess};
use crate::tls_data::TlsData;
#[cfg(feature = "logging")]
use crate::LogEvent::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    CreateReq,
    ResponseId,
    ResponseStart,
    Response,
    Finish,
    Finished,
}

/// EAP-TLS authenticator running the TLS server locally.
pub struct EapTlsAuth<T: TlsEngine> {
    common: SecProtCommon<State>,
    eap_id_seq: u8,
    tls: Option<TlsBridge<T>>,
    tls_send: TlsData,
    tls_recv: TlsData,
    /// Last request sent, resent on retry.
    last: Option<EapolPdu>,
    /// The TLS engine is calculating and owes us its next output.
    wait_tls: bool,
    /// The engine reported the handshake over; the next acknowledgement completes EAP.
    tls_done: bool,
}

impl<T: TlsEngine> EapTlsAuth<T> {
    pub fn new() -> Self {
        Self {
            common: SecProtCommon::new(State::Init),
            eap_id_seq: 0,
            tls: None,
            tls_send: TlsData::new(),
            tls_recv: TlsData::new(),
            last: None,
            wait_tls: false,
            tls_done: false,
        }
    }

    fn request_send<C: CryptoLayer, App: ApplicationLayer<C>>(&mut self, ctx: &mut SecProtContext<'_, C, App>, frame: EapFrame) {
        let pdu = EapolPdu::Eap(frame);
        ctx.send(ProtocolKind::EapTls, &pdu);
        self.last = Some(pdu);
        self.common.trickle_start(&ctx.settings.sec_prot_trickle, ctx.rng);
    }

    /// Sends the next fragment of `tls_send` as a new request, or an empty request when there
    /// is nothing queued.
    fn request_next<C: CryptoLayer, App: ApplicationLayer<C>>(&mut self, ctx: &mut SecProtContext<'_, C, App>, flags: u8) {
        self.eap_id_seq = self.eap_id_seq.wrapping_add(1);
        let frame = message_build(EAP_REQ, self.eap_id_seq, flags, &mut self.tls_send);
        self.request_send(ctx, frame);
    }

    fn finish<C: CryptoLayer, App: ApplicationLayer<C>>(&mut self, ctx: &mut SecProtContext<'_, C, App>, result: SecProtResult) {
        self.common.result_set(result);
        self.common.timers_stop();
        self.wait_tls = false;
        self.common.state_set(State::Finish);
        ctx.finished_indication(ProtocolKind::EapTls, result);
    }

    /// Sends EAP-Success or EAP-Failure and finishes.
    fn result_send<C: CryptoLayer, App: ApplicationLayer<C>>(&mut self, ctx: &mut SecProtContext<'_, C, App>, result: SecProtResult) {
        let code = if result == SecProtResult::Ok { EAP_SUCCESS } else { EAP_FAILURE };
        ctx.send(ProtocolKind::EapTls, &EapolPdu::Eap(EapFrame::result(code, self.eap_id_seq)));
        self.finish(ctx, result);
    }

    fn tls_result<C: CryptoLayer, App: ApplicationLayer<C>>(&mut self, ctx: &mut SecProtContext<'_, C, App>, result: TlsProcess) {
        let Some(bridge) = self.tls.as_mut() else {
            return;
        };
        match result {
            TlsProcess::Calculating => self.wait_tls = true,
            TlsProcess::Continue | TlsProcess::HandshakeOver => {
                self.wait_tls = false;
                if result == TlsProcess::HandshakeOver {
                    let Some(pmk) = bridge.take_pmk() else {
                        tracing::warn!("TLS handshake over without key material");
                        self.result_send(ctx, SecProtResult::Error);
                        return;
                    };
                    ctx.keys.pmk_write(&pmk);
                    log!(ctx.app, TlsHandshakeOver(ctx.remote_eui64));
                    self.tls_done = true;
                }
                self.tls_send = bridge.take_outgoing();
                if self.tls_send.is_empty() && self.tls_done {
                    self.result_send(ctx, SecProtResult::Ok);
                } else {
                    self.request_next(ctx, 0);
                    self.common.state_set(State::Response);
                }
            }
            TlsProcess::Error | TlsProcess::ConfError => {
                log!(ctx.app, TlsFailed(ctx.remote_eui64, result));
                let result = if result == TlsProcess::ConfError { SecProtResult::ConfError } else { SecProtResult::Error };
                self.result_send(ctx, result);
            }
        }
    }

    fn identity_receive<C: CryptoLayer, App: ApplicationLayer<C, Tls = T>>(&mut self, ctx: &mut SecProtContext<'_, C, App>) {
        log!(ctx.app, ReceivedEapIdentity(ctx.remote_eui64));
        let Some(engine) = ctx.app.tls_create(ctx.remote_eui64, true) else {
            self.result_send(ctx, SecProtResult::ConfError);
            return;
        };
        let mut bridge = TlsBridge::new(engine);
        match bridge.start(true) {
            TlsProcess::Error => return self.result_send(ctx, SecProtResult::Error),
            TlsProcess::ConfError => return self.result_send(ctx, SecProtResult::ConfError),
            _ => {}
        }
        self.tls = Some(bridge);
        self.tls_send.free();
        self.request_next(ctx, EAP_TLS_START);
        self.common.state_set(State::ResponseStart);
    }

    fn tls_response<C: CryptoLayer, App: ApplicationLayer<C>>(&mut self, ctx: &mut SecProtContext<'_, C, App>, frame: EapFrame) {
        match message_handle(&frame.data, true, &mut self.tls_send, &mut self.tls_recv) {
            EapTlsMsg::MoreFrag => {
                self.request_next(ctx, 0);
                self.common.state_set(State::Response);
            }
            EapTlsMsg::Continue => self.request_next(ctx, 0),
            EapTlsMsg::SendDone => {
                if self.tls_done {
                    self.result_send(ctx, SecProtResult::Ok);
                } else if let Some(bridge) = self.tls.as_mut() {
                    let result = bridge.process(None);
                    self.tls_result(ctx, result);
                }
            }
            EapTlsMsg::ReceiveDone => {
                let message = self.tls_recv.take_payload();
                if let Some(bridge) = self.tls.as_mut() {
                    let result = bridge.process(Some(message));
                    self.tls_result(ctx, result);
                }
            }
            EapTlsMsg::Start | EapTlsMsg::Duplicate => {}
            EapTlsMsg::Fail | EapTlsMsg::DecodeError => tracing::debug!("invalid EAP-TLS response dropped"),
        }
    }
}

impl<T: TlsEngine> Default for EapTlsAuth<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CryptoLayer, T: TlsEngine, App: ApplicationLayer<C, Tls = T>> SecProt<C, App> for EapTlsAuth<T> {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::EapTls
    }

    fn create_request(&mut self, ctx: &mut SecProtContext<'_, C, App>) {
        if self.common.state() != State::Init {
            return;
        }
        self.common.timeout_set(ctx.settings.sec_prot_timeout);
        self.common.state_set(State::CreateReq);
        ctx.create_confirm(ProtocolKind::EapTls, SecProtResult::Ok);

        self.eap_id_seq = ctx.rng.next_u32() as u8;
        let identity = EapFrame::new(EAP_REQ, self.eap_id_seq, EAP_IDENTITY, Vec::new());
        self.request_send(ctx, identity);
        self.common.state_set(State::ResponseId);
    }

    fn receive(&mut self, ctx: &mut SecProtContext<'_, C, App>, data: &[u8]) -> Result<(), ReceiveError> {
        let frame = eap_frame_parse(data)?;
        if frame.code != EAP_RESPONSE {
            return Err(fault!(FaultType::InvalidPacket, true));
        }
        if frame.id_seq != self.eap_id_seq || self.wait_tls {
            // Answer to an earlier request, or a retransmission while the engine runs.
            return Err(fault!(FaultType::OutOfSequence, false));
        }
        match (self.common.state(), frame.eap_type) {
            (State::ResponseId, EAP_IDENTITY) => self.identity_receive(ctx),
            (State::ResponseStart | State::Response, EAP_TLS) => self.tls_response(ctx, frame),
            _ => return Err(fault!(FaultType::OutOfSequence, false)),
        }
        Ok(())
    }

    fn timer_timeout(&mut self, ctx: &mut SecProtContext<'_, C, App>, ticks: u16) {
        if matches!(self.common.state(), State::Init | State::Finish | State::Finished) {
            return;
        }
        if self.wait_tls {
            if let Some(result) = self.tls.as_mut().and_then(|bridge| bridge.timer_timeout(ticks)) {
                self.tls_result(ctx, result);
            }
        }
        match self.common.timer_timeout(ticks, ctx.rng) {
            TimerEvent::Retry if !self.wait_tls => {
                if let Some(pdu) = self.last.as_ref() {
                    ctx.send(ProtocolKind::EapTls, pdu);
                    log!(ctx.app, Resent(ctx.remote_eui64, ProtocolKind::EapTls));
                }
            }
            TimerEvent::Timeout => {
                log!(ctx.app, TimedOut(ctx.remote_eui64, ProtocolKind::EapTls));
                self.finish(ctx, SecProtResult::Timeout);
            }
            _ => {}
        }
    }

    fn finished_send(&mut self, _: &mut SecProtContext<'_, C, App>) {
        self.tls = None;
        self.tls_send.free();
        self.tls_recv.free();
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
