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
    CreateResp,
    RequestTlsEap,
    Request,
    Finish,
    Finished,
}

/// EAP-TLS supplicant running the TLS client locally.
///
/// Requests are answered in order. A request repeating the id of the last one is ignored while
/// the burst filter runs, and answered with the last response after it expired.
pub struct EapTlsSupp<T: TlsEngine> {
    common: SecProtCommon<State>,
    tls: Option<TlsBridge<T>>,
    tls_send: TlsData,
    tls_recv: TlsData,
    last_recv_id: Option<u8>,
    burst_filt_timer: u16,
    last: Option<EapolPdu>,
    wait_tls: bool,
    tls_done: bool,
}

impl<T: TlsEngine> EapTlsSupp<T> {
    pub fn new() -> Self {
        Self {
            common: SecProtCommon::new(State::Init),
            tls: None,
            tls_send: TlsData::new(),
            tls_recv: TlsData::new(),
            last_recv_id: None,
            burst_filt_timer: 0,
            last: None,
            wait_tls: false,
            tls_done: false,
        }
    }

    fn response_send<C: CryptoLayer, App: ApplicationLayer<C>>(&mut self, ctx: &mut SecProtContext<'_, C, App>, frame: EapFrame) {
        let pdu = EapolPdu::Eap(frame);
        ctx.send(ProtocolKind::EapTls, &pdu);
        self.last = Some(pdu);
    }

    /// Answers the last request with the next fragment of `tls_send`, or with an empty
    /// response when nothing is queued.
    fn tls_response_send<C: CryptoLayer, App: ApplicationLayer<C>>(&mut self, ctx: &mut SecProtContext<'_, C, App>) {
        let id = self.last_recv_id.unwrap_or(0);
        let frame = message_build(EAP_RESPONSE, id, 0, &mut self.tls_send);
        self.response_send(ctx, frame);
    }

    fn finish<C: CryptoLayer, App: ApplicationLayer<C>>(&mut self, ctx: &mut SecProtContext<'_, C, App>, result: SecProtResult) {
        self.common.result_set(result);
        self.common.timers_stop();
        self.wait_tls = false;
        self.common.state_set(State::Finish);
        ctx.finished_indication(ProtocolKind::EapTls, result);
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
                    if let Some(pmk) = bridge.take_pmk() {
                        ctx.keys.pmk_write(&pmk);
                        log!(ctx.app, TlsHandshakeOver(ctx.remote_eui64));
                        self.tls_done = true;
                    }
                }
                self.tls_send = bridge.take_outgoing();
                self.tls_response_send(ctx);
            }
            TlsProcess::Error | TlsProcess::ConfError => {
                log!(ctx.app, TlsFailed(ctx.remote_eui64, result));
                let result = if result == TlsProcess::ConfError { SecProtResult::ConfError } else { SecProtResult::Error };
                self.finish(ctx, result);
            }
        }
    }

    fn tls_start<C: CryptoLayer, App: ApplicationLayer<C, Tls = T>>(&mut self, ctx: &mut SecProtContext<'_, C, App>) {
        let Some(engine) = ctx.app.tls_create(ctx.remote_eui64, false) else {
            self.finish(ctx, SecProtResult::ConfError);
            return;
        };
        self.tls = Some(TlsBridge::new(engine));
        self.tls_send.free();
        self.tls_recv.free();
        self.tls_done = false;
        self.common.state_set(State::Request);
        let result = match self.tls.as_mut() {
            Some(bridge) => bridge.start(false),
            None => return,
        };
        self.tls_result(ctx, result);
    }

    fn tls_request<C: CryptoLayer, App: ApplicationLayer<C>>(&mut self, ctx: &mut SecProtContext<'_, C, App>, frame: EapFrame) {
        match message_handle(&frame.data, true, &mut self.tls_send, &mut self.tls_recv) {
            EapTlsMsg::MoreFrag => {
                self.tls_send.free();
                self.tls_response_send(ctx);
            }
            EapTlsMsg::Continue => self.tls_response_send(ctx),
            EapTlsMsg::SendDone => {
                if self.tls_done {
                    self.tls_response_send(ctx);
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
            EapTlsMsg::Fail | EapTlsMsg::DecodeError => tracing::debug!("invalid EAP-TLS request dropped"),
        }
    }
}

impl<T: TlsEngine> Default for EapTlsSupp<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CryptoLayer, T: TlsEngine, App: ApplicationLayer<C, Tls = T>> SecProt<C, App> for EapTlsSupp<T> {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::EapTls
    }

    fn create_response(&mut self, ctx: &mut SecProtContext<'_, C, App>, result: SecProtResult) {
        if self.common.state() != State::CreateResp {
            return;
        }
        if result != SecProtResult::Ok {
            self.finish(ctx, result);
            return;
        }
        self.common.timeout_set(ctx.settings.sec_prot_timeout);
        let id = self.last_recv_id.unwrap_or(0);
        self.response_send(ctx, EapFrame::new(EAP_RESPONSE, id, EAP_IDENTITY, EAP_ANONYMOUS_IDENTITY.to_vec()));
        self.common.state_set(State::RequestTlsEap);
    }

    fn receive(&mut self, ctx: &mut SecProtContext<'_, C, App>, data: &[u8]) -> Result<(), ReceiveError> {
        let frame = eap_frame_parse(data)?;
        let state = self.common.state();
        if matches!(state, State::Finish | State::Finished) {
            return Err(fault!(FaultType::OutOfSequence, false));
        }

        // Success and failure carry the id of the last request.
        match frame.code {
            EAP_SUCCESS | EAP_FAILURE if state != State::Init => {
                let result = if frame.code == EAP_SUCCESS && self.tls_done && ctx.keys.pmk_is_set() {
                    SecProtResult::Ok
                } else {
                    SecProtResult::Error
                };
                self.finish(ctx, result);
                return Ok(());
            }
            EAP_REQ => {}
            _ => return Err(fault!(FaultType::InvalidPacket, true)),
        }

        if self.last_recv_id == Some(frame.id_seq) {
            if self.burst_filt_timer > 0 || self.wait_tls {
                log!(ctx.app, BurstFiltered(ctx.remote_eui64, frame.id_seq));
                return Ok(());
            }
            // The authenticator did not get our answer.
            self.burst_filt_timer = ctx.settings.burst_filter_timeout;
            if let Some(pdu) = self.last.as_ref() {
                ctx.send(ProtocolKind::EapTls, pdu);
            }
            return Ok(());
        }

        match (state, frame.eap_type) {
            (State::Init, EAP_IDENTITY) => {
                self.last_recv_id = Some(frame.id_seq);
                self.burst_filt_timer = ctx.settings.burst_filter_timeout;
                self.common.state_set(State::CreateResp);
                ctx.create_indication(ProtocolKind::EapTls);
            }
            (State::RequestTlsEap | State::Request, EAP_IDENTITY) => {
                // The authenticator restarted.
                self.last_recv_id = Some(frame.id_seq);
                self.burst_filt_timer = ctx.settings.burst_filter_timeout;
                self.tls = None;
                self.response_send(ctx, EapFrame::new(EAP_RESPONSE, frame.id_seq, EAP_IDENTITY, EAP_ANONYMOUS_IDENTITY.to_vec()));
                self.common.state_set(State::RequestTlsEap);
            }
            (State::RequestTlsEap | State::Request, EAP_TLS) => {
                let start = frame.data.first().is_some_and(|flags| flags & EAP_TLS_START != 0);
                if state == State::RequestTlsEap && !start {
                    return Err(fault!(FaultType::OutOfSequence, false));
                }
                self.last_recv_id = Some(frame.id_seq);
                self.burst_filt_timer = ctx.settings.burst_filter_timeout;
                if start {
                    self.tls_start(ctx);
                } else {
                    self.tls_request(ctx, frame);
                }
            }
            _ => return Err(fault!(FaultType::OutOfSequence, false)),
        }
        Ok(())
    }

    fn timer_timeout(&mut self, ctx: &mut SecProtContext<'_, C, App>, ticks: u16) {
        if matches!(self.common.state(), State::Finish | State::Finished) {
            return;
        }
        self.burst_filt_timer = self.burst_filt_timer.saturating_sub(ticks);
        if self.wait_tls {
            if let Some(result) = self.tls.as_mut().and_then(|bridge| bridge.timer_timeout(ticks)) {
                self.tls_result(ctx, result);
            }
        }
        if self.common.timer_timeout(ticks, ctx.rng) == TimerEvent::Timeout {
            log!(ctx.app, TimedOut(ctx.remote_eui64, ProtocolKind::EapTls));
            self.finish(ctx, SecProtResult::Timeout);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sec_prot::KmpEvent;
    use crate::test_util::{eap_pdu, Harness, MockStep, MockTls, TestApp};

    type Supp = EapTlsSupp<MockTls>;

    fn identified(h: &mut Harness, id: u8) -> Supp {
        let mut supp = Supp::new();
        h.run(|ctx| SecProt::receive(&mut supp, ctx, &eap_pdu(EAP_REQ, id, EAP_IDENTITY, &[]))).unwrap();
        assert_eq!(h.events, [KmpEvent::CreateIndication(ProtocolKind::EapTls)]);
        h.events.clear();
        h.run(|ctx| SecProt::create_response(&mut supp, ctx, SecProtResult::Ok));
        supp
    }

    #[test]
    fn burst_of_duplicates_gets_one_answer() {
        let mut h = Harness::new(TestApp::new());
        let mut supp = identified(&mut h, 40);
        for _ in 0..4 {
            h.run(|ctx| SecProt::receive(&mut supp, ctx, &eap_pdu(EAP_REQ, 40, EAP_IDENTITY, &[]))).unwrap();
        }
        assert_eq!(h.app.sent.len(), 1);
        let response = h.app.take_eap();
        assert_eq!((response.code, response.id_seq, response.eap_type), (EAP_RESPONSE, 40, EAP_IDENTITY));
        assert_eq!(response.data, EAP_ANONYMOUS_IDENTITY);

        // Once the filter window is over, a repeat is a retransmission and gets the same answer.
        h.run(|ctx| SecProt::timer_timeout(&mut supp, ctx, BURST_FILTER_TIMER_TIMEOUT));
        h.run(|ctx| SecProt::receive(&mut supp, ctx, &eap_pdu(EAP_REQ, 40, EAP_IDENTITY, &[]))).unwrap();
        assert_eq!(h.app.take_eap(), response);
        assert!(h.events.is_empty());
    }

    #[test]
    fn handshake_to_success() {
        let hello = vec![0x16u8; EAP_TLS_FRAGMENT_LEN + 1];
        let mut h = Harness::new(TestApp::with_tls(vec![
            MockStep::send(&hello, TlsProcess::Continue),
            MockStep::finish(b"client-fin", &[3u8; 40]),
        ]));
        let mut supp = identified(&mut h, 1);
        h.app.sent.clear();

        h.run(|ctx| SecProt::receive(&mut supp, ctx, &eap_pdu(EAP_REQ, 2, EAP_TLS, &[EAP_TLS_START]))).unwrap();
        let first = h.app.take_eap();
        assert_eq!((first.id_seq, first.data[0]), (2, EAP_TLS_MORE_FRAGMENTS | EAP_TLS_FRAGMENT_LENGTH));
        h.run(|ctx| SecProt::receive(&mut supp, ctx, &eap_pdu(EAP_REQ, 3, EAP_TLS, &[0]))).unwrap();
        let second = h.app.take_eap();
        assert_eq!((second.id_seq, second.data.as_slice()), (3, &[0u8, 0x16][..]));

        // Server flight in two fragments.
        let mut frag = vec![EAP_TLS_MORE_FRAGMENTS | EAP_TLS_FRAGMENT_LENGTH];
        frag.extend_from_slice(&8u32.to_be_bytes());
        frag.extend_from_slice(b"serv");
        h.run(|ctx| SecProt::receive(&mut supp, ctx, &eap_pdu(EAP_REQ, 4, EAP_TLS, &frag))).unwrap();
        assert_eq!(h.app.take_eap().data, [0]);
        h.run(|ctx| SecProt::receive(&mut supp, ctx, &eap_pdu(EAP_REQ, 5, EAP_TLS, b"\x00er-1"))).unwrap();
        let fin = h.app.take_eap();
        assert_eq!(&fin.data[1..], b"client-fin");

        h.run(|ctx| SecProt::receive(&mut supp, ctx, &eap_pdu(EAP_REQ, 6, EAP_TLS, &[0]))).unwrap();
        assert_eq!(h.app.take_eap().data, [0]);
        h.run(|ctx| SecProt::receive(&mut supp, ctx, &EapolPdu::Eap(EapFrame::result(EAP_SUCCESS, 6)).to_bytes().unwrap()))
            .unwrap();
        assert_eq!(h.keys.pmk_get(), Some(&[3u8; 32]));
        assert_eq!(h.events, [KmpEvent::FinishedIndication(ProtocolKind::EapTls, SecProtResult::Ok)]);
    }

    #[test]
    fn failure_and_timeout() {
        let mut h = Harness::new(TestApp::new());
        let mut supp = identified(&mut h, 1);
        h.run(|ctx| SecProt::receive(&mut supp, ctx, &EapolPdu::Eap(EapFrame::result(EAP_FAILURE, 1)).to_bytes().unwrap()))
            .unwrap();
        assert_eq!(h.events, [KmpEvent::FinishedIndication(ProtocolKind::EapTls, SecProtResult::Error)]);

        let mut h = Harness::new(TestApp::new());
        let mut supp = identified(&mut h, 1);
        let timeout = h.settings.sec_prot_timeout;
        for _ in 0..timeout / 100 {
            h.run(|ctx| SecProt::timer_timeout(&mut supp, ctx, 100));
        }
        assert_eq!(h.events, [KmpEvent::FinishedIndication(ProtocolKind::EapTls, SecProtResult::Timeout)]);
    }

    #[test]
    fn success_without_keys_is_an_error() {
        let mut h = Harness::new(TestApp::new());
        let mut supp = identified(&mut h, 9);
        h.run(|ctx| SecProt::receive(&mut supp, ctx, &EapolPdu::Eap(EapFrame::result(EAP_SUCCESS, 9)).to_bytes().unwrap()))
            .unwrap();
        assert_eq!(h.events, [KmpEvent::FinishedIndication(ProtocolKind::EapTls, SecProtResult::Error)]);
    }
}
