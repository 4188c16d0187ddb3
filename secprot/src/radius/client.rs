use rand_core::RngCore;

use crate::application::{ApplicationLayer, CryptoLayer};
use crate::common::{SecProtCommon, SecProtResult};
use crate::eapol::EapFrame;
use crate::log_event::log;
use crate::proto::*;
use crate::radius::message::{identifier_get, response_validate, AccessRequest};
use crate::radius::shared::{station_id, RadiusIdRange};
use crate::result::{fault, FaultType, ReceiveError};
use crate::sec_prot::{PeerMessage, ProtocolKind, SecProt, SecProtContext};
#[cfg(feature = "logging")]
use crate::LogEvent::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    /// Identity received from the relay, waiting for the create response.
    CreateResp,
    SendInitialAccessRequest,
    /// Access-Request outstanding.
    AccessAcceptRejectChallenge,
    /// Challenge forwarded, waiting for the next EAP response from the relay.
    SendAccessRequest,
    Finish,
    Finished,
}

/// RADIUS client serving the EAP-TLS relay of the same session.
///
/// Each EAP message from the relay becomes one Access-Request. Every request is sent with a new
/// identifier from the identifier range claimed by this instance and a fresh random request
/// authenticator, and is retransmitted unchanged until a response arrives.
pub struct RadiusClient {
    common: SecProtCommon<State>,
    identity: Vec<u8>,
    /// EAP message to carry in the next Access-Request.
    eap: Vec<u8>,
    /// State attribute of the last challenge, echoed in the next request.
    state_attr: Option<Vec<u8>>,
    id_range: Option<RadiusIdRange>,
    identifier: u8,
    request_authenticator: [u8; RADIUS_AUTHENTICATOR_LEN],
    request: Vec<u8>,
    retry_ticks: u16,
    retries_left: u8,
}

impl RadiusClient {
    pub fn new() -> Self {
        Self {
            common: SecProtCommon::new(State::Init),
            identity: Vec::new(),
            eap: Vec::new(),
            state_attr: None,
            id_range: None,
            identifier: 0,
            request_authenticator: [0; RADIUS_AUTHENTICATOR_LEN],
            request: Vec::new(),
            retry_ticks: 0,
            retries_left: 0,
        }
    }

    fn identifier_allocate<C: CryptoLayer, App: ApplicationLayer<C>>(
        &mut self,
        ctx: &mut SecProtContext<'_, C, App>,
    ) -> Option<u8> {
        if let Some(id) = self.id_range.and_then(|range| ctx.radius.pool.id_allocate(range)) {
            return Some(id);
        }
        if let Some(range) = self.id_range.take() {
            ctx.radius.pool.range_release(range);
        }
        let range = ctx.radius.pool.range_allocate()?;
        self.id_range = Some(range);
        ctx.radius.pool.id_allocate(range)
    }

    fn retry_delay<R: RngCore>(rng: &mut R, imin: u16, imax: u16) -> u16 {
        let span = imax.saturating_sub(imin) as u32 + 1;
        imin + (rng.next_u32() % span) as u16
    }

    /// Encodes and sends an Access-Request for the pending EAP message.
    fn access_request_send<C: CryptoLayer, App: ApplicationLayer<C>>(
        &mut self,
        ctx: &mut SecProtContext<'_, C, App>,
    ) -> SecProtResult {
        let Some(config) = ctx.radius.config.as_ref() else {
            return SecProtResult::ConfError;
        };
        let secret = config.secret.clone();
        let nas_ipv6_address = config.nas_ipv6_address;

        let Some(identifier) = self.identifier_allocate(ctx) else {
            log!(ctx.app, RadiusIdentifiersExhausted);
            tracing::warn!("no free RADIUS identifier range");
            return SecProtResult::Error;
        };
        self.identifier = identifier;
        ctx.rng.fill_bytes(&mut self.request_authenticator);

        let called = station_id::<C::Sha256>(ctx.local_eui64, &ctx.radius.salt);
        let calling = station_id::<C::Sha256>(ctx.remote_eui64, &ctx.radius.salt);
        let request = AccessRequest {
            identifier,
            authenticator: self.request_authenticator,
            user_name: &self.identity,
            nas_ipv6_address: nas_ipv6_address.as_ref(),
            called_station_id: &called,
            calling_station_id: &calling,
            state: self.state_attr.as_deref(),
            eap: &self.eap,
        };
        self.request = match request.build::<C::HmacMd5>(&secret) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Access-Request not encoded: {}", e);
                return SecProtResult::Error;
            }
        };
        if let Err(e) = ctx.app.radius_send(&self.request) {
            // Left to the retransmission timer.
            tracing::debug!("Access-Request send failed: {}", e);
        }
        log!(ctx.app, RadiusAccessRequestSent(identifier));

        self.retry_ticks = Self::retry_delay(ctx.rng, ctx.settings.radius_retry_imin, ctx.settings.radius_retry_imax);
        self.retries_left = ctx.settings.radius_retry_count;
        self.common.state_set(State::AccessAcceptRejectChallenge);
        SecProtResult::Ok
    }

    fn finish<C: CryptoLayer, App: ApplicationLayer<C>>(&mut self, ctx: &mut SecProtContext<'_, C, App>, result: SecProtResult) {
        self.common.result_set(result);
        self.common.timers_stop();
        self.retry_ticks = 0;
        self.common.state_set(State::Finish);
        ctx.finished_indication(ProtocolKind::RadiusClient, result);
    }

    fn release<C: CryptoLayer, App: ApplicationLayer<C>>(&mut self, ctx: &mut SecProtContext<'_, C, App>) {
        if let Some(range) = self.id_range.take() {
            ctx.radius.pool.range_release(range);
        }
    }
}

impl Default for RadiusClient {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CryptoLayer, App: ApplicationLayer<C>> SecProt<C, App> for RadiusClient {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::RadiusClient
    }

    fn create_response(&mut self, ctx: &mut SecProtContext<'_, C, App>, result: SecProtResult) {
        if self.common.state() != State::CreateResp {
            return;
        }
        if result != SecProtResult::Ok {
            self.finish(ctx, result);
            return;
        }
        self.common.state_set(State::SendInitialAccessRequest);
        let result = self.access_request_send(ctx);
        if result != SecProtResult::Ok {
            self.finish(ctx, result);
        }
    }

    fn receive(&mut self, ctx: &mut SecProtContext<'_, C, App>, data: &[u8]) -> Result<(), ReceiveError> {
        if self.common.state() != State::AccessAcceptRejectChallenge {
            return Err(fault!(FaultType::OutOfSequence, false));
        }
        if identifier_get(data) != Some(self.identifier) {
            return Err(fault!(FaultType::UnknownIdentifier, false));
        }
        let Some(config) = ctx.radius.config.as_ref() else {
            return Err(ReceiveError::Unassociated);
        };
        let response = response_validate::<C>(data, self.identifier, &self.request_authenticator, &config.secret)?;
        log!(ctx.app, RadiusResponseAccepted(response.code, response.identifier));
        self.retry_ticks = 0;

        if response.state.is_some() {
            self.state_attr = response.state;
        }
        let eap = response.eap;
        match response.code {
            RADIUS_ACCESS_CHALLENGE => {
                self.common.state_set(State::SendAccessRequest);
                ctx.peer_send(ProtocolKind::RadiusEapTls, PeerMessage::Eap(eap));
            }
            RADIUS_ACCESS_ACCEPT => {
                let result = match response.recv_key.as_deref().and_then(|key| key.get(..PMK_LEN)) {
                    Some(pmk) => {
                        let mut key = [0u8; PMK_LEN];
                        key.copy_from_slice(pmk);
                        ctx.keys.pmk_write(&key);
                        zeroize::Zeroize::zeroize(&mut key);
                        SecProtResult::Ok
                    }
                    None => {
                        tracing::warn!("Access-Accept without MS-MPPE-Recv-Key");
                        SecProtResult::Error
                    }
                };
                ctx.peer_send(ProtocolKind::RadiusEapTls, PeerMessage::Eap(eap));
                self.finish(ctx, result);
            }
            _ => {
                ctx.peer_send(ProtocolKind::RadiusEapTls, PeerMessage::Eap(eap));
                self.finish(ctx, SecProtResult::Error);
            }
        }
        Ok(())
    }

    fn receive_peer(&mut self, ctx: &mut SecProtContext<'_, C, App>, msg: PeerMessage) {
        match msg {
            PeerMessage::Eap(eap) => match self.common.state() {
                State::Init => {
                    let Ok(frame) = EapFrame::parse(&eap) else {
                        return;
                    };
                    if frame.code != EAP_RESPONSE || frame.eap_type != EAP_IDENTITY {
                        tracing::debug!("RADIUS client started without an EAP identity");
                        return;
                    }
                    self.identity = frame.data;
                    self.eap = eap;
                    self.common.state_set(State::CreateResp);
                    ctx.create_indication(ProtocolKind::RadiusClient);
                }
                State::SendAccessRequest => {
                    self.eap = eap;
                    let result = self.access_request_send(ctx);
                    if result != SecProtResult::Ok {
                        self.finish(ctx, result);
                    }
                }
                _ => tracing::debug!("RADIUS client busy, EAP from relay dropped"),
            },
            PeerMessage::PeerDeleted => {
                if !matches!(self.common.state(), State::Finish | State::Finished) {
                    let result = match self.common.result() {
                        SecProtResult::None => SecProtResult::Error,
                        r => r,
                    };
                    self.finish(ctx, result);
                }
            }
        }
    }

    fn timer_timeout(&mut self, ctx: &mut SecProtContext<'_, C, App>, ticks: u16) {
        if self.common.state() != State::AccessAcceptRejectChallenge || self.retry_ticks == 0 {
            return;
        }
        if self.retry_ticks > ticks {
            self.retry_ticks -= ticks;
            return;
        }
        if self.retries_left == 0 {
            log!(ctx.app, TimedOut(ctx.remote_eui64, ProtocolKind::RadiusClient));
            // The relay learns of the failure when this instance is deleted.
            self.finish(ctx, SecProtResult::Timeout);
            return;
        }
        self.retries_left -= 1;
        if let Err(e) = ctx.app.radius_send(&self.request) {
            tracing::debug!("Access-Request resend failed: {}", e);
        }
        log!(ctx.app, Resent(ctx.remote_eui64, ProtocolKind::RadiusClient));
        self.retry_ticks = Self::retry_delay(ctx.rng, ctx.settings.radius_retry_imin, ctx.settings.radius_retry_imax);
    }

    fn finished_send(&mut self, ctx: &mut SecProtContext<'_, C, App>) {
        self.release(ctx);
        self.common.state_set(State::Finished);
    }

    fn delete(&mut self, ctx: &mut SecProtContext<'_, C, App>) {
        self.release(ctx);
    }

    fn is_finished(&self) -> bool {
        self.common.state() == State::Finished
    }

    fn result(&self) -> SecProtResult {
        self.common.result()
    }

    fn radius_identifier(&self) -> Option<u8> {
        (self.common.state() == State::AccessAcceptRejectChallenge).then_some(self.identifier)
    }
}
