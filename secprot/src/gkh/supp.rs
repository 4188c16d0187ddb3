use zeroize::Zeroizing;

use crate::application::{ApplicationLayer, CryptoLayer};
use crate::common::{SecProtCommon, SecProtResult, TimerEvent};
use crate::crypto::aes_key_unwrap;
use crate::eapol::{EapolPdu, KeyFrame, KeyInformation};
use crate::kde;
use crate::key_frame::*;
use crate::log_event::log;
use crate::proto::*;
use crate::result::{fault, DecodeError, FaultType, ReceiveError};
use crate::sec_prot::{ProtocolKind, SecProt, SecProtContext};
#[cfg(feature = "logging")]
use crate::LogEvent::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    CreateResp,
    Message1,
    Finish,
    Finished,
}

/// Group key handshake supplicant.
pub struct GkhSupp {
    common: SecProtCommon<State>,
    /// Message 1 that created this instance, handled once the creation is accepted.
    message1: Option<KeyFrame>,
}

impl GkhSupp {
    pub fn new() -> Self {
        Self { common: SecProtCommon::new(State::Init), message1: None }
    }

    fn finish<C: CryptoLayer, App: ApplicationLayer<C>>(&mut self, ctx: &mut SecProtContext<'_, C, App>, result: SecProtResult) {
        self.common.result_set(result);
        self.common.timers_stop();
        self.common.state_set(State::Finish);
        ctx.finished_indication(ProtocolKind::Gkh, result);
    }

    /// Header, replay counter and MIC checks of Message 1.
    fn message1_check<C: CryptoLayer, App: ApplicationLayer<C>>(
        ctx: &SecProtContext<'_, C, App>,
        frame: &KeyFrame,
        eapol: &[u8],
    ) -> Result<(), ReceiveError> {
        if key_mask(&frame.key_information) != KEY_MASK_ACK | KEY_MASK_MIC | KEY_MASK_SECURED | KEY_MASK_ENCRYPTED
            || frame.key_information.pairwise_key
        {
            return Err(fault!(FaultType::InvalidPacket, true));
        }
        if !ctx.keys.pmk_replay_cnt_compare(frame.replay_counter) {
            return Err(fault!(FaultType::ExpiredCounter, false));
        }
        match ctx.keys.kck_get() {
            Some(kck) if mic_verify::<C::HmacSha1>(kck, eapol) => Ok(()),
            _ => Err(fault!(FaultType::FailedAuth, true)),
        }
    }

    /// Installs the GTK of a checked Message 1 and answers with Message 2.
    fn message1_process<C: CryptoLayer, App: ApplicationLayer<C>>(
        &mut self,
        ctx: &mut SecProtContext<'_, C, App>,
        frame: &KeyFrame,
    ) -> Result<(), ReceiveError> {
        let Some(kek) = ctx.keys.kek_get().copied().map(Zeroizing::new) else {
            return Err(fault!(FaultType::FailedAuth, false));
        };
        let Some(key_data) = aes_key_unwrap::<C::AesDec>(&kek, &frame.key_data).map(Zeroizing::new) else {
            return Err(fault!(FaultType::FailedAuth, true));
        };
        let kdes = kde::parse(&key_data)?;
        let gtk = kdes.gtk.as_ref().ok_or(DecodeError::InvalidAttribute)?;
        let lifetime = kdes.lifetime.unwrap_or(ctx.settings.gtk_lifetime);
        if !ctx.gtks.gtk_set(gtk.index, &gtk.gtk, lifetime) && !ctx.gtks.gtk_is_set(gtk.index) {
            return Err(DecodeError::InvalidAttribute.into());
        }
        log!(ctx.app, GtkInstalled(ctx.remote_eui64, gtk.index));
        if let Some(gtkl) = kdes.gtkl {
            ctx.keys.gtkl_set(gtkl);
        }
        ctx.keys.pmk_replay_cnt_set(frame.replay_counter);

        let info = KeyInformation {
            description_version: KEY_DESCRIPTION_HMAC_SHA1_MIC_AES_ENC,
            key_mic: true,
            secured_key_frame: true,
            ..Default::default()
        };
        if let Some(kck) = ctx.keys.kck_get().copied().map(Zeroizing::new) {
            let eapol = frame_build::<C::HmacSha1>(&kck, KeyFrame::new(info, frame.replay_counter, Vec::new()))
                .map_err(|_| ReceiveError::OutOfMemory)?;
            ctx.send_bytes(ProtocolKind::Gkh, &eapol);
        }
        Ok(())
    }
}

impl Default for GkhSupp {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CryptoLayer, App: ApplicationLayer<C>> SecProt<C, App> for GkhSupp {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Gkh
    }

    fn create_response(&mut self, ctx: &mut SecProtContext<'_, C, App>, result: SecProtResult) {
        if self.common.state() != State::CreateResp {
            return;
        }
        let Some(frame) = self.message1.take() else {
            return;
        };
        if result != SecProtResult::Ok {
            return self.finish(ctx, result);
        }
        self.common.state_set(State::Message1);
        match self.message1_process(ctx, &frame) {
            Ok(()) => self.finish(ctx, SecProtResult::Ok),
            Err(e) => {
                tracing::debug!("group key handshake message 1 rejected: {}", e);
                self.finish(ctx, SecProtResult::Error);
            }
        }
    }

    fn receive(&mut self, ctx: &mut SecProtContext<'_, C, App>, data: &[u8]) -> Result<(), ReceiveError> {
        let pdu = EapolPdu::parse(data)?;
        let Some(len) = pdu_bytes(data, &pdu) else {
            return Err(fault!(FaultType::InvalidPacket, true));
        };
        let EapolPdu::Key(frame) = pdu else {
            return Err(fault!(FaultType::InvalidPacket, true));
        };
        if self.common.state() != State::Init {
            return Err(fault!(FaultType::OutOfSequence, false));
        }
        Self::message1_check(ctx, &frame, &data[..len])?;
        self.message1 = Some(frame);
        self.common.timeout_set(ctx.settings.sec_prot_timeout);
        self.common.state_set(State::CreateResp);
        ctx.create_indication(ProtocolKind::Gkh);
        Ok(())
    }

    fn timer_timeout(&mut self, ctx: &mut SecProtContext<'_, C, App>, ticks: u16) {
        if matches!(self.common.state(), State::Init | State::Finish | State::Finished) {
            return;
        }
        if self.common.timer_timeout(ticks, ctx.rng) == TimerEvent::Timeout {
            log!(ctx.app, TimedOut(ctx.remote_eui64, ProtocolKind::Gkh));
            self.finish(ctx, SecProtResult::Timeout);
        }
    }

    fn finished_send(&mut self, _: &mut SecProtContext<'_, C, App>) {
        self.message1 = None;
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
