use zeroize::Zeroizing;

use crate::application::{ApplicationLayer, CryptoLayer};
use crate::common::{SecProtCommon, SecProtResult, TimerEvent};
use crate::crypto::aes_key_wrap;
use crate::eapol::{EapolPdu, KeyFrame, KeyInformation};
use crate::kde;
use crate::key_frame::*;
use crate::log_event::log;
use crate::proto::*;
use crate::result::{fault, FaultType, ReceiveError};
use crate::sec_prot::{ProtocolKind, SecProt, SecProtContext};
#[cfg(feature = "logging")]
use crate::LogEvent::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    CreateReq,
    Message2,
    Finish,
    Finished,
}

/// Group key handshake authenticator. Sends one GTK to the supplicant and marks it live in
/// the supplicant's GTKL once Message 2 confirms it.
pub struct GkhAuth {
    common: SecProtCommon<State>,
    gtk_index: u8,
    /// Replay counter of the last Message 1 sent.
    replay_counter: u64,
}

impl GkhAuth {
    pub fn new() -> Self {
        Self { common: SecProtCommon::new(State::Init), gtk_index: 0, replay_counter: 0 }
    }

    fn finish<C: CryptoLayer, App: ApplicationLayer<C>>(&mut self, ctx: &mut SecProtContext<'_, C, App>, result: SecProtResult) {
        self.common.result_set(result);
        self.common.timers_stop();
        self.common.state_set(State::Finish);
        ctx.finished_indication(ProtocolKind::Gkh, result);
    }

    /// Builds and sends Message 1 with a new replay counter.
    fn message1_send<C: CryptoLayer, App: ApplicationLayer<C>>(&mut self, ctx: &mut SecProtContext<'_, C, App>) -> bool {
        let (Some(kck), Some(kek)) = (ctx.keys.kck_get().copied(), ctx.keys.kek_get().copied()) else {
            tracing::debug!("group key handshake without PTK");
            return false;
        };
        let (kck, kek) = (Zeroizing::new(kck), Zeroizing::new(kek));
        let Some((index, gtk)) = ctx.keys.gtk_get_for_insert(ctx.gtks) else {
            return false;
        };
        let gtk = Zeroizing::new(*gtk);
        let lifetime = ctx.gtks.gtk_lifetime_get(index);
        let gtkl = ctx.keys.gtkl_get() | (1 << index);

        let mut key_data = Zeroizing::new(Vec::with_capacity(kde::padded_length(KDE_GTK_LEN + KDE_LIFETIME_LEN + KDE_GTKL_LEN)));
        kde::gtk_write(&mut key_data, index, false, &gtk);
        kde::lifetime_write(&mut key_data, lifetime);
        kde::gtkl_write(&mut key_data, gtkl);
        kde::pad(&mut key_data);
        let Some(wrapped) = aes_key_wrap::<C::AesEnc>(&kek, &key_data) else {
            return false;
        };

        let counter = ctx.keys.pmk_replay_cnt_increment();
        let info = KeyInformation {
            description_version: KEY_DESCRIPTION_HMAC_SHA1_MIC_AES_ENC,
            key_ack: true,
            key_mic: true,
            secured_key_frame: true,
            encrypted_key_data: true,
            ..Default::default()
        };
        let eapol = match frame_build::<C::HmacSha1>(&kck, KeyFrame::new(info, counter, wrapped)) {
            Ok(eapol) => eapol,
            Err(e) => {
                tracing::warn!("GKH Message 1 not encoded: {}", e);
                return false;
            }
        };
        ctx.keys.ptk_installed_gtk_hash_set::<C::Sha256>(ctx.gtks);
        ctx.send_bytes(ProtocolKind::Gkh, &eapol);

        self.gtk_index = index;
        self.replay_counter = counter;
        log!(ctx.app, GkhMessage1Sent(ctx.remote_eui64, index, counter));
        true
    }

    /// Message 2 is MIC and secure only, and echoes the counter of the last Message 1.
    fn message2_check<H: crate::crypto::HmacSha1>(&self, kck: &[u8; KCK_LEN], frame: &KeyFrame, eapol: &[u8]) -> bool {
        key_mask(&frame.key_information) == KEY_MASK_MIC | KEY_MASK_SECURED
            && !frame.key_information.pairwise_key
            && frame.replay_counter == self.replay_counter
            && mic_verify::<H>(kck, eapol)
    }
}

impl Default for GkhAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CryptoLayer, App: ApplicationLayer<C>> SecProt<C, App> for GkhAuth {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Gkh
    }

    fn create_request(&mut self, ctx: &mut SecProtContext<'_, C, App>) {
        if self.common.state() != State::Init {
            return;
        }
        self.common.state_set(State::CreateReq);
        ctx.create_confirm(ProtocolKind::Gkh, SecProtResult::Ok);

        let Some(index) = ctx.keys.gtk_insert_index_from_gtkl_get(ctx.gtks) else {
            tracing::debug!("no GTK to insert");
            return self.finish(ctx, SecProtResult::Error);
        };
        if ctx.keys.ptk_installed_gtk_hash_mismatch_check::<C::Sha256>(ctx.gtks, index) {
            log!(ctx.app, PtkInstalledGtkMismatch(ctx.remote_eui64, index));
            ctx.keys.ptk_mismatch_set();
            return self.finish(ctx, SecProtResult::Error);
        }
        if !self.message1_send(ctx) {
            return self.finish(ctx, SecProtResult::Error);
        }
        self.common.timeout_set(ctx.settings.sec_prot_timeout);
        self.common.fixed_retry_start(ctx.settings.gkh_retry_timeout, ctx.settings.gkh_retry_count);
        self.common.state_set(State::Message2);
    }

    fn receive(&mut self, ctx: &mut SecProtContext<'_, C, App>, data: &[u8]) -> Result<(), ReceiveError> {
        let pdu = EapolPdu::parse(data)?;
        let Some(len) = pdu_bytes(data, &pdu) else {
            return Err(fault!(FaultType::InvalidPacket, true));
        };
        let EapolPdu::Key(frame) = pdu else {
            return Err(fault!(FaultType::InvalidPacket, true));
        };
        if self.common.state() != State::Message2 {
            return Err(fault!(FaultType::OutOfSequence, false));
        }
        let Some(kck) = ctx.keys.kck_get().copied().map(Zeroizing::new) else {
            return Err(fault!(FaultType::FailedAuth, false));
        };
        if !self.message2_check::<C::HmacSha1>(&kck, &frame, &data[..len]) {
            log!(ctx.app, GkhMessage2Ignored(ctx.remote_eui64, frame.replay_counter));
            return Err(if frame.replay_counter != self.replay_counter {
                fault!(FaultType::ExpiredCounter, false)
            } else {
                fault!(FaultType::FailedAuth, true)
            });
        }
        ctx.keys.gtkl_gtk_live_set(self.gtk_index);
        ctx.keys.gtk_insert_index_clear();
        self.finish(ctx, SecProtResult::Ok);
        Ok(())
    }

    fn timer_timeout(&mut self, ctx: &mut SecProtContext<'_, C, App>, ticks: u16) {
        if self.common.state() != State::Message2 {
            return;
        }
        match self.common.timer_timeout(ticks, ctx.rng) {
            TimerEvent::Retry => {
                if self.message1_send(ctx) {
                    log!(ctx.app, Resent(ctx.remote_eui64, ProtocolKind::Gkh));
                } else {
                    self.finish(ctx, SecProtResult::Error);
                }
            }
            TimerEvent::Timeout => {
                log!(ctx.app, TimedOut(ctx.remote_eui64, ProtocolKind::Gkh));
                self.finish(ctx, SecProtResult::Timeout);
            }
            TimerEvent::None => {}
        }
    }

    fn finished_send(&mut self, _: &mut SecProtContext<'_, C, App>) {
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
