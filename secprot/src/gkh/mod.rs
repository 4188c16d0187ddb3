/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) ZeroTier, Inc.
 * https://www.zerotier.com/
 */
//! The 802.11 group key handshake: Message 1 carries a wrapped GTK, Message 2 confirms it.
mod auth;
mod supp;

pub use auth::GkhAuth;
pub use supp::GkhSupp;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SecProtResult;
    use crate::proto::PTK_LEN;
    use crate::sec_prot::{KmpEvent, ProtocolKind, SecProt};
    use crate::test_util::{Harness, TestApp};

    fn paired() -> (Harness, Harness) {
        let mut ptk = [0u8; PTK_LEN];
        for (i, b) in ptk.iter_mut().enumerate() {
            *b = i as u8 ^ 0x5a;
        }
        let mut auth = Harness::new(TestApp::new());
        let mut supp = Harness::new(TestApp::new());
        auth.keys.ptk_write(&ptk);
        supp.keys.ptk_write(&ptk);
        assert!(auth.gtks.gtk_set(0, &[0x11; 16], 1000));
        auth.gtks.gtk_status_fresh_set(0);
        assert!(auth.gtks.gtk_status_active_set(0));
        (auth, supp)
    }

    /// Delivers the last Message 1 sent by `a` to a new supplicant instance on `s` and
    /// returns the Message 2 it answered with.
    fn supplicant_answers(a: &mut Harness, s: &mut Harness) -> Vec<u8> {
        let (_, message1) = a.app.take_key();
        let mut gkh = GkhSupp::new();
        s.run(|ctx| SecProt::receive(&mut gkh, ctx, &message1)).unwrap();
        assert_eq!(s.events, [KmpEvent::CreateIndication(ProtocolKind::Gkh)]);
        s.run(|ctx| SecProt::create_response(&mut gkh, ctx, SecProtResult::Ok));
        assert_eq!(s.events[1], KmpEvent::FinishedIndication(ProtocolKind::Gkh, SecProtResult::Ok));
        s.events.clear();
        s.app.take_key().1
    }

    #[test]
    fn gtk_delivered_and_confirmed() {
        let (mut a, mut s) = paired();
        let mut gkh = GkhAuth::new();
        a.run(|ctx| SecProt::create_request(&mut gkh, ctx));
        assert_eq!(a.events, [KmpEvent::CreateConfirm(ProtocolKind::Gkh, SecProtResult::Ok)]);
        a.events.clear();

        let message2 = supplicant_answers(&mut a, &mut s);
        assert_eq!(s.gtks.gtk_get(0), Some(&[0x11; 16]));
        assert_eq!(s.gtks.gtk_lifetime_get(0), 1000);
        assert_eq!(s.keys.gtkl_get(), 0b1);

        a.run(|ctx| SecProt::receive(&mut gkh, ctx, &message2)).unwrap();
        assert_eq!(a.events, [KmpEvent::FinishedIndication(ProtocolKind::Gkh, SecProtResult::Ok)]);
        assert!(a.keys.gtkl_gtk_is_live(0));
        assert_eq!(a.keys.gtk_insert_index_get(), None);
    }

    #[test]
    fn stale_message2_ignored_until_retry_answered() {
        let (mut a, mut s) = paired();
        let mut first = GkhAuth::new();
        a.run(|ctx| SecProt::create_request(&mut first, ctx));
        let old_message2 = supplicant_answers(&mut a, &mut s);
        a.run(|ctx| SecProt::receive(&mut first, ctx, &old_message2)).unwrap();
        a.events.clear();

        assert!(a.gtks.gtk_set(1, &[0x22; 16], 2000));
        a.gtks.gtk_status_fresh_set(1);
        let mut second = GkhAuth::new();
        a.run(|ctx| SecProt::create_request(&mut second, ctx));
        a.events.clear();

        // A replay of the previous handshake's Message 2 carries an older counter.
        assert!(a.run(|ctx| SecProt::receive(&mut second, ctx, &old_message2)).is_err());
        assert!(a.events.is_empty());
        assert!(!a.keys.gtkl_gtk_is_live(1));

        let sent_before = a.app.sent.len();
        let interval = a.settings.gkh_retry_timeout;
        a.run(|ctx| SecProt::timer_timeout(&mut second, ctx, interval));
        assert_eq!(a.app.sent.len(), sent_before + 1);

        let message2 = supplicant_answers(&mut a, &mut s);
        assert_eq!(s.keys.pmk_replay_cnt_get(), 2);
        assert_eq!(s.gtks.gtk_get(1), Some(&[0x22; 16]));
        a.run(|ctx| SecProt::receive(&mut second, ctx, &message2)).unwrap();
        assert_eq!(a.events, [KmpEvent::FinishedIndication(ProtocolKind::Gkh, SecProtResult::Ok)]);
        assert_eq!(a.keys.gtkl_get(), 0b11);
    }

    #[test]
    fn retries_then_timeout() {
        let (mut a, _) = paired();
        let mut gkh = GkhAuth::new();
        a.run(|ctx| SecProt::create_request(&mut gkh, ctx));
        a.events.clear();
        let interval = a.settings.gkh_retry_timeout;
        for _ in 0..a.settings.gkh_retry_count {
            a.run(|ctx| SecProt::timer_timeout(&mut gkh, ctx, interval));
        }
        assert_eq!(a.app.sent.len(), 1 + a.settings.gkh_retry_count as usize);
        assert!(a.events.is_empty());
        a.run(|ctx| SecProt::timer_timeout(&mut gkh, ctx, interval));
        assert_eq!(a.events, [KmpEvent::FinishedIndication(ProtocolKind::Gkh, SecProtResult::Timeout)]);
    }

    #[test]
    fn nothing_to_insert_is_an_error() {
        let (mut a, _) = paired();
        a.keys.gtkl_set(0b1);
        let mut gkh = GkhAuth::new();
        a.run(|ctx| SecProt::create_request(&mut gkh, ctx));
        assert_eq!(a.events[1], KmpEvent::FinishedIndication(ProtocolKind::Gkh, SecProtResult::Error));
        assert!(a.app.sent.is_empty());
    }

    #[test]
    fn message1_with_bad_mic_creates_nothing() {
        let (mut a, mut s) = paired();
        let mut gkh = GkhAuth::new();
        a.run(|ctx| SecProt::create_request(&mut gkh, ctx));
        let (_, mut message1) = a.app.take_key();
        let last = message1.len() - 1;
        message1[last] ^= 1;
        let mut supp = GkhSupp::new();
        assert!(s.run(|ctx| SecProt::receive(&mut supp, ctx, &message1)).is_err());
        assert!(s.events.is_empty());
        assert!(!s.gtks.gtk_is_set(0));
    }
}
