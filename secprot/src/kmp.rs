use crate::application::{ApplicationLayer, CryptoLayer, NetworkSize, Settings};
use crate::common::SecProtResult;
use crate::eap_tls::{EapTlsAuth, EapTlsSupp, RadiusEapTlsRelay};
use crate::gkh::{GkhAuth, GkhSupp};
use crate::gtks::SecProtGtkKeys;
use crate::keys::SecProtKeys;
use crate::log_event::log;
use crate::msg::MsgSecProt;
use crate::proto::*;
use crate::radius::message::identifier_get;
use crate::radius::{RadiusClient, RadiusConfig, RadiusShared};
use crate::result::{DecodeError, ReceiveError};
use crate::sec_prot::{KmpEvent, PeerMessage, ProtocolKind, SecProt, SecProtContext};
#[cfg(feature = "logging")]
use crate::LogEvent::*;

/// Which end of the key management exchange a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Authenticator,
    Supplicant,
}

/// State of one interface, shared by all of its sessions.
///
/// The timing profile is selected when the context is created and stays fixed for its
/// lifetime.
pub struct Context<C: CryptoLayer> {
    pub rng: C::Rng,
    pub settings: Settings,
    /// GTKs of the interface. The authenticator distributes them, a supplicant learns them.
    pub gtks: SecProtGtkKeys,
    pub radius: RadiusShared,
    pub local_eui64: [u8; EUI64_LEN],
}

impl<C: CryptoLayer> Context<C> {
    pub fn new(local_eui64: [u8; EUI64_LEN], network_size: NetworkSize, mut rng: C::Rng) -> Self {
        let radius = RadiusShared::new(&mut rng);
        Self {
            rng,
            settings: Settings::for_network_size(network_size),
            gtks: SecProtGtkKeys::new(),
            radius,
            local_eui64,
        }
    }

    /// Sets or removes the RADIUS server. Sessions started afterwards relay EAP-TLS to it.
    pub fn radius_configure(&mut self, config: Option<RadiusConfig>) {
        self.radius.config = config;
    }

    /// The authenticator protocol that runs EAP-TLS: the local TLS engine, or the relay when a
    /// RADIUS server is configured.
    pub fn eap_tls_kind(&self) -> ProtocolKind {
        if self.radius.is_configured() {
            ProtocolKind::RadiusEapTls
        } else {
            ProtocolKind::EapTls
        }
    }

    /// Interface timers, in ticks of `SEC_PROT_TIMER_TICK_MS`.
    pub fn timer_timeout(&mut self, ticks: u16) {
        self.radius.pool.timer_timeout(ticks);
    }

    /// Ages the GTKs and clears the ones that expired. Returns a bitmap of the cleared slots.
    pub fn gtks_lifetime_decrement(&mut self, seconds: u32) -> u8 {
        let mut expired = 0;
        for index in 0..GTK_NUM as u8 {
            if self.gtks.gtk_is_set(index) && self.gtks.gtk_lifetime_decrement(index, seconds) == 0 {
                self.gtks.gtk_clear(index);
                expired |= 1 << index;
            }
        }
        expired
    }

    /// Hands a message from the RADIUS server to the session whose RADIUS client is waiting
    /// for its identifier.
    pub fn radius_receive<App: ApplicationLayer<C>>(
        &mut self,
        app: &mut App,
        sessions: &mut [KmpSession<C, App>],
        data: &[u8],
    ) -> Result<(), ReceiveError> {
        let identifier = identifier_get(data).ok_or(DecodeError::TooShort)?;
        let session = sessions
            .iter_mut()
            .find(|s| s.radius_identifier() == Some(identifier))
            .ok_or(ReceiveError::Unassociated)?;
        session.radius_receive(self, app, data)
    }
}

/// Creates the protocol instance for a kind and role, None if the role does not run it.
fn protocol_new<C: CryptoLayer, App: ApplicationLayer<C>>(kind: ProtocolKind, role: Role) -> Option<Box<dyn SecProt<C, App>>> {
    let prot: Box<dyn SecProt<C, App>> = match (kind, role) {
        (ProtocolKind::EapTls, Role::Authenticator) => Box::new(EapTlsAuth::<<App as ApplicationLayer<C>>::Tls>::new()),
        (ProtocolKind::EapTls, Role::Supplicant) => Box::new(EapTlsSupp::<<App as ApplicationLayer<C>>::Tls>::new()),
        (ProtocolKind::RadiusEapTls, Role::Authenticator) => Box::new(RadiusEapTlsRelay::new()),
        (ProtocolKind::RadiusClient, Role::Authenticator) => Box::new(RadiusClient::new()),
        (ProtocolKind::Gkh, Role::Authenticator) => Box::new(GkhAuth::new()),
        (ProtocolKind::Gkh, Role::Supplicant) => Box::new(GkhSupp::new()),
        (ProtocolKind::Msg, Role::Authenticator) => Box::new(MsgSecProt::new()),
        _ => return None,
    };
    Some(prot)
}

/// The key management state of one peer: its keys and the protocol instances running with it.
///
/// At most one instance of each protocol kind exists at a time. Every call drives one
/// instance and then handles the events it queued, so create and finished indications reach
/// the application before the call returns.
pub struct KmpSession<C: CryptoLayer, App: ApplicationLayer<C>> {
    role: Role,
    remote_eui64: [u8; EUI64_LEN],
    keys: SecProtKeys,
    protocols: Vec<Box<dyn SecProt<C, App>>>,
    events: Vec<KmpEvent>,
}

impl<C: CryptoLayer, App: ApplicationLayer<C>> KmpSession<C, App> {
    pub fn new(role: Role, remote_eui64: [u8; EUI64_LEN]) -> Self {
        Self { role, remote_eui64, keys: SecProtKeys::new(), protocols: Vec::new(), events: Vec::new() }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn remote_eui64(&self) -> &[u8; EUI64_LEN] {
        &self.remote_eui64
    }

    pub fn keys(&self) -> &SecProtKeys {
        &self.keys
    }

    pub fn keys_mut(&mut self) -> &mut SecProtKeys {
        &mut self.keys
    }

    /// True while any protocol instance is running.
    pub fn is_active(&self) -> bool {
        !self.protocols.is_empty()
    }

    pub fn is_running(&self, kind: ProtocolKind) -> bool {
        self.protocols.iter().any(|p| p.kind() == kind)
    }

    /// Starts a protocol on the initiating side. False if it is already running or the
    /// session's role does not initiate it.
    pub fn create_request(&mut self, ctx: &mut Context<C>, app: &mut App, kind: ProtocolKind) -> bool {
        if !self.instance_create(app, kind) {
            return false;
        }
        self.with_instance(ctx, app, kind, |prot, sctx| prot.create_request(sctx));
        self.events_process(ctx, app);
        true
    }

    /// Handles an EAPOL PDU from the peer, routed by its KMP id.
    ///
    /// A supplicant creates the EAP-TLS or group key handshake instance on demand. An
    /// instance created for a message it then rejects is dropped again without notice.
    pub fn receive(&mut self, ctx: &mut Context<C>, app: &mut App, kmp_id: u8, data: &[u8]) -> Result<(), ReceiveError> {
        let kind = match kmp_id {
            KMP_ID_8021X if self.role == Role::Authenticator && self.is_running(ProtocolKind::RadiusEapTls) => {
                ProtocolKind::RadiusEapTls
            }
            KMP_ID_8021X => ProtocolKind::EapTls,
            KMP_ID_80211_GKH => ProtocolKind::Gkh,
            _ => return Err(ReceiveError::Unassociated),
        };
        let created = if self.is_running(kind) {
            false
        } else if self.role == Role::Supplicant && self.instance_create(app, kind) {
            true
        } else {
            return Err(ReceiveError::Unassociated);
        };

        let result = self
            .with_instance(ctx, app, kind, |prot, sctx| prot.receive(sctx, data))
            .unwrap_or(Err(ReceiveError::Unassociated));
        if let Err(e) = &result {
            tracing::debug!("{:?} dropped a message: {}", kind, e);
            if created {
                self.protocols.retain(|p| p.kind() != kind);
                self.events.clear();
                return result;
            }
        }
        self.events_process(ctx, app);
        result
    }

    /// The identifier of the Access-Request this session's RADIUS client waits on.
    pub fn radius_identifier(&self) -> Option<u8> {
        self.protocols.iter().find_map(|p| p.radius_identifier())
    }

    /// Handles a message from the RADIUS server.
    pub fn radius_receive(&mut self, ctx: &mut Context<C>, app: &mut App, data: &[u8]) -> Result<(), ReceiveError> {
        match identifier_get(data) {
            Some(identifier) if Some(identifier) == self.radius_identifier() => {}
            _ => return Err(ReceiveError::Unassociated),
        }
        let result = self
            .with_instance(ctx, app, ProtocolKind::RadiusClient, |prot, sctx| prot.receive(sctx, data))
            .unwrap_or(Err(ReceiveError::Unassociated));
        self.events_process(ctx, app);
        result
    }

    /// Advances the timers of every running instance.
    pub fn timer_timeout(&mut self, ctx: &mut Context<C>, app: &mut App, ticks: u16) {
        let kinds: Vec<ProtocolKind> = self.protocols.iter().map(|p| p.kind()).collect();
        for kind in kinds {
            self.with_instance(ctx, app, kind, |prot, sctx| prot.timer_timeout(sctx, ticks));
            self.events_process(ctx, app);
        }
    }

    /// Ages the PTK and PMK. Returns true if either expired and was deleted.
    pub fn lifetime_decrement(&mut self, ctx: &Context<C>, seconds: u32) -> bool {
        let ptk = self.keys.ptk_lifetime_decrement(ctx.settings.ptk_lifetime, seconds);
        let pmk = self.keys.pmk_lifetime_decrement(ctx.settings.pmk_lifetime, seconds);
        ptk || pmk
    }

    /// Drops every running instance without finished indications.
    pub fn delete(&mut self, ctx: &mut Context<C>, app: &mut App) {
        let kinds: Vec<ProtocolKind> = self.protocols.iter().map(|p| p.kind()).collect();
        for kind in kinds {
            self.with_instance(ctx, app, kind, |prot, sctx| prot.delete(sctx));
        }
        self.protocols.clear();
        self.events.clear();
    }

    fn instance_create(&mut self, app: &mut App, kind: ProtocolKind) -> bool {
        if self.is_running(kind) {
            return false;
        }
        let Some(prot) = protocol_new::<C, App>(kind, self.role) else {
            tracing::debug!("{:?} does not run {:?}", self.role, kind);
            return false;
        };
        log!(app, Created(&self.remote_eui64, kind));
        self.protocols.push(prot);
        true
    }

    /// Runs `f` against the instance of `kind`, lending it the session and interface state.
    fn with_instance<R>(
        &mut self,
        ctx: &mut Context<C>,
        app: &mut App,
        kind: ProtocolKind,
        f: impl FnOnce(&mut dyn SecProt<C, App>, &mut SecProtContext<'_, C, App>) -> R,
    ) -> Option<R> {
        let prot = self.protocols.iter_mut().find(|p| p.kind() == kind)?;
        let mut sctx = SecProtContext {
            app,
            rng: &mut ctx.rng,
            settings: &ctx.settings,
            keys: &mut self.keys,
            gtks: &mut ctx.gtks,
            radius: &mut ctx.radius,
            local_eui64: &ctx.local_eui64,
            remote_eui64: &self.remote_eui64,
            events: &mut self.events,
        };
        Some(f(prot.as_mut(), &mut sctx))
    }

    /// Handles queued events in order, including the ones raised while handling them.
    fn events_process(&mut self, ctx: &mut Context<C>, app: &mut App) {
        while !self.events.is_empty() {
            let events = std::mem::take(&mut self.events);
            for event in events {
                self.event_handle(ctx, app, event);
            }
        }
    }

    fn event_handle(&mut self, ctx: &mut Context<C>, app: &mut App, event: KmpEvent) {
        match event {
            KmpEvent::CreateConfirm(kind, result) => app.create_confirm(&self.remote_eui64, kind, result),
            KmpEvent::CreateIndication(kind) => {
                let result = if app.create_indication(&self.remote_eui64, kind) {
                    SecProtResult::Ok
                } else {
                    SecProtResult::Error
                };
                self.with_instance(ctx, app, kind, |prot, sctx| prot.create_response(sctx, result));
            }
            KmpEvent::FinishedIndication(kind, result) => {
                log!(app, Finished(&self.remote_eui64, kind, result));
                app.finished_indication(&self.remote_eui64, kind, result, &self.keys);
                self.with_instance(ctx, app, kind, |prot, sctx| prot.finished_send(sctx));
                self.instance_remove(app, kind);
            }
            KmpEvent::Peer { to, msg } => {
                if !self.is_running(to) {
                    // Only EAP from the relay starts a RADIUS client.
                    if !matches!(msg, PeerMessage::Eap(_)) || to != ProtocolKind::RadiusClient || !self.instance_create(app, to) {
                        return;
                    }
                }
                self.with_instance(ctx, app, to, |prot, sctx| prot.receive_peer(sctx, msg));
            }
        }
    }

    /// Removes a finished instance and tells its sibling.
    fn instance_remove(&mut self, app: &mut App, kind: ProtocolKind) {
        let Some(index) = self.protocols.iter().position(|p| p.kind() == kind && p.is_finished()) else {
            return;
        };
        self.protocols.remove(index);
        app.finished(&self.remote_eui64, kind);
        if let Some(sibling) = kind.sibling().filter(|s| self.is_running(*s)) {
            self.events.push(KmpEvent::Peer { to: sibling, msg: PeerMessage::PeerDeleted });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eapol::EapFrame;
    use crate::radius::message::response_build;
    use crate::test_util::{eap_pdu, MockStep, TestApp, TestCrypto, XorShiftRng, LOCAL_EUI64, REMOTE_EUI64};
    use crate::tls_bridge::TlsProcess;

    const SECRET: &[u8] = b"kmp-secret";

    struct Node {
        ctx: Context<TestCrypto>,
        app: TestApp,
        session: KmpSession<TestCrypto, TestApp>,
    }

    impl Node {
        fn new(role: Role, app: TestApp, local: [u8; 8], remote: [u8; 8], seed: u64) -> Self {
            Self {
                ctx: Context::new(local, NetworkSize::Medium, XorShiftRng::new(seed)),
                app,
                session: KmpSession::new(role, remote),
            }
        }
    }

    fn pair(auth_app: TestApp, supp_app: TestApp) -> (Node, Node) {
        (
            Node::new(Role::Authenticator, auth_app, LOCAL_EUI64, REMOTE_EUI64, 1),
            Node::new(Role::Supplicant, supp_app, REMOTE_EUI64, LOCAL_EUI64, 2),
        )
    }

    /// Delivers EAPOL both ways until both sides are quiet.
    fn pump(a: &mut Node, s: &mut Node) {
        loop {
            let to_supp: Vec<_> = a.app.sent.drain(..).collect();
            let to_auth: Vec<_> = s.app.sent.drain(..).collect();
            if to_supp.is_empty() && to_auth.is_empty() {
                return;
            }
            for (_, kmp_id, pdu) in to_supp {
                s.session.receive(&mut s.ctx, &mut s.app, kmp_id, &pdu).unwrap();
            }
            for (_, kmp_id, pdu) in to_auth {
                a.session.receive(&mut a.ctx, &mut a.app, kmp_id, &pdu).unwrap();
            }
        }
    }

    /// EAP-Message attributes of an Access-Request, joined.
    fn request_eap(request: &[u8]) -> EapFrame {
        let mut eap = Vec::new();
        let mut offset = RADIUS_HEADER_LEN;
        while offset + 2 <= request.len() {
            let len = request[offset + 1] as usize;
            if request[offset] == AVP_TYPE_EAP_MESSAGE {
                eap.extend_from_slice(&request[offset + 2..offset + len]);
            }
            offset += len;
        }
        EapFrame::parse(&eap).unwrap()
    }

    fn server_reply(request: &[u8], code: u8, eap: &EapFrame, key: Option<&[u8]>) -> Vec<u8> {
        let mut auth = [0u8; 16];
        auth.copy_from_slice(&request[RADIUS_AUTHENTICATOR_OFFSET..RADIUS_HEADER_LEN]);
        response_build::<TestCrypto>(code, request[1], &auth, SECRET, &eap.to_bytes().unwrap(), Some(b"st"), key.map(|k| (k, [0x80, 7])))
            .unwrap()
    }

    #[test]
    fn eap_tls_then_group_key_handshake() {
        let (mut a, mut s) = pair(
            TestApp::with_tls(vec![
                MockStep::send(b"server-flight", TlsProcess::Continue),
                MockStep::finish(b"", &[5u8; 64]),
            ]),
            TestApp::with_tls(vec![
                MockStep::send(b"client-hello", TlsProcess::Continue),
                MockStep::finish(b"client-fin", &[5u8; 64]),
            ]),
        );
        assert!(a.session.create_request(&mut a.ctx, &mut a.app, ProtocolKind::EapTls));
        assert!(!a.session.create_request(&mut a.ctx, &mut a.app, ProtocolKind::EapTls));
        pump(&mut a, &mut s);

        assert!(!a.session.is_active());
        assert!(!s.session.is_active());
        assert_eq!(a.app.finished_ind, [(ProtocolKind::EapTls, SecProtResult::Ok)]);
        assert_eq!(s.app.finished_ind, [(ProtocolKind::EapTls, SecProtResult::Ok)]);
        assert_eq!(s.app.indications, [ProtocolKind::EapTls]);
        assert_eq!(a.session.keys().pmk_get(), Some(&[5u8; 32]));
        assert_eq!(s.session.keys().pmk_get(), a.session.keys().pmk_get());

        // The PTK comes from the four way handshake, outside this crate.
        let ptk = [0x3cu8; PTK_LEN];
        a.session.keys_mut().ptk_write(&ptk);
        s.session.keys_mut().ptk_write(&ptk);
        assert!(a.ctx.gtks.gtk_set(2, &[0x42; 16], 3600));
        a.ctx.gtks.gtk_status_fresh_set(2);
        assert!(a.ctx.gtks.gtk_status_active_set(2));

        assert!(a.session.create_request(&mut a.ctx, &mut a.app, ProtocolKind::Gkh));
        pump(&mut a, &mut s);
        assert_eq!(a.app.finished_ind.last(), Some(&(ProtocolKind::Gkh, SecProtResult::Ok)));
        assert_eq!(s.app.finished_ind.last(), Some(&(ProtocolKind::Gkh, SecProtResult::Ok)));
        assert_eq!(s.ctx.gtks.gtk_get(2), Some(&[0x42; 16]));
        assert!(a.session.keys().gtkl_gtk_is_live(2));
        assert_eq!(s.session.keys().gtkl_get(), 1 << 2);
        assert_eq!(a.app.finished, [ProtocolKind::EapTls, ProtocolKind::Gkh]);
    }

    #[test]
    fn eap_tls_relayed_to_radius_server() {
        let (mut a, mut s) = pair(TestApp::new(), TestApp::with_tls(vec![MockStep::finish(b"client-hello", &[7u8; 64])]));
        a.ctx.radius_configure(Some(RadiusConfig::new(SECRET, None)));
        let kind = a.ctx.eap_tls_kind();
        assert_eq!(kind, ProtocolKind::RadiusEapTls);
        assert!(a.session.create_request(&mut a.ctx, &mut a.app, kind));
        pump(&mut a, &mut s);

        // The relay started a RADIUS client with the supplicant's identity.
        assert!(a.session.is_running(ProtocolKind::RadiusClient));
        let request = a.app.radius_sent.pop().unwrap();
        let identity = request_eap(&request);
        assert_eq!((identity.eap_type, identity.data.as_slice()), (EAP_IDENTITY, EAP_ANONYMOUS_IDENTITY));

        let id = identity.id_seq.wrapping_add(1);
        let start = EapFrame::new(EAP_REQ, id, EAP_TLS, vec![EAP_TLS_START]);
        let challenge = server_reply(&request, RADIUS_ACCESS_CHALLENGE, &start, None);
        // Replies for other identifiers find no session.
        let mut stray = challenge.clone();
        stray[1] = stray[1].wrapping_add(100);
        assert!(a.ctx.radius_receive(&mut a.app, std::slice::from_mut(&mut a.session), &stray).is_err());
        a.ctx.radius_receive(&mut a.app, std::slice::from_mut(&mut a.session), &challenge).unwrap();
        pump(&mut a, &mut s);

        let request = a.app.radius_sent.pop().unwrap();
        let hello = request_eap(&request);
        assert_eq!((hello.id_seq, &hello.data[1..]), (id, &b"client-hello"[..]));
        let success = EapFrame::result(EAP_SUCCESS, id);
        let accept = server_reply(&request, RADIUS_ACCESS_ACCEPT, &success, Some(&[7u8; 32]));
        a.ctx.radius_receive(&mut a.app, std::slice::from_mut(&mut a.session), &accept).unwrap();
        pump(&mut a, &mut s);

        assert!(!a.session.is_active());
        assert_eq!(a.session.keys().pmk_get(), Some(&[7u8; 32]));
        assert_eq!(s.session.keys().pmk_get(), Some(&[7u8; 32]));
        assert!(a.app.finished_ind.contains(&(ProtocolKind::RadiusEapTls, SecProtResult::Ok)));
        assert!(a.app.finished_ind.contains(&(ProtocolKind::RadiusClient, SecProtResult::Ok)));
        assert_eq!(s.app.finished_ind, [(ProtocolKind::EapTls, SecProtResult::Ok)]);
        assert_eq!(a.ctx.radius.pool.in_use_count(), 0);
    }

    #[test]
    fn radius_timeout_fails_the_relay() {
        let (mut a, mut s) = pair(TestApp::new(), TestApp::new());
        a.ctx.radius_configure(Some(RadiusConfig::new(SECRET, None)));
        assert!(a.session.create_request(&mut a.ctx, &mut a.app, ProtocolKind::RadiusEapTls));
        pump(&mut a, &mut s);
        assert!(a.session.radius_identifier().is_some());

        for _ in 0..200 {
            a.session.timer_timeout(&mut a.ctx, &mut a.app, 1);
        }
        assert!(!a.session.is_active());
        assert!(a.app.finished_ind.contains(&(ProtocolKind::RadiusClient, SecProtResult::Timeout)));
        assert!(a.app.finished_ind.contains(&(ProtocolKind::RadiusEapTls, SecProtResult::Error)));
        // The relay's EAP-Failure reaches the supplicant.
        pump(&mut a, &mut s);
        assert_eq!(s.app.finished_ind, [(ProtocolKind::EapTls, SecProtResult::Error)]);
    }

    #[test]
    fn refused_creation_finishes_the_instance() {
        let mut refusing = TestApp::new();
        refusing.refuse = true;
        let (mut a, mut s) = pair(TestApp::new(), refusing);
        a.session.create_request(&mut a.ctx, &mut a.app, ProtocolKind::EapTls);
        pump(&mut a, &mut s);
        assert_eq!(s.app.finished_ind, [(ProtocolKind::EapTls, SecProtResult::Error)]);
        assert!(!s.session.is_active());
        assert!(a.session.is_active());
    }

    #[test]
    fn unsolicited_messages_create_nothing() {
        let (mut a, mut s) = pair(TestApp::new(), TestApp::new());
        let response = eap_pdu(EAP_RESPONSE, 1, EAP_IDENTITY, b"x");
        assert!(a.session.receive(&mut a.ctx, &mut a.app, KMP_ID_8021X, &response).is_err());
        assert!(!a.session.is_active());
        // A supplicant instance created for a message it rejects is dropped again.
        assert!(s.session.receive(&mut s.ctx, &mut s.app, KMP_ID_8021X, &response).is_err());
        assert!(!s.session.is_active());
        assert!(s.app.indications.is_empty());
        assert!(s.session.receive(&mut s.ctx, &mut s.app, 42, &response).is_err());
    }

    #[test]
    fn signal_and_lifetimes() {
        let (mut a, _) = pair(TestApp::new(), TestApp::new());
        assert!(a.session.create_request(&mut a.ctx, &mut a.app, ProtocolKind::Msg));
        assert_eq!(a.app.sent, [(REMOTE_EUI64, 0, Vec::new())]);
        assert!(!a.session.is_active());

        a.session.keys_mut().pmk_write(&[1; 32]);
        a.session.keys_mut().ptk_write(&[2; PTK_LEN]);
        let ptk_lifetime = a.ctx.settings.ptk_lifetime;
        assert!(!a.session.lifetime_decrement(&a.ctx, 1));
        assert!(a.session.lifetime_decrement(&a.ctx, ptk_lifetime));
        assert!(!a.session.keys().ptk_is_set());
        assert!(a.session.keys().pmk_is_set());

        assert!(a.ctx.gtks.gtk_set(0, &[9; 16], 100));
        assert!(a.ctx.gtks.gtk_set(1, &[8; 16], 1000));
        assert_eq!(a.ctx.gtks_lifetime_decrement(100), 0b01);
        assert!(!a.ctx.gtks.gtk_is_set(0));
        assert!(a.ctx.gtks.gtk_is_set(1));
    }
}
