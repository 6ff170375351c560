//! SRP login, first-password registration and sudo (password change).

use super::*;

use mt_rs_crypto::{
    decode_srp_verifier_and_salt, encode_srp_verifier, generate_srp_verifier_and_salt,
    SrpVerifier,
};
use mt_rs_proto::packets::{AcceptSudoMode, AuthAccept, FirstSrp, SrpBytesA, SrpBytesM, SrpBytesSB};

impl ConnectionHandler {
    pub(super) fn handle_first_srp(&self, handle: SessionHandle, buf: &mut Cursor<&[u8]>) {
        let pkt = match FirstSrp::proto_decode(buf) {
            Ok(p) => p,
            Err(e) => {
                warn!("Bad FIRST_SRP from {handle}: {e}");
                return;
            }
        };

        let (addr, name, state, allowed) = match self.registry.lock().get(handle) {
            Some(s) => (
                s.address,
                s.name.clone(),
                s.state(),
                s.allowed_auth_mechanisms,
            ),
            None => return,
        };
        let server = &self.config.server;
        let empty_refused = pkt.is_empty && server.disallow_empty_password && !server.singleplayer;
        let encoded = encode_srp_verifier(&pkt.verifier, &pkt.salt);

        match state {
            ClientState::HelloSent => {
                if !allowed.contains(AuthMechanisms::FIRST_SRP) {
                    warn!("{addr}: {name} sent FIRST_SRP but the account exists");
                    self.deny_access(handle, AccessDeniedCode::UnexpectedData);
                    return;
                }
                if empty_refused {
                    info!("{addr}: {name} tried to register with an empty password");
                    self.deny_access(handle, AccessDeniedCode::EmptyPassword);
                    return;
                }
                if !self.auth.lock().create_auth(&name, &encoded) {
                    info!("{addr}: account {name} appeared during registration");
                    self.deny_access(handle, AccessDeniedCode::AlreadyConnected);
                    return;
                }
                if let Some(session) = self.registry.lock().get_mut(handle) {
                    session.enc_pwd = encoded;
                }
                info!("{addr}: registered new account {name}");
                self.hooks
                    .lock()
                    .on_authplayer(&name, &addr.ip().to_string(), true);
                self.accept_auth(handle, false);
            }
            ClientState::SudoMode => {
                self.notify(handle, ClientEvent::SudoLeave);
                let changed = if empty_refused {
                    info!("{addr}: {name} tried to set an empty password");
                    false
                } else {
                    let changed = self.auth.lock().set_password(&name, &encoded);
                    if changed {
                        if let Some(session) = self.registry.lock().get_mut(handle) {
                            session.enc_pwd = encoded;
                        }
                    }
                    changed
                };
                let message = if changed {
                    info!("{name} changed their password");
                    "Password change successful."
                } else {
                    "Password change failed or unavailable."
                };
                self.send_chat(addr, message);
            }
            other => debug!("{addr}: FIRST_SRP in {other:?}; ignoring"),
        }
    }

    pub(super) fn handle_srp_bytes_a(&self, handle: SessionHandle, buf: &mut Cursor<&[u8]>) {
        let pkt = match SrpBytesA::proto_decode(buf) {
            Ok(p) => p,
            Err(e) => {
                warn!("Bad SRP_BYTES_A from {handle}: {e}");
                return;
            }
        };

        let (addr, name, state, chosen, allowed_auth, allowed_sudo, enc_pwd) =
            match self.registry.lock().get(handle) {
                Some(s) => (
                    s.address,
                    s.name.clone(),
                    s.state(),
                    s.chosen_mechanism,
                    s.allowed_auth_mechanisms,
                    s.allowed_sudo_mechanisms,
                    s.enc_pwd.clone(),
                ),
                None => return,
            };

        let want_sudo = match state {
            ClientState::HelloSent => false,
            ClientState::Active => true,
            other => {
                debug!("{addr}: SRP_BYTES_A in {other:?}; ignoring");
                return;
            }
        };
        let fail = |reason: &str| {
            info!("{addr}: {name}: {reason}");
            if want_sudo {
                self.deny_sudo(handle);
            } else {
                self.deny_access(handle, AccessDeniedCode::UnexpectedData);
            }
        };

        if !chosen.is_none() {
            fail("SRP exchange already in progress");
            return;
        }

        let mechanism = if pkt.based_on == 0 {
            AuthMechanisms::LEGACY_PASSWORD
        } else {
            AuthMechanisms::SRP
        };
        let allowed = if want_sudo { allowed_sudo } else { allowed_auth };
        if !allowed.contains(mechanism) {
            fail(&format!("mechanism {mechanism} not allowed"));
            return;
        }

        let (verifier, salt) = if mechanism == AuthMechanisms::LEGACY_PASSWORD {
            generate_srp_verifier_and_salt(&name, &enc_pwd)
        } else {
            match decode_srp_verifier_and_salt(&enc_pwd) {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("{addr}: stored verifier of {name} is unusable: {e}");
                    self.deny_access(handle, AccessDeniedCode::ServerFail);
                    return;
                }
            }
        };

        let srp = match SrpVerifier::new(&name, &salt, &verifier, &pkt.bytes_a) {
            Ok(srp) => srp,
            Err(e) => {
                fail(&format!("SRP start failed: {e}"));
                return;
            }
        };
        let reply = SrpBytesSB {
            salt,
            bytes_b: srp.bytes_b().to_vec(),
        };

        {
            let mut registry = self.registry.lock();
            let Some(session) = registry.get_mut(handle) else {
                return;
            };
            session.chosen_mechanism = mechanism;
            session.srp = Some(srp);
            session.srp_started = Some(Instant::now());
        }
        debug!("{addr}: {name} started {mechanism} exchange (sudo: {want_sudo})");
        self.send(addr, id::toclient::SRP_BYTES_S_B, &reply);
    }

    pub(super) fn handle_srp_bytes_m(&self, handle: SessionHandle, buf: &mut Cursor<&[u8]>) {
        let pkt = match SrpBytesM::proto_decode(buf) {
            Ok(p) => p,
            Err(e) => {
                warn!("Bad SRP_BYTES_M from {handle}: {e}");
                return;
            }
        };

        // The verifier is taken out of the session; every path below either
        // accepts or denies, so it never goes back.
        let (addr, name, want_sudo, chosen, srp, create_account, enc_pwd) = {
            let mut registry = self.registry.lock();
            let Some(session) = registry.get_mut(handle) else {
                return;
            };
            let want_sudo = match session.state() {
                ClientState::HelloSent => false,
                ClientState::Active => true,
                other => {
                    debug!("{}: SRP_BYTES_M in {other:?}; ignoring", session.address);
                    return;
                }
            };
            (
                session.address,
                session.name.clone(),
                want_sudo,
                session.chosen_mechanism,
                session.srp.take(),
                session.create_player_on_auth_success,
                session.enc_pwd.clone(),
            )
        };

        let fail_unexpected = |reason: &str| {
            info!("{addr}: {name}: {reason}");
            if want_sudo {
                self.deny_sudo(handle);
            } else {
                self.deny_access(handle, AccessDeniedCode::UnexpectedData);
            }
        };

        let srp_chosen =
            chosen == AuthMechanisms::SRP || chosen == AuthMechanisms::LEGACY_PASSWORD;
        let Some(mut srp) = srp.filter(|_| srp_chosen) else {
            fail_unexpected("SRP_BYTES_M without an SRP exchange");
            return;
        };

        if pkt.bytes_m.len() != srp.session_key_len() {
            info!(
                "{addr}: {name} sent a proof of {} bytes, expected {}",
                pkt.bytes_m.len(),
                srp.session_key_len()
            );
            self.deny_access(handle, AccessDeniedCode::UnexpectedData);
            return;
        }

        if srp.verify_session(&pkt.bytes_m).is_none() {
            if want_sudo {
                info!("{addr}: {name} supplied a wrong password for sudo");
                self.deny_sudo(handle);
            } else {
                info!("{addr}: {name} supplied a wrong password");
                let ip = addr.ip().to_string();
                {
                    let mut hooks = self.hooks.lock();
                    hooks.on_auth_failure(&name, &ip);
                    hooks.on_authplayer(&name, &ip, false);
                }
                self.deny_access(handle, AccessDeniedCode::WrongPassword);
            }
            return;
        }

        if create_account {
            let mut auth = self.auth.lock();
            auth.create_auth(&name, &enc_pwd);
            if !auth.exists(&name) {
                drop(auth);
                warn!("{addr}: could not create account {name}");
                self.deny_access(handle, AccessDeniedCode::ServerFail);
                return;
            }
        }

        if !want_sudo {
            self.hooks
                .lock()
                .on_authplayer(&name, &addr.ip().to_string(), true);
        }
        self.accept_auth(handle, want_sudo);
    }

    /// Finish a successful login or sudo request.
    fn accept_auth(&self, handle: SessionHandle, want_sudo: bool) {
        let Some((addr, name)) = self.peer(handle) else {
            return;
        };
        if want_sudo {
            self.send(
                addr,
                id::toclient::ACCEPT_SUDO_MODE,
                &AcceptSudoMode {
                    sudo_mechanisms: AuthMechanisms::FIRST_SRP,
                },
            );
            self.notify(handle, ClientEvent::SudoSuccess);
            info!("{addr}: {name} entered sudo mode");
            return;
        }

        self.send(
            addr,
            id::toclient::AUTH_ACCEPT,
            &AuthAccept {
                spawn_position: self.spawn_position,
                map_seed: self.config.server.map_seed,
                send_interval: self.config.timeouts.step_interval_ms as f32 / 1000.0,
                sudo_mechanisms: AuthMechanisms::SRP,
            },
        );
        {
            let mut registry = self.registry.lock();
            if let Some(session) = registry.get_mut(handle) {
                session.allowed_sudo_mechanisms = AuthMechanisms::SRP;
                session.notify(ClientEvent::AuthAccept, Instant::now());
            }
        }
        self.auth.lock().record_login(&name);
        info!("{addr}: {name} authenticated");
    }
}
