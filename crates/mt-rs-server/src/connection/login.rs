use super::*;

use mt_rs_crypto::{get_encoded_srp_verifier, StoredPassword};
use mt_rs_proto::packets::{Hello, Init};

/// Longest allowed player name, in bytes.
pub const PLAYERNAME_SIZE: usize = 20;

pub fn is_valid_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Name problems map straight to a denial code.
pub fn check_player_name(name: &str, singleplayer: bool) -> Result<(), AccessDeniedCode> {
    if name.is_empty() || name.len() > PLAYERNAME_SIZE {
        return Err(AccessDeniedCode::WrongName);
    }
    if !name.chars().all(is_valid_name_char) {
        return Err(AccessDeniedCode::WrongCharsInName);
    }
    if !singleplayer && name.eq_ignore_ascii_case("singleplayer") {
        return Err(AccessDeniedCode::WrongName);
    }
    Ok(())
}

impl ConnectionHandler {
    pub(super) fn handle_init(&self, handle: SessionHandle, buf: &mut Cursor<&[u8]>) {
        let init = match Init::proto_decode(buf) {
            Ok(p) => p,
            Err(e) => {
                warn!("Bad INIT from {handle}: {e}");
                return;
            }
        };

        let (addr, state) = match self.registry.lock().get(handle) {
            Some(s) => (s.address, s.state()),
            None => return,
        };
        if state > ClientState::Created {
            debug!("{addr}: INIT in {state:?}; ignoring");
            return;
        }

        let server = &self.config.server;
        if server.singleplayer && self.registry.lock().count_at_least(ClientState::HelloSent) > 0 {
            info!("{addr}: refusing a second client in singleplayer mode");
            self.deny_access(handle, AccessDeniedCode::Singleplayer);
            return;
        }

        let Some(ser_ver) = packets::negotiate_ser_ver(init.max_ser_ver) else {
            info!(
                "{addr}: unsupported serialisation version {}",
                init.max_ser_ver
            );
            self.deny_access(handle, AccessDeniedCode::WrongVersion);
            return;
        };

        let Some(protocol_version) = packets::negotiate_protocol(
            init.min_protocol,
            init.max_protocol,
            server.strict_protocol_version_checking,
        ) else {
            info!(
                "{addr}: unsupported protocol range {}..={}",
                init.min_protocol, init.max_protocol
            );
            self.deny_access(handle, AccessDeniedCode::WrongVersion);
            return;
        };

        let name = init.player_name;
        if let Err(code) = check_player_name(&name, server.singleplayer) {
            info!("{addr}: refusing player name {name:?}");
            self.deny_access(handle, code);
            return;
        }

        let ban = self
            .bans
            .lock()
            .is_banned(&name, addr.ip())
            .map(str::to_string);
        if let Some(reason) = ban {
            info!("{addr}: {name} is banned: {reason}");
            self.deny_access_custom(handle, &format!("Banned: {reason}"));
            return;
        }

        let ip = addr.ip().to_string();
        let veto = self.hooks.lock().on_prejoinplayer(&name, &ip);
        if let Some(reason) = veto {
            info!("{addr}: {name} refused by script: {reason}");
            self.deny_access_custom(handle, &reason);
            return;
        }

        let bypass_limit = (!server.name.is_empty() && name == server.name)
            || self.hooks.lock().can_bypass_userlimit(&name, &ip);

        // Claiming the name and counting users happen under one lock so two
        // sessions cannot take the same name.
        let claim = {
            let mut registry = self.registry.lock();
            if registry.find_by_name(&name).is_some_and(|h| h != handle) {
                Err(AccessDeniedCode::AlreadyConnected)
            } else if !bypass_limit
                && registry.count_at_least(ClientState::HelloSent) >= server.max_users
            {
                Err(AccessDeniedCode::TooManyUsers)
            } else if let Some(session) = registry.get_mut(handle) {
                session.name = name.clone();
                session.ser_ver = ser_ver;
                session.protocol_version = protocol_version;
                Ok(())
            } else {
                return;
            }
        };
        if let Err(code) = claim {
            info!("{addr}: refusing {name}: {code}");
            self.deny_access(handle, code);
            return;
        }

        let stored = self.auth.lock().get(&name).map(|e| e.password.clone());
        let mut create_on_success = false;
        let (mechanisms, enc_pwd) = match stored {
            Some(encoded) => match StoredPassword::classify(&encoded) {
                Ok(StoredPassword::Srp) => (AuthMechanisms::SRP, encoded),
                Ok(StoredPassword::Legacy) => (AuthMechanisms::LEGACY_PASSWORD, encoded),
                Err(e) => {
                    warn!("Stored password of {name} is unusable: {e}");
                    self.deny_access(handle, AccessDeniedCode::ServerFail);
                    return;
                }
            },
            None if server.default_password.is_empty() => {
                (AuthMechanisms::FIRST_SRP, String::new())
            }
            None => {
                create_on_success = true;
                (
                    AuthMechanisms::SRP,
                    get_encoded_srp_verifier(&name, &server.default_password),
                )
            }
        };

        {
            let mut registry = self.registry.lock();
            let Some(session) = registry.get_mut(handle) else {
                return;
            };
            session.allowed_auth_mechanisms = mechanisms;
            session.enc_pwd = enc_pwd;
            session.create_player_on_auth_success = create_on_success;
            session.notify(ClientEvent::Hello, Instant::now());
        }

        debug!("{addr}: {name} offered {mechanisms}, protocol {protocol_version}");
        self.send(
            addr,
            id::toclient::HELLO,
            &Hello {
                ser_ver,
                compression_mode: 0,
                protocol_version,
                auth_mechanisms: mechanisms,
                legacy_player_name: name,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_rules() {
        assert_eq!(check_player_name("Alice_1-x", false), Ok(()));
        assert_eq!(
            check_player_name("", false),
            Err(AccessDeniedCode::WrongName)
        );
        assert_eq!(
            check_player_name(&"a".repeat(PLAYERNAME_SIZE + 1), false),
            Err(AccessDeniedCode::WrongName)
        );
        assert_eq!(
            check_player_name(&"a".repeat(PLAYERNAME_SIZE), false),
            Ok(())
        );
        assert_eq!(
            check_player_name("bad name", false),
            Err(AccessDeniedCode::WrongCharsInName)
        );
        assert_eq!(
            check_player_name("SinglePlayer", false),
            Err(AccessDeniedCode::WrongName)
        );
        assert_eq!(check_player_name("singleplayer", true), Ok(()));
    }
}
