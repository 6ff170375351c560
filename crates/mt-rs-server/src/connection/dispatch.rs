use super::*;

/// Lowest state a command is accepted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MinState {
    All,
    NotConnected,
    Startup,
    InGame,
}

impl MinState {
    pub fn admits(self, state: ClientState) -> bool {
        let threshold = match self {
            MinState::All => return true,
            MinState::NotConnected => ClientState::Created,
            MinState::Startup => ClientState::InitDone,
            MinState::InGame => ClientState::Active,
        };
        state >= threshold
    }
}

pub type Handler = fn(&ConnectionHandler, SessionHandle, &mut Cursor<&[u8]>);

pub struct CommandEntry {
    pub opcode: u16,
    pub name: &'static str,
    pub min_state: MinState,
    pub handler: Handler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    UnknownOpcode,
    NoSession,
    WrongState(ClientState),
}

macro_rules! command {
    ($opcode:ident, $min:ident, $handler:ident) => {
        CommandEntry {
            opcode: id::toserver::$opcode,
            name: stringify!($opcode),
            min_state: MinState::$min,
            handler: ConnectionHandler::$handler,
        }
    };
}

/// Every to-server command. Anything else is dropped.
pub static COMMANDS: &[CommandEntry] = &[
    command!(INIT, NotConnected, handle_init),
    command!(INIT2, NotConnected, handle_init2),
    command!(MODCHANNEL_JOIN, InGame, handle_modchannel_join),
    command!(MODCHANNEL_LEAVE, InGame, handle_modchannel_leave),
    command!(MODCHANNEL_MSG, InGame, handle_modchannel_msg),
    command!(PLAYERPOS, InGame, handle_player_pos),
    command!(GOTBLOCKS, Startup, handle_got_blocks),
    command!(DELETEDBLOCKS, InGame, handle_deleted_blocks),
    command!(INVENTORY_ACTION, InGame, handle_inventory_action),
    command!(CHAT_MESSAGE, InGame, handle_chat_message),
    command!(DAMAGE, InGame, handle_damage),
    command!(PLAYERITEM, InGame, handle_player_item),
    command!(RESPAWN, InGame, handle_respawn),
    command!(INTERACT, InGame, handle_interact),
    command!(REQUEST_MEDIA, Startup, handle_request_media),
    command!(RECEIVED_MEDIA, Startup, handle_received_media),
    command!(CLIENT_READY, Startup, handle_client_ready),
    command!(FIRST_SRP, NotConnected, handle_first_srp),
    command!(SRP_BYTES_A, NotConnected, handle_srp_bytes_a),
    command!(SRP_BYTES_M, NotConnected, handle_srp_bytes_m),
];

pub fn lookup(table: &'static [CommandEntry], opcode: u16) -> Option<&'static CommandEntry> {
    table.iter().find(|e| e.opcode == opcode)
}

impl ConnectionHandler {
    /// Gate a packet on its command's minimum state, then run the handler.
    pub fn dispatch(&self, handle: SessionHandle, opcode: u16, payload: &[u8]) -> DispatchOutcome {
        self.dispatch_with(COMMANDS, handle, opcode, payload)
    }

    pub(super) fn dispatch_with(
        &self,
        table: &'static [CommandEntry],
        handle: SessionHandle,
        opcode: u16,
        payload: &[u8],
    ) -> DispatchOutcome {
        let Some(entry) = lookup(table, opcode) else {
            debug!("{handle}: unknown opcode 0x{opcode:02x}; dropping");
            return DispatchOutcome::UnknownOpcode;
        };
        let state = {
            let mut registry = self.registry.lock();
            let Some(session) = registry.get_mut(handle) else {
                return DispatchOutcome::NoSession;
            };
            session.last_seen = Instant::now();
            session.state()
        };
        if !entry.min_state.admits(state) {
            debug!(
                "{handle}: {} ({:?}) not accepted in {state:?}; dropping",
                entry.name, entry.min_state
            );
            return DispatchOutcome::WrongState(state);
        }
        let mut buf = Cursor::new(payload);
        (entry.handler)(self, handle, &mut buf);
        DispatchOutcome::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::connection::tests::{harness, Harness};

    thread_local! {
        static CALLS: Cell<usize> = const { Cell::new(0) };
    }

    fn count_call(_: &ConnectionHandler, _: SessionHandle, _: &mut Cursor<&[u8]>) {
        CALLS.with(|c| c.set(c.get() + 1));
    }

    fn counting_table() -> &'static [CommandEntry] {
        let entries: Vec<CommandEntry> = COMMANDS
            .iter()
            .map(|e| CommandEntry {
                opcode: e.opcode,
                name: e.name,
                min_state: e.min_state,
                handler: count_call,
            })
            .collect();
        Box::leak(entries.into_boxed_slice())
    }

    #[test]
    fn min_state_thresholds() {
        assert!(MinState::All.admits(ClientState::Invalid));
        assert!(!MinState::NotConnected.admits(ClientState::Denied));
        assert!(MinState::NotConnected.admits(ClientState::Created));
        assert!(!MinState::Startup.admits(ClientState::AwaitingInit2));
        assert!(MinState::Startup.admits(ClientState::InitDone));
        assert!(!MinState::InGame.admits(ClientState::DefinitionsSent));
        assert!(MinState::InGame.admits(ClientState::SudoMode));
    }

    #[test]
    fn opcodes_are_unique() {
        let mut seen = HashSet::new();
        for e in COMMANDS {
            assert!(seen.insert(e.opcode), "duplicate opcode {}", e.name);
        }
    }

    #[test]
    fn handler_runs_only_at_or_above_min_state() {
        let Harness { handler, .. } = harness();
        let table = counting_table();
        let addr: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        let handle = handler.peer_seen(addr);

        for state in ClientState::ALL {
            for entry in table {
                handler
                    .registry
                    .lock()
                    .get_mut(handle)
                    .unwrap()
                    .force_state(state);
                let before = CALLS.with(Cell::get);
                let outcome = handler.dispatch_with(table, handle, entry.opcode, &[]);
                let ran = CALLS.with(Cell::get) > before;
                assert_eq!(
                    ran,
                    entry.min_state.admits(state),
                    "{} in {state:?}",
                    entry.name
                );
                assert_eq!(ran, outcome == DispatchOutcome::Handled);
            }
        }
    }

    #[test]
    fn unknown_opcode_and_missing_session() {
        let Harness { handler, .. } = harness();
        let addr: SocketAddr = "127.0.0.1:5001".parse().unwrap();
        let handle = handler.peer_seen(addr);
        assert_eq!(
            handler.dispatch(handle, 0x7777, &[]),
            DispatchOutcome::UnknownOpcode
        );
        let stale = SessionHandle {
            index: handle.index,
            generation: handle.generation + 1,
        };
        assert_eq!(
            handler.dispatch(stale, id::toserver::INIT, &[]),
            DispatchOutcome::NoSession
        );
    }
}
