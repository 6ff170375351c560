//! Script API: the hooks the server calls into game scripts.
//!
//! This crate has no dependency on mt-rs-server or mt-rs-proto. Positions
//! and players are passed as plain values.

use std::fmt;

// ─── Types ───────────────────────────────────────────────────────────────────

/// Snapshot of a player, passed to hooks.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptPlayer {
    pub name: String,
    /// World units.
    pub position: (f32, f32, f32),
    pub hp: u16,
}

/// Node position for hooks (decoupled from mt-rs-proto).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptNodePos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ScriptNodePos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for ScriptNodePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}

/// What a player or node hook points at.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptPointed {
    Nothing,
    Node {
        under: ScriptNodePos,
        above: ScriptNodePos,
    },
    Object {
        id: u16,
    },
}

/// Kind of anti-cheat report passed to `on_cheat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheatKind {
    MovedTooFast,
    InteractedTooFar,
    InteractedWhileDead,
    FinishedUnknownDig,
    DugUnbreakable,
    DugTooFast,
}

impl CheatKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CheatKind::MovedTooFast => "moved_too_fast",
            CheatKind::InteractedTooFar => "interacted_too_far",
            CheatKind::InteractedWhileDead => "interacted_while_dead",
            CheatKind::FinishedUnknownDig => "finished_unknown_dig",
            CheatKind::DugUnbreakable => "dug_unbreakable",
            CheatKind::DugTooFast => "dug_too_fast",
        }
    }
}

impl fmt::Display for CheatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of calling a cancellable hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Continue normal handling.
    Continue,
    /// The hook handled the event; skip the default behaviour.
    Cancelled,
}

impl EventResult {
    pub fn is_cancelled(self) -> bool {
        self == EventResult::Cancelled
    }
}

// ─── Hooks ───────────────────────────────────────────────────────────────────

/// Callbacks into game scripts. Every method has a no-op default.
pub trait ScriptHooks: Send {
    /// Veto a login before authentication. `Some(reason)` refuses it.
    fn on_prejoinplayer(&mut self, name: &str, address: &str) -> Option<String> {
        let _ = (name, address);
        None
    }

    /// Let `name` in even when the server is full.
    fn can_bypass_userlimit(&mut self, name: &str, address: &str) -> bool {
        let _ = (name, address);
        false
    }

    /// Called after every login decision.
    fn on_authplayer(&mut self, name: &str, address: &str, success: bool) {
        let _ = (name, address, success);
    }

    fn on_auth_failure(&mut self, name: &str, address: &str) {
        let _ = (name, address);
    }

    fn on_joinplayer(&mut self, player: &ScriptPlayer) {
        let _ = player;
    }

    fn on_leaveplayer(&mut self, player: &ScriptPlayer, timed_out: bool) {
        let _ = (player, timed_out);
    }

    fn on_dieplayer(&mut self, player: &ScriptPlayer) {
        let _ = player;
    }

    /// `Cancelled` means the script placed the player itself.
    fn on_respawnplayer(&mut self, player: &ScriptPlayer) -> EventResult {
        let _ = player;
        EventResult::Continue
    }

    fn on_cheat(&mut self, player: &ScriptPlayer, cheat: CheatKind) {
        let _ = (player, cheat);
    }

    /// `Cancelled` suppresses the broadcast.
    fn on_chat_message(&mut self, name: &str, message: &str) -> EventResult {
        let _ = (name, message);
        EventResult::Continue
    }

    fn node_on_punch(&mut self, pos: ScriptNodePos, node: &str, player: &ScriptPlayer) {
        let _ = (pos, node, player);
    }

    /// `Cancelled` keeps the node in place.
    fn node_on_dig(&mut self, pos: ScriptNodePos, node: &str, player: &ScriptPlayer) -> EventResult {
        let _ = (pos, node, player);
        EventResult::Continue
    }

    /// `Cancelled` skips the default node placement.
    fn item_on_place(
        &mut self,
        item: &str,
        player: &ScriptPlayer,
        pointed: &ScriptPointed,
    ) -> EventResult {
        let _ = (item, player, pointed);
        EventResult::Continue
    }

    fn item_on_use(&mut self, item: &str, player: &ScriptPlayer, pointed: &ScriptPointed) {
        let _ = (item, player, pointed);
    }

    fn item_on_secondary_use(&mut self, item: &str, player: &ScriptPlayer) {
        let _ = (item, player);
    }

    fn on_modchannel_message(&mut self, channel: &str, sender: &str, message: &str) {
        let _ = (channel, sender, message);
    }
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl ScriptHooks for NoopHooks {}

/// Several hook sets called in registration order.
///
/// Vetoes and cancellations short-circuit: the first hook that refuses a
/// login or cancels an event wins.
#[derive(Default)]
pub struct HookChain {
    hooks: Vec<Box<dyn ScriptHooks>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hooks: Box<dyn ScriptHooks>) {
        self.hooks.push(hooks);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    fn first_cancel(
        &mut self,
        mut f: impl FnMut(&mut dyn ScriptHooks) -> EventResult,
    ) -> EventResult {
        for hooks in &mut self.hooks {
            if f(hooks.as_mut()).is_cancelled() {
                return EventResult::Cancelled;
            }
        }
        EventResult::Continue
    }
}

impl ScriptHooks for HookChain {
    fn on_prejoinplayer(&mut self, name: &str, address: &str) -> Option<String> {
        self.hooks
            .iter_mut()
            .find_map(|h| h.on_prejoinplayer(name, address))
    }

    fn can_bypass_userlimit(&mut self, name: &str, address: &str) -> bool {
        self.hooks
            .iter_mut()
            .any(|h| h.can_bypass_userlimit(name, address))
    }

    fn on_authplayer(&mut self, name: &str, address: &str, success: bool) {
        self.hooks
            .iter_mut()
            .for_each(|h| h.on_authplayer(name, address, success));
    }

    fn on_auth_failure(&mut self, name: &str, address: &str) {
        self.hooks
            .iter_mut()
            .for_each(|h| h.on_auth_failure(name, address));
    }

    fn on_joinplayer(&mut self, player: &ScriptPlayer) {
        self.hooks.iter_mut().for_each(|h| h.on_joinplayer(player));
    }

    fn on_leaveplayer(&mut self, player: &ScriptPlayer, timed_out: bool) {
        self.hooks
            .iter_mut()
            .for_each(|h| h.on_leaveplayer(player, timed_out));
    }

    fn on_dieplayer(&mut self, player: &ScriptPlayer) {
        self.hooks.iter_mut().for_each(|h| h.on_dieplayer(player));
    }

    fn on_respawnplayer(&mut self, player: &ScriptPlayer) -> EventResult {
        self.first_cancel(|h| h.on_respawnplayer(player))
    }

    fn on_cheat(&mut self, player: &ScriptPlayer, cheat: CheatKind) {
        self.hooks.iter_mut().for_each(|h| h.on_cheat(player, cheat));
    }

    fn on_chat_message(&mut self, name: &str, message: &str) -> EventResult {
        self.first_cancel(|h| h.on_chat_message(name, message))
    }

    fn node_on_punch(&mut self, pos: ScriptNodePos, node: &str, player: &ScriptPlayer) {
        self.hooks
            .iter_mut()
            .for_each(|h| h.node_on_punch(pos, node, player));
    }

    fn node_on_dig(&mut self, pos: ScriptNodePos, node: &str, player: &ScriptPlayer) -> EventResult {
        self.first_cancel(|h| h.node_on_dig(pos, node, player))
    }

    fn item_on_place(
        &mut self,
        item: &str,
        player: &ScriptPlayer,
        pointed: &ScriptPointed,
    ) -> EventResult {
        self.first_cancel(|h| h.item_on_place(item, player, pointed))
    }

    fn item_on_use(&mut self, item: &str, player: &ScriptPlayer, pointed: &ScriptPointed) {
        self.hooks
            .iter_mut()
            .for_each(|h| h.item_on_use(item, player, pointed));
    }

    fn item_on_secondary_use(&mut self, item: &str, player: &ScriptPlayer) {
        self.hooks
            .iter_mut()
            .for_each(|h| h.item_on_secondary_use(item, player));
    }

    fn on_modchannel_message(&mut self, channel: &str, sender: &str, message: &str) {
        self.hooks
            .iter_mut()
            .for_each(|h| h.on_modchannel_message(channel, sender, message));
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn test_player() -> ScriptPlayer {
        ScriptPlayer {
            name: "TestPlayer".into(),
            position: (0.0, 20.0, 0.0),
            hp: 20,
        }
    }

    #[derive(Default)]
    struct Recorder {
        cheats: Arc<Mutex<Vec<CheatKind>>>,
        joins: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptHooks for Recorder {
        fn on_cheat(&mut self, _player: &ScriptPlayer, cheat: CheatKind) {
            self.cheats.lock().unwrap().push(cheat);
        }

        fn on_joinplayer(&mut self, player: &ScriptPlayer) {
            self.joins.lock().unwrap().push(player.name.clone());
        }
    }

    struct Censor;

    impl ScriptHooks for Censor {
        fn on_chat_message(&mut self, _name: &str, message: &str) -> EventResult {
            if message.contains("bad") {
                EventResult::Cancelled
            } else {
                EventResult::Continue
            }
        }

        fn on_prejoinplayer(&mut self, name: &str, _address: &str) -> Option<String> {
            (name == "griefer").then(|| "Not welcome.".to_string())
        }
    }

    #[test]
    fn noop_hooks_continue() {
        let mut hooks = NoopHooks;
        assert_eq!(hooks.on_chat_message("a", "b"), EventResult::Continue);
        assert!(hooks.on_prejoinplayer("a", "127.0.0.1").is_none());
        assert!(!hooks.can_bypass_userlimit("a", "127.0.0.1"));
        let pointed = ScriptPointed::Nothing;
        assert!(!hooks.item_on_place("x", &test_player(), &pointed).is_cancelled());
    }

    #[test]
    fn cheat_names() {
        assert_eq!(CheatKind::MovedTooFast.as_str(), "moved_too_fast");
        assert_eq!(CheatKind::DugTooFast.to_string(), "dug_too_fast");
        assert_eq!(CheatKind::FinishedUnknownDig.as_str(), "finished_unknown_dig");
    }

    #[test]
    fn chain_fans_out_notifications() {
        let rec = Recorder::default();
        let cheats = rec.cheats.clone();
        let joins = rec.joins.clone();
        let mut chain = HookChain::new();
        chain.push(Box::new(rec));
        chain.push(Box::new(NoopHooks));
        chain.on_cheat(&test_player(), CheatKind::DugUnbreakable);
        chain.on_joinplayer(&test_player());
        assert_eq!(*cheats.lock().unwrap(), vec![CheatKind::DugUnbreakable]);
        assert_eq!(*joins.lock().unwrap(), vec!["TestPlayer".to_string()]);
    }

    #[test]
    fn chain_cancels_on_first_cancel() {
        let mut chain = HookChain::new();
        chain.push(Box::new(NoopHooks));
        chain.push(Box::new(Censor));
        assert!(chain.on_chat_message("a", "bad words").is_cancelled());
        assert!(!chain.on_chat_message("a", "hello").is_cancelled());
    }

    #[test]
    fn chain_returns_first_veto() {
        let mut chain = HookChain::new();
        chain.push(Box::new(Censor));
        assert_eq!(
            chain.on_prejoinplayer("griefer", "10.0.0.1").as_deref(),
            Some("Not welcome.")
        );
        assert!(chain.on_prejoinplayer("alice", "10.0.0.1").is_none());
    }
}
