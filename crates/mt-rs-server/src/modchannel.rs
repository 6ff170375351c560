//! Named broadcast groups between clients.

use std::collections::{HashMap, HashSet};

use crate::session::SessionHandle;

#[derive(Default)]
pub struct ModChannelManager {
    channels: HashMap<String, HashSet<SessionHandle>>,
}

impl ModChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// False when the session already is a member.
    pub fn join(&mut self, channel: &str, handle: SessionHandle) -> bool {
        self.channels
            .entry(channel.to_string())
            .or_default()
            .insert(handle)
    }

    /// False when the session was not a member.
    pub fn leave(&mut self, channel: &str, handle: SessionHandle) -> bool {
        let Some(members) = self.channels.get_mut(channel) else {
            return false;
        };
        let removed = members.remove(&handle);
        if members.is_empty() {
            self.channels.remove(channel);
        }
        removed
    }

    /// A channel exists while it has members.
    pub fn is_registered(&self, channel: &str) -> bool {
        self.channels.contains_key(channel)
    }

    pub fn is_member(&self, channel: &str, handle: SessionHandle) -> bool {
        self.channels
            .get(channel)
            .is_some_and(|m| m.contains(&handle))
    }

    pub fn members(&self, channel: &str) -> Vec<SessionHandle> {
        self.channels
            .get(channel)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Remove `handle` from every channel. Returns the channels it left.
    pub fn leave_all(&mut self, handle: SessionHandle) -> Vec<String> {
        let mut left = Vec::new();
        self.channels.retain(|name, members| {
            if members.remove(&handle) {
                left.push(name.clone());
            }
            !members.is_empty()
        });
        left.sort();
        left
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(index: u32) -> SessionHandle {
        SessionHandle {
            index,
            generation: 0,
        }
    }

    #[test]
    fn join_and_leave() {
        let mut m = ModChannelManager::new();
        assert!(!m.is_registered("chan"));
        assert!(m.join("chan", h(1)));
        assert!(!m.join("chan", h(1)));
        assert!(m.is_registered("chan"));
        assert!(m.leave("chan", h(1)));
        assert!(!m.leave("chan", h(1)));
        assert!(!m.is_registered("chan"));
    }

    #[test]
    fn leave_all_drops_empty_channels() {
        let mut m = ModChannelManager::new();
        m.join("a", h(1));
        m.join("b", h(1));
        m.join("b", h(2));
        assert_eq!(m.leave_all(h(1)), vec!["a".to_string(), "b".to_string()]);
        assert!(!m.is_registered("a"));
        assert_eq!(m.members("b"), vec![h(2)]);
    }
}
