//! In-memory rollback log with per-handler actor attribution.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};

use mt_rs_proto::inventory::InventoryLocation;
use mt_rs_proto::types::V3s16;

use crate::env::Environment;

#[derive(Debug, Clone, PartialEq)]
pub enum RollbackAction {
    NodeSet {
        pos: V3s16,
        old: String,
        new: String,
    },
    InventoryModified {
        location: InventoryLocation,
        list: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RollbackEntry {
    /// Empty when no handler scope was active.
    pub actor: String,
    pub action: RollbackAction,
}

pub struct RollbackLog {
    enabled: bool,
    capacity: usize,
    entries: VecDeque<RollbackEntry>,
    actor: Option<String>,
}

impl RollbackLog {
    pub fn new(enabled: bool, capacity: usize) -> Self {
        Self {
            enabled,
            capacity,
            entries: VecDeque::new(),
            actor: None,
        }
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    pub fn record(&mut self, action: RollbackAction) {
        if !self.enabled || self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(RollbackEntry {
            actor: self.actor.clone().unwrap_or_default(),
            action,
        });
    }

    pub fn entries(&self) -> impl Iterator<Item = &RollbackEntry> {
        self.entries.iter()
    }

    pub fn by_actor<'a>(&'a self, actor: &'a str) -> impl Iterator<Item = &'a RollbackEntry> {
        self.entries.iter().filter(move |e| e.actor == actor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Attributes every world mutation made through it to one player.
/// The actor is cleared when the scope drops.
pub struct RollbackScope<'a> {
    env: &'a mut Environment,
}

impl<'a> RollbackScope<'a> {
    pub fn new(env: &'a mut Environment, actor: &str) -> Self {
        env.rollback.actor = Some(actor.to_string());
        Self { env }
    }
}

impl Deref for RollbackScope<'_> {
    type Target = Environment;

    fn deref(&self) -> &Environment {
        self.env
    }
}

impl DerefMut for RollbackScope<'_> {
    fn deref_mut(&mut self) -> &mut Environment {
        self.env
    }
}

impl Drop for RollbackScope<'_> {
    fn drop(&mut self) {
        self.env.rollback.actor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_set(x: i16) -> RollbackAction {
        RollbackAction::NodeSet {
            pos: V3s16::new(x, 0, 0),
            old: "air".into(),
            new: "default:stone".into(),
        }
    }

    #[test]
    fn capacity_drops_oldest() {
        let mut log = RollbackLog::new(true, 2);
        log.record(node_set(1));
        log.record(node_set(2));
        log.record(node_set(3));
        let xs: Vec<i16> = log
            .entries()
            .map(|e| match &e.action {
                RollbackAction::NodeSet { pos, .. } => pos.x,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(xs, vec![2, 3]);
    }

    #[test]
    fn disabled_log_records_nothing() {
        let mut log = RollbackLog::new(false, 10);
        log.record(node_set(1));
        assert!(log.is_empty());
    }

    #[test]
    fn scope_sets_and_clears_actor() {
        let mut env = Environment::new(true, 100);
        {
            let mut scope = RollbackScope::new(&mut env, "alice");
            scope.set_node(V3s16::new(0, 5, 0), "default:wood");
            assert_eq!(scope.rollback.actor(), Some("alice"));
        }
        assert_eq!(env.rollback.actor(), None);
        env.set_node(V3s16::new(0, 6, 0), "default:wood");
        let actors: Vec<&str> = env.rollback.entries().map(|e| e.actor.as_str()).collect();
        assert_eq!(actors, vec!["alice", ""]);
        assert_eq!(env.rollback.by_actor("alice").count(), 1);
    }
}
