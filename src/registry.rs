use crate::combination::{CombinationKey, Modifier};
use indexmap::IndexMap;
use std::fmt;

/// Lifecycle of one (entity, combination, modifier) variant.
///
/// `Called` and `Silent` are terminal: [`Registry::request_transition`] is
/// the only way out of `NotCalled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    NotCalled,
    Called,
    Silent,
}

impl CallState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::NotCalled)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotCalled => "false",
            Self::Called => "true",
            Self::Silent => "silent",
        })
    }
}

pub type ModifierStates = IndexMap<Modifier, CallState>;
pub type EntityTable = IndexMap<CombinationKey, ModifierStates>;

/// Pass-scoped call-state store with a nested silent flag.
#[derive(Debug, Clone)]
pub struct Registry {
    combinations: Vec<CombinationKey>,
    entities: IndexMap<String, EntityTable>,
    silent: bool,
    mute_depth: usize,
}

impl Registry {
    /// `combinations` is the enumerated table, used to seed each entity so
    /// that snapshots list combinations in canonical order.
    pub fn new(combinations: Vec<CombinationKey>, silent: bool) -> Self {
        Self {
            combinations,
            entities: IndexMap::new(),
            silent,
            mute_depth: 0,
        }
    }

    pub fn mute(&mut self) {
        self.mute_depth += 1;
    }

    pub fn unmute(&mut self) {
        self.mute_depth = self.mute_depth.saturating_sub(1);
    }

    pub fn is_muted(&self) -> bool {
        self.silent || self.mute_depth > 0
    }

    /// Moves a variant out of `NotCalled` and returns its state. Variants
    /// that already reached a terminal state are returned unchanged.
    pub fn request_transition(
        &mut self,
        entity: &str,
        key: &CombinationKey,
        modifier: &Modifier,
    ) -> CallState {
        let next = if self.is_muted() {
            CallState::Silent
        } else {
            CallState::Called
        };
        let combinations = &self.combinations;
        let table = self
            .entities
            .entry(entity.to_string())
            .or_insert_with(|| seed_table(combinations));
        let state = table
            .entry(key.clone())
            .or_default()
            .entry(modifier.clone())
            .or_insert(CallState::NotCalled);
        if !state.is_terminal() {
            *state = next;
            tracing::debug!(entity, combination = %key, %modifier, state = %next, "variant requested");
        }
        *state
    }

    pub fn query_state(
        &self,
        entity: &str,
        key: &CombinationKey,
        modifier: &Modifier,
    ) -> CallState {
        self.entities
            .get(entity)
            .and_then(|table| table.get(key))
            .and_then(|modifiers| modifiers.get(modifier))
            .copied()
            .unwrap_or(CallState::NotCalled)
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Full combination/modifier table of an entity in first-insertion order.
    pub fn snapshot(&self, entity: &str) -> Option<&EntityTable> {
        self.entities.get(entity)
    }
}

fn seed_table(combinations: &[CombinationKey]) -> EntityTable {
    combinations
        .iter()
        .map(|key| {
            let mut modifiers = ModifierStates::new();
            modifiers.insert(Modifier::None, CallState::NotCalled);
            (key.clone(), modifiers)
        })
        .collect()
}
