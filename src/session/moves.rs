//! Move table: which action names exist and when they are legal.

use smallvec::SmallVec;

use super::turn::TurnState;

/// One action a variant accepts.
#[derive(Clone, Debug)]
pub struct MoveSpec<A> {
    pub name: &'static str,
    pub action: A,
    legal: SmallVec<[TurnState; 2]>,
}

impl<A> MoveSpec<A> {
    #[must_use]
    pub fn legal_in(&self, state: TurnState) -> bool {
        self.legal.contains(&state)
    }
}

/// Lookup from the wire action name to the variant's action enum.
#[derive(Clone, Debug)]
pub struct MoveTable<A> {
    entries: Vec<MoveSpec<A>>,
}

impl<A> Default for MoveTable<A> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<A: Copy> MoveTable<A> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, legal in the listed turn states.
    #[must_use]
    pub fn with(mut self, name: &'static str, action: A, legal: &[TurnState]) -> Self {
        self.entries.push(MoveSpec {
            name,
            action,
            legal: legal.iter().copied().collect(),
        });
        self
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&MoveSpec<A>> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Names of the actions legal in `state`.
    #[must_use]
    pub fn legal_names(&self, state: TurnState) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|e| e.legal_in(state))
            .map(|e| e.name)
            .collect()
    }
}

/// What a successful handler tells the router.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The move does not end the turn.
    pub continues: bool,
}

impl MoveOutcome {
    #[must_use]
    pub const fn ends_turn() -> Self {
        Self { continues: false }
    }

    #[must_use]
    pub const fn continues() -> Self {
        Self { continues: true }
    }
}
