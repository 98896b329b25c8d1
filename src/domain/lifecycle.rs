use super::EntityKind;
use crate::error::{EngineError, Result};
use std::fmt::Debug;

/// A status enum with an explicit transition table.
///
/// Each entity declares which states may follow the current one; every status
/// change in the engine goes through [`Lifecycle::advance`], so an illegal
/// move is rejected before anything is staged for commit.
pub trait Lifecycle: Copy + PartialEq + Debug + Sized + 'static {
    const ENTITY: EntityKind;

    fn as_str(self) -> &'static str;

    fn next_states(self) -> &'static [Self];

    fn can_become(self, next: Self) -> bool {
        self.next_states().contains(&next)
    }

    fn is_terminal(self) -> bool {
        self.next_states().is_empty()
    }

    /// Returns `next` if the table allows it, `InvalidState` otherwise.
    fn advance(self, id: u64, next: Self) -> Result<Self> {
        if self.can_become(next) {
            Ok(next)
        } else {
            Err(invalid(self, id, next))
        }
    }

    /// Fails with `InvalidState` unless the entity is currently `expected`.
    /// For actions an actor may only take from one state even when the table
    /// allows the target from several.
    fn require(self, id: u64, expected: Self) -> Result<()> {
        if self == expected {
            Ok(())
        } else {
            Err(invalid(self, id, expected))
        }
    }
}

fn invalid<S: Lifecycle>(from: S, id: u64, to: S) -> EngineError {
    EngineError::InvalidState {
        entity: S::ENTITY,
        id,
        from: from.as_str(),
        to: to.as_str(),
    }
}
