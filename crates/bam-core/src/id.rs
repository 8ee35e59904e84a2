//! Arena index types for basins and shoals
//!
//! Basins hold lists of incident shoals and shoals point at their two
//! endpoint basins. Storing plain indices into the `Bay` arenas keeps
//! that cycle out of the ownership graph.

use serde::{Deserialize, Serialize};

/// Index of a basin in the [`Bay`](crate::Bay) arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BasinId(pub(crate) usize);

impl BasinId {
    /// Position in the basin arena
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for BasinId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "basin#{}", self.0)
    }
}

/// Index of a shoal in the [`Bay`](crate::Bay) arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShoalId(pub(crate) usize);

impl ShoalId {
    /// Position in the shoal arena
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ShoalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "shoal#{}", self.0)
    }
}
