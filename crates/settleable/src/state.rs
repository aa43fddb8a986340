//! Public settlement-state view.

/// Discriminant-only view of a settleable's lifecycle.
///
/// The payload-carrying state lives inside the instance; this view is what
/// state queries and assertions work with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleState {
    /// No settlement has occurred yet.
    Unsettled,
    /// Settled with a value.
    Fulfilled,
    /// Settled with an error.
    Rejected,
}

impl SettleState {
    /// Check whether settlement has occurred, in either direction.
    pub fn is_settled(self) -> bool {
        !matches!(self, SettleState::Unsettled)
    }
}
