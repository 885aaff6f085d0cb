//! OS execution-context kind set, current numbering.
//!
//! This is the kind set produced by operating-system trace analyses: the
//! thread was running, blocked, preempted, waiting on a timer, the network, a
//! block device, and so on. Classification and matchability live here as pure
//! functions over [`ContextKind`]; the legacy numbering in
//! [`super::legacy`] reuses them so that the two encodings can never drift
//! apart semantically.

use std::sync::LazyLock;

use serde_json::{Value, json};

use super::{ContextKind, EdgeContextState, EdgeContextStateFactory, TraversalClass};

/// Wire codes of the current OS numbering.
///
/// These are the codes written into artifacts by OS graph builders; they must
/// never be renumbered, only extended.
pub mod codes {
    pub const NO_EDGE: u32 = 0;
    pub const EPS: u32 = 1;
    pub const UNKNOWN: u32 = 2;
    pub const DEFAULT: u32 = 3;
    pub const RUNNING: u32 = 4;
    pub const BLOCKED: u32 = 5;
    pub const INTERRUPTED: u32 = 6;
    pub const PREEMPTED: u32 = 7;
    pub const TIMER: u32 = 8;
    pub const NETWORK: u32 = 9;
    pub const USER_INPUT: u32 = 10;
    pub const BLOCK_DEVICE: u32 = 11;
    pub const IPI: u32 = 12;
}

/// Traversal class of an OS kind.
///
/// Everything that means "the worker was progressing, or was only briefly
/// diverted" passes; genuine waits stop; the catch-alls are unknown.
#[must_use]
pub fn classify(kind: &ContextKind) -> TraversalClass {
    match kind {
        ContextKind::Running
        | ContextKind::Interrupted
        | ContextKind::Preempted
        | ContextKind::Timer
        | ContextKind::UserInput
        | ContextKind::BlockDevice
        | ContextKind::Ipi
        | ContextKind::NoEdge => TraversalClass::Pass,
        ContextKind::Blocked | ContextKind::Network => TraversalClass::Stop,
        ContextKind::Eps | ContextKind::Default | ContextKind::Unknown | ContextKind::Custom(_) => {
            TraversalClass::Unknown
        }
    }
}

/// Whether an OS kind may be joined with a counterpart edge in another graph.
///
/// Only network waits have an identifiable other side (the peer's send or
/// receive); everything else is local to its worker.
#[must_use]
pub fn matchable(kind: &ContextKind) -> bool {
    matches!(kind, ContextKind::Network)
}

static BLOCKED_GROUP_STYLE: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "style-name": "Unknown",
        "background-color": "#403b33",
        "height": 1.0,
        "opacity": 1.0,
        "style-group": "Blocked",
    })
});

static RUNNING_GROUP_STYLE: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "style-name": "Running",
        "background-color": "#33cc33",
        "height": 1.0,
        "opacity": 1.0,
        "style-group": "Running",
    })
});

/// Presentation metadata for an OS kind.
///
/// Opaque to this crate; consumed only by embedding presentation layers.
/// Kinds group by traversal class: progressing kinds share the running
/// style, stalls and catch-alls share the blocked style.
#[must_use]
pub fn styles(kind: &ContextKind) -> Value {
    match classify(kind) {
        TraversalClass::Pass => RUNNING_GROUP_STYLE.clone(),
        TraversalClass::Stop | TraversalClass::Unknown => BLOCKED_GROUP_STYLE.clone(),
    }
}

/// Factory for the current OS numbering.
///
/// # Examples
///
/// ```
/// use tracegraph::context::os::{OsContextStateFactory, codes};
/// use tracegraph::context::{ContextKind, EdgeContextStateFactory, TraversalClass};
///
/// let factory = OsContextStateFactory;
/// let blocked = factory.create_context_state(codes::BLOCKED);
/// assert_eq!(blocked.kind(), &ContextKind::Blocked);
/// assert_eq!(blocked.class(), TraversalClass::Stop);
///
/// // Fail-safe decode: codes never produced map to Unknown, not an error.
/// let mystery = factory.create_context_state(4096);
/// assert_eq!(mystery.kind(), &ContextKind::Unknown);
/// assert_eq!(mystery.class(), TraversalClass::Unknown);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct OsContextStateFactory;

impl OsContextStateFactory {
    /// Kind for a current-numbering wire code; unknown codes yield `Unknown`.
    #[must_use]
    pub fn kind_for(code: u32) -> ContextKind {
        match code {
            codes::NO_EDGE => ContextKind::NoEdge,
            codes::EPS => ContextKind::Eps,
            codes::UNKNOWN => ContextKind::Unknown,
            codes::DEFAULT => ContextKind::Default,
            codes::RUNNING => ContextKind::Running,
            codes::BLOCKED => ContextKind::Blocked,
            codes::INTERRUPTED => ContextKind::Interrupted,
            codes::PREEMPTED => ContextKind::Preempted,
            codes::TIMER => ContextKind::Timer,
            codes::NETWORK => ContextKind::Network,
            codes::USER_INPUT => ContextKind::UserInput,
            codes::BLOCK_DEVICE => ContextKind::BlockDevice,
            codes::IPI => ContextKind::Ipi,
            _ => ContextKind::Unknown,
        }
    }

    /// Current-numbering wire code for an OS kind. `Custom` kinds have no
    /// code in this numbering.
    #[must_use]
    pub fn code_for(kind: &ContextKind) -> Option<u32> {
        Some(match kind {
            ContextKind::NoEdge => codes::NO_EDGE,
            ContextKind::Eps => codes::EPS,
            ContextKind::Unknown => codes::UNKNOWN,
            ContextKind::Default => codes::DEFAULT,
            ContextKind::Running => codes::RUNNING,
            ContextKind::Blocked => codes::BLOCKED,
            ContextKind::Interrupted => codes::INTERRUPTED,
            ContextKind::Preempted => codes::PREEMPTED,
            ContextKind::Timer => codes::TIMER,
            ContextKind::Network => codes::NETWORK,
            ContextKind::UserInput => codes::USER_INPUT,
            ContextKind::BlockDevice => codes::BLOCK_DEVICE,
            ContextKind::Ipi => codes::IPI,
            ContextKind::Custom(_) => return None,
        })
    }

    /// Typed constructor: a full state for an OS kind under this numbering.
    ///
    /// `Custom` kinds fall back to the unknown state, since they have no code
    /// here; embedders with custom kinds supply their own factory.
    #[must_use]
    pub fn state_for(kind: ContextKind) -> EdgeContextState {
        match Self::code_for(&kind) {
            Some(code) => {
                let class = classify(&kind);
                let is_matchable = matchable(&kind);
                let style = styles(&kind);
                EdgeContextState::new(kind, class, is_matchable, code).with_styles(style)
            }
            None => Self::state_for(ContextKind::Unknown),
        }
    }
}

impl EdgeContextStateFactory for OsContextStateFactory {
    fn create_context_state(&self, code: u32) -> EdgeContextState {
        let kind = Self::kind_for(code);
        // Unrecognized codes keep their decoded kind (`Unknown`) but must not
        // reuse the incoming code, or round-tripping would mint new codes.
        Self::state_for(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_codes_round_trip() {
        let factory = OsContextStateFactory;
        for code in 0..=12 {
            let state = factory.create_context_state(code);
            assert_eq!(state.serialize(), code, "code {code} must round-trip");
            let again = factory.create_context_state(state.serialize());
            assert_eq!(again.kind(), state.kind());
        }
    }

    #[test]
    fn network_is_the_only_matchable_kind() {
        let factory = OsContextStateFactory;
        for code in 0..=12 {
            let state = factory.create_context_state(code);
            assert_eq!(
                state.matchable(),
                state.kind() == &ContextKind::Network,
                "{:?}",
                state.kind()
            );
        }
    }

    #[test]
    fn blocked_and_network_stop_the_walk() {
        assert_eq!(classify(&ContextKind::Blocked), TraversalClass::Stop);
        assert_eq!(classify(&ContextKind::Network), TraversalClass::Stop);
        assert_eq!(classify(&ContextKind::Running), TraversalClass::Pass);
        assert_eq!(classify(&ContextKind::Eps), TraversalClass::Unknown);
    }
}
