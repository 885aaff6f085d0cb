//! OS execution-context kind set, historical numbering.
//!
//! Early artifacts were written with a shorter kind table under different
//! codes. Decoding them is the embedder's choice: pass this factory to
//! `SealedGraph::open` instead of the current one. Both numberings share the
//! classification and matchability rules from [`super::os`], so algorithm
//! code is oblivious to which encoding an artifact uses. That isolation is
//! the entire point of the factory seam.

use super::os::{classify, matchable, styles};
use super::{ContextKind, EdgeContextState, EdgeContextStateFactory};

/// Wire codes of the historical OS numbering.
pub mod codes {
    pub const EPS: u32 = 0;
    pub const NO_EDGE: u32 = 1;
    pub const UNKNOWN: u32 = 2;
    pub const DEFAULT: u32 = 3;
    pub const RUNNING: u32 = 4;
    pub const BLOCKED: u32 = 5;
}

/// Factory for artifacts written with the historical numbering.
#[derive(Clone, Copy, Debug, Default)]
pub struct LegacyOsContextStateFactory;

impl LegacyOsContextStateFactory {
    /// Kind for a legacy wire code; codes past the legacy table are `Unknown`.
    #[must_use]
    pub fn kind_for(code: u32) -> ContextKind {
        match code {
            codes::EPS => ContextKind::Eps,
            codes::NO_EDGE => ContextKind::NoEdge,
            codes::UNKNOWN => ContextKind::Unknown,
            codes::DEFAULT => ContextKind::Default,
            codes::RUNNING => ContextKind::Running,
            codes::BLOCKED => ContextKind::Blocked,
            _ => ContextKind::Unknown,
        }
    }

    /// Legacy wire code for a kind, if the legacy table had one.
    #[must_use]
    pub fn code_for(kind: &ContextKind) -> Option<u32> {
        match kind {
            ContextKind::Eps => Some(codes::EPS),
            ContextKind::NoEdge => Some(codes::NO_EDGE),
            ContextKind::Unknown => Some(codes::UNKNOWN),
            ContextKind::Default => Some(codes::DEFAULT),
            ContextKind::Running => Some(codes::RUNNING),
            ContextKind::Blocked => Some(codes::BLOCKED),
            _ => None,
        }
    }
}

impl EdgeContextStateFactory for LegacyOsContextStateFactory {
    fn create_context_state(&self, code: u32) -> EdgeContextState {
        let kind = Self::kind_for(code);
        let wire = Self::code_for(&kind).unwrap_or(codes::UNKNOWN);
        let class = classify(&kind);
        let is_matchable = matchable(&kind);
        let style = styles(&kind);
        EdgeContextState::new(kind, class, is_matchable, wire).with_styles(style)
    }
}
