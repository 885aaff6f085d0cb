//! Edge context model: round-trips, fail-safe decoding, classification.

use proptest::prelude::*;
use tracegraph::context::legacy::LegacyOsContextStateFactory;
use tracegraph::context::os::{OsContextStateFactory, codes};
use tracegraph::context::{ContextKind, EdgeContextStateFactory, TraversalClass};

#[test]
fn every_os_code_round_trips() {
    let factory = OsContextStateFactory;
    for code in codes::NO_EDGE..=codes::IPI {
        let state = factory.create_context_state(code);
        assert_eq!(state.serialize(), code);
        assert_eq!(
            factory.create_context_state(state.serialize()).kind(),
            state.kind()
        );
    }
}

#[test]
fn every_legacy_code_round_trips() {
    let factory = LegacyOsContextStateFactory;
    for code in 0..=5 {
        let state = factory.create_context_state(code);
        assert_eq!(state.serialize(), code);
        assert_eq!(
            factory.create_context_state(state.serialize()).kind(),
            state.kind()
        );
    }
}

#[test]
fn numberings_disagree_on_codes_but_not_kinds() {
    // EPS is code 1 today and was code 0 historically; both factories still
    // agree on what an EPS edge *means*.
    let current = OsContextStateFactory.create_context_state(codes::EPS);
    let legacy = LegacyOsContextStateFactory.create_context_state(0);
    assert_eq!(current.kind(), &ContextKind::Eps);
    assert_eq!(legacy.kind(), &ContextKind::Eps);
    assert_eq!(current.class(), legacy.class());
    assert_ne!(current.serialize(), legacy.serialize());
}

#[test]
fn classification_table_matches_the_os_semantics() {
    let expect = [
        (codes::RUNNING, TraversalClass::Pass),
        (codes::PREEMPTED, TraversalClass::Pass),
        (codes::INTERRUPTED, TraversalClass::Pass),
        (codes::TIMER, TraversalClass::Pass),
        (codes::USER_INPUT, TraversalClass::Pass),
        (codes::BLOCK_DEVICE, TraversalClass::Pass),
        (codes::IPI, TraversalClass::Pass),
        (codes::NO_EDGE, TraversalClass::Pass),
        (codes::BLOCKED, TraversalClass::Stop),
        (codes::NETWORK, TraversalClass::Stop),
        (codes::EPS, TraversalClass::Unknown),
        (codes::DEFAULT, TraversalClass::Unknown),
        (codes::UNKNOWN, TraversalClass::Unknown),
    ];
    let factory = OsContextStateFactory;
    for (code, class) in expect {
        assert_eq!(
            factory.create_context_state(code).class(),
            class,
            "code {code}"
        );
    }
}

#[test]
fn styles_are_carried_through_opaquely() {
    let state = OsContextStateFactory.create_context_state(codes::DEFAULT);
    assert!(state.styles().is_object(), "styles must survive the factory");
}

proptest! {
    /// Fail-safe decode: any code whatsoever yields a usable state, and any
    /// code outside the table yields the unknown kind with the unknown class.
    #[test]
    fn arbitrary_codes_never_fail(code in any::<u32>()) {
        for factory in [
            &OsContextStateFactory as &dyn EdgeContextStateFactory,
            &LegacyOsContextStateFactory,
        ] {
            let state = factory.create_context_state(code);
            // Decoding what we got back lands on the same kind.
            let again = factory.create_context_state(state.serialize());
            prop_assert_eq!(again.kind(), state.kind());
        }
        if code > 12 {
            let state = OsContextStateFactory.create_context_state(code);
            prop_assert_eq!(state.kind(), &ContextKind::Unknown);
            prop_assert_eq!(state.class(), TraversalClass::Unknown);
            prop_assert!(!state.matchable());
        }
    }
}
