//! Property-based tests for electronic code derivation and numbering.

use partmaster_api::{
    models::{Division, IndustryCode, PartGroup, Revision},
    services::code_generator::{derive_code, next_sequence_no, SEQUENCE_WIDTH},
};
use proptest::prelude::*;
use strum::IntoEnumIterator;

fn division() -> impl Strategy<Value = Division> {
    prop::sample::select(Division::iter().collect::<Vec<_>>())
}

fn industry() -> impl Strategy<Value = IndustryCode> {
    prop::sample::select(IndustryCode::iter().collect::<Vec<_>>())
}

fn part_group() -> impl Strategy<Value = PartGroup> {
    prop::sample::select(PartGroup::iter().collect::<Vec<_>>())
}

fn revision() -> impl Strategy<Value = Revision> {
    (b'A'..=b'Z').prop_filter_map("uppercase letter", |b| Revision::new(b as char))
}

proptest! {
    #[test]
    fn code_has_four_segments_and_padded_sequence(
        d in division(),
        i in industry(),
        g in part_group(),
        seq in 1i64..10_000_000,
        r in revision(),
    ) {
        let code = derive_code(d, i, g, seq, Some(r));
        let segments: Vec<&str> = code.split('-').collect();

        prop_assert_eq!(segments.len(), 4);
        prop_assert_eq!(segments[0], d.to_string());
        prop_assert_eq!(segments[1], i.to_string());
        prop_assert_eq!(segments[2], g.to_string());

        let tail = segments[3];
        prop_assert!(tail.ends_with(r.letter()));
        let digits = &tail[..tail.len() - 1];
        prop_assert!(digits.len() >= SEQUENCE_WIDTH);
        prop_assert_eq!(digits.parse::<i64>().unwrap(), seq);
    }

    #[test]
    fn derivation_is_deterministic(
        d in division(),
        i in industry(),
        g in part_group(),
        seq in 1i64..100_000,
        r in prop::option::of(revision()),
    ) {
        prop_assert_eq!(derive_code(d, i, g, seq, r), derive_code(d, i, g, seq, r));
    }

    #[test]
    fn missing_revision_means_initial(
        d in division(),
        i in industry(),
        g in part_group(),
        seq in 1i64..100_000,
    ) {
        prop_assert_eq!(
            derive_code(d, i, g, seq, None),
            derive_code(d, i, g, seq, Some(Revision::INITIAL))
        );
    }

    #[test]
    fn changing_division_only_changes_first_segment(
        from in division(),
        to in division(),
        i in industry(),
        g in part_group(),
        seq in 1i64..100_000,
        r in revision(),
    ) {
        let before = derive_code(from, i, g, seq, Some(r));
        let after = derive_code(to, i, g, seq, Some(r));

        let (before_head, before_rest) = before.split_once('-').unwrap();
        let (after_head, after_rest) = after.split_once('-').unwrap();
        prop_assert_eq!(before_rest, after_rest);
        prop_assert_eq!(before_head == after_head, from == to);
    }

    #[test]
    fn next_sequence_follows_the_maximum(values in prop::collection::vec(1i64..1_000_000, 1..20)) {
        let max = values.iter().copied().max();
        prop_assert_eq!(next_sequence_no(max), max.unwrap() + 1);
    }
}

#[test]
fn empty_registry_starts_at_one() {
    assert_eq!(next_sequence_no(None), 1);
    assert_eq!(next_sequence_no(Some(0)), 1);
}

#[test]
fn known_codes() {
    assert_eq!(
        derive_code(Division::A, IndustryCode::E, PartGroup::A00, 1, Some(Revision::INITIAL)),
        "A-E-A00-00001A"
    );
    assert_eq!(
        derive_code(
            Division::B,
            IndustryCode::H,
            PartGroup::C00,
            42,
            Revision::new('B')
        ),
        "B-H-C00-00042B"
    );
    assert_eq!(next_sequence_no([5, 9, 3].into_iter().max()), 10);
}
