// Property tests for text edit ordering.
//
// Offsets are computed against the original file. Inserting from the back
// keeps every pending offset valid; inserting from the front does not.

use proptest::prelude::*;
use unbed::editor::apply_edits;

/// Insert `text` at each offset in the given order without adjusting the rest.
fn naive(source: &str, offsets: &[usize], text: &str) -> String {
    let mut out = source.to_string();
    for &o in offsets {
        out.insert_str(o, text);
    }
    out
}

/// Build the expected output by copying the source piecewise.
fn spliced(source: &str, offsets: &[usize], text: &str) -> String {
    let mut out = String::new();
    let mut last = 0;
    for &o in offsets {
        out.push_str(&source[last..o]);
        out.push_str(text);
        last = o;
    }
    out.push_str(&source[last..]);
    out
}

fn arb_edits() -> impl Strategy<Value = (String, Vec<usize>)> {
    "[a-z. \n]{1,200}".prop_flat_map(|source| {
        let len = source.len();
        (Just(source), proptest::collection::vec(0..=len, 0..12))
    })
    .prop_map(|(source, mut offsets)| {
        offsets.sort_unstable();
        offsets.dedup();
        (source, offsets)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn descending_application_matches_splicing((source, offsets) in arb_edits()) {
        let expected = spliced(&source, &offsets, "F.");
        let mut descending = offsets.clone();
        descending.reverse();
        prop_assert_eq!(naive(&source, &descending, "F."), expected.clone());
        prop_assert_eq!(apply_edits(&source, &offsets, "F.").unwrap(), expected);
    }

    #[test]
    fn input_order_does_not_matter((source, offsets) in arb_edits(), seed in any::<u64>()) {
        let mut shuffled = offsets.clone();
        let n = shuffled.len();
        if n > 1 {
            shuffled.rotate_left((seed as usize) % n);
        }
        prop_assert_eq!(apply_edits(&source, &shuffled, "F.").unwrap(), apply_edits(&source, &offsets, "F.").unwrap());
    }

    #[test]
    fn growth_is_exact((source, offsets) in arb_edits()) {
        let out = apply_edits(&source, &offsets, "Base.").unwrap();
        prop_assert_eq!(out.len(), source.len() + offsets.len() * "Base.".len());
    }
}

#[test]
fn ascending_application_corrupts_later_offsets() {
    let source: String = (0..120).map(|i| if i % 10 == 9 { '\n' } else { 'x' }).collect();
    let offsets = [12, 47, 103];

    let correct = apply_edits(&source, &offsets, "B.").unwrap();
    assert_eq!(correct, spliced(&source, &offsets, "B."));

    let mut descending = offsets;
    descending.reverse();
    assert_eq!(naive(&source, &descending, "B."), correct);

    // From the front, each insertion pushes the rest two bytes to the right.
    let ascending = naive(&source, &offsets, "B.");
    assert_ne!(ascending, correct);
    assert_eq!(ascending.find("B.").unwrap(), 12);
    assert_eq!(correct.match_indices("B.").map(|(i, _)| i).collect::<Vec<_>>(), vec![12, 49, 107]);
    assert_eq!(ascending.match_indices("B.").map(|(i, _)| i).collect::<Vec<_>>(), vec![12, 47, 103]);
}
