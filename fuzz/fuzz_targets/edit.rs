#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (String, Vec<u16>)| {
    let (source, offsets) = input;
    let offsets: Vec<usize> = offsets.into_iter().map(usize::from).collect();
    // Out-of-range and mid-character offsets are errors, never panics
    if let Ok(out) = unbed::editor::apply_edits(&source, &offsets, "F.") {
        let mut unique = offsets.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(out.len(), source.len() + 2 * unique.len());
    }
});
