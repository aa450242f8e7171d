#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Diff parsing must not panic on any input.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = diffcov::diff::parse_hunk_lines(s);
        for section in diffcov::diff::split_by_file(s).values() {
            let _ = diffcov::diff::ChangedLines::from_diff(section);
        }
    }
});
