//! Fuzz target for IPSec key line parsing.
//!
//! This fuzzer tests the key file parser against random input to find:
//! - Panics
//! - Incorrect error handling
//! - Round-trip mismatches
//!
//! Run with:
//! ```bash
//! cd crates/datapath
//! cargo +nightly fuzz run key_line -- -max_total_time=300
//! ```

#![no_main]
use libfuzzer_sys::fuzz_target;
use podsec_datapath::ipsec::KeyRecord;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    // If parsing succeeds, ensure round-trip works
    if let Ok((identity, record)) = KeyRecord::parse_line(line) {
        let rendered = record.to_line(&identity);
        let (reparsed_identity, reparsed) =
            KeyRecord::parse_line(&rendered).expect("Round-trip parsing should never fail");

        assert_eq!(identity, reparsed_identity);
        assert_eq!(record, reparsed);
    }
});
