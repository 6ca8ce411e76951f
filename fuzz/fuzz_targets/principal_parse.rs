#![no_main]

use libfuzzer_sys::fuzz_target;
use std::str::FromStr;
use testament_core::Principal;

fuzz_target!(|data: &[u8]| {
    // Principal::from_str must never panic; it should always return Ok or Err.
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(p) = Principal::from_str(s) {
            // Anything accepted must print back to something that parses to itself.
            assert_eq!(Principal::from_str(&p.to_string()).ok(), Some(p));
        }
    }
});
