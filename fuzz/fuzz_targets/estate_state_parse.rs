#![no_main]

use libfuzzer_sys::fuzz_target;
use testament_core::{Estate, EstateState, ManualClock};

fuzz_target!(|data: &[u8]| {
    // A stored snapshot is untrusted input: decoding and validation must
    // never panic, and neither may querying an estate that was accepted.
    if let Ok(state) = serde_json::from_slice::<EstateState>(data) {
        let Ok(estate) = Estate::from_state(state, ManualClock::new(0)) else {
            return;
        };
        let _ = estate.heartbeat(&Default::default());
        for role in testament_core::Role::ALL {
            let count = estate.role_member_count(role);
            let _ = estate.role_member_at(role, 0);
            let members = estate.roles().members(role);
            for (idx, member) in members.iter().enumerate() {
                assert!(!members[..idx].contains(member));
            }
            assert_eq!(count, members.len());
        }
        assert!(estate.role_member_count(testament_core::Role::Owner) > 0);
    }
});
