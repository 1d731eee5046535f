#![no_main]

use libfuzzer_sys::fuzz_target;
use rigctl_core::{clamp_angle, parse_angle};

fuzz_target!(|data: &[u8]| {
    // Parsed angles are finite and clamp into the servo range
    if let Ok(s) = std::str::from_utf8(data)
        && let Ok(angle) = parse_angle(s)
    {
        assert!(angle.is_finite());
        assert!((0.0..=180.0).contains(&clamp_angle(angle)));
    }
});
