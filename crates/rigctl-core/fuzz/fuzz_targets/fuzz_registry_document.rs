#![no_main]

use libfuzzer_sys::fuzz_target;
use rigctl_core::HardwareRegistry;

fuzz_target!(|data: &[u8]| {
    // Any document that loads must serialize and load again with the same devices
    if let Ok(mut registry) = HardwareRegistry::from_slice(data, "/etc/NiBot/RSXA.json") {
        let bytes = registry.to_document_bytes().unwrap();
        let reloaded = HardwareRegistry::from_slice(&bytes, "/etc/NiBot/RSXA.json").unwrap();
        assert_eq!(registry.devices(), reloaded.devices());

        let names: Vec<String> = registry.names().map(str::to_string).collect();
        for name in names {
            let _ = registry.toggle_simulation_mode(&name);
        }
    }
});
