#![no_main]

use blockvault::Structure;
use libfuzzer_sys::fuzz_target;

// Arbitrary structure bytes must decode or fail cleanly, never panic.
// Anything that decodes must survive an encode/decode cycle unchanged.
fuzz_target!(|data: &[u8]| {
    if let Ok(structure) = Structure::from_bytes(data) {
        let encoded = structure.to_bytes().expect("decoded structure must encode");
        let decoded = Structure::from_bytes(&encoded).expect("encoded structure must decode");
        assert_eq!(decoded, structure);
    }
});
