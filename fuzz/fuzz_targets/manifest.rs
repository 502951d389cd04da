#![no_main]

use libfuzzer_sys::fuzz_target;
use yair_image_scanner::{LayerChain, Manifest};

fuzz_target!(|data: &[u8]| {
    if let Ok(manifest) = Manifest::from_slice(data) {
        // 성공한 체인은 비어 있지 않아야 함
        if let Ok(chain) = LayerChain::from_manifest(&manifest) {
            assert!(chain.len() > 0);
            assert_eq!(chain.parent_of(0), None);
        }
    }
});
