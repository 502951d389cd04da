#![no_main]

use libfuzzer_sys::fuzz_target;
use yair_image_scanner::ImageReference;

fuzz_target!(|data: &[u8]| {
    // 참조 파서는 &str을 받으므로 UTF-8 변환 필요
    if let Ok(input) = std::str::from_utf8(data) {
        for namespace_defaulting in [true, false] {
            if let Ok(reference) = ImageReference::parse(input, namespace_defaulting) {
                assert!(!reference.name().is_empty());
                assert!(!reference.tag().is_empty());
                assert_ne!(reference.registry_port(), Some(0));
                let _ = reference.to_string();
            }
        }
    }
});
