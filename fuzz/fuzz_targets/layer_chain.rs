#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use yair_image_scanner::{LayerChain, Manifest};

/// 퍼저용 구조적 매니페스트 입력
#[derive(Arbitrary, Debug)]
struct FuzzManifest {
    schema_version: u8,
    layers: Vec<String>,
}

fuzz_target!(|input: FuzzManifest| {
    // 레이어 수 제한 (퍼징 성능)
    let layers: Vec<String> = input.layers.into_iter().take(256).collect();
    let body = match input.schema_version % 3 {
        1 => serde_json::json!({
            "schemaVersion": 1,
            "fsLayers": layers.iter().map(|l| serde_json::json!({"blobSum": l})).collect::<Vec<_>>(),
        }),
        2 => serde_json::json!({
            "schemaVersion": 2,
            "layers": layers.iter().map(|l| serde_json::json!({"digest": l, "size": 0})).collect::<Vec<_>>(),
        }),
        _ => serde_json::json!({ "schemaVersion": input.schema_version }),
    };

    let Ok(bytes) = serde_json::to_vec(&body) else {
        return;
    };
    let Ok(manifest) = Manifest::from_slice(&bytes) else {
        return;
    };

    match LayerChain::from_manifest(&manifest) {
        Ok(chain) => {
            let mut expected = layers.clone();
            if manifest.schema_version == 1 {
                expected.reverse();
            }
            assert_eq!(chain.as_slice(), expected.as_slice());
            for i in 1..chain.len() {
                assert_eq!(chain.parent_of(i), Some(expected[i - 1].as_str()));
            }
        }
        Err(_) => assert!(layers.is_empty() || !matches!(manifest.schema_version, 1 | 2)),
    }
});
