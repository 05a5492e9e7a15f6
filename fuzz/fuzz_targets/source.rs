#![no_main]

use libfuzzer_sys::fuzz_target;
use unseen_formats::accumulate;
use unseen_formats::source::{JsonLines, JsonMap, RegistrySource, YamlIndex};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    for registries in [JsonMap.parse(input), JsonLines.parse(input), YamlIndex.parse(input)]
        .into_iter()
        .flatten()
    {
        let registries = registries.without_empty();
        if let Ok(table) = accumulate(&registries) {
            assert_eq!(table.union_cardinality(), registries.union().len());
            for row in table.rows() {
                assert!(row.total_uniq_exts <= row.total_exts);
                assert!(row.num_uniq_exts <= row.num_exts);
            }
        }
    }
});
