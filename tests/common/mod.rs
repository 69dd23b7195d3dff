use covrep::collector::Collector;
use covrep::model::CoverageMap;

/// Load the sample istanbul coverage fixture into a collector. The
/// fixture embeds its source in the `code` arrays, so reports need no
/// source store.
pub fn fixture_collector() -> Collector {
    let map: CoverageMap =
        serde_json::from_str(include_str!("../fixtures/sample_istanbul.json")).unwrap();
    let mut collector = Collector::new();
    collector.add_map(map);
    collector
}
