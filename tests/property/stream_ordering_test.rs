// tests/property/stream_ordering_test.rs

//! Property-based tests for the stream engine: ids produced by successful
//! appends are strictly increasing, and range scans return exactly the
//! ordered subsequence inside the bounds.

use bytes::Bytes;
use indexmap::IndexMap;
use opaldb::core::storage::{EntryIdSpec, Stream, StreamEngine, StreamId};
use proptest::prelude::*;

/// One append request as a client might issue it.
#[derive(Debug, Clone)]
enum AppendOp {
    Auto { clock_step: u64 },
    PartialMs(u64),
    Explicit(u64, u64),
}

fn arb_append_op() -> impl Strategy<Value = AppendOp> {
    prop_oneof![
        (0u64..3).prop_map(|clock_step| AppendOp::Auto { clock_step }),
        (0u64..16).prop_map(AppendOp::PartialMs),
        ((0u64..16), (0u64..16)).prop_map(|(ms, seq)| AppendOp::Explicit(ms, seq)),
    ]
}

fn fields() -> IndexMap<Bytes, Bytes> {
    let mut map = IndexMap::new();
    map.insert(Bytes::from_static(b"f"), Bytes::from_static(b"v"));
    map
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    /// Invariant: over any mix of auto, partial and explicit appends, the
    /// ids of the appends that *succeed* form a strictly increasing sequence.
    #[test]
    fn test_successful_append_ids_strictly_increase(ops in prop::collection::vec(arb_append_op(), 1..64)) {
        let mut stream = Stream::new();
        let mut now_ms = 0u64;
        let mut accepted = Vec::new();

        for op in ops {
            let spec = match op {
                AppendOp::Auto { clock_step } => {
                    now_ms += clock_step;
                    EntryIdSpec::Auto
                }
                AppendOp::PartialMs(ms) => EntryIdSpec::PartialMs(ms),
                AppendOp::Explicit(ms, seq) => EntryIdSpec::Explicit(StreamId::new(ms, seq)),
            };
            if let Ok(id) = stream.add_entry(spec, fields(), now_ms) {
                accepted.push(id);
            }
        }

        for pair in accepted.windows(2) {
            prop_assert!(pair[0] < pair[1], "ids must strictly increase: {} then {}", pair[0], pair[1]);
        }
        for id in &accepted {
            prop_assert!(*id > StreamId::MIN);
        }
    }

    /// Invariant: `range(start, end)` equals the ordered subsequence of the
    /// stream whose ids lie in `[start, end]`.
    #[test]
    fn test_range_matches_filtered_subsequence(
        raw_ids in prop::collection::btree_set((0u64..12, 0u64..12), 1..48),
        start in (0u64..12, 0u64..12),
        end in (0u64..12, 0u64..12),
    ) {
        let engine = StreamEngine::new();
        let key = Bytes::from_static(b"s");

        // Insert in ascending order so every explicit append is accepted;
        // skip the forbidden 0-0.
        let ids: Vec<StreamId> = raw_ids
            .into_iter()
            .map(|(ms, seq)| StreamId::new(ms, seq))
            .filter(|id| *id > StreamId::MIN)
            .collect();
        for id in &ids {
            engine.append(&key, EntryIdSpec::Explicit(*id), fields(), 0).unwrap();
        }

        let start = StreamId::new(start.0, start.1);
        let end = StreamId::new(end.0, end.1);

        let got: Vec<StreamId> = engine
            .range(&key, start, end)
            .into_iter()
            .map(|entry| entry.id)
            .collect();
        let want: Vec<StreamId> = ids
            .iter()
            .copied()
            .filter(|id| *id >= start && *id <= end)
            .collect();

        prop_assert_eq!(got, want);
    }

    /// `entries_after` is the strictly-greater-than filter used by XREAD.
    #[test]
    fn test_entries_after_is_strictly_exclusive(
        raw_ids in prop::collection::btree_set((0u64..12, 0u64..12), 1..48),
        after in (0u64..12, 0u64..12),
    ) {
        let engine = StreamEngine::new();
        let key = Bytes::from_static(b"s");

        let ids: Vec<StreamId> = raw_ids
            .into_iter()
            .map(|(ms, seq)| StreamId::new(ms, seq))
            .filter(|id| *id > StreamId::MIN)
            .collect();
        for id in &ids {
            engine.append(&key, EntryIdSpec::Explicit(*id), fields(), 0).unwrap();
        }

        let after = StreamId::new(after.0, after.1);
        let got: Vec<StreamId> = engine
            .entries_after(&key, after)
            .into_iter()
            .map(|entry| entry.id)
            .collect();
        let want: Vec<StreamId> = ids.iter().copied().filter(|id| *id > after).collect();

        prop_assert_eq!(got, want);
    }
}
