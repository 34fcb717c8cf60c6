//! Property tests for ranking and index selection.

use autorepro::core::planner::{Rationale, Suggestion, rank};
use autorepro::core::rules::RuleSource;
use autorepro::core::selection::{Selection, parse_indexes, resolve};
use proptest::prelude::*;

fn suggestion() -> impl Strategy<Value = Suggestion>
{
    (0i64..12, 0usize..3, any::<bool>(), "[a-d]{1,3}").prop_map(|(score, kws, plugin, cmd)| {
        Suggestion {
            cmd,
            score,
            rationale: Rationale {
                matched_keywords: (0..kws).map(|i| format!("k{i}")).collect(),
                ..Rationale::default()
            },
            source: if plugin { RuleSource::Plugin } else { RuleSource::Builtin },
            ecosystem: "x".into(),
        }
    })
}

proptest! {
    #[test]
    fn ranking_is_sorted_and_idempotent(mut list in prop::collection::vec(suggestion(), 0..20))
    {
        rank(&mut list);
        for pair in list.windows(2)
        {
            prop_assert!(pair[0].score >= pair[1].score);
        }
        let once = list.clone();
        rank(&mut list);
        prop_assert_eq!(once, list);
    }

    #[test]
    fn ranges_expand_inclusively(lo in 0usize..50, span in 0usize..20)
    {
        let hi = lo + span;
        let parsed = parse_indexes(&format!("{lo}-{hi}")).unwrap();
        prop_assert_eq!(parsed.iter().collect::<Vec<_>>(), (lo..=hi).collect::<Vec<_>>());
    }

    #[test]
    fn resolved_indices_are_sorted_unique_and_in_range(
        picks in prop::collection::vec(0usize..10, 1..8),
        len in 0usize..12,
    )
    {
        let raw = picks.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(",");
        let parsed = parse_indexes(&raw).unwrap();
        match resolve(len, &Selection::Explicit(parsed))
        {
            Ok(indices) =>
            {
                prop_assert!(indices.windows(2).all(|w| w[0] < w[1]));
                prop_assert!(indices.iter().all(|&i| i < len));
            }
            Err(_) => prop_assert!(picks.iter().any(|&p| p >= len)),
        }
    }
}
