//! Property-based tests for range consolidation.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use proptest::prelude::*;

use crate::billing::consolidate::consolidate;
use crate::billing::period::DateRange;

/// Strategy for ranges within a few years of 2020 so overlaps are common.
fn arb_range() -> impl Strategy<Value = DateRange> {
    (0u64..1500, 0u64..400).prop_map(|(offset, length)| {
        let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let start_date = base + Days::new(offset);
        DateRange {
            start_date,
            end_date: start_date + Days::new(length),
        }
    })
}

fn covered_days(ranges: &[DateRange]) -> BTreeSet<NaiveDate> {
    ranges
        .iter()
        .flat_map(|range| range.start_date.iter_days().take_while(move |d| *d <= range.end_date))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Consolidating twice changes nothing.
    #[test]
    fn prop_consolidation_is_idempotent(ranges in prop::collection::vec(arb_range(), 0..12)) {
        let once = consolidate(&ranges);
        let twice = consolidate(&once);
        prop_assert_eq!(once, twice);
    }

    /// No day is gained or lost.
    #[test]
    fn prop_consolidation_preserves_coverage(ranges in prop::collection::vec(arb_range(), 0..12)) {
        let consolidated = consolidate(&ranges);
        prop_assert_eq!(covered_days(&ranges), covered_days(&consolidated));
    }

    /// Output is ordered and no two output ranges share a day.
    #[test]
    fn prop_consolidation_output_is_disjoint(ranges in prop::collection::vec(arb_range(), 0..12)) {
        let consolidated = consolidate(&ranges);
        for pair in consolidated.windows(2) {
            prop_assert!(pair[0].end_date < pair[1].start_date);
        }
    }

    /// Summed day counts of the output equal the number of distinct covered days.
    #[test]
    fn prop_consolidated_days_never_double_count(ranges in prop::collection::vec(arb_range(), 1..12)) {
        let consolidated = consolidate(&ranges);
        let summed: i64 = consolidated.iter().map(DateRange::days).sum();
        prop_assert_eq!(summed, i64::try_from(covered_days(&ranges).len()).unwrap());
    }
}
