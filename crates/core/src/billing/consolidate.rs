//! Consolidation of overlapping date ranges.

use super::period::DateRange;

/// Merges overlapping or touching ranges into the minimal ordered set of
/// disjoint ranges covering the same days.
///
/// Ranges that share a day (one ends on the day the next starts) are merged.
/// Ranges separated by a day boundary (31 Oct, 1 Nov) stay apart.
#[must_use]
pub fn consolidate(ranges: &[DateRange]) -> Vec<DateRange> {
    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|range| range.start_date);

    let mut consolidated: Vec<DateRange> = Vec::with_capacity(sorted.len());

    for next in sorted {
        match consolidated.last_mut() {
            // Fully contained: nothing to do
            Some(current) if next.end_date <= current.end_date => {}
            Some(current) if next.start_date <= current.end_date => {
                current.end_date = next.end_date;
            }
            _ => consolidated.push(next),
        }
    }

    consolidated
}
