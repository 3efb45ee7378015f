//! Date-combination expansion.
//!
//! Turns one `RouteSpec` into the ordered sequence of concrete
//! (outbound, return) date-pairs to query this cycle. Pure: recomputed
//! fresh each call, no state retained between calls.
//!
//! Ordering is outbound-date ascending, then trip-offset ascending.
//! That ordering only matters for log readability.

use chrono::{Duration, NaiveDate};
use tracing::warn;

use crate::types::{DateCombination, DateStrategy, RouteSpec};

/// Candidates with an outbound date more than this many days from
/// "today" are dropped entirely.
pub const LOOKAHEAD_DAYS: i64 = 365;

/// Expand a route into its candidate date combinations.
///
/// `today` anchors the one-year look-ahead cap. `allow_day_trips`
/// controls whether trip-length offsets ≤ 0 (possible when
/// trip_flex_days ≥ trip_length_days) are emitted or filtered.
pub fn expand(route: &RouteSpec, today: NaiveDate, allow_day_trips: bool) -> Vec<DateCombination> {
    let cap = today + Duration::days(LOOKAHEAD_DAYS);

    match &route.dates {
        DateStrategy::Fixed { date, return_date } => {
            expand_fixed(route, *date, *return_date, cap)
        }
        DateStrategy::RangedPlain {
            start,
            end,
            return_date,
        } => expand_ranged_plain(route, *start, *end, *return_date, cap),
        DateStrategy::RangedWithTripLength {
            start,
            end,
            trip_length_days,
            trip_flex_days,
        } => expand_ranged_trip_length(
            route,
            *start,
            *end,
            *trip_length_days,
            *trip_flex_days,
            cap,
            allow_day_trips,
        ),
    }
}

/// Estimated provider requests for one full cycle over `routes`.
/// Recomputed when the active configuration is swapped.
pub fn estimated_requests_per_cycle(
    routes: &[RouteSpec],
    today: NaiveDate,
    allow_day_trips: bool,
) -> usize {
    routes
        .iter()
        .map(|r| expand(r, today, allow_day_trips).len())
        .sum()
}

/// Whether [start, end] covers every required date.
fn covers_required(required: &[NaiveDate], start: NaiveDate, end: NaiveDate) -> bool {
    required.iter().all(|d| start <= *d && *d <= end)
}

fn expand_fixed(
    route: &RouteSpec,
    date: NaiveDate,
    return_date: Option<NaiveDate>,
    cap: NaiveDate,
) -> Vec<DateCombination> {
    if date > cap {
        warn!(route = %route.label(), outbound = %date, "Fixed date beyond look-ahead cap, skipping route");
        return Vec::new();
    }

    match return_date {
        None => vec![DateCombination::one_way(date)],
        Some(ret) => {
            if route.exclude_return_dates.contains(&ret) {
                warn!(route = %route.label(), return_date = %ret, "Fixed return date is excluded");
                return Vec::new();
            }
            if !route.must_include_dates.is_empty()
                && !covers_required(&route.must_include_dates, date, ret)
            {
                warn!(
                    route = %route.label(),
                    required = ?route.must_include_dates,
                    "Fixed dates don't cover required dates"
                );
                return Vec::new();
            }
            vec![DateCombination::round_trip(date, ret)]
        }
    }
}

fn expand_ranged_plain(
    route: &RouteSpec,
    start: NaiveDate,
    end: NaiveDate,
    return_date: Option<NaiveDate>,
    cap: NaiveDate,
) -> Vec<DateCombination> {
    if start > cap {
        warn!(route = %route.label(), start = %start, "Range starts beyond look-ahead cap, skipping route");
        return Vec::new();
    }

    let mut combos = Vec::new();
    let mut day = start;
    while day <= end {
        if day > cap {
            break;
        }
        match return_date {
            None => combos.push(DateCombination::one_way(day)),
            Some(ret) => {
                let excluded = route.exclude_return_dates.contains(&ret);
                let covered = route.must_include_dates.is_empty()
                    || covers_required(&route.must_include_dates, day, ret);
                if !excluded && covered {
                    combos.push(DateCombination::round_trip(day, ret));
                }
            }
        }
        day += Duration::days(1);
    }
    combos
}

#[allow(clippy::too_many_arguments)]
fn expand_ranged_trip_length(
    route: &RouteSpec,
    start: NaiveDate,
    end: NaiveDate,
    trip_length_days: i64,
    trip_flex_days: i64,
    cap: NaiveDate,
    allow_day_trips: bool,
) -> Vec<DateCombination> {
    if start > cap {
        warn!(route = %route.label(), start = %start, "Range starts beyond look-ahead cap, skipping route");
        return Vec::new();
    }

    let min_trip = trip_length_days - trip_flex_days;
    let max_trip = trip_length_days + trip_flex_days;

    let mut combos = Vec::new();
    let mut day = start;
    while day <= end {
        if day > cap {
            break;
        }
        for offset in min_trip..=max_trip {
            if !allow_day_trips && offset <= 0 {
                continue;
            }
            let ret = day + Duration::days(offset);
            if route.exclude_return_dates.contains(&ret) {
                continue;
            }
            if !route.must_include_dates.is_empty()
                && !covers_required(&route.must_include_dates, day, ret)
            {
                continue;
            }
            combos.push(DateCombination {
                outbound: day,
                return_date: Some(ret),
                trip_days: Some(offset),
            });
        }
        day += Duration::days(1);
    }
    combos
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn today() -> NaiveDate {
        d(2025, 1, 1)
    }

    fn route(dates: DateStrategy) -> RouteSpec {
        RouteSpec {
            departure: "JFK".to_string(),
            destination: "LAX".to_string(),
            description: String::new(),
            max_price: dec!(250),
            adults: 1,
            allowed_airlines: None,
            must_include_dates: Vec::new(),
            exclude_return_dates: HashSet::new(),
            dates,
        }
    }

    // -- Case A: fixed date ------------------------------------------------

    #[test]
    fn test_fixed_one_way_single_combination() {
        let r = route(DateStrategy::Fixed {
            date: d(2025, 6, 1),
            return_date: None,
        });
        let combos = expand(&r, today(), false);
        assert_eq!(combos, vec![DateCombination::one_way(d(2025, 6, 1))]);
    }

    #[test]
    fn test_fixed_with_return() {
        let r = route(DateStrategy::Fixed {
            date: d(2025, 7, 1),
            return_date: Some(d(2025, 7, 8)),
        });
        let combos = expand(&r, today(), false);
        assert_eq!(combos, vec![DateCombination::round_trip(d(2025, 7, 1), d(2025, 7, 8))]);
    }

    #[test]
    fn test_fixed_return_excluded_yields_zero() {
        let mut r = route(DateStrategy::Fixed {
            date: d(2025, 7, 1),
            return_date: Some(d(2025, 7, 8)),
        });
        r.exclude_return_dates.insert(d(2025, 7, 8));
        assert!(expand(&r, today(), false).is_empty());
    }

    #[test]
    fn test_fixed_required_date_not_covered_yields_zero() {
        // must_include 2025-07-04, trip 07-01..07-03: required date outside
        let mut r = route(DateStrategy::Fixed {
            date: d(2025, 7, 1),
            return_date: Some(d(2025, 7, 3)),
        });
        r.must_include_dates.push(d(2025, 7, 4));
        assert!(expand(&r, today(), false).is_empty());
    }

    #[test]
    fn test_fixed_required_date_covered() {
        let mut r = route(DateStrategy::Fixed {
            date: d(2025, 7, 1),
            return_date: Some(d(2025, 7, 5)),
        });
        r.must_include_dates.push(d(2025, 7, 4));
        assert_eq!(expand(&r, today(), false).len(), 1);
    }

    #[test]
    fn test_fixed_beyond_lookahead_cap_dropped() {
        let r = route(DateStrategy::Fixed {
            date: today() + Duration::days(LOOKAHEAD_DAYS + 1),
            return_date: None,
        });
        assert!(expand(&r, today(), false).is_empty());
    }

    // -- Case B: ranged, no trip length -------------------------------------

    #[test]
    fn test_ranged_plain_one_per_day() {
        let r = route(DateStrategy::RangedPlain {
            start: d(2025, 6, 1),
            end: d(2025, 6, 5),
            return_date: None,
        });
        let combos = expand(&r, today(), false);
        assert_eq!(combos.len(), 5);
        assert!(combos.iter().all(|c| c.return_date.is_none()));
        assert_eq!(combos[0].outbound, d(2025, 6, 1));
        assert_eq!(combos[4].outbound, d(2025, 6, 5));
    }

    #[test]
    fn test_ranged_plain_global_return_applied_per_day() {
        let r = route(DateStrategy::RangedPlain {
            start: d(2025, 6, 1),
            end: d(2025, 6, 3),
            return_date: Some(d(2025, 6, 10)),
        });
        let combos = expand(&r, today(), false);
        assert_eq!(combos.len(), 3);
        assert!(combos.iter().all(|c| c.return_date == Some(d(2025, 6, 10))));
    }

    #[test]
    fn test_ranged_plain_global_return_excluded_drops_all() {
        let mut r = route(DateStrategy::RangedPlain {
            start: d(2025, 6, 1),
            end: d(2025, 6, 3),
            return_date: Some(d(2025, 6, 10)),
        });
        r.exclude_return_dates.insert(d(2025, 6, 10));
        assert!(expand(&r, today(), false).is_empty());
    }

    #[test]
    fn test_ranged_plain_required_coverage_per_day() {
        // Required date 06-02: outbound days after it can't cover it.
        let mut r = route(DateStrategy::RangedPlain {
            start: d(2025, 6, 1),
            end: d(2025, 6, 4),
            return_date: Some(d(2025, 6, 10)),
        });
        r.must_include_dates.push(d(2025, 6, 2));
        let combos = expand(&r, today(), false);
        assert_eq!(combos.len(), 2);
        assert_eq!(combos[0].outbound, d(2025, 6, 1));
        assert_eq!(combos[1].outbound, d(2025, 6, 2));
    }

    #[test]
    fn test_ranged_start_beyond_cap_yields_empty() {
        let start = today() + Duration::days(LOOKAHEAD_DAYS + 10);
        let r = route(DateStrategy::RangedPlain {
            start,
            end: start + Duration::days(5),
            return_date: None,
        });
        assert!(expand(&r, today(), false).is_empty());
    }

    #[test]
    fn test_ranged_truncated_at_cap() {
        // Range straddles the cap: days past it are dropped, not the route.
        let start = today() + Duration::days(LOOKAHEAD_DAYS - 2);
        let r = route(DateStrategy::RangedPlain {
            start,
            end: start + Duration::days(10),
            return_date: None,
        });
        assert_eq!(expand(&r, today(), false).len(), 3);
    }

    // -- Case C: ranged with trip length -------------------------------------

    #[test]
    fn test_trip_length_offsets_per_day_is_2f_plus_1() {
        let r = route(DateStrategy::RangedWithTripLength {
            start: d(2025, 6, 1),
            end: d(2025, 6, 1),
            trip_length_days: 7,
            trip_flex_days: 2,
        });
        let combos = expand(&r, today(), false);
        assert_eq!(combos.len(), 2 * 2 + 1);
        let offsets: Vec<i64> = combos.iter().map(|c| c.trip_days.unwrap()).collect();
        assert_eq!(offsets, vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_spec_example_jfk_lax_nine_combinations() {
        // date_range 06-01..06-03, length 5, flex 1: 3 outbound days × 3 offsets.
        let r = route(DateStrategy::RangedWithTripLength {
            start: d(2025, 6, 1),
            end: d(2025, 6, 3),
            trip_length_days: 5,
            trip_flex_days: 1,
        });
        let combos = expand(&r, today(), false);
        assert_eq!(combos.len(), 9);

        // Outbound ascending, then offset ascending.
        assert_eq!(combos[0].outbound, d(2025, 6, 1));
        assert_eq!(combos[0].trip_days, Some(4));
        assert_eq!(combos[2].trip_days, Some(6));
        assert_eq!(combos[3].outbound, d(2025, 6, 2));
        assert_eq!(combos[8].outbound, d(2025, 6, 3));
        assert_eq!(combos[8].return_date, Some(d(2025, 6, 9)));
    }

    #[test]
    fn test_exhaustive_return_exclusion_yields_zero() {
        let mut r = route(DateStrategy::RangedWithTripLength {
            start: d(2025, 6, 1),
            end: d(2025, 6, 2),
            trip_length_days: 3,
            trip_flex_days: 1,
        });
        // Every reachable return date: 06-03 .. 06-06
        for day in 3..=6 {
            r.exclude_return_dates.insert(d(2025, 6, day));
        }
        assert!(expand(&r, today(), false).is_empty());
    }

    #[test]
    fn test_required_coverage_filters_short_offsets() {
        let mut r = route(DateStrategy::RangedWithTripLength {
            start: d(2025, 6, 1),
            end: d(2025, 6, 1),
            trip_length_days: 3,
            trip_flex_days: 2,
        });
        // Offsets 1..=5 → returns 06-02..06-06; requiring 06-05 keeps only 4, 5.
        r.must_include_dates.push(d(2025, 6, 5));
        let combos = expand(&r, today(), false);
        let offsets: Vec<i64> = combos.iter().map(|c| c.trip_days.unwrap()).collect();
        assert_eq!(offsets, vec![4, 5]);
    }

    #[test]
    fn test_day_trips_filtered_by_default() {
        // flex ≥ length: offsets -1, 0 exist but are filtered when day
        // trips are disallowed.
        let r = route(DateStrategy::RangedWithTripLength {
            start: d(2025, 6, 1),
            end: d(2025, 6, 1),
            trip_length_days: 1,
            trip_flex_days: 2,
        });
        let combos = expand(&r, today(), false);
        let offsets: Vec<i64> = combos.iter().map(|c| c.trip_days.unwrap()).collect();
        assert_eq!(offsets, vec![1, 2, 3]);
    }

    #[test]
    fn test_day_trips_passed_through_when_allowed() {
        let r = route(DateStrategy::RangedWithTripLength {
            start: d(2025, 6, 1),
            end: d(2025, 6, 1),
            trip_length_days: 1,
            trip_flex_days: 2,
        });
        let combos = expand(&r, today(), true);
        let offsets: Vec<i64> = combos.iter().map(|c| c.trip_days.unwrap()).collect();
        assert_eq!(offsets, vec![-1, 0, 1, 2, 3]);
        // A negative offset yields a return before the outbound; it is
        // passed downstream unfiltered by explicit policy choice.
        assert_eq!(combos[0].return_date, Some(d(2025, 5, 31)));
    }

    #[test]
    fn test_no_combination_beyond_cap() {
        let start = today() + Duration::days(LOOKAHEAD_DAYS - 1);
        let r = route(DateStrategy::RangedWithTripLength {
            start,
            end: start + Duration::days(5),
            trip_length_days: 2,
            trip_flex_days: 0,
        });
        let cap = today() + Duration::days(LOOKAHEAD_DAYS);
        for combo in expand(&r, today(), false) {
            assert!(combo.outbound <= cap);
        }
    }

    #[test]
    fn test_expansion_is_restartable() {
        let r = route(DateStrategy::RangedWithTripLength {
            start: d(2025, 6, 1),
            end: d(2025, 6, 3),
            trip_length_days: 5,
            trip_flex_days: 1,
        });
        assert_eq!(expand(&r, today(), false), expand(&r, today(), false));
    }

    // -- Request volume estimate ---------------------------------------------

    #[test]
    fn test_estimated_requests_per_cycle() {
        let a = route(DateStrategy::Fixed {
            date: d(2025, 6, 1),
            return_date: None,
        });
        let b = route(DateStrategy::RangedWithTripLength {
            start: d(2025, 6, 1),
            end: d(2025, 6, 3),
            trip_length_days: 5,
            trip_flex_days: 1,
        });
        assert_eq!(estimated_requests_per_cycle(&[a, b], today(), false), 10);
    }
}
