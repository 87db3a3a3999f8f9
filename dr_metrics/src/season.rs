//! Season detection: the shortest calendar span that still holds most of
//! the year's top-ranked events.
//!
//! The top `K + 1` events are put in calendar order and each is annotated
//! with the gap to the next one. The chronologically last event only serves
//! as the right-hand bound of that gap and is dropped, leaving `K` rows.
//! The window is then trimmed one edge at a time, always removing the edge
//! whose adjoining gap is larger, until it holds
//! [`SeasonConfig::terminal_len`] rows.

use crate::config::SeasonConfig;
use crate::error::{MetricsError, Result};
use crate::models::EventWindow;
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeasonEvent {
    pub timestamp: NaiveDateTime,
    pub value: f64,
    /// Time until the next top event in calendar order
    #[serde(skip)]
    pub gap: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Season {
    pub window: EventWindow,
    pub events: Vec<SeasonEvent>,
    /// Value of the K-th ranked event
    pub threshold: f64,
}

/// Keeps the top `top_events` of `ranked` (already sorted descending) in
/// calendar order, each with the gap to its successor.
pub fn time_between_events(
    ranked: &[(NaiveDateTime, f64)],
    top_events: usize,
    metric: &'static str,
) -> Result<Vec<SeasonEvent>> {
    let needed = top_events + 1;
    if ranked.len() < needed {
        return Err(MetricsError::InsufficientEvents {
            metric,
            needed,
            available: ranked.len(),
        });
    }

    let mut candidates = ranked[..needed].to_vec();
    candidates.sort_by_key(|(ts, _)| *ts);

    Ok(candidates
        .windows(2)
        .map(|pair| SeasonEvent {
            timestamp: pair[0].0,
            value: pair[0].1,
            gap: pair[1].0 - pair[0].0,
        })
        .collect())
}

/// Edge the next contraction step removes. `window` must hold at least two
/// events.
pub fn trim_edge(window: &[SeasonEvent]) -> Edge {
    let start_gap = window[0].gap.num_milliseconds().abs();
    let end_gap = window[window.len() - 2].gap.num_milliseconds().abs();
    if start_gap > end_gap {
        Edge::Left
    } else {
        Edge::Right
    }
}

/// Greedily trims `events` (in calendar order) down to `terminal_len` rows.
/// Windows already at or below the target come back unchanged.
pub fn contract_window(events: &[SeasonEvent], terminal_len: usize) -> Vec<SeasonEvent> {
    let target = terminal_len.max(1);
    let (mut lo, mut hi) = (0, events.len());
    while hi - lo > target {
        match trim_edge(&events[lo..hi]) {
            Edge::Left => lo += 1,
            Edge::Right => hi -= 1,
        }
    }
    events[lo..hi].to_vec()
}

/// Runs the full season search over events ranked by descending value.
pub fn find_season(
    ranked: &[(NaiveDateTime, f64)],
    config: &SeasonConfig,
    metric: &'static str,
) -> Result<Season> {
    let events = time_between_events(ranked, config.top_events, metric)?;
    let contracted = contract_window(&events, config.terminal_len());

    let (first, last) = match (contracted.first(), contracted.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(MetricsError::InsufficientEvents {
                metric,
                needed: config.terminal_len(),
                available: 0,
            })
        }
    };

    Ok(Season {
        window: EventWindow {
            start: first.timestamp,
            end: last.timestamp,
        },
        threshold: ranked[config.top_events - 1].1,
        events: contracted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpanBoundary;
    use chrono::NaiveDate;

    fn day(n: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            + Duration::days(n)
    }

    fn ranked_days(days: &[i64]) -> Vec<(NaiveDateTime, f64)> {
        // value decreases with position so the slice order is the ranking
        days.iter()
            .enumerate()
            .map(|(rank, &d)| (day(d), 1000.0 - rank as f64))
            .collect()
    }

    #[test]
    fn test_time_between_events_drops_last_in_time() {
        let ranked = ranked_days(&[10, 2, 7, 30]);
        let events = time_between_events(&ranked, 3, "test").unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events.iter().map(|e| e.timestamp).collect::<Vec<_>>(),
            vec![day(2), day(7), day(10)]
        );
        assert_eq!(events[0].gap, Duration::days(5));
        assert_eq!(events[2].gap, Duration::days(20));
    }

    #[test]
    fn test_insufficient_events() {
        let ranked = ranked_days(&[1, 2, 3]);
        let err = time_between_events(&ranked, 3, "shed_season").unwrap_err();
        assert!(matches!(
            err,
            MetricsError::InsufficientEvents { needed: 4, available: 3, .. }
        ));
    }

    #[test]
    fn test_contraction_trims_outliers() {
        // a dense cluster on days 100..110 with stragglers on both sides
        let mut days: Vec<i64> = (100..110).collect();
        days.extend([5, 20, 200, 300, 360]);
        let ranked = ranked_days(&days);
        let events = time_between_events(&ranked, days.len() - 1, "test").unwrap();
        let window = contract_window(&events, 10);
        assert_eq!(window.len(), 10);
        assert_eq!(window[0].timestamp, day(100));
        assert_eq!(window[9].timestamp, day(109));
    }

    #[test]
    fn test_contraction_shrinks_by_one_edge_per_step() {
        let days: Vec<i64> = vec![3, 40, 41, 43, 44, 47, 90, 91, 180, 250, 251, 364];
        let ranked = ranked_days(&days);
        let mut window = time_between_events(&ranked, days.len() - 1, "test").unwrap();
        while window.len() > 4 {
            let before = window.clone();
            window = contract_window(&before, before.len() - 1);
            assert_eq!(window.len(), before.len() - 1);
            let kept_interior = before[1..before.len() - 1]
                .iter()
                .all(|e| window.contains(e));
            assert!(kept_interior, "an interior event was removed");
        }
    }

    #[test]
    fn test_contraction_is_idempotent_at_target() {
        let days: Vec<i64> = (0..30).map(|d| d * 5 + (d % 4)).collect();
        let ranked = ranked_days(&days);
        let events = time_between_events(&ranked, 29, "test").unwrap();
        let once = contract_window(&events, 21);
        let twice = contract_window(&once, 21);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 21);
    }

    #[test]
    fn test_equal_gaps_trim_right_edge() {
        let ranked = ranked_days(&[0, 1, 2, 3]);
        let events = time_between_events(&ranked, 3, "test").unwrap();
        assert_eq!(trim_edge(&events), Edge::Right);
        let window = contract_window(&events, 2);
        assert_eq!(window[0].timestamp, day(0));
        assert_eq!(window[1].timestamp, day(1));
    }

    #[test]
    fn test_boundary_conventions() {
        let days: Vec<i64> = (0..101).map(|d| d * 2).collect();
        let ranked = ranked_days(&days);

        let exact = SeasonConfig {
            top_events: 100,
            target_span: 80,
            boundary: SpanBoundary::Exact,
        };
        let plus_one = SeasonConfig {
            boundary: SpanBoundary::PlusOne,
            ..exact
        };

        let a = find_season(&ranked, &exact, "test").unwrap();
        let b = find_season(&ranked, &plus_one, "test").unwrap();
        assert_eq!(a.events.len(), 80);
        assert_eq!(b.events.len(), 81);
        assert_eq!(a.window.span(), Duration::days(79 * 2));
        assert_eq!(b.window.span(), Duration::days(80 * 2));
        assert_eq!(a.threshold, 1000.0 - 99.0);
    }
}
