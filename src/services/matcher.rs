// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pairing of activities recorded independently on two platforms.
//!
//! Matching is first-fit: candidates are tried in the order given and the
//! first one inside the tolerance window wins, even if a later candidate
//! would be closer.

use chrono::{DateTime, TimeDelta, Utc};

/// Anything with an absolute start instant and an optional distance.
pub trait Timed {
    fn instant(&self) -> DateTime<Utc>;

    /// Distance in meters, if known.
    fn distance_meters(&self) -> Option<f64> {
        None
    }
}

impl Timed for crate::models::Activity {
    fn instant(&self) -> DateTime<Utc> {
        self.start
    }

    fn distance_meters(&self) -> Option<f64> {
        self.distance
    }
}

/// How close two activities must be to count as the same session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchTolerance {
    /// Inclusive bound on the start-time difference
    pub time_secs: i64,
    /// Inclusive bound on the distance difference; `None` disables it.
    /// The check is skipped when either side has no distance.
    pub distance_meters: Option<f64>,
}

impl MatchTolerance {
    pub fn time_only(time_secs: i64) -> Self {
        Self {
            time_secs,
            distance_meters: None,
        }
    }

    fn accepts<R, C>(&self, reference: &R, candidate: &C) -> bool
    where
        R: Timed + ?Sized,
        C: Timed + ?Sized,
    {
        // A negative window matches nothing; one too wide for TimeDelta
        // matches everything.
        if self.time_secs < 0 {
            return false;
        }
        let offset = (candidate.instant() - reference.instant()).abs();
        if TimeDelta::try_seconds(self.time_secs).is_some_and(|limit| offset > limit) {
            return false;
        }

        match (
            self.distance_meters,
            reference.distance_meters(),
            candidate.distance_meters(),
        ) {
            (Some(limit), Some(a), Some(b)) => (a - b).abs() <= limit,
            _ => true,
        }
    }
}

/// Return the first candidate within `tolerance` of `reference`.
pub fn find_match<'a, R, C>(
    reference: &R,
    candidates: &'a [C],
    tolerance: &MatchTolerance,
) -> Option<&'a C>
where
    R: Timed + ?Sized,
    C: Timed,
{
    candidates.iter().find(|c| tolerance.accepts(reference, *c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[derive(Debug, PartialEq)]
    struct Point {
        label: &'static str,
        at: DateTime<Utc>,
        distance: Option<f64>,
    }

    impl Timed for Point {
        fn instant(&self) -> DateTime<Utc> {
            self.at
        }

        fn distance_meters(&self) -> Option<f64> {
            self.distance
        }
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 16, 0, 0).unwrap()
    }

    fn point(label: &'static str, offset_secs: i64) -> Point {
        Point {
            label,
            at: base() + Duration::seconds(offset_secs),
            distance: None,
        }
    }

    #[test]
    fn test_first_fit_is_order_sensitive() {
        let reference = point("ref", 0);
        let near = point("near", 2);
        let far = point("far", -15);

        let candidates = [far, near];
        let found = find_match(&reference, &candidates, &MatchTolerance::time_only(20));
        assert_eq!(found.map(|p| p.label), Some("far"));

        let candidates = [point("near", 2), point("far", -15)];
        let found = find_match(&reference, &candidates, &MatchTolerance::time_only(20));
        assert_eq!(found.map(|p| p.label), Some("near"));
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        let reference = point("ref", 0);
        let tolerance = MatchTolerance::time_only(20);

        assert!(find_match(&reference, &[point("edge", 20)], &tolerance).is_some());
        assert!(find_match(&reference, &[point("edge", -20)], &tolerance).is_some());
        assert!(find_match(&reference, &[point("out", 21)], &tolerance).is_none());
        assert!(find_match(&reference, &[point("out", -21)], &tolerance).is_none());
    }

    #[test]
    fn test_no_candidates() {
        let candidates: [Point; 0] = [];
        let tolerance = MatchTolerance::time_only(20);
        assert!(find_match(&point("ref", 0), &candidates, &tolerance).is_none());
    }

    #[test]
    fn test_huge_tolerance_matches_without_overflow() {
        let reference = point("ref", 0);
        let tolerance = MatchTolerance::time_only(i64::MAX / 10);
        let candidates = [point("week_later", 7 * 86_400)];
        let found = find_match(&reference, &candidates, &tolerance);
        assert_eq!(found.map(|p| p.label), Some("week_later"));
    }

    #[test]
    fn test_negative_tolerance_matches_nothing() {
        let reference = point("ref", 0);
        let tolerance = MatchTolerance::time_only(-1);
        assert!(find_match(&reference, &[point("same", 0)], &tolerance).is_none());
    }

    #[test]
    fn test_distance_tolerance() {
        let mut reference = point("ref", 0);
        reference.distance = Some(1000.0);
        let tolerance = MatchTolerance {
            time_secs: 20,
            distance_meters: Some(50.0),
        };

        let mut too_far = point("too_far", 1);
        too_far.distance = Some(1100.0);
        let mut close = point("close", 5);
        close.distance = Some(1050.0);

        let candidates = [too_far, close];
        let found = find_match(&reference, &candidates, &tolerance);
        assert_eq!(found.map(|p| p.label), Some("close"));
    }

    #[test]
    fn test_missing_distance_falls_back_to_time() {
        let mut reference = point("ref", 0);
        reference.distance = Some(1000.0);
        let tolerance = MatchTolerance {
            time_secs: 20,
            distance_meters: Some(1.0),
        };
        let candidates = [point("no_distance", 3)];
        let found = find_match(&reference, &candidates, &tolerance);
        assert_eq!(found.map(|p| p.label), Some("no_distance"));
    }
}
