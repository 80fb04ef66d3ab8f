//! Calendar reindexing and time-weighted linear interpolation.

use chrono::{Days, NaiveDate};
use tracing::{debug, instrument};

use crate::series::DailySeries;

/// Counts describing a gap-filling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GapFillSummary {
    /// Calendar dates that were absent from the input index.
    pub n_inserted_dates: usize,
    /// Valueless dates that received an interpolated value.
    pub n_filled: usize,
    /// Valueless dates left empty because they lie outside the known range.
    pub n_unfilled: usize,
}

/// Reindex a series onto every calendar day in its range and interpolate gaps.
///
/// The output covers `[first date, last date]` with one entry per day. A
/// valueless entry is filled from the nearest valued neighbours on each side,
/// weighted by elapsed days, so unequal spacing is interpolated in proportion
/// to real time. Entries before the first or after the last valued date stay
/// empty; there is no extrapolation. An empty input yields an empty output,
/// and a series with no gaps is returned unchanged.
#[must_use = "returns a new filled series; the original is unchanged"]
#[instrument(skip_all, fields(n_in = series.len()))]
pub fn fill_gaps(series: &DailySeries) -> (DailySeries, GapFillSummary) {
    let Some((first, last)) = series.date_range() else {
        return (DailySeries::empty(), GapFillSummary::default());
    };

    let n_days = (last - first).num_days() as usize + 1;
    let dates: Vec<NaiveDate> = (0..n_days)
        .map(|offset| first + Days::new(offset as u64))
        .collect();

    // Reindex: input dates are strictly increasing, so a single merge pass suffices.
    let mut values: Vec<Option<f64>> = vec![None; n_days];
    for (date, value) in series.iter() {
        let offset = (date - first).num_days() as usize;
        values[offset] = value;
    }
    let n_inserted_dates = n_days - series.len();

    let known: Vec<usize> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect();

    let mut n_filled = 0usize;
    for pair in known.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if hi - lo < 2 {
            continue;
        }
        let (Some(y0), Some(y1)) = (values[lo], values[hi]) else {
            continue;
        };
        let (t0, t1) = (dates[lo], dates[hi]);
        let span = (t1 - t0).num_days() as f64;
        for i in (lo + 1)..hi {
            let w = (dates[i] - t0).num_days() as f64 / span;
            values[i] = Some(y0 + w * (y1 - y0));
            n_filled += 1;
        }
    }

    let n_unfilled = values.iter().filter(|v| v.is_none()).count();
    debug!(n_days, n_inserted_dates, n_filled, n_unfilled, "gaps filled");

    (
        DailySeries::new_unchecked(dates, values),
        GapFillSummary {
            n_inserted_dates,
            n_filled,
            n_unfilled,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn gap_free_series_is_unchanged() {
        let s = DailySeries::from_points([(d(1), 0.1), (d(2), 0.4), (d(3), 0.2)]).unwrap();
        let (filled, summary) = fill_gaps(&s);
        assert_eq!(filled, s);
        assert_eq!(summary.n_inserted_dates, 0);
        assert_eq!(summary.n_filled, 0);
    }

    #[test]
    fn empty_in_empty_out() {
        let (filled, summary) = fill_gaps(&DailySeries::empty());
        assert!(filled.is_empty());
        assert_eq!(summary, GapFillSummary::default());
    }

    #[test]
    fn missing_dates_are_inserted_and_interpolated() {
        let s = DailySeries::from_points([(d(1), 0.0), (d(5), 0.8)]).unwrap();
        let (filled, summary) = fill_gaps(&s);
        assert_eq!(filled.len(), 5);
        assert!(filled.is_regular());
        let values = filled.complete_values().unwrap();
        for (i, expected) in [0.0, 0.2, 0.4, 0.6, 0.8].iter().enumerate() {
            assert!((values[i] - expected).abs() < 1e-12, "day {i}: {}", values[i]);
        }
        assert_eq!(summary.n_inserted_dates, 3);
        assert_eq!(summary.n_filled, 3);
    }

    #[test]
    fn interpolation_follows_elapsed_time() {
        // Known points at day 1 (1.0), day 2 (2.0), day 10 (10.0). The gap on
        // the right is 8 days wide, so day 6 sits halfway between 2.0 and 10.0.
        let s = DailySeries::from_points([(d(1), 1.0), (d(2), 2.0), (d(10), 10.0)]).unwrap();
        let (filled, _) = fill_gaps(&s);
        let values = filled.complete_values().unwrap();
        assert!((values[5] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn valueless_dates_inside_the_index_are_filled() {
        let s = DailySeries::new(vec![d(1), d(2), d(3)], vec![Some(1.0), None, Some(3.0)]).unwrap();
        let (filled, summary) = fill_gaps(&s);
        assert_eq!(filled.values()[1], Some(2.0));
        assert_eq!(summary.n_inserted_dates, 0);
        assert_eq!(summary.n_filled, 1);
    }

    #[test]
    fn no_extrapolation_at_edges() {
        let s = DailySeries::new(
            vec![d(1), d(2), d(3), d(4)],
            vec![None, Some(1.0), Some(2.0), None],
        )
        .unwrap();
        let (filled, summary) = fill_gaps(&s);
        assert_eq!(filled.values()[0], None);
        assert_eq!(filled.values()[3], None);
        assert_eq!(summary.n_unfilled, 2);
    }

    #[test]
    fn output_spans_exact_input_range() {
        let s = DailySeries::from_points([(d(3), 1.0), (d(7), 2.0), (d(20), 3.0)]).unwrap();
        let (filled, _) = fill_gaps(&s);
        assert_eq!(filled.date_range(), Some((d(3), d(20))));
        assert_eq!(filled.len(), 18);
        assert!(filled.is_regular());
    }
}
