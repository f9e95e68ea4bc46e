use crate::FIRST_PERIOD;

/// Formats a set of periods as compact ranges: `{1, 2, 3, 5, 6, 8}` gives
/// `"1-3, 5-6, 8"`. Order and duplicates in the input do not matter.
pub fn format_periods(periods: &[u8]) -> String {
    let mut sorted = periods.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    if sorted.is_empty() {
        return FIRST_PERIOD.to_string();
    }

    runs(&sorted)
        .into_iter()
        .map(|(start, end)| range_token(start, end))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `"5"` for a single period, `"5-7"` otherwise.
pub(crate) fn range_token(start: u8, end: u8) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{}-{}", start, end)
    }
}

/// Splits sorted, deduplicated periods into runs of consecutive values.
pub(crate) fn runs(sorted: &[u8]) -> Vec<(u8, u8)> {
    let mut runs = Vec::new();
    let mut iter = sorted.iter().copied();

    let mut current = match iter.next() {
        Some(first) => (first, first),
        None => return runs,
    };

    for period in iter {
        if current.1.checked_add(1) == Some(period) {
            current.1 = period;
        } else {
            runs.push(current);
            current = (period, period);
        }
    }

    runs.push(current);
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract_periods;

    #[test]
    fn compresses_runs() {
        assert_eq!(format_periods(&[1, 2, 3, 5, 6, 8]), "1-3, 5-6, 8");
        assert_eq!(format_periods(&[8, 6, 5, 3, 2, 1]), "1-3, 5-6, 8");
        assert_eq!(format_periods(&[1, 2, 2, 3]), "1-3");
    }

    #[test]
    fn single_period_has_no_dash() {
        assert_eq!(format_periods(&[4]), "4");
    }

    #[test]
    fn empty_input_gives_placeholder() {
        assert_eq!(format_periods(&[]), "1");
    }

    #[test]
    fn round_trips_through_the_extractor() {
        let sets: &[&[u8]] = &[
            &[1],
            &[10],
            &[1, 3],
            &[2, 4, 6, 8, 10],
            &[1, 2, 3, 5, 6, 8],
            &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10],
            &[3, 4, 9],
        ];

        for set in sets {
            let formatted = format_periods(set);
            assert_eq!(
                format_periods(&extract_periods(&formatted)),
                formatted,
                "set {:?}",
                set
            );
        }
    }

    #[test]
    fn runs_of_the_last_value() {
        assert_eq!(runs(&[254, 255]), vec![(254, 255)]);
        assert_eq!(runs(&[]), vec![]);
    }
}
