// Derived metrics over typed records.
//
// Every aggregate here returns `None` (or an empty collection) when the
// filtered input is empty, so callers can render a "no data" state instead
// of dividing by zero.

pub mod capability;
pub mod events;
pub mod load;
pub mod notes;
pub mod rates;
pub mod readiness;
pub mod recovery;
pub mod season;
pub mod trend;

pub use rates::per_90;
pub use readiness::{readiness_score, Bucket};
pub use season::{season_label, Season};
pub use trend::{linear_slope, Trend};

/// Arithmetic mean, `None` for no values.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Sort descending by a float key. Ties keep their input order.
pub(crate) fn sort_desc_by<T>(items: &mut [T], key: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| key(b).total_cmp(&key(a)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(mean(Vec::<f64>::new()), None);
        assert_eq!(mean([2.0, 4.0]), Some(3.0));
    }
}
