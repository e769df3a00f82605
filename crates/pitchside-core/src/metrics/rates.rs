// Per-90-minute rates.

/// `metric * 90 / minutes`. Undefined (`None`) when either input is missing
/// or the player has no recorded minutes.
pub fn per_90(metric: Option<f64>, minutes: Option<f64>) -> Option<f64> {
    let minutes = minutes.filter(|m| *m > 0.0)?;
    let value = metric? * 90.0 / minutes;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_minutes_is_undefined() {
        assert_eq!(per_90(Some(3.0), Some(0.0)), None);
        assert_eq!(per_90(Some(0.0), Some(0.0)), None);
    }

    #[test]
    fn missing_inputs_are_undefined() {
        assert_eq!(per_90(None, Some(900.0)), None);
        assert_eq!(per_90(Some(2.0), None), None);
    }

    #[test]
    fn rate_scales_to_ninety_minutes() {
        assert_eq!(per_90(Some(10.0), Some(900.0)), Some(1.0));
        assert_eq!(per_90(Some(1.0), Some(45.0)), Some(2.0));
    }
}
