/// Discrete index into the shared x-series (time axis).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct XIndex(pub usize);

/// Number formatting shared by report value cells and the x-series label.
///
/// Large and tiny magnitudes switch to scientific notation so report columns
/// stay narrow regardless of the simulation's unit system.
pub fn format_value(val: f64) -> String {
    if val >= 1000.0 || val < 0.01 {
        format!("{val:.2e}")
    } else {
        format!("{val:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mid_range_values_use_fixed_notation() {
        assert_eq!(format_value(0.5), "0.50");
        assert_eq!(format_value(999.99), "999.99");
        assert_eq!(format_value(0.01), "0.01");
    }

    #[test]
    fn extremes_use_scientific_notation() {
        assert_eq!(format_value(12345.0), "1.23e4");
        assert_eq!(format_value(0.005), "5.00e-3");
        assert_eq!(format_value(-2.0), "-2.00e0");
    }
}
