//! Assertion utilities for testing.
//!
//! Store values are quantized to hundredths, so comparisons against JSON
//! numbers use a tolerance.

use serde_json::Value;

/// Default epsilon for quantized values
pub const DEFAULT_EPSILON: f64 = 0.006;

/// Assert that a floating-point value is approximately equal to `expected`
pub fn assert_approx_eq(actual: f64, expected: f64, epsilon: Option<f64>) {
    let epsilon = epsilon.unwrap_or(DEFAULT_EPSILON);
    let diff = (actual - expected).abs();

    assert!(
        diff <= epsilon,
        "Values not approximately equal: actual = {}, expected = {}, diff = {}, epsilon = {}",
        actual,
        expected,
        diff,
        epsilon
    );
}

/// Assert that a JSON value is a number approximately equal to `expected`
pub fn assert_json_approx(value: &Value, expected: f64) {
    let actual = value
        .as_f64()
        .unwrap_or_else(|| panic!("Expected a number, got {}", value));
    assert_approx_eq(actual, expected, None);
}

/// Assert which cells of a JSON `values` grid row are masked (null)
pub fn assert_row_mask(row: &Value, masked: &[bool]) {
    let cells = row.as_array().expect("row is not an array");
    assert_eq!(cells.len(), masked.len(), "row length differs");
    for (i, (cell, &expect_null)) in cells.iter().zip(masked).enumerate() {
        assert_eq!(
            cell.is_null(),
            expect_null,
            "cell {} is {}, expected {}",
            i,
            cell,
            if expect_null { "null" } else { "a number" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_approx_eq() {
        assert_approx_eq(1.0, 1.0, None);
        assert_approx_eq(33.8, 33.80499, None);
        assert_approx_eq(1.0, 1.05, Some(0.1));
    }

    #[test]
    fn test_assert_row_mask() {
        let row = serde_json::json!([1.0, null, 2.5]);
        assert_row_mask(&row, &[false, true, false]);
        assert_json_approx(&row[2], 2.5);
    }
}
