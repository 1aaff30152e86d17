//! Series length and value-column checks.

use crate::domain::ValuePolicy;
use crate::error::IngestError;

/// Cell texts read as missing values.
const NULL_TOKENS: [&str; 12] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "<NA>",
];

/// Reject series shorter than `min_points`.
pub fn check_length(len: usize, min_points: usize) -> Result<(), IngestError> {
    if len < min_points {
        return Err(IngestError::ValueDomain(format!(
            "Data must contain at least {min_points} data points, found {len}."
        )));
    }
    Ok(())
}

/// Coerce the raw data column to `f64` and apply the value policy.
///
/// Checks run column-wide in a fixed order: numeric, then null, then finite,
/// then the policy. A column holding both `abc` and an empty cell therefore
/// reports the numeric failure.
pub fn coerce_values(raw: &[String], policy: ValuePolicy) -> Result<Vec<f64>, IngestError> {
    let cells: Vec<Option<&str>> = raw
        .iter()
        .map(|s| {
            let s = s.trim();
            (!NULL_TOKENS.contains(&s)).then_some(s)
        })
        .collect();

    let mut parsed = Vec::with_capacity(cells.len());
    for cell in &cells {
        match cell {
            Some(s) => {
                let v = s
                    .parse::<f64>()
                    .map_err(|_| IngestError::ValueDomain("Data column must be numeric.".to_string()))?;
                parsed.push(Some(v));
            }
            None => parsed.push(None),
        }
    }

    if parsed.iter().any(Option::is_none) {
        return Err(IngestError::ValueDomain("Data column contains null values.".to_string()));
    }
    let values: Vec<f64> = parsed.into_iter().flatten().collect();

    if values.iter().any(|v| !v.is_finite()) {
        return Err(IngestError::ValueDomain("Data column contains non-finite values.".to_string()));
    }
    if policy == ValuePolicy::Positive && values.iter().any(|&v| v <= 0.0) {
        return Err(IngestError::ValueDomain("Data column contains non-positive values.".to_string()));
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn integers_and_floats_are_coerced() {
        let v = coerce_values(&raw(&["1", "2.5", "3e2"]), ValuePolicy::Positive).unwrap();
        assert_eq!(v, vec![1.0, 2.5, 300.0]);
    }

    #[test]
    fn text_is_not_numeric() {
        let err = coerce_values(&raw(&["abc", "20", "50"]), ValuePolicy::Positive).unwrap_err();
        assert_eq!(err, IngestError::ValueDomain("Data column must be numeric.".into()));
    }

    #[test]
    fn empty_and_nan_cells_are_null() {
        for cell in ["", "NaN", "null"] {
            let err = coerce_values(&raw(&["10", cell, "50"]), ValuePolicy::Positive).unwrap_err();
            assert!(matches!(err, IngestError::ValueDomain(ref m) if m.contains("null")), "cell {cell:?}");
        }
    }

    #[test]
    fn non_positive_values_break_the_default_policy() {
        for cell in ["0", "-5", "-0.0"] {
            let err = coerce_values(&raw(&["10", cell, "50"]), ValuePolicy::Positive).unwrap_err();
            assert!(matches!(err, IngestError::ValueDomain(ref m) if m.contains("non-positive")));
        }
    }

    #[test]
    fn finite_policy_accepts_signed_values() {
        let v = coerce_values(&raw(&["-3.5", "0", "12"]), ValuePolicy::Finite).unwrap();
        assert_eq!(v, vec![-3.5, 0.0, 12.0]);
    }

    #[test]
    fn infinity_is_rejected_under_any_policy() {
        let err = coerce_values(&raw(&["1", "inf", "2"]), ValuePolicy::Finite).unwrap_err();
        assert!(matches!(err, IngestError::ValueDomain(ref m) if m.contains("non-finite")));
    }

    #[test]
    fn length_floor() {
        assert!(check_length(3, 3).is_ok());
        let err = check_length(2, 3).unwrap_err();
        assert!(matches!(err, IngestError::ValueDomain(ref m) if m.contains("at least 3")));
    }
}
