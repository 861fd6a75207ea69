//! Positional string-argument parsing.
//!
//! Every invocation arrives as a function name plus a flat list of strings.
//! These helpers turn that list into typed values and report problems as
//! [`ContractError::Validation`].

use crate::error::{ContractError, ContractResult};

/// Fail unless exactly `expected` arguments were supplied.
pub fn expect_count(function: &str, args: &[String], expected: usize) -> ContractResult<()> {
    if args.len() != expected {
        return Err(ContractError::validation(format!(
            "{function} takes {expected} arguments, got {}",
            args.len()
        )));
    }
    Ok(())
}

/// A required argument that must not be empty.
pub fn required<'a>(name: &str, value: &'a str) -> ContractResult<&'a str> {
    if value.is_empty() {
        return Err(ContractError::validation(format!("{name} must not be empty")));
    }
    Ok(value)
}

/// A finite real number `>= 0`.
pub fn non_negative(name: &str, value: &str) -> ContractResult<f64> {
    let parsed: f64 = required(name, value)?
        .parse()
        .map_err(|e| ContractError::validation(format!("{name} is not a number: {e}")))?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(ContractError::validation(format!(
            "{name} must be a non-negative number, got {value}"
        )));
    }
    Ok(parsed)
}

/// A whole number of days.
pub fn days(name: &str, value: &str) -> ContractResult<u32> {
    required(name, value)?
        .parse()
        .map_err(|e| ContractError::validation(format!("{name} is not a whole number of days: {e}")))
}

/// Reject the same account on both sides of a transfer.
pub fn distinct_parties(left: (&str, &str), right: (&str, &str)) -> ContractResult<()> {
    if left.1 == right.1 {
        return Err(ContractError::validation(format!(
            "{} and {} must be different accounts",
            left.0, right.0
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn count_must_match() {
        assert!(expect_count("f", &strings(&["a", "b"]), 2).is_ok());
        let err = expect_count("f", &strings(&["a"]), 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("takes 2 arguments, got 1"));
    }

    #[test]
    fn numbers_parse_and_reject() {
        assert_eq!(non_negative("price", "100.5").unwrap(), 100.5);
        assert_eq!(non_negative("price", "0").unwrap(), 0.0);
        assert!(non_negative("price", "").is_err());
        assert!(non_negative("price", "abc").is_err());
        assert!(non_negative("price", "-1").is_err());
        assert!(non_negative("price", "NaN").is_err());
        assert!(non_negative("price", "inf").is_err());
    }

    #[test]
    fn surrounding_whitespace_rejected() {
        for value in [" 5", "5 ", " 5 ", " "] {
            let err = non_negative("price", value).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{value:?}");
            assert!(days("saleWindowDays", value).is_err(), "{value:?}");
        }
    }

    #[test]
    fn days_are_whole() {
        assert_eq!(days("saleWindowDays", "30").unwrap(), 30);
        assert!(days("saleWindowDays", "1.5").is_err());
        assert!(days("saleWindowDays", "-3").is_err());
    }

    #[test]
    fn parties_must_differ() {
        assert!(distinct_parties(("seller", "s"), ("buyer", "b")).is_ok());
        let err = distinct_parties(("seller", "s"), ("buyer", "s")).unwrap_err();
        assert_eq!(err.to_string(), "validation failed: seller and buyer must be different accounts");
    }
}
