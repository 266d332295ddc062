//! Parses the `"value"` / `"start,stop,N[,log]"` range syntax shared by
//! the `--l-by-r` and `--t` command-line options (spec.md `§6`).

/// A single value or a linearly/logarithmically spaced range of values.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueSpec {
    /// A single, fixed value.
    Single(f64),
    /// `N` values from `start` to `stop` inclusive, spaced linearly or
    /// (when `log` is set) geometrically.
    Range {
        /// First value.
        start: f64,
        /// Last value.
        stop: f64,
        /// Number of values, including both endpoints.
        n: usize,
        /// `true` for geometric spacing, `false` for linear.
        log: bool,
    },
}

impl ValueSpec {
    /// Parses either a bare floating-point literal or the
    /// `"start,stop,N[,log]"` syntax.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message if the spec has the wrong number
    /// of comma-separated fields, a field fails to parse, `N == 0`, or a
    /// logarithmic range has a non-positive endpoint.
    pub fn parse(s: &str) -> Result<Self, String> {
        let fields: Vec<&str> = s.split(',').map(str::trim).collect();

        match fields.as_slice() {
            [single] => single
                .parse::<f64>()
                .map(ValueSpec::Single)
                .map_err(|e| format!("'{single}' is not a valid number: {e}")),
            [start, stop, n] | [start, stop, n, _] => {
                let log = matches!(fields.get(3), Some(&tag) if tag.eq_ignore_ascii_case("log"));
                if fields.len() == 4 && !log {
                    return Err(format!(
                        "unrecognized range modifier '{}' (expected 'log')",
                        fields[3]
                    ));
                }
                let start: f64 = start
                    .parse()
                    .map_err(|e| format!("'{start}' is not a valid number: {e}"))?;
                let stop: f64 = stop
                    .parse()
                    .map_err(|e| format!("'{stop}' is not a valid number: {e}"))?;
                let n: usize = n
                    .parse()
                    .map_err(|e| format!("'{n}' is not a valid count: {e}"))?;
                if n == 0 {
                    return Err("range count N must be >= 1".to_owned());
                }
                if log && (start <= 0.0 || stop <= 0.0) {
                    return Err("logarithmic range endpoints must be positive".to_owned());
                }
                Ok(ValueSpec::Range { start, stop, n, log })
            }
            _ => Err(format!(
                "'{s}' is neither a single value nor a 'start,stop,N[,log]' range"
            )),
        }
    }

    /// Expands the spec into its concrete sample points.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        match *self {
            Self::Single(v) => vec![v],
            Self::Range { start, n, .. } if n == 1 => vec![start],
            Self::Range { start, stop, n, log } => {
                if log {
                    let (lo, hi) = (start.ln(), stop.ln());
                    (0..n)
                        .map(|i| (lo + (hi - lo) * i as f64 / (n - 1) as f64).exp())
                        .collect()
                } else {
                    (0..n)
                        .map(|i| start + (stop - start) * i as f64 / (n - 1) as f64)
                        .collect()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_value() {
        assert_eq!(ValueSpec::parse("0.85").unwrap(), ValueSpec::Single(0.85));
    }

    #[test]
    fn parses_linear_range() {
        let spec = ValueSpec::parse("1,2,3").unwrap();
        let values = spec.values();
        assert_eq!(values, vec![1.0, 1.5, 2.0]);
    }

    #[test]
    fn parses_log_range() {
        let spec = ValueSpec::parse("1,100,3,log").unwrap();
        let values = spec.values();
        assert!((values[1] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_zero_count() {
        assert!(ValueSpec::parse("1,2,0").is_err());
    }

    #[test]
    fn rejects_non_positive_log_endpoint() {
        assert!(ValueSpec::parse("-1,2,3,log").is_err());
    }

    #[test]
    fn rejects_unknown_modifier() {
        assert!(ValueSpec::parse("1,2,3,bogus").is_err());
    }
}
