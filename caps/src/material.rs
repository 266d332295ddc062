//! Material dielectric-function file loading and interpolation (`§6`).
//!
//! The file format is UTF-8 text. Lines starting with `#` may carry
//! `key = value` header pairs from `{omegap_low, gamma_low, omegap_high,
//! gamma_high}`; every other non-blank line is a whitespace-separated
//! `xi epsilon` pair. `xi` must be strictly increasing.

use crate::error::{Error, Result};

/// A tabulated dielectric function `epsilon(xi)`, linearly interpolated
/// between sampled points and extrapolated outside the table with Drude
/// tails read from the file header.
#[derive(Clone, Debug)]
pub struct MaterialTable {
    xi: Vec<f64>,
    eps: Vec<f64>,
    omegap_low: f64,
    gamma_low: f64,
    omegap_high: f64,
    gamma_high: f64,
}

impl MaterialTable {
    /// Parses a material file from its full text contents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Material`] if a data line cannot be parsed, `xi`
    /// is not strictly increasing, or one of the four required header
    /// keys is missing.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut omegap_low = None;
        let mut gamma_low = None;
        let mut omegap_high = None;
        let mut gamma_high = None;
        let mut xi = Vec::new();
        let mut eps = Vec::new();

        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix('#') {
                let rest = rest.trim();
                if let Some((key, value)) = rest.split_once('=') {
                    let key = key.trim();
                    let value = value.trim().parse::<f64>().map_err(|e| {
                        Error::Material(format!("line {}: bad header value: {e}", lineno + 1))
                    })?;
                    match key {
                        "omegap_low" => omegap_low = Some(value),
                        "gamma_low" => gamma_low = Some(value),
                        "omegap_high" => omegap_high = Some(value),
                        "gamma_high" => gamma_high = Some(value),
                        _ => {}
                    }
                }
                continue;
            }

            let mut fields = line.split_whitespace();
            let (Some(xi_s), Some(eps_s)) = (fields.next(), fields.next()) else {
                return Err(Error::Material(format!(
                    "line {}: expected 'xi epsilon' pair",
                    lineno + 1
                )));
            };
            let xi_v: f64 = xi_s
                .parse()
                .map_err(|e| Error::Material(format!("line {}: bad xi: {e}", lineno + 1)))?;
            let eps_v: f64 = eps_s
                .parse()
                .map_err(|e| Error::Material(format!("line {}: bad epsilon: {e}", lineno + 1)))?;

            if let Some(&last) = xi.last() {
                if xi_v <= last {
                    return Err(Error::Material(format!(
                        "line {}: xi values must be strictly increasing",
                        lineno + 1
                    )));
                }
            }
            xi.push(xi_v);
            eps.push(eps_v);
        }

        if xi.len() < 2 {
            return Err(Error::Material(
                "material file needs at least two (xi, epsilon) data points".to_owned(),
            ));
        }

        Ok(Self {
            xi,
            eps,
            omegap_low: omegap_low.ok_or_else(|| {
                Error::Material("missing required header key 'omegap_low'".to_owned())
            })?,
            gamma_low: gamma_low.ok_or_else(|| {
                Error::Material("missing required header key 'gamma_low'".to_owned())
            })?,
            omegap_high: omegap_high.ok_or_else(|| {
                Error::Material("missing required header key 'omegap_high'".to_owned())
            })?,
            gamma_high: gamma_high.ok_or_else(|| {
                Error::Material("missing required header key 'gamma_high'".to_owned())
            })?,
        })
    }

    /// Reads and parses a material file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be opened, or
    /// [`Error::Material`] if its contents are malformed.
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// `epsilon(xi)`: linear interpolation within the table, Drude
    /// extrapolation below the first and above the last sampled point.
    #[must_use]
    pub fn epsilon(&self, xi: f64) -> f64 {
        if xi <= self.xi[0] {
            return 1.0 + self.omegap_low * self.omegap_low / (xi * (xi + self.gamma_low));
        }
        if xi >= *self.xi.last().expect("at least two points") {
            return 1.0 + self.omegap_high * self.omegap_high / (xi * (xi + self.gamma_high));
        }

        // Binary search to the bracketing pair: `idx` is the largest index
        // with `self.xi[idx] <= xi`.
        let idx = match self.xi.binary_search_by(|probe| probe.partial_cmp(&xi).unwrap()) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let (x0, x1) = (self.xi[idx], self.xi[idx + 1]);
        let (e0, e1) = (self.eps[idx], self.eps[idx + 1]);
        let t = (xi - x0) / (x1 - x0);
        e0 + t * (e1 - e0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# a gold-like synthetic material
# omegap_low = 9.0
# gamma_low = 0.1
# omegap_high = 9.0
# gamma_high = 0.1
1.0 10.0
2.0 20.0
3.0 30.0
";

    #[test]
    fn parses_header_and_data() {
        let table = MaterialTable::parse(SAMPLE).unwrap();
        assert!((table.epsilon(2.0) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn interpolates_linearly_between_points() {
        let table = MaterialTable::parse(SAMPLE).unwrap();
        assert!((table.epsilon(1.5) - 15.0).abs() < 1e-12);
    }

    #[test]
    fn extrapolates_below_and_above_with_drude_tail() {
        let table = MaterialTable::parse(SAMPLE).unwrap();
        let below = table.epsilon(0.5);
        let expected = 1.0 + 9.0 * 9.0 / (0.5 * (0.5 + 0.1));
        assert!((below - expected).abs() < 1e-9);
    }

    #[test]
    fn rejects_non_monotonic_xi() {
        let bad = "# omegap_low = 1.0\n# gamma_low = 1.0\n# omegap_high = 1.0\n# gamma_high = 1.0\n2.0 1.0\n1.0 2.0\n";
        assert!(MaterialTable::parse(bad).is_err());
    }

    #[test]
    fn rejects_missing_header_key() {
        let bad = "1.0 10.0\n2.0 20.0\n";
        assert!(MaterialTable::parse(bad).is_err());
    }
}
