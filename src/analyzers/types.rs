//! Result types for the growth analysis.

use serde::Serialize;

/// Fitted exponential growth model for one county.
///
/// `growth_rate` is the slope of `ln(cases)` per day; the equivalent daily
/// growth factor is `exp(growth_rate)`. `r_squared` is the weighted
/// coefficient of determination of the fit, used as a quality diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionResult {
    pub growth_rate: f64,
    pub r_squared: f64,
}

impl RegressionResult {
    /// Daily multiplication factor implied by the fitted rate.
    pub fn growth_factor(&self) -> f64 {
        self.growth_rate.exp()
    }
}

/// One output row: a county's attributes plus its fitted growth model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountyGrowth {
    pub county_state: String,
    pub fips: String,
    pub population_density: f64,
    pub temperature: f64,
    pub growth_rate: f64,
    pub r_squared: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_factor() {
        let fit = RegressionResult {
            growth_rate: std::f64::consts::LN_2,
            r_squared: 1.0,
        };
        assert!((fit.growth_factor() - 2.0).abs() < 1e-12);
    }
}
