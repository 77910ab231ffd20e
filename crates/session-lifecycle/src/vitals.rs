//! Vitals Payload Validation

use serde::{Deserialize, Serialize};
use storage::Vitals;
use thiserror::Error;

/// Errors during vitals validation
#[derive(Debug, Clone, Error)]
pub enum VitalsError {
    /// Value out of the clinically plausible range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A record with no measurements at all is not worth appending
    #[error("Vitals payload contains no measurements")]
    Empty,
}

/// Clinically plausible ranges for each vitals field.
///
/// These bound data-entry mistakes, not clinical normality; an abnormal but
/// real reading must pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalsConfig {
    /// Patient weight range (kg)
    pub weight_range: (f64, f64),
    /// Systolic blood pressure range (mmHg)
    pub systolic_range: (f64, f64),
    /// Diastolic blood pressure range (mmHg)
    pub diastolic_range: (f64, f64),
    /// Heart rate range (bpm)
    pub heart_rate_range: (f64, f64),
    /// Body temperature range (°C)
    pub temperature_range: (f64, f64),
    /// Arterial line pressure range (mmHg, negative pre-pump)
    pub arterial_range: (f64, f64),
    /// Venous line pressure range (mmHg)
    pub venous_range: (f64, f64),
    /// Transmembrane pressure range (mmHg)
    pub tmp_range: (f64, f64),
    /// Blood flow rate range (mL/min)
    pub blood_flow_range: (f64, f64),
    /// Dialysate flow rate range (mL/min)
    pub dialysate_flow_range: (f64, f64),
    /// Cumulative ultrafiltration range (mL)
    pub ultrafiltration_range: (f64, f64),
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self {
            weight_range: (20.0, 300.0),
            systolic_range: (50.0, 260.0),
            diastolic_range: (20.0, 160.0),
            heart_rate_range: (20.0, 250.0),
            temperature_range: (30.0, 43.0),
            arterial_range: (-400.0, 400.0),
            venous_range: (-100.0, 500.0),
            tmp_range: (-100.0, 600.0),
            blood_flow_range: (0.0, 600.0),
            dialysate_flow_range: (0.0, 1200.0),
            ultrafiltration_range: (0.0, 10_000.0),
        }
    }
}

/// Validator for vitals payloads appended to an in-progress session
pub struct VitalsValidator {
    config: VitalsConfig,
}

impl VitalsValidator {
    pub fn new(config: VitalsConfig) -> Self {
        Self { config }
    }

    fn check(
        field: &'static str,
        value: Option<f64>,
        range: (f64, f64),
    ) -> Result<(), VitalsError> {
        match value {
            Some(v) if v < range.0 || v > range.1 => Err(VitalsError::OutOfRange {
                field,
                value: v,
                min: range.0,
                max: range.1,
            }),
            _ => Ok(()),
        }
    }

    /// Validate a vitals payload. Each present numeric field must fall in
    /// its plausible range; a payload with nothing in it is rejected.
    pub fn validate(&self, vitals: &Vitals) -> Result<(), VitalsError> {
        let numeric = [
            vitals.weight_kg,
            vitals.systolic_bp,
            vitals.diastolic_bp,
            vitals.heart_rate,
            vitals.temperature_c,
            vitals.arterial_pressure,
            vitals.venous_pressure,
            vitals.transmembrane_pressure,
            vitals.blood_flow_rate,
            vitals.dialysate_flow_rate,
            vitals.ultrafiltration_ml,
        ];
        if numeric.iter().all(Option::is_none) && vitals.clinical_state.is_none() {
            return Err(VitalsError::Empty);
        }

        let c = &self.config;
        Self::check("weight_kg", vitals.weight_kg, c.weight_range)?;
        Self::check("systolic_bp", vitals.systolic_bp, c.systolic_range)?;
        Self::check("diastolic_bp", vitals.diastolic_bp, c.diastolic_range)?;
        Self::check("heart_rate", vitals.heart_rate, c.heart_rate_range)?;
        Self::check("temperature_c", vitals.temperature_c, c.temperature_range)?;
        Self::check("arterial_pressure", vitals.arterial_pressure, c.arterial_range)?;
        Self::check("venous_pressure", vitals.venous_pressure, c.venous_range)?;
        Self::check(
            "transmembrane_pressure",
            vitals.transmembrane_pressure,
            c.tmp_range,
        )?;
        Self::check("blood_flow_rate", vitals.blood_flow_rate, c.blood_flow_range)?;
        Self::check(
            "dialysate_flow_rate",
            vitals.dialysate_flow_rate,
            c.dialysate_flow_range,
        )?;
        Self::check(
            "ultrafiltration_ml",
            vitals.ultrafiltration_ml,
            c.ultrafiltration_range,
        )?;
        Ok(())
    }
}

impl Default for VitalsValidator {
    fn default() -> Self {
        Self::new(VitalsConfig::default())
    }
}
