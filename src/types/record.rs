//! Child measurement records and form input validation

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sex of the child as captured by the screening form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Boy,
    Girl,
}

impl Sex {
    /// Binary code the classifiers were trained with (boy = 0, girl = 1)
    pub fn code(self) -> u8 {
        match self {
            Sex::Boy => 0,
            Sex::Girl => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Boy => "boy",
            Sex::Girl => "girl",
        }
    }
}

impl FromStr for Sex {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boy" => Ok(Sex::Boy),
            "girl" => Ok(Sex::Girl),
            _ => Err(ValidationError::UnknownSex(s.to_string())),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Youngest age the classifiers were trained on, in years
pub const MIN_AGE_YEARS: f64 = 0.0;

/// Oldest age the classifiers were trained on, in years
pub const MAX_AGE_YEARS: f64 = 5.0;

/// Bounds applied to form input before a record is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    /// Minimum accepted age in years (inclusive)
    #[serde(default = "default_min_age")]
    pub min_age: f64,
    /// Maximum accepted age in years (inclusive)
    #[serde(default = "default_max_age")]
    pub max_age: f64,
    /// Optional upper bound on height in centimetres
    #[serde(default)]
    pub max_height_cm: Option<f64>,
    /// Optional upper bound on weight in kilograms
    #[serde(default)]
    pub max_weight_kg: Option<f64>,
}

fn default_min_age() -> f64 {
    MIN_AGE_YEARS
}

fn default_max_age() -> f64 {
    MAX_AGE_YEARS
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            min_age: default_min_age(),
            max_age: default_max_age(),
            max_height_cm: None,
            max_weight_kg: None,
        }
    }
}

impl ValidationRules {
    /// Check the rules themselves.
    ///
    /// The age range may only narrow `[MIN_AGE_YEARS, MAX_AGE_YEARS]`, and
    /// configured maxima must be positive.
    pub fn check(&self) -> Result<(), String> {
        if !(MIN_AGE_YEARS..=MAX_AGE_YEARS).contains(&self.min_age)
            || !(MIN_AGE_YEARS..=MAX_AGE_YEARS).contains(&self.max_age)
            || self.min_age > self.max_age
        {
            return Err(format!(
                "age range [{}, {}] must lie within [{}, {}]",
                self.min_age, self.max_age, MIN_AGE_YEARS, MAX_AGE_YEARS
            ));
        }

        let maxima = [
            ("max_height_cm", self.max_height_cm),
            ("max_weight_kg", self.max_weight_kg),
        ];
        for (field, max) in maxima {
            if let Some(max) = max {
                if !max.is_finite() || max <= 0.0 {
                    return Err(format!("{} must be a positive number, got {}", field, max));
                }
            }
        }

        Ok(())
    }

    fn check_age(&self, age: f64) -> Result<(), ValidationError> {
        if !age.is_finite() || age < self.min_age || age > self.max_age {
            return Err(ValidationError::AgeOutOfRange {
                value: age,
                min: self.min_age,
                max: self.max_age,
            });
        }
        Ok(())
    }

    fn check_measurement(
        field: &'static str,
        value: f64,
        max: Option<f64>,
    ) -> Result<(), ValidationError> {
        // Values past f32::MAX would reach the classifiers as infinity
        if !value.is_finite() || value < 0.0 || value > f64::from(f32::MAX) {
            return Err(ValidationError::InvalidMeasurement { field, value });
        }
        match max {
            Some(max) if value > max => {
                Err(ValidationError::MeasurementTooLarge { field, value, max })
            }
            _ => Ok(()),
        }
    }
}

/// Raw values as entered in the manual prediction form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSubmission {
    /// Age in years
    #[serde(alias = "Age")]
    pub age: f64,

    /// "boy" or "girl"
    #[serde(alias = "Sex")]
    pub sex: String,

    /// Height in centimetres
    #[serde(alias = "Height", alias = "height_cm")]
    pub height: f64,

    /// Weight in kilograms
    #[serde(alias = "Weight", alias = "weight_kg")]
    pub weight: f64,
}

impl FormSubmission {
    pub fn new(age: f64, sex: impl Into<String>, height: f64, weight: f64) -> Self {
        Self {
            age,
            sex: sex.into(),
            height,
            weight,
        }
    }

    /// Validate the raw input and build a canonical record
    pub fn into_record(self, rules: &ValidationRules) -> Result<ChildRecord, ValidationError> {
        let sex = self.sex.parse::<Sex>()?;
        ChildRecord::new(self.age, sex, self.height, self.weight, rules)
    }
}

/// A validated child measurement, ready for encoding.
///
/// Fields are private so a record can only exist once every field has
/// passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChildRecord {
    age: f64,
    sex: Sex,
    height_cm: f64,
    weight_kg: f64,
}

impl ChildRecord {
    pub fn new(
        age: f64,
        sex: Sex,
        height_cm: f64,
        weight_kg: f64,
        rules: &ValidationRules,
    ) -> Result<Self, ValidationError> {
        rules.check_age(age)?;
        ValidationRules::check_measurement("height", height_cm, rules.max_height_cm)?;
        ValidationRules::check_measurement("weight", weight_kg, rules.max_weight_kg)?;

        Ok(Self {
            age,
            sex,
            height_cm,
            weight_kg,
        })
    }

    pub fn age(&self) -> f64 {
        self.age
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    pub fn height_cm(&self) -> f64 {
        self.height_cm
    }

    pub fn weight_kg(&self) -> f64 {
        self.weight_kg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sex_codes() {
        assert_eq!(Sex::Boy.code(), 0);
        assert_eq!(Sex::Girl.code(), 1);
        assert_eq!(" Girl ".parse::<Sex>().unwrap(), Sex::Girl);
        assert_eq!("BOY".parse::<Sex>().unwrap(), Sex::Boy);
    }

    #[test]
    fn test_unknown_sex_rejected() {
        let err = "other".parse::<Sex>().unwrap_err();
        assert_eq!(err, ValidationError::UnknownSex("other".to_string()));
    }

    #[test]
    fn test_valid_submission() {
        let record = FormSubmission::new(2.5, "girl", 85.0, 11.0)
            .into_record(&ValidationRules::default())
            .unwrap();

        assert_eq!(record.age(), 2.5);
        assert_eq!(record.sex(), Sex::Girl);
        assert_eq!(record.height_cm(), 85.0);
        assert_eq!(record.weight_kg(), 11.0);
    }

    #[test]
    fn test_age_bounds_are_inclusive() {
        let rules = ValidationRules::default();
        assert!(ChildRecord::new(0.0, Sex::Boy, 50.0, 3.2, &rules).is_ok());
        assert!(ChildRecord::new(5.0, Sex::Boy, 110.0, 18.0, &rules).is_ok());
    }

    #[test]
    fn test_age_out_of_range() {
        let rules = ValidationRules::default();
        let err = ChildRecord::new(7.0, Sex::Boy, 120.0, 22.0, &rules).unwrap_err();
        assert!(matches!(err, ValidationError::AgeOutOfRange { value, .. } if value == 7.0));

        assert!(ChildRecord::new(-0.5, Sex::Boy, 50.0, 3.0, &rules).is_err());
        assert!(ChildRecord::new(f64::NAN, Sex::Boy, 50.0, 3.0, &rules).is_err());
    }

    #[test]
    fn test_negative_measurements_rejected() {
        let rules = ValidationRules::default();

        let err = ChildRecord::new(1.0, Sex::Girl, -70.0, 9.0, &rules).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidMeasurement { field: "height", .. }));

        let err = ChildRecord::new(1.0, Sex::Girl, 70.0, f64::INFINITY, &rules).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidMeasurement { field: "weight", .. }));
    }

    #[test]
    fn test_measurement_beyond_f32_range() {
        let rules = ValidationRules::default();

        let err = ChildRecord::new(2.0, Sex::Girl, 1e39, 12.0, &rules).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidMeasurement { field: "height", .. }));

        let err = ChildRecord::new(2.0, Sex::Girl, 88.0, 1e39, &rules).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidMeasurement { field: "weight", .. }));
    }

    #[test]
    fn test_rules_cannot_widen_age_range() {
        assert!(ValidationRules::default().check().is_ok());

        let narrowed = ValidationRules {
            min_age: 0.5,
            max_age: 2.0,
            ..ValidationRules::default()
        };
        assert!(narrowed.check().is_ok());

        for (min_age, max_age) in [(0.0, 18.0), (-3.0, 5.0), (4.0, 1.0), (f64::NAN, 5.0)] {
            let rules = ValidationRules {
                min_age,
                max_age,
                ..ValidationRules::default()
            };
            assert!(rules.check().is_err(), "accepted [{}, {}]", min_age, max_age);
        }

        let bad_max = ValidationRules {
            max_weight_kg: Some(-1.0),
            ..ValidationRules::default()
        };
        assert!(bad_max.check().is_err());
    }

    #[test]
    fn test_configured_maxima() {
        let rules = ValidationRules {
            max_height_cm: Some(130.0),
            max_weight_kg: Some(40.0),
            ..ValidationRules::default()
        };

        assert!(ChildRecord::new(3.0, Sex::Boy, 95.0, 14.0, &rules).is_ok());

        let err = ChildRecord::new(3.0, Sex::Boy, 180.0, 14.0, &rules).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MeasurementTooLarge { field: "height", .. }
        ));
    }

    #[test]
    fn test_submission_aliases() {
        let json = r#"{"Age": 1.5, "Sex": "boy", "height_cm": 80.0, "weight_kg": 10.5}"#;
        let submission: FormSubmission = serde_json::from_str(json).unwrap();

        assert_eq!(submission, FormSubmission::new(1.5, "boy", 80.0, 10.5));
    }

    #[test]
    fn test_submission_missing_field() {
        let json = r#"{"age": 1.5, "sex": "boy", "height": 80.0}"#;
        assert!(serde_json::from_str::<FormSubmission>(json).is_err());
    }
}
