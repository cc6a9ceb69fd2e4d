use serde::{Deserialize, Serialize};

use crate::compare::CompareOptions;
use crate::error::{LvrError, Result};
use crate::flakiness::{CalibrationOptions, FlakinessOptions};
use crate::grouping::{GroupBuilderConfig, ProximityConfig};
use crate::matching::{FingerprintConfig, MatcherConfig};
use crate::thresholds::ThresholdConfig;

/// Every tunable of the engine, one section per component.
///
/// Engine entry points take their own option structs; the accessors below
/// inject the shared `matcher`, `fingerprint` and `grouping` sections into
/// them so a single file configures the whole pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub compare: CompareOptions,
    pub matcher: MatcherConfig,
    pub fingerprint: FingerprintConfig,
    pub grouping: GroupBuilderConfig,
    pub proximity: ProximityConfig,
    pub flakiness: FlakinessOptions,
    pub calibration: CalibrationOptions,
    pub thresholds: ThresholdConfig,
}

impl Config {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(input).map_err(|e| LvrError::config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(input)
            .map_err(|e| LvrError::config(format!("invalid YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.compare_options().validate()?;
        self.calibration_options().validate()?;
        self.thresholds.validate()?;
        if !self.proximity.radius.is_finite() || self.proximity.radius < 0.0 {
            return Err(LvrError::config("proximity radius must be non-negative"));
        }
        if self.grouping.max_depth == 0 {
            return Err(LvrError::config("grouping maxDepth must be at least 1"));
        }
        Ok(())
    }

    pub fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            matcher: self.matcher,
            fingerprint: self.fingerprint,
            grouping: self.grouping.clone(),
            ..self.compare.clone()
        }
    }

    pub fn flakiness_options(&self) -> FlakinessOptions {
        FlakinessOptions {
            matcher: self.matcher,
            ..self.flakiness.clone()
        }
    }

    pub fn calibration_options(&self) -> CalibrationOptions {
        CalibrationOptions {
            flakiness: self.flakiness_options(),
            compare: self.compare_options(),
            ..self.calibration.clone()
        }
    }
}
