//! Constants handed to the strategy by the simulation engine, plus the
//! tuning knobs of the reciprocity estimator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) type Result<T> = std::result::Result<T, ConfigError>;

/// Fraction of the minimum upload bandwidth used as the default floor for
/// `required_upload`.
const UPLOAD_FLOOR_FRACTION: f64 = 1e-3;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("min upload bandwidth {min} is greater than max upload bandwidth {max}")]
    InvertedBandwidthRange { min: u32, max: u32 },
    #[error("max requests per peer must be positive")]
    NoRequestSlots,
    #[error("blocks per piece must be positive")]
    EmptyPiece,
    #[error("{name} must be within {range}, got {value}")]
    OutOfRange {
        name: &'static str,
        range: &'static str,
        value: f64,
    },
    #[error("reciprocation window must cover at least one round")]
    EmptyWindow,
}

/// Swarm-wide constants. Read-only for the strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub min_upload_bandwidth: u32,
    pub max_upload_bandwidth: u32,
    pub blocks_per_piece: u32,
    pub max_requests_per_peer: usize,
    /// Upload capacity of the agent running the strategy, in bandwidth units per round.
    pub upload_capacity: u32,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.min_upload_bandwidth > self.max_upload_bandwidth {
            return Err(ConfigError::InvertedBandwidthRange {
                min: self.min_upload_bandwidth,
                max: self.max_upload_bandwidth,
            });
        }
        if self.max_requests_per_peer == 0 {
            return Err(ConfigError::NoRequestSlots);
        }
        if self.blocks_per_piece == 0 {
            return Err(ConfigError::EmptyPiece);
        }
        Ok(())
    }

    /// Highest `required_upload` the choke penalty may push an estimate to.
    pub fn upload_ceiling(&self) -> f64 {
        self.upload_capacity as f64 / 3.0
    }

    pub fn default_upload_floor(&self) -> f64 {
        self.min_upload_bandwidth.max(1) as f64 * UPLOAD_FLOOR_FRACTION
    }
}

/// Tuning of the reciprocity feedback loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TyrantParams {
    /// Growth factor applied to peers that choked us last round.
    pub alpha: f64,
    /// Shrink factor applied to peers that kept unchoking us.
    pub gamma: f64,
    /// Number of rounds a peer must reciprocate before we probe a cheaper offer.
    pub window: usize,
    /// Lower bound for `required_upload`. `None` derives it from the config.
    pub upload_floor: Option<f64>,
}

impl Default for TyrantParams {
    fn default() -> Self {
        Self {
            alpha: 0.20,
            gamma: 0.10,
            window: 3,
            upload_floor: None,
        }
    }
}

impl TyrantParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "alpha",
                range: "[0, inf)",
                value: self.alpha,
            });
        }
        if !(0.0..1.0).contains(&self.gamma) {
            return Err(ConfigError::OutOfRange {
                name: "gamma",
                range: "[0, 1)",
                value: self.gamma,
            });
        }
        if self.window == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        if let Some(floor) = self.upload_floor {
            if !(floor.is_finite() && floor > 0.0) {
                return Err(ConfigError::OutOfRange {
                    name: "upload_floor",
                    range: "(0, inf)",
                    value: floor,
                });
            }
        }
        Ok(())
    }

    pub fn upload_floor(&self, config: &Config) -> f64 {
        self.upload_floor
            .unwrap_or_else(|| config.default_upload_floor())
    }
}

#[cfg(test)]
pub(crate) fn test_config(upload_capacity: u32) -> Config {
    Config {
        min_upload_bandwidth: 16,
        max_upload_bandwidth: 64,
        blocks_per_piece: 4,
        max_requests_per_peer: 3,
        upload_capacity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_sane_config() {
        assert_eq!(test_config(40).validate(), Ok(()));
        assert_eq!(TyrantParams::default().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_inverted_bandwidth() {
        let mut config = test_config(40);
        config.min_upload_bandwidth = 70;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedBandwidthRange { min: 70, max: 64 })
        );
    }

    #[test]
    fn test_validate_rejects_zero_request_slots() {
        let mut config = test_config(40);
        config.max_requests_per_peer = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoRequestSlots));
    }

    #[test]
    fn test_validate_rejects_empty_piece() {
        let mut config = test_config(40);
        config.blocks_per_piece = 0;
        assert_eq!(config.validate(), Err(ConfigError::EmptyPiece));
    }

    #[test]
    fn test_params_reject_bad_values() {
        let params = TyrantParams {
            gamma: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::OutOfRange { name: "gamma", .. })
        ));

        let params = TyrantParams {
            window: 0,
            ..Default::default()
        };
        assert_eq!(params.validate(), Err(ConfigError::EmptyWindow));

        let params = TyrantParams {
            upload_floor: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::OutOfRange {
                name: "upload_floor",
                ..
            })
        ));
    }

    #[test]
    fn test_params_missing_fields_use_defaults() {
        let params: TyrantParams = serde_json::from_str(r#"{ "alpha": 0.5 }"#).unwrap();
        assert_eq!(params.alpha, 0.5);
        assert_eq!(params.gamma, 0.10);
        assert_eq!(params.window, 3);
        assert_eq!(params.upload_floor, None);
    }

    #[test]
    fn test_config_from_json() {
        let config: Config = serde_json::from_str(
            r#"{
                "min_upload_bandwidth": 16,
                "max_upload_bandwidth": 64,
                "blocks_per_piece": 4,
                "max_requests_per_peer": 3,
                "upload_capacity": 40
            }"#,
        )
        .unwrap();
        assert_eq!(config, test_config(40));
    }

    #[test]
    fn test_upload_floor() {
        let config = test_config(40);
        assert!((TyrantParams::default().upload_floor(&config) - 0.016).abs() < 1e-12);
        let params = TyrantParams {
            upload_floor: Some(0.5),
            ..Default::default()
        };
        assert_eq!(params.upload_floor(&config), 0.5);
        assert!((config.upload_ceiling() - 40.0 / 3.0).abs() < 1e-12);
    }
}
