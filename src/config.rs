//! Engine configuration.
//!
//! Every tunable constant of the conquest pipeline lives here. Values can be
//! changed at runtime through the protocol's `setoption` command, which maps
//! option names onto fields via [`EngineConfig::set_option`].

use std::io::Write;

/// Errors raised by `setoption`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown option '{0}'")]
    UnknownOption(String),

    #[error("option '{0}' requires a value")]
    MissingValue(String),

    #[error("invalid value '{value}' for option '{name}': {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: &'static str,
    },
}

/// Tunables for the conquest pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Half-width of the corridor drawn around a route (meters).
    pub corridor_half_width_m: f64,
    /// Start and end closer than this make the route a loop whose interior is claimed.
    pub loop_close_distance_m: f64,
    /// Douglas–Peucker tolerance applied before buffering (meters).
    pub simplify_tolerance_m: f64,
    /// Consecutive samples farther apart than this raise a teleport warning (meters).
    pub teleport_threshold_m: f64,
    /// Vertices used to approximate each half circle of a round cap or join.
    pub arc_segments: usize,
    /// Area changes below this are float noise (square meters).
    pub negligible_area_m2: f64,
    /// Snapshot/commit attempts before giving up on a contended submission.
    pub max_commit_attempts: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            corridor_half_width_m: 20.0,
            loop_close_distance_m: 75.0,
            simplify_tolerance_m: 1.5,
            teleport_threshold_m: 2000.0,
            arc_segments: 12,
            negligible_area_m2: 1.0,
            max_commit_attempts: 5,
        }
    }
}

impl EngineConfig {
    /// Sets an option by its protocol name.
    pub fn set_option(&mut self, name: &str, value: Option<&str>) -> Result<(), ConfigError> {
        let raw = value.ok_or_else(|| ConfigError::MissingValue(name.to_string()))?;
        match name {
            "CorridorWidth" => self.corridor_half_width_m = positive(name, raw)?,
            "LoopCloseDistance" => self.loop_close_distance_m = non_negative(name, raw)?,
            "SimplifyTolerance" => self.simplify_tolerance_m = non_negative(name, raw)?,
            "TeleportThreshold" => self.teleport_threshold_m = positive(name, raw)?,
            "NegligibleArea" => self.negligible_area_m2 = non_negative(name, raw)?,
            "ArcSegments" => {
                let n = count(name, raw)?;
                if n < 2 {
                    return Err(invalid(name, raw, "need at least 2 segments per half circle"));
                }
                self.arc_segments = n;
            }
            "MaxCommitAttempts" => {
                let n = count(name, raw)?;
                if n == 0 {
                    return Err(invalid(name, raw, "need at least 1 attempt"));
                }
                self.max_commit_attempts = n;
            }
            _ => return Err(ConfigError::UnknownOption(name.to_string())),
        }
        Ok(())
    }

    /// Writes one `option` line per tunable, with its current value.
    pub fn describe<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "option name CorridorWidth type float default {}", self.corridor_half_width_m)?;
        writeln!(out, "option name LoopCloseDistance type float default {}", self.loop_close_distance_m)?;
        writeln!(out, "option name SimplifyTolerance type float default {}", self.simplify_tolerance_m)?;
        writeln!(out, "option name TeleportThreshold type float default {}", self.teleport_threshold_m)?;
        writeln!(out, "option name ArcSegments type spin default {} min 2", self.arc_segments)?;
        writeln!(out, "option name NegligibleArea type float default {}", self.negligible_area_m2)?;
        writeln!(out, "option name MaxCommitAttempts type spin default {} min 1", self.max_commit_attempts)
    }
}

fn invalid(name: &str, value: &str, reason: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
        reason,
    }
}

fn float(name: &str, raw: &str) -> Result<f64, ConfigError> {
    let v: f64 = raw
        .trim()
        .parse()
        .map_err(|_| invalid(name, raw, "not a number"))?;
    if !v.is_finite() {
        return Err(invalid(name, raw, "not finite"));
    }
    Ok(v)
}

fn positive(name: &str, raw: &str) -> Result<f64, ConfigError> {
    let v = float(name, raw)?;
    if v <= 0.0 {
        return Err(invalid(name, raw, "must be positive"));
    }
    Ok(v)
}

fn non_negative(name: &str, raw: &str) -> Result<f64, ConfigError> {
    let v = float(name, raw)?;
    if v < 0.0 {
        return Err(invalid(name, raw, "must not be negative"));
    }
    Ok(v)
}

fn count(name: &str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| invalid(name, raw, "not a whole number"))
}
