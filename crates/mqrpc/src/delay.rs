// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Delay policy: deferred delivery of remote calls.
//!
//! A [`DelaySpec`] passed as the last call argument asks the transport to
//! hold the request back. Invalid delays never fail a call; they collapse
//! to "no delay".
//!
//! On the wire a delay is `{"value": <number>, "unit": "ms"|"s"|"m"|"h"|"d"}`.
//! For configuration and CLI use it also parses from the compact form
//! `"250ms"`, `"1.5s"`, `"2m"`.

use crate::error::RpcError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Time unit of a [`DelaySpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayUnit {
    Ms,
    S,
    M,
    H,
    D,
}

impl DelayUnit {
    /// Milliseconds per unit.
    pub const fn scale(self) -> f64 {
        match self {
            Self::Ms => 1.0,
            Self::S => 1_000.0,
            Self::M => 60_000.0,
            Self::H => 3_600_000.0,
            Self::D => 86_400_000.0,
        }
    }

    /// Compact suffix (`"ms"`, `"s"`, ...).
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Ms => "ms",
            Self::S => "s",
            Self::M => "m",
            Self::H => "h",
            Self::D => "d",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "ms" => Some(Self::Ms),
            "s" => Some(Self::S),
            "m" => Some(Self::M),
            "h" => Some(Self::H),
            "d" => Some(Self::D),
            _ => None,
        }
    }
}

/// A time value plus unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelaySpec {
    #[serde(rename = "value")]
    pub magnitude: f64,
    pub unit: DelayUnit,
}

impl DelaySpec {
    pub const fn new(magnitude: f64, unit: DelayUnit) -> Self {
        Self { magnitude, unit }
    }

    pub const fn millis(magnitude: f64) -> Self {
        Self::new(magnitude, DelayUnit::Ms)
    }

    pub const fn seconds(magnitude: f64) -> Self {
        Self::new(magnitude, DelayUnit::S)
    }

    pub const fn minutes(magnitude: f64) -> Self {
        Self::new(magnitude, DelayUnit::M)
    }

    pub const fn hours(magnitude: f64) -> Self {
        Self::new(magnitude, DelayUnit::H)
    }

    pub const fn days(magnitude: f64) -> Self {
        Self::new(magnitude, DelayUnit::D)
    }

    /// Clamped delay in milliseconds, see [`to_milliseconds`].
    pub fn milliseconds(&self) -> u64 {
        to_milliseconds(self)
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.milliseconds())
    }
}

/// Convert a delay to whole milliseconds.
///
/// NaN, infinite and negative results collapse to 0. Fractional
/// milliseconds are rounded to the nearest integer.
pub fn to_milliseconds(spec: &DelaySpec) -> u64 {
    let ms = spec.magnitude * spec.unit.scale();
    if !ms.is_finite() || ms <= 0.0 {
        return 0;
    }
    // Float-to-int `as` saturates at u64::MAX.
    ms.round() as u64
}

impl fmt::Display for DelaySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit.suffix())
    }
}

impl FromStr for DelaySpec {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| c.is_ascii_alphabetic())
            .ok_or_else(|| RpcError::Config(format!("delay `{}` has no unit", s)))?;
        let (number, suffix) = s.split_at(split);
        let unit = DelayUnit::from_suffix(suffix)
            .ok_or_else(|| RpcError::Config(format!("unknown delay unit `{}`", suffix)))?;
        let magnitude = number
            .trim()
            .parse::<f64>()
            .map_err(|e| RpcError::Config(format!("invalid delay value `{}`: {}", number, e)))?;
        Ok(Self::new(magnitude, unit))
    }
}

impl From<Duration> for DelaySpec {
    fn from(d: Duration) -> Self {
        Self::millis(d.as_secs_f64() * 1_000.0)
    }
}
