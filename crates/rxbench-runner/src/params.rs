use crate::error::BenchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub const ALL: [Toggle; 2] = [Toggle::On, Toggle::Off];

    pub fn as_str(&self) -> &'static str {
        match self {
            Toggle::On => "on",
            Toggle::Off => "off",
        }
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Toggle {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(Toggle::On),
            "off" => Ok(Toggle::Off),
            other => Err(BenchError::InvalidValue {
                field: "toggle",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Simd {
    None,
    Sse,
    Avx,
    Avx2,
}

impl Simd {
    pub const ALL: [Simd; 4] = [Simd::None, Simd::Sse, Simd::Avx, Simd::Avx2];

    pub fn as_str(&self) -> &'static str {
        match self {
            Simd::None => "none",
            Simd::Sse => "sse",
            Simd::Avx => "avx",
            Simd::Avx2 => "avx2",
        }
    }
}

impl fmt::Display for Simd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Simd {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Simd::None),
            "sse" => Ok(Simd::Sse),
            "avx" => Ok(Simd::Avx),
            "avx2" => Ok(Simd::Avx2),
            other => Err(BenchError::InvalidValue {
                field: "simd",
                value: other.to_string(),
            }),
        }
    }
}

/// Which (tip_inner, site_repeats) pairs are worth running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExclusionRule {
    /// Skip pairs where both toggles take the same value.
    #[default]
    Distinct,
    /// Skip only the pair where both toggles are on.
    NotBothOn,
}

impl ExclusionRule {
    pub fn excludes(&self, tip_inner: Toggle, site_repeats: Toggle) -> bool {
        match self {
            ExclusionRule::Distinct => tip_inner == site_repeats,
            ExclusionRule::NotBothOn => tip_inner == Toggle::On && site_repeats == Toggle::On,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterCombination {
    pub tip_inner: Toggle,
    pub site_repeats: Toggle,
    pub simd: Simd,
}

impl ParameterCombination {
    /// Directory name of the cell running this combination. The log parser
    /// decodes the same `key.value` tokens back out of it.
    pub fn cell_name(&self) -> String {
        format!(
            "tipinner.{}_siterepeats.{}_simd.{}",
            self.tip_inner, self.site_repeats, self.simd
        )
    }
}

pub fn enumerate(rule: ExclusionRule, simd_list: &[Simd]) -> Vec<ParameterCombination> {
    let mut out = Vec::new();
    for tip_inner in Toggle::ALL {
        for site_repeats in Toggle::ALL {
            if rule.excludes(tip_inner, site_repeats) {
                continue;
            }
            for &simd in simd_list {
                out.push(ParameterCombination {
                    tip_inner,
                    site_repeats,
                    simd,
                });
            }
        }
    }
    out
}
