use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer};

use super::playlist::VariantStream;
use crate::error::{VodlError, VodlResult};

/// How to pick one variant out of a master playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitrateCriterion {
    /// The variant with exactly this bandwidth
    Exact(u64),
    Min,
    #[default]
    Max,
    /// The middle of the distinct bandwidths, rounding towards the lower one
    Average,
}

impl FromStr for BitrateCriterion {
    type Err = VodlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "average" | "avg" | "medium" => Ok(Self::Average),
            _ => s
                .parse()
                .map(Self::Exact)
                .map_err(|_| VodlError::InvalidCriterion(s.to_string())),
        }
    }
}

impl fmt::Display for BitrateCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(bandwidth) => write!(f, "{bandwidth}"),
            Self::Min => f.write_str("min"),
            Self::Max => f.write_str("max"),
            Self::Average => f.write_str("average"),
        }
    }
}

impl<'de> Deserialize<'de> for BitrateCriterion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(bandwidth) => Ok(Self::Exact(bandwidth)),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Pick a variant by bandwidth.
///
/// When several variants share the chosen bandwidth, the first one in playlist order wins.
pub fn select_variant(
    variants: &[VariantStream],
    criterion: BitrateCriterion,
) -> VodlResult<&VariantStream> {
    let bandwidth = match criterion {
        BitrateCriterion::Exact(bandwidth) => bandwidth,
        BitrateCriterion::Min => variants
            .iter()
            .map(|v| v.bandwidth)
            .min()
            .ok_or(VodlError::NoVariants)?,
        BitrateCriterion::Max => variants
            .iter()
            .map(|v| v.bandwidth)
            .max()
            .ok_or(VodlError::NoVariants)?,
        BitrateCriterion::Average => {
            let mut bandwidths: Vec<u64> = variants.iter().map(|v| v.bandwidth).collect();
            bandwidths.sort_unstable();
            bandwidths.dedup();
            if bandwidths.is_empty() {
                return Err(VodlError::NoVariants);
            }
            // 1-based ceil(n/2) for odd n and n/2 for even n
            bandwidths[(bandwidths.len() - 1) / 2]
        }
    };

    variants
        .iter()
        .find(|v| v.bandwidth == bandwidth)
        .ok_or(VodlError::NoSuchBitrate(bandwidth))
}
