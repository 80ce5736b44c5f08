use crate::error::{Error, Result};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::Deserialize;

/// Largest transfer size a model may produce. Keeps pool sums and minted
/// amounts well inside `u64`.
pub const MAX_TRANSFER_SIZE: u64 = u32::MAX as u64;

/// Produces the amount requested by the next transfer.
pub trait SizeModel {
    fn next_size<R: Rng + ?Sized>(&self, rng: &mut R) -> u64;
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UniformSizeConfig {
    pub low: u64,
    pub high: u64,
}

impl Default for UniformSizeConfig {
    // 1000 units are one currency unit
    fn default() -> Self {
        Self {
            low: 100,
            high: 10000,
        }
    }
}

/// Uniform amounts in `[low, high)`.
#[derive(Debug, Clone)]
pub struct UniformSizeModel {
    distribution: Uniform<u64>,
}

impl UniformSizeModel {
    pub fn new(low: u64, high: u64) -> Result<Self> {
        if low == 0 {
            return Err(Error::InvalidConfig(
                "transfer sizes must be positive".to_string(),
            ));
        }
        if high <= low {
            return Err(Error::InvalidConfig(format!(
                "empty transfer size range [{}, {})",
                low, high
            )));
        }
        if high > MAX_TRANSFER_SIZE + 1 {
            return Err(Error::InvalidConfig(format!(
                "transfer size bound {} exceeds {}",
                high,
                MAX_TRANSFER_SIZE + 1
            )));
        }
        Ok(Self {
            distribution: Uniform::new(low, high),
        })
    }
}

impl TryFrom<UniformSizeConfig> for UniformSizeModel {
    type Error = Error;

    fn try_from(config: UniformSizeConfig) -> Result<Self> {
        Self::new(config.low, config.high)
    }
}

impl SizeModel for UniformSizeModel {
    fn next_size<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        self.distribution.sample(rng)
    }
}
