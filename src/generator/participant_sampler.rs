use crate::error::{Error, Result};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Weighted choice of the paying and the receiving participant. Each sender
/// has its own receiver distribution with the sender's weight removed, so
/// picking a distinct receiver never needs rejection sampling.
#[derive(Debug, Clone)]
pub struct ParticipantSampler {
    senders: WeightedIndex<f64>,
    receivers: Vec<Option<WeightedIndex<f64>>>,
}

impl ParticipantSampler {
    pub fn new(weights: &[f64]) -> Result<Self> {
        if weights.is_empty() {
            return Err(Error::InvalidConfig("no participants configured".to_string()));
        }
        if let Some(weight) = weights
            .iter()
            .find(|weight| !weight.is_finite() || **weight < 0.0)
        {
            return Err(Error::InvalidConfig(format!(
                "participant weights must be finite and non-negative, got {}",
                weight
            )));
        }
        let active = weights.iter().filter(|weight| **weight > 0.0).count();
        if active < 2 {
            return Err(Error::InvalidConfig(format!(
                "at least two participants need a positive weight, got {}",
                active
            )));
        }

        let senders = WeightedIndex::new(weights)
            .map_err(|err| Error::InvalidConfig(format!("bad participant weights: {}", err)))?;
        let receivers = (0..weights.len())
            .map(|sender| {
                let others = weights
                    .iter()
                    .enumerate()
                    .map(|(index, weight)| if index == sender { 0.0 } else { *weight });
                WeightedIndex::new(others).ok()
            })
            .collect();

        Ok(Self { senders, receivers })
    }

    pub fn sample_sender<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.senders.sample(rng)
    }

    /// `None` only if no other participant carries any weight.
    pub fn sample_receiver<R: Rng + ?Sized>(&self, rng: &mut R, sender: usize) -> Option<usize> {
        self.receivers
            .get(sender)
            .and_then(|receivers| receivers.as_ref())
            .map(|receivers| receivers.sample(rng))
    }
}
