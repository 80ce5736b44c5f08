pub mod liquidity_pool;
pub mod participant_sampler;

use crate::error::{Error, Result};
use crate::generator::liquidity_pool::{LiquidityPool, PoolEntry};
use crate::generator::participant_sampler::ParticipantSampler;
use crate::size_model::SizeModel;
use crate::txo::{participant_label, ParticipantId, TxoId, TxoStore};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// A participant that cannot cover a transfer mints this multiple of the
/// requested amount.
pub const MINT_FACTOR: u64 = 3;

pub struct GeneratedLedger {
    pub store: TxoStore,
    pub pools: Vec<LiquidityPool>,
}

/// Builds a random txo graph of exactly `target_count` outputs by moving
/// money between participants. All mutable simulation state lives here.
pub struct Generator<S: SizeModel> {
    rng: StdRng,
    store: TxoStore,
    pools: Vec<LiquidityPool>,
    sampler: ParticipantSampler,
    max_depth: u32,
    size_model: S,
    log_steps: bool,
}

impl<S: SizeModel> Generator<S> {
    pub fn new(
        weights: &[f64],
        target_count: usize,
        seed: u64,
        max_depth: u32,
        size_model: S,
    ) -> Result<Self> {
        if target_count == 0 {
            return Err(Error::InvalidConfig(
                "target txo count must be positive".to_string(),
            ));
        }
        let sampler = ParticipantSampler::new(weights)?;
        let pools = (0..weights.len())
            .map(|participant| LiquidityPool::new(participant as ParticipantId))
            .collect();

        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            store: TxoStore::with_capacity(target_count),
            pools,
            sampler,
            max_depth,
            size_model,
            log_steps: false,
        })
    }

    /// Logs every pool balance after each transfer at debug level.
    pub fn with_step_logging(mut self, log_steps: bool) -> Self {
        self.log_steps = log_steps;
        self
    }

    pub fn generate(mut self) -> GeneratedLedger {
        while !self.store.is_full() {
            let sender = self.sampler.sample_sender(&mut self.rng);
            let receiver = match self.sampler.sample_receiver(&mut self.rng, sender) {
                Some(receiver) => receiver,
                None => {
                    tracing::warn!(
                        "participant {} has nobody to pay, stopping generation early",
                        participant_label(sender as ParticipantId)
                    );
                    break;
                }
            };
            self.transfer(sender, receiver);
            if self.log_steps {
                self.log_balances();
            }
        }

        tracing::info!(
            "Generated {:?} txos ({:?} transactions) for {:?} participants",
            self.store.len(),
            self.store.transaction_count(),
            self.pools.len()
        );

        GeneratedLedger {
            store: self.store,
            pools: self.pools,
        }
    }

    fn transfer(&mut self, sender: usize, receiver: usize) {
        let amount = self.size_model.next_size(&mut self.rng);

        let mut selection = self.pools[sender].plan_selection(amount);
        if !selection.covered {
            let value = amount.saturating_mul(MINT_FACTOR);
            let id = match self.store.push(sender as ParticipantId, value, 0, vec![]) {
                Some(id) => id,
                None => return,
            };
            self.pools[sender].deposit_largest(PoolEntry {
                id,
                value,
                depth: 0,
            });
            selection = self.pools[sender].plan_selection(amount);
        }

        let from: Vec<TxoId> = self.pools[sender]
            .take_prefix(selection.count)
            .into_iter()
            .map(|entry| entry.id)
            .collect();
        let depth = selection.max_depth + 1;

        let change = selection.sum - amount;
        if change > 0 {
            self.emit(receiver, amount, depth, from.clone());
            self.emit(sender, change, depth, from);
        } else {
            self.emit(receiver, amount, depth, from);
        }
    }

    fn emit(&mut self, participant: usize, value: u64, depth: u32, from: Vec<TxoId>) {
        let id = match self
            .store
            .push(participant as ParticipantId, value, depth, from)
        {
            Some(id) => id,
            None => return,
        };
        let index = self.pools[participant].insert_sorted(PoolEntry { id, value, depth });
        self.maybe_snip(participant, index);
    }

    /// Replaces a too deep pool entry with fresh money of the same value, so
    /// the old output stays in the ledger but is never spent again.
    fn maybe_snip(&mut self, participant: usize, index: usize) {
        let entry = match self.pools[participant].get(index) {
            Some(entry) if entry.depth >= self.max_depth => *entry,
            _ => return,
        };
        let id = match self
            .store
            .push(participant as ParticipantId, entry.value, 0, vec![])
        {
            Some(id) => id,
            None => return,
        };
        tracing::trace!("snipped txo {} into {}", entry.id, id);
        let replaced = self.pools[participant].replace(
            index,
            PoolEntry {
                id,
                value: entry.value,
                depth: 0,
            },
        );
        debug_assert_eq!(replaced.map(|old| old.id), Some(entry.id));
    }

    fn log_balances(&self) {
        let mut total = 0;
        for pool in self.pools.iter() {
            let balance = pool.balance();
            total += balance;
            tracing::debug!(
                "\t{}: {} {}",
                participant_label(pool.participant()),
                balance,
                pool.len()
            );
        }
        tracing::debug!("\t{}", total);
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::generator::{GeneratedLedger, Generator};
    use crate::size_model::UniformSizeModel;
    use std::collections::HashSet;

    const WEIGHTS: [f64; 6] = [1.7, 1.3, 1.0, 1.0, 0.4, 0.1];

    fn generate(weights: &[f64], target: usize, seed: u64, max_depth: u32) -> GeneratedLedger {
        Generator::new(
            weights,
            target,
            seed,
            max_depth,
            UniformSizeModel::new(100, 10000).unwrap(),
        )
        .unwrap()
        .generate()
    }

    #[test]
    fn exact_target_count() {
        for seed in 0..5 {
            let ledger = generate(&WEIGHTS, 997, seed, 4);
            assert_eq!(ledger.store.len(), 997);
        }
    }

    #[test]
    fn ledger_is_well_formed() {
        for max_depth in [1, 2, 5, 50] {
            let ledger = generate(&WEIGHTS, 3000, 42, max_depth);
            // dense ids, inputs before outputs, one owner per input set
            ledger.store.validate().unwrap();
            for txo in ledger.store.txos() {
                assert!(txo.depth <= max_depth, "{:?}", txo);
                if txo.is_root() {
                    assert_eq!(txo.depth, 0);
                } else {
                    let expected = txo
                        .from
                        .iter()
                        .map(|input| ledger.store.get(*input).unwrap().depth)
                        .max()
                        .unwrap()
                        + 1;
                    assert_eq!(txo.depth, expected, "{:?}", txo);
                }
            }
        }
    }

    #[test]
    fn pools_hold_unspent_snipped_outputs() {
        let max_depth = 3;
        let ledger = generate(&WEIGHTS, 5000, 9, max_depth);
        let spent: HashSet<usize> = ledger
            .store
            .txos()
            .iter()
            .flat_map(|txo| txo.from.iter().cloned())
            .collect();

        let mut too_deep = 0;
        for pool in ledger.pools.iter() {
            let values: Vec<u64> = pool.entries().iter().map(|e| e.value).collect();
            assert!(values.windows(2).all(|w| w[0] <= w[1]));
            for entry in pool.entries() {
                let txo = ledger.store.get(entry.id).unwrap();
                assert_eq!(ledger.store.owner_of(entry.id), Some(pool.participant()));
                assert_eq!(txo.value, entry.value);
                assert_eq!(txo.depth, entry.depth);
                assert!(!spent.contains(&entry.id));
                if entry.depth >= max_depth {
                    too_deep += 1;
                }
                if entry.depth == 0 {
                    assert!(txo.is_root());
                }
            }
        }
        // only the very last output can miss its snip for lack of budget
        assert!(too_deep <= 1, "{}", too_deep);
    }

    #[test]
    fn snipped_outputs_are_dead_ends() {
        let ledger = generate(&WEIGHTS, 2000, 5, 2);
        let spent: HashSet<usize> = ledger
            .store
            .txos()
            .iter()
            .flat_map(|txo| txo.from.iter().cloned())
            .collect();
        let deep: Vec<usize> = ledger
            .store
            .txos()
            .iter()
            .filter(|txo| txo.depth >= 2)
            .map(|txo| txo.id)
            .collect();
        assert!(!deep.is_empty());
        for id in deep {
            assert!(!spent.contains(&id), "{}", id);
        }
    }

    #[test]
    fn every_root_is_held_or_spent() {
        let ledger = generate(&WEIGHTS, 3000, 21, 2);
        let spent: HashSet<usize> = ledger
            .store
            .txos()
            .iter()
            .flat_map(|txo| txo.from.iter().cloned())
            .collect();
        let held: HashSet<usize> = ledger
            .pools
            .iter()
            .flat_map(|pool| pool.entries().iter().map(|entry| entry.id))
            .collect();
        for txo in ledger.store.txos().iter().filter(|txo| txo.is_root()) {
            assert!(
                spent.contains(&txo.id) || held.contains(&txo.id),
                "root {} is lost",
                txo.id
            );
        }
    }

    #[test]
    fn value_is_conserved_per_pool() {
        let ledger = generate(&WEIGHTS, 4000, 17, 6);
        for pool in ledger.pools.iter() {
            assert_eq!(pool.deposited(), pool.withdrawn() + pool.balance());
        }
    }

    #[test]
    fn deterministic_for_seed() {
        let first = generate(&WEIGHTS, 500, 123, 3);
        let second = generate(&WEIGHTS, 500, 123, 3);
        let other = generate(&WEIGHTS, 500, 124, 3);
        assert_eq!(first.store, second.store);
        assert_ne!(first.store, other.store);
    }

    #[test]
    fn weightless_participant_is_left_out() {
        let ledger = generate(&[1.0, 0.0, 1.0], 1000, 1, 3);
        assert_eq!(ledger.store.len(), 1000);
        assert!(ledger.store.owners().iter().all(|owner| *owner != 1));
        assert!(ledger.pools[1].is_empty());
    }

    #[test]
    fn single_active_participant_is_rejected() {
        let result = Generator::new(
            &[1.0, 0.0],
            6,
            0,
            2,
            UniformSizeModel::new(100, 10000).unwrap(),
        );
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn zero_target_is_rejected() {
        let result = Generator::new(
            &[1.0, 1.0],
            0,
            0,
            2,
            UniformSizeModel::new(100, 10000).unwrap(),
        );
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn first_transfer_mints() {
        let ledger = generate(&[1.0, 1.0], 3, 0, 10);
        let txos = ledger.store.txos();
        assert!(txos[0].is_root());
        assert_eq!(txos[1].from, vec![0]);
        assert_eq!(txos[2].from, vec![0]);
        assert_eq!(txos[1].value * 3, txos[0].value);
        assert_eq!(txos[1].value + txos[2].value, txos[0].value);
        assert_ne!(ledger.store.owner_of(1), ledger.store.owner_of(0));
        assert_eq!(ledger.store.owner_of(2), ledger.store.owner_of(0));
    }
}
