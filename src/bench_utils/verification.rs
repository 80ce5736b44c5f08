use crate::analysis::BeliefMap;
use crate::error::{Error, Result};
use crate::txo::{Txo, TxoStore};

/// Every inferred owner must be the real one; there is no room for guesses.
pub fn verify_beliefs(store: &TxoStore, beliefs: &BeliefMap) -> Result<()> {
    for (id, believed) in beliefs.iter() {
        match store.owner_of(*id) {
            Some(actual) if actual == *believed => {}
            Some(actual) => {
                return Err(Error::invariant(
                    *id,
                    "belief matches ground truth",
                    actual,
                    believed,
                ))
            }
            None => {
                return Err(Error::invariant(
                    *id,
                    "belief refers to a stored txo",
                    format!("id < {}", store.len()),
                    id,
                ))
            }
        }
    }
    Ok(())
}

pub fn verify_seen<'a, I>(store: &TxoStore, seen: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Txo>,
{
    for txo in seen {
        if !store.matches_canonical(txo) {
            return Err(Error::invariant(
                txo.id,
                "seen txo matches ledger",
                format!("{:?}", store.get(txo.id)),
                format!("{:?}", txo),
            ));
        }
    }
    Ok(())
}
