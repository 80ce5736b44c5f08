use crate::error::{Error, Result};
use crate::oracle::TxoAccess;
use crate::txo::{ParticipantId, Txo, TxoId};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

/// Txo id -> participant believed to own it.
pub type BeliefMap = HashMap<TxoId, ParticipantId>;

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// Backward closure of everything the participant touched.
    pub seen: BTreeMap<TxoId, Txo>,
    /// Part of `seen` whose inputs could not be attributed.
    pub unresolved: BTreeMap<TxoId, Txo>,
    pub beliefs: BeliefMap,
}

impl AnalysisOutcome {
    pub fn extra_identities(&self, known: &BeliefMap) -> usize {
        self.beliefs
            .keys()
            .filter(|id| !known.contains_key(id))
            .count()
    }
}

/// Reconstructs what one participant can see through `access` and attributes
/// as many owners as deterministic propagation allows.
pub fn analyze<A: TxoAccess + ?Sized>(
    incoming: &[Txo],
    outgoing: &[Txo],
    known: &BeliefMap,
    access: &A,
) -> Result<AnalysisOutcome> {
    let seen = collect_reachable(incoming.iter().chain(outgoing).map(|txo| txo.id), access)?;

    let mut unresolved = seen.clone();
    let mut beliefs = known.clone();
    let resolved = propagate(&mut unresolved, &mut beliefs)?;

    tracing::debug!(
        "seen {} txos, resolved {}, beliefs grew from {} to {}",
        seen.len(),
        resolved,
        known.len(),
        beliefs.len()
    );

    Ok(AnalysisOutcome {
        seen,
        unresolved,
        beliefs,
    })
}

/// Walks the `from` relation backwards from the seeds. Every request carries
/// the custody chain it was reached through; a denial aborts the walk.
pub fn collect_reachable<A, I>(seeds: I, access: &A) -> Result<BTreeMap<TxoId, Txo>>
where
    A: TxoAccess + ?Sized,
    I: IntoIterator<Item = TxoId>,
{
    let mut reachable = BTreeMap::<TxoId, Txo>::new();
    // (txo, index of the trail entry it was reached from)
    let mut to_visit: Vec<(TxoId, Option<usize>)> =
        seeds.into_iter().map(|id| (id, None)).collect();
    to_visit.reverse();
    // visited txos linked to their parent, chains are rebuilt from here
    let mut trail: Vec<(TxoId, Option<usize>)> = vec![];
    let mut chain: Vec<TxoId> = vec![];

    while let Some((id, parent)) = to_visit.pop() {
        if reachable.contains_key(&id) {
            continue;
        }
        chain.clear();
        let mut link = parent;
        while let Some(index) = link {
            let (ancestor, next) = trail[index];
            chain.push(ancestor);
            link = next;
        }
        chain.reverse();

        let txo = access.get_txo(id, &chain)?;
        if txo.id != id {
            return Err(Error::invariant(id, "requested txo returned", id, txo.id));
        }

        trail.push((id, parent));
        let position = trail.len() - 1;
        for input in txo.from.iter().rev() {
            if !reachable.contains_key(input) {
                to_visit.push((*input, Some(position)));
            }
        }
        reachable.insert(id, txo);
    }

    Ok(reachable)
}

/// Inputs consumed together always share one owner, so knowing any of them
/// reveals all of them. Repeats full passes until nothing new resolves and
/// returns how many txos were resolved.
pub fn propagate(unresolved: &mut BTreeMap<TxoId, Txo>, beliefs: &mut BeliefMap) -> Result<usize> {
    let mut total = 0;
    loop {
        let mut resolved_in_pass = 0;
        let ids: Vec<TxoId> = unresolved.keys().cloned().collect();
        for id in ids {
            let owner = match unresolved.get(&id).and_then(|txo| {
                txo.from
                    .iter()
                    .find_map(|input| beliefs.get(input).cloned())
            }) {
                Some(owner) => owner,
                None => continue,
            };
            if let Some(txo) = unresolved.remove(&id) {
                for input in txo.from.iter() {
                    assign(beliefs, *input, owner)?;
                }
                resolved_in_pass += 1;
            }
        }
        total += resolved_in_pass;
        if resolved_in_pass == 0 {
            break;
        }
    }
    Ok(total)
}

fn assign(beliefs: &mut BeliefMap, id: TxoId, owner: ParticipantId) -> Result<()> {
    match beliefs.entry(id) {
        Entry::Occupied(entry) if *entry.get() != owner => Err(Error::invariant(
            id,
            "consistent ownership belief",
            entry.get(),
            owner,
        )),
        Entry::Occupied(_) => Ok(()),
        Entry::Vacant(entry) => {
            entry.insert(owner);
            Ok(())
        }
    }
}
