use crate::analysis::BeliefMap;
use crate::txo::{ParticipantId, Txo, TxoStore};

/// What a single participant observes first hand: the outputs it received,
/// the outputs it paid for, and the owners it learns by taking part.
pub struct ParticipantView {
    pub participant: ParticipantId,
    pub incoming: Vec<Txo>,
    pub outgoing: Vec<Txo>,
    pub known: BeliefMap,
}

impl ParticipantView {
    pub fn build(store: &TxoStore, participant: ParticipantId) -> Self {
        let mut incoming = Vec::with_capacity(100);
        let mut outgoing = Vec::with_capacity(100);
        let mut known = BeliefMap::with_capacity(100);

        for (txo, owner) in store.iter() {
            if owner == participant {
                // a receiver sees who paid it
                known.insert(txo.id, owner);
                for input in txo.from.iter() {
                    if let Some(sender) = store.owner_of(*input) {
                        known.insert(*input, sender);
                    }
                }
                incoming.push(txo.clone());
            }
            if store.sender_of(txo) == Some(participant) {
                known.insert(txo.id, owner);
                outgoing.push(txo.clone());
            }
        }

        Self {
            participant,
            incoming,
            outgoing,
            known,
        }
    }
}
