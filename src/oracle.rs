use crate::error::{Error, Result};
use crate::txo::{ParticipantId, Txo, TxoId, TxoStore};
use std::iter;

/// Access to ledger entries gated by a proof of involvement.
pub trait TxoAccess {
    /// `chain` is the custody path the requester claims leads to `id`,
    /// starting at a txo it was directly involved in. `id` itself is
    /// appended before validating.
    fn get_txo(&self, id: TxoId, chain: &[TxoId]) -> Result<Txo>;
}

/// The disclosure rule for one participant over the shared ledger.
///
/// A chain element is justified when the requester owns it, paid for it, or
/// when it is an input of the previously justified element.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityOracle<'a> {
    store: &'a TxoStore,
    requester: ParticipantId,
}

impl<'a> VisibilityOracle<'a> {
    pub fn new(store: &'a TxoStore, requester: ParticipantId) -> Self {
        Self { store, requester }
    }

    fn is_justified(&self, id: TxoId, last_justified: Option<TxoId>) -> bool {
        let txo = match self.store.get(id) {
            Some(txo) => txo,
            None => return false,
        };
        if self.store.is_involved(txo, self.requester) {
            return true;
        }
        last_justified
            .and_then(|last| self.store.get(last))
            .map(|last| last.from.contains(&id))
            .unwrap_or(false)
    }
}

impl<'a> TxoAccess for VisibilityOracle<'a> {
    fn get_txo(&self, id: TxoId, chain: &[TxoId]) -> Result<Txo> {
        let mut last_justified = None;
        for element in chain.iter().cloned().chain(iter::once(id)) {
            if !self.is_justified(element, last_justified) {
                return Err(Error::AccessDenied {
                    requester: self.requester,
                    id,
                    chain: chain.iter().cloned().chain(iter::once(id)).collect(),
                    rejected: element,
                });
            }
            last_justified = Some(element);
        }
        self.store
            .get(id)
            .cloned()
            .ok_or_else(|| Error::AccessDenied {
                requester: self.requester,
                id,
                chain: chain.to_vec(),
                rejected: id,
            })
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::oracle::{TxoAccess, VisibilityOracle};
    use crate::txo::tests::small_ledger;

    #[test]
    fn direct_involvement_is_visible() {
        let store = small_ledger();
        // C received 3
        let oracle = VisibilityOracle::new(&store, 2);
        assert_eq!(oracle.get_txo(3, &[]).unwrap(), store.txos()[3]);
        // B paid for 3 and received 1
        let oracle = VisibilityOracle::new(&store, 1);
        assert_eq!(oracle.get_txo(3, &[]).unwrap().id, 3);
        assert_eq!(oracle.get_txo(1, &[]).unwrap().id, 1);
    }

    #[test]
    fn ancestors_need_a_connected_chain() {
        let store = small_ledger();
        let oracle = VisibilityOracle::new(&store, 2);
        assert_eq!(oracle.get_txo(1, &[3]).unwrap().id, 1);
        assert_eq!(oracle.get_txo(0, &[3, 1]).unwrap().id, 0);
    }

    #[test]
    fn missing_link_is_denied() {
        let store = small_ledger();
        let oracle = VisibilityOracle::new(&store, 2);
        let err = oracle.get_txo(0, &[3]).unwrap_err();
        assert_eq!(
            err,
            Error::AccessDenied {
                requester: 2,
                id: 0,
                chain: vec![3, 0],
                rejected: 0,
            }
        );
    }

    #[test]
    fn fabricated_chain_is_denied() {
        let store = small_ledger();
        let oracle = VisibilityOracle::new(&store, 2);
        // 2 is A's change, C never touched it
        assert!(oracle.get_txo(0, &[2]).unwrap_err().is_access_denied());
        assert!(oracle.get_txo(2, &[]).unwrap_err().is_access_denied());
        // siblings are not inputs of each other
        assert!(oracle.get_txo(2, &[3, 1]).unwrap_err().is_access_denied());
    }

    #[test]
    fn root_id_can_follow_in_chain() {
        let store = small_ledger();
        // A minted 0 and sees it directly, B reaches it through 1
        let oracle = VisibilityOracle::new(&store, 1);
        assert_eq!(oracle.get_txo(0, &[1]).unwrap().id, 0);
        assert!(oracle.get_txo(0, &[]).unwrap_err().is_access_denied());
    }

    #[test]
    fn unknown_id_is_denied() {
        let store = small_ledger();
        let oracle = VisibilityOracle::new(&store, 0);
        assert!(oracle.get_txo(42, &[]).unwrap_err().is_access_denied());
    }
}
