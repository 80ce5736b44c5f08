use crate::error::{Error, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::io::Write;

pub type TxoId = usize;
pub type ParticipantId = u32;

/// A single transaction output. `from` lists the consumed inputs; an empty
/// list marks freshly minted money.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Txo {
    pub id: TxoId,
    #[serde(rename = "val")]
    pub value: u64,
    pub depth: u32,
    pub from: Vec<TxoId>,
}

impl Txo {
    pub fn is_root(&self) -> bool {
        self.from.is_empty()
    }
}

/// A ledger line in exchange form: the txo flattened next to its owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub owner: ParticipantId,
    #[serde(flatten)]
    pub txo: Txo,
}

pub fn participant_label(participant: ParticipantId) -> String {
    if participant < 26 {
        char::from(b'A' + participant as u8).to_string()
    } else {
        format!("P{}", participant)
    }
}

/// Append-only ledger of every txo together with the owner assigned at
/// creation. Ids are dense and equal to the position in the ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxoStore {
    txos: Vec<Txo>,
    owners: Vec<ParticipantId>,
    capacity: usize,
}

impl TxoStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            txos: Vec::with_capacity(capacity),
            owners: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Rebuilds a store from raw parts, rejecting graphs the generator could
    /// never have produced.
    pub fn from_parts(txos: Vec<Txo>, owners: Vec<ParticipantId>) -> Result<Self> {
        let capacity = txos.len();
        let store = Self {
            txos,
            owners,
            capacity,
        };
        store.validate()?;
        Ok(store)
    }

    pub fn from_records(records: Vec<LedgerRecord>) -> Result<Self> {
        let (owners, txos): (Vec<_>, Vec<_>) = records
            .into_iter()
            .map(|record| (record.owner, record.txo))
            .unzip();
        Self::from_parts(txos, owners)
    }

    pub fn validate(&self) -> Result<()> {
        if self.owners.len() != self.txos.len() {
            return Err(Error::invariant(
                self.txos.len(),
                "owner table length",
                self.txos.len(),
                self.owners.len(),
            ));
        }
        for (index, txo) in self.txos.iter().enumerate() {
            if txo.id != index {
                return Err(Error::invariant(index, "dense txo ids", index, txo.id));
            }
            if txo.value == 0 {
                return Err(Error::invariant(txo.id, "positive value", "> 0", 0));
            }
            if let Some(input) = txo.from.iter().find(|input| **input >= txo.id) {
                return Err(Error::invariant(
                    txo.id,
                    "inputs precede output",
                    format!("< {}", txo.id),
                    input,
                ));
            }
            if let Some(first) = txo.from.first() {
                let sender = self.owners[*first];
                if let Some(input) = txo.from.iter().find(|input| self.owners[**input] != sender) {
                    return Err(Error::invariant(
                        txo.id,
                        "single owner per input set",
                        sender,
                        format!("{} (input {})", self.owners[*input], input),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Registers a new txo, returning `None` once the target count is reached.
    pub(crate) fn push(
        &mut self,
        owner: ParticipantId,
        value: u64,
        depth: u32,
        from: Vec<TxoId>,
    ) -> Option<TxoId> {
        if self.is_full() {
            return None;
        }
        let id = self.txos.len();
        tracing::trace!(
            "id: {:3} ow: {} val: {} depth: {} from: {:?}",
            id,
            participant_label(owner),
            value,
            depth,
            from
        );
        self.owners.push(owner);
        self.txos.push(Txo {
            id,
            value,
            depth,
            from,
        });
        Some(id)
    }

    pub fn is_full(&self) -> bool {
        self.txos.len() >= self.capacity
    }

    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.txos.len())
    }

    pub fn len(&self) -> usize {
        self.txos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: TxoId) -> Option<&Txo> {
        self.txos.get(id)
    }

    pub fn owner_of(&self, id: TxoId) -> Option<ParticipantId> {
        self.owners.get(id).cloned()
    }

    pub fn txos(&self) -> &[Txo] {
        &self.txos
    }

    pub fn owners(&self) -> &[ParticipantId] {
        &self.owners
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Txo, ParticipantId)> {
        self.txos.iter().zip(self.owners.iter().cloned())
    }

    /// Owner of the first consumed input, i.e. the participant who paid.
    pub fn sender_of(&self, txo: &Txo) -> Option<ParticipantId> {
        txo.from.first().and_then(|input| self.owner_of(*input))
    }

    /// Money moving between two different participants. Minting and change
    /// returned to the payer are not transactions.
    pub fn is_transaction(&self, txo: &Txo) -> bool {
        match (self.sender_of(txo), self.owner_of(txo.id)) {
            (Some(sender), Some(receiver)) => sender != receiver,
            _ => false,
        }
    }

    /// The participant either received this output or paid for it.
    pub fn is_involved(&self, txo: &Txo, participant: ParticipantId) -> bool {
        self.owner_of(txo.id) == Some(participant) || self.sender_of(txo) == Some(participant)
    }

    pub fn matches_canonical(&self, txo: &Txo) -> bool {
        self.get(txo.id)
            .map(|stored| {
                stored.id == txo.id && stored.value == txo.value && stored.from == txo.from
            })
            .unwrap_or(false)
    }

    pub fn transaction_count(&self) -> usize {
        self.txos
            .iter()
            .filter(|txo| self.is_transaction(txo))
            .count()
    }

    pub fn records(&self) -> Vec<LedgerRecord> {
        self.iter()
            .map(|(txo, owner)| LedgerRecord {
                owner,
                txo: txo.clone(),
            })
            .collect()
    }

    pub fn print_ledger<W: Write>(&self, output: &mut W) -> anyhow::Result<()> {
        for (txo, owner) in self.iter() {
            output.write_all(
                format!(
                    "id: {:3}\tow: {}\tval: {}\tfrom: [{}]\n",
                    txo.id,
                    participant_label(owner),
                    txo.value,
                    txo.from.iter().join(" ")
                )
                .as_bytes(),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::error::Error;
    use crate::txo::{participant_label, LedgerRecord, Txo, TxoStore};

    pub(crate) fn txo(id: usize, value: u64, from: Vec<usize>) -> Txo {
        Txo {
            id,
            value,
            depth: 0,
            from,
        }
    }

    /// A mints 0, pays B with 1 and keeps change 2; B pays C with 3 out of 1.
    pub(crate) fn small_ledger() -> TxoStore {
        TxoStore::from_parts(
            vec![
                txo(0, 300, vec![]),
                txo(1, 100, vec![0]),
                txo(2, 200, vec![0]),
                txo(3, 100, vec![1]),
            ],
            vec![0, 1, 0, 2],
        )
        .unwrap()
    }

    #[test]
    fn classify_transactions() {
        let store = small_ledger();
        let txos = store.txos();
        assert!(!store.is_transaction(&txos[0]));
        assert!(store.is_transaction(&txos[1]));
        assert!(!store.is_transaction(&txos[2]));
        assert!(store.is_transaction(&txos[3]));
        assert_eq!(store.transaction_count(), 2);

        assert!(store.is_involved(&txos[3], 1));
        assert!(store.is_involved(&txos[3], 2));
        assert!(!store.is_involved(&txos[3], 0));
        assert_eq!(store.sender_of(&txos[3]), Some(1));
        assert_eq!(store.sender_of(&txos[0]), None);
    }

    #[test]
    fn rejects_forward_reference() {
        let result = TxoStore::from_parts(
            vec![txo(0, 10, vec![]), txo(1, 10, vec![1])],
            vec![0, 0],
        );
        assert!(matches!(
            result,
            Err(Error::InvariantViolation {
                id: 1,
                check: "inputs precede output",
                ..
            })
        ));
    }

    #[test]
    fn rejects_mixed_owner_inputs() {
        let result = TxoStore::from_parts(
            vec![
                txo(0, 10, vec![]),
                txo(1, 10, vec![]),
                txo(2, 20, vec![0, 1]),
            ],
            vec![0, 1, 2],
        );
        assert!(matches!(
            result,
            Err(Error::InvariantViolation {
                id: 2,
                check: "single owner per input set",
                ..
            })
        ));
    }

    #[test]
    fn rejects_short_owner_table() {
        let result = TxoStore::from_parts(vec![txo(0, 10, vec![])], vec![]);
        assert!(result.unwrap_err().is_invariant_violation());
    }

    #[test]
    fn push_stops_at_capacity() {
        let mut store = TxoStore::with_capacity(2);
        assert_eq!(store.push(0, 5, 0, vec![]), Some(0));
        assert_eq!(store.push(1, 5, 1, vec![0]), Some(1));
        assert!(store.is_full());
        assert!(store.push(1, 5, 0, vec![]).is_none());
        assert_eq!(store.len(), 2);
        assert_eq!(store.remaining(), 0);
    }

    #[test]
    fn canonical_match() {
        let store = small_ledger();
        let mut copy = store.txos()[3].clone();
        assert!(store.matches_canonical(&copy));
        copy.value += 1;
        assert!(!store.matches_canonical(&copy));
        assert!(!store.matches_canonical(&txo(9, 1, vec![])));
    }

    #[test]
    fn ledger_listing() {
        let store = small_ledger();
        let mut out = Vec::new();
        store.print_ledger(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert!(text.contains("ow: C\tval: 100\tfrom: [1]"));
        assert_eq!(participant_label(1), "B");
        assert_eq!(participant_label(30), "P30");
    }

    #[test]
    fn ledger_records_as_json() {
        let store = small_ledger();
        let json = serde_json::to_string(&store.records()).unwrap();
        assert!(json.starts_with(r#"[{"owner":0,"id":0,"val":300,"depth":0,"from":[]}"#));

        let records: Vec<LedgerRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(records[3].owner, 2);
        assert_eq!(records[3].txo, txo(3, 100, vec![1]));
        assert_eq!(TxoStore::from_records(records).unwrap(), store);
    }

    #[test]
    fn ledger_records_are_validated() {
        let json = r#"[{"owner":0,"id":0,"val":10,"depth":0,"from":[]},
                       {"owner":1,"id":1,"val":10,"depth":1,"from":[1]}]"#;
        let records: Vec<LedgerRecord> = serde_json::from_str(json).unwrap();
        assert!(TxoStore::from_records(records)
            .unwrap_err()
            .is_invariant_violation());
    }
}
