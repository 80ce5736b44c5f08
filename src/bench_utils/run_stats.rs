use crate::analysis::AnalysisOutcome;
use crate::bench_utils::participant_view::ParticipantView;
use crate::bench_utils::verification::{verify_beliefs, verify_seen};
use crate::error::Result;
use crate::txo::{participant_label, ParticipantId, TxoStore};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantStats {
    pub participant: ParticipantId,
    pub txos_seen: usize,
    pub transactions_seen: usize,
    pub transactions_involved: usize,
    /// Transactions seen without being sender or receiver.
    pub transactions_other_seen: usize,
    /// Beliefs beyond what the participant knew first hand.
    pub extra_identified: usize,
    pub extra_sender: usize,
    pub extra_receiver: usize,
    pub extra_both: usize,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl ParticipantStats {
    /// Checks the outcome against the ledger before counting anything.
    pub fn compute(
        store: &TxoStore,
        view: &ParticipantView,
        outcome: &AnalysisOutcome,
    ) -> Result<Self> {
        verify_beliefs(store, &outcome.beliefs)?;
        verify_seen(store, outcome.seen.values())?;

        let mut stats = ParticipantStats {
            participant: view.participant,
            txos_seen: outcome.seen.len(),
            extra_identified: outcome.extra_identities(&view.known),
            ..Default::default()
        };

        for txo in outcome.seen.values() {
            if !store.is_transaction(txo) {
                continue;
            }
            stats.transactions_seen += 1;
            if store.is_involved(txo, view.participant) {
                stats.transactions_involved += 1;
                continue;
            }
            stats.transactions_other_seen += 1;

            let receiver_known = outcome.beliefs.contains_key(&txo.id);
            let sender_known = txo
                .from
                .first()
                .map(|input| outcome.beliefs.contains_key(input))
                .unwrap_or(false);
            if receiver_known {
                stats.extra_receiver += 1;
            }
            if sender_known {
                stats.extra_sender += 1;
            }
            if receiver_known && sender_known {
                stats.extra_both += 1;
            }
        }

        Ok(stats)
    }

    pub fn not_involved(&self, transaction_count: usize) -> usize {
        transaction_count.saturating_sub(self.transactions_involved)
    }

    pub fn involved_fraction(&self, transaction_count: usize) -> f64 {
        ratio(self.transactions_involved, transaction_count)
    }

    /// Share of foreign transactions with both ends identified.
    pub fn both_fraction(&self, transaction_count: usize) -> f64 {
        ratio(self.extra_both, self.not_involved(transaction_count))
    }

    fn write_report(&self, f: &mut fmt::Formatter<'_>, run: &RunStats) -> fmt::Result {
        let not_involved = self.not_involved(run.transaction_count);
        let of_transactions = |value: usize| 100.0 * ratio(value, run.transaction_count);
        let of_not_involved = |value: usize| 100.0 * ratio(value, not_involved);

        writeln!(f, "Participant {}", participant_label(self.participant))?;
        writeln!(
            f,
            "txos seen: {:.2}% ({})",
            100.0 * ratio(self.txos_seen, run.txo_count),
            self.txos_seen
        )?;
        writeln!(
            f,
            "transactions seen: {:.2}% ({})",
            of_transactions(self.transactions_seen),
            self.transactions_seen
        )?;
        writeln!(
            f,
            "transactions involved in: {:.2}% ({})",
            of_transactions(self.transactions_involved),
            self.transactions_involved
        )?;
        writeln!(
            f,
            "transactions not involved in: {:.2}% ({})",
            of_transactions(not_involved),
            not_involved
        )?;
        writeln!(
            f,
            "transactions not involved in but seen: {:.2}% ({})",
            of_transactions(self.transactions_other_seen),
            self.transactions_other_seen
        )?;
        writeln!(f, "extra identities identified: {}", self.extra_identified)?;
        writeln!(
            f,
            "uninvolved transactions identified sender: {:.2}% ({})",
            of_not_involved(self.extra_sender),
            self.extra_sender
        )?;
        writeln!(
            f,
            "uninvolved transactions identified receiver: {:.2}% ({})",
            of_not_involved(self.extra_receiver),
            self.extra_receiver
        )?;
        writeln!(
            f,
            "uninvolved transactions identified both: {:.2}% ({})",
            of_not_involved(self.extra_both),
            self.extra_both
        )
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub txo_count: usize,
    /// Transactions between different participants in the whole ledger.
    pub transaction_count: usize,
    pub participants: Vec<ParticipantStats>,
}

impl RunStats {
    pub fn participant(&self, participant: ParticipantId) -> Option<&ParticipantStats> {
        self.participants
            .iter()
            .find(|stats| stats.participant == participant)
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of txos: {}", self.txo_count)?;
        writeln!(f, "Number of transactions: {}", self.transaction_count)?;
        for stats in self.participants.iter() {
            writeln!(f)?;
            stats.write_report(f, self)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::analysis::tests::learning_ledger;
    use crate::analysis::{analyze, AnalysisOutcome};
    use crate::bench_utils::participant_view::ParticipantView;
    use crate::bench_utils::run_stats::{ParticipantStats, RunStats};
    use crate::oracle::VisibilityOracle;

    #[test]
    fn stats_for_payer() {
        let store = learning_ledger();
        let view = ParticipantView::build(&store, 0);
        let outcome = analyze(
            &view.incoming,
            &view.outgoing,
            &view.known,
            &VisibilityOracle::new(&store, 0),
        )
        .unwrap();
        let stats = ParticipantStats::compute(&store, &view, &outcome).unwrap();

        // transactions: 2 (A->B), 4 (B->C), 5 (C->A)
        assert_eq!(store.transaction_count(), 3);
        assert_eq!(
            stats,
            ParticipantStats {
                participant: 0,
                txos_seen: 6,
                transactions_seen: 3,
                transactions_involved: 2,
                transactions_other_seen: 1,
                extra_identified: 1,
                extra_sender: 1,
                extra_receiver: 1,
                extra_both: 1,
            }
        );
        assert_eq!(stats.not_involved(3), 1);
        assert!((stats.both_fraction(3) - 1.0).abs() < f64::EPSILON);
        assert!((stats.involved_fraction(3) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn wrong_outcome_is_rejected() {
        let store = learning_ledger();
        let view = ParticipantView::build(&store, 0);
        let mut beliefs = view.known.clone();
        beliefs.insert(1, 2);
        let outcome = AnalysisOutcome {
            seen: Default::default(),
            unresolved: Default::default(),
            beliefs,
        };
        assert!(ParticipantStats::compute(&store, &view, &outcome)
            .unwrap_err()
            .is_invariant_violation());
    }

    #[test]
    fn report_lists_every_participant() {
        let run = RunStats {
            txo_count: 10,
            transaction_count: 4,
            participants: vec![
                ParticipantStats {
                    participant: 0,
                    transactions_involved: 2,
                    extra_both: 1,
                    ..Default::default()
                },
                ParticipantStats {
                    participant: 1,
                    ..Default::default()
                },
            ],
        };
        let report = run.to_string();
        assert!(report.starts_with("Number of txos: 10\nNumber of transactions: 4\n"));
        assert!(report.contains("Participant A"));
        assert!(report.contains("Participant B"));
        assert!(report.contains("uninvolved transactions identified both: 50.00% (1)"));
        assert_eq!(run.participant(1).map(|p| p.participant), Some(1));
        assert!(run.participant(7).is_none());
    }

    #[test]
    fn empty_run_has_no_nan() {
        let stats = ParticipantStats::default();
        assert_eq!(stats.both_fraction(0), 0.0);
        assert_eq!(stats.involved_fraction(0), 0.0);
    }
}
