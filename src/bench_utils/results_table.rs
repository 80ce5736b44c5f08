use crate::bench_utils::run_stats::RunStats;
use crate::txo::{participant_label, ParticipantId};
use itertools::Itertools;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

/// Tab separated summary of a parameter sweep: one row per run, two columns
/// (involved share and fully identified share) per reported participant.
#[derive(Default)]
pub struct ResultsTable {
    participants: Vec<ParticipantId>,
    rows: Vec<(u32, u64, RunStats)>,
}

impl ResultsTable {
    pub fn new(participants: Vec<ParticipantId>) -> Self {
        Self {
            participants,
            rows: vec![],
        }
    }

    pub fn add_run(&mut self, max_depth: u32, seed: u64, stats: RunStats) {
        self.rows.push((max_depth, seed, stats));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn header(&self) -> String {
        ["id".to_string(), "snip".to_string(), "seed".to_string()]
            .into_iter()
            .chain(self.participants.iter().flat_map(|participant| {
                let label = participant_label(*participant);
                [format!("{}-size", label), format!("{}-both", label)]
            }))
            .join("\t")
    }

    fn row(&self, id: usize, max_depth: u32, seed: u64, stats: &RunStats) -> String {
        [id.to_string(), max_depth.to_string(), seed.to_string()]
            .into_iter()
            .chain(self.participants.iter().flat_map(|participant| {
                match stats.participant(*participant) {
                    Some(p) => [
                        p.involved_fraction(stats.transaction_count).to_string(),
                        p.both_fraction(stats.transaction_count).to_string(),
                    ],
                    None => ["-".to_string(), "-".to_string()],
                }
            }))
            .join("\t")
    }

    pub fn write_to<W: Write>(&self, output: &mut W) -> anyhow::Result<()> {
        output.write_all(format!("{}\n", self.header()).as_bytes())?;
        for (id, (max_depth, seed, stats)) in self.rows.iter().enumerate() {
            output.write_all(format!("{}\n", self.row(id, *max_depth, *seed, stats)).as_bytes())?;
        }
        Ok(())
    }

    pub fn dump(&self, path: PathBuf) -> anyhow::Result<()> {
        let mut file = File::create(path)?;
        self.write_to(&mut file)
    }
}
