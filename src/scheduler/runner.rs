use std::collections::HashMap;

use rayon::prelude::*;
use rayon::ThreadPoolBuildError;
use thiserror::Error;

use crate::persistence::ModelScoreRow;
use crate::referenceset::ReferenceSet;
use crate::representation::Representation;

use super::packet::{ComputePacket, PacketError};
use super::plan::PacketPlan;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Packet(#[from] PacketError),

    #[error("failed to build worker thread pool: {0}")]
    ThreadPool(#[from] ThreadPoolBuildError),
}

/// Run every packet and collect all score rows that survive persistence
/// thresholds, mirroring the original implementation's
/// `multiprocessing.Pool(cores).map(run, packets)` dispatch: packets run
/// sequentially whenever there's nothing to gain from parallelism, and
/// on a bounded `rayon` thread pool otherwise.
pub fn run_packets(
    plans: Vec<PacketPlan>,
    general_refset: &ReferenceSet,
    specific_refset: &ReferenceSet,
    models: &HashMap<String, Representation>,
    fp_penalty: f64,
    min_inference: f64,
    min_enrichment: f64,
    timestamp: &str,
    cores: usize,
) -> Result<Vec<ModelScoreRow>, RunnerError> {
    let packets: Vec<ComputePacket> = plans
        .into_iter()
        .map(|plan| {
            ComputePacket::new(
                plan,
                general_refset,
                specific_refset,
                models,
                fp_penalty,
                min_inference,
                min_enrichment,
                timestamp,
            )
        })
        .collect();

    if packets.len() <= 1 || cores <= 1 {
        let mut rows = Vec::new();
        for packet in &packets {
            rows.extend(packet.run()?);
        }
        return Ok(rows);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cores)
        .build()?;

    let results: Vec<Result<Vec<ModelScoreRow>, PacketError>> =
        pool.install(|| packets.par_iter().map(ComputePacket::run).collect());

    let mut rows = Vec::new();
    for result in results {
        rows.extend(result?);
    }
    Ok(rows)
}
