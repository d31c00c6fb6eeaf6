// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! One worker's share of a run: partition, compute its rows, wait for
//! the others, then hand its rows to the coordinator.

use log::{debug, info};
use std::time::{Duration, Instant};

use crate::collector::{collect, Assembly, Image};
use crate::config::Config;
use crate::error::MandelError;
use crate::escape::render_rows;
use crate::group::{Communicator, ThreadGroup};
use crate::partition::Partition;
use crate::planes::PlaneMapper;

/// What one worker knows at the end of a run.
#[derive(Clone, Debug)]
pub struct Report {
    /// The worker's rank.
    pub rank: usize,
    /// The finished image; only the coordinator has one.
    pub image: Option<Image>,
    /// Time spent computing this worker's rows.
    pub compute: Duration,
    /// Time spent in the row gather.
    pub communication: Duration,
    /// Operations this worker spent.
    pub ops: u64,
    /// Every worker's operation count in rank order; coordinator only.
    pub ops_per_worker: Option<Vec<u64>>,
}

impl Report {
    /// Sum of all workers' operations, when known.
    pub fn total_ops(&self) -> Option<u64> {
        self.ops_per_worker.as_ref().map(|all| all.iter().sum())
    }
}

/// Run one worker's part of the render.  Every member of the group
/// must call this with the same configuration.
pub fn run<C: Communicator>(comm: &C, config: &Config) -> Result<Report, MandelError> {
    config.validate()?;
    if comm.size() != config.workers {
        return Err(MandelError::config(format!(
            "configured for {} workers but the group has {}",
            config.workers,
            comm.size()
        )));
    }

    let partition = Partition::new(config.width, config.height, config.workers)?;
    let plane = PlaneMapper::new(
        config.width,
        config.height,
        config.leftlower,
        config.rightupper,
    )?;
    let entry = *partition.entry(comm.rank())?;

    let assembly = if comm.is_coordinator() {
        Some(Assembly::allocate(&partition, config.max_iterations)?)
    } else {
        None
    };

    // No one computes until the coordinator holds its image buffer.
    comm.barrier()?;

    let started = Instant::now();
    let block = render_rows(&plane, &entry, config.max_iterations)?;
    let compute = started.elapsed();
    debug!("rank {} computed rows {:?} in {:?}", comm.rank(), entry.rows(), compute);

    comm.barrier()?;

    let started = Instant::now();
    let image = collect(comm, block.pixels, &partition, assembly)?;
    let communication = started.elapsed();

    let ops_per_worker = comm.gather_ops(block.ops)?;
    if image.is_some() {
        info!(
            "assembled a {}x{} image from {} workers",
            config.width, config.height, config.workers
        );
    }

    Ok(Report {
        rank: comm.rank(),
        image,
        compute,
        communication,
        ops: block.ops,
        ops_per_worker,
    })
}

/// Run a whole render on a thread group and return every worker's
/// report in rank order.
pub fn render_all(config: &Config) -> Result<Vec<Report>, MandelError> {
    config.validate()?;
    let group = ThreadGroup::new(config.workers)?;
    info!(
        "rendering {}x{} at {} iterations across {} workers",
        config.width, config.height, config.max_iterations, config.workers
    );
    group.run(|comm| run(comm, config))?.into_iter().collect()
}

/// Run a whole render on a thread group and return the coordinator's
/// report, which carries the image.
pub fn render(config: &Config) -> Result<Report, MandelError> {
    render_all(config)?
        .into_iter()
        .next()
        .ok_or_else(|| MandelError::collective("the group produced no coordinator"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_coordinator_holds_the_image() {
        let config = Config::new(8, 6, 20).with_workers(3);
        let reports = render_all(&config).unwrap();
        assert_eq!(reports.len(), 3);
        let image = reports[0].image.as_ref().unwrap();
        assert_eq!((image.width(), image.height()), (8, 6));
        assert!(reports[1..].iter().all(|r| r.image.is_none()));
        assert!(reports[1..].iter().all(|r| r.ops_per_worker.is_none()));
    }

    #[test]
    fn operation_counts_reach_the_coordinator() {
        let config = Config::new(8, 8, 20).with_workers(4);
        let reports = render_all(&config).unwrap();
        let all = reports[0].ops_per_worker.clone().unwrap();
        let own: Vec<u64> = reports.iter().map(|r| r.ops).collect();
        assert_eq!(all, own);
        assert_eq!(reports[0].total_ops(), Some(own.iter().sum()));
    }

    #[test]
    fn bad_configurations_stop_before_computing() {
        let config = Config::new(8, 0, 20).with_workers(2);
        match render(&config) {
            Err(MandelError::Configuration(_)) => {}
            other => panic!("expected a configuration error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn an_unallocatable_image_is_an_error() {
        let config = Config::new(std::usize::MAX / 8, 4, 10).with_workers(3);
        match render(&config) {
            Err(MandelError::Allocation { elements }) => {
                assert_eq!(elements, (std::usize::MAX / 8) * 4)
            }
            other => panic!("expected an allocation error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn group_size_must_match_the_configuration() {
        let config = Config::new(8, 8, 20).with_workers(3);
        let group = ThreadGroup::new(2).unwrap();
        let results = group.run(|comm| run(comm, &config)).unwrap();
        assert!(results.iter().all(|r| r.is_err()));
    }
}
