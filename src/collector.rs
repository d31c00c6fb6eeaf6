// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reassembles the workers' row blocks into one image at the
//! coordinator.
//!
//! Every worker already holds the same partition table, so a block
//! needs no metadata beyond its sender's rank: the table says where
//! it goes and how long it must be.  Blocks may arrive in any order;
//! the finished image depends only on which rank sent what.

use log::{debug, warn};

use crate::error::MandelError;
use crate::escape::{is_interior, remap};
use crate::group::Communicator;
use crate::partition::Partition;

/// A complete Mandelbrot raster of raw iteration counts, row-major.
/// Only ever produced at the coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    max_iterations: u32,
    raw: Vec<u32>,
}

impl Image {
    /// Columns per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Rows in the image.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The iteration cap the counts were computed with.
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// The raw counts, where the cap itself means "did not escape".
    pub fn raw(&self) -> &[u32] {
        &self.raw
    }

    /// The raw count at a pixel.
    pub fn raw_at(&self, row: usize, col: usize) -> Option<u32> {
        if row >= self.height || col >= self.width {
            return None;
        }
        Some(self.raw[row * self.width + col])
    }

    /// The displayed value at a pixel: its escape count, or 0 if the
    /// point did not escape.
    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        self.raw_at(row, col).map(|k| remap(k, self.max_iterations))
    }

    /// True when the pixel's point never escaped.
    pub fn is_interior(&self, row: usize, col: usize) -> Option<bool> {
        self.raw_at(row, col).map(|k| is_interior(k, self.max_iterations))
    }

    /// Every displayed value, row-major, with interior points as 0.
    pub fn escape_counts(&self) -> Vec<u32> {
        self.raw
            .iter()
            .map(|&k| remap(k, self.max_iterations))
            .collect()
    }

    /// The raw counts one row at a time.
    pub fn rows(&self) -> std::slice::Chunks<u32> {
        self.raw.chunks(self.width)
    }
}

/// The coordinator's full-size buffer while blocks are being placed.
#[derive(Debug)]
pub struct Assembly {
    partition: Partition,
    max_iterations: u32,
    buffer: Vec<u32>,
    placed: Vec<bool>,
}

impl Assembly {
    /// Reserve room for the whole image.  Failure here is fatal and
    /// must happen before any worker starts computing.
    pub fn allocate(partition: &Partition, max_iterations: u32) -> Result<Assembly, MandelError> {
        let elements = partition.total_elements();
        let mut buffer: Vec<u32> = Vec::new();
        buffer
            .try_reserve_exact(elements)
            .map_err(|_| MandelError::Allocation { elements })?;
        buffer.resize(elements, 0);
        debug!("allocated an image of {} elements", elements);
        Ok(Assembly {
            partition: partition.clone(),
            max_iterations,
            buffer,
            placed: vec![false; partition.workers()],
        })
    }

    /// Copy `rank`'s block into place.  The block must be exactly as
    /// long as the partition says and each rank may be placed once.
    pub fn place(&mut self, rank: usize, block: &[u32]) -> Result<(), MandelError> {
        let entry = *self.partition.entry(rank).map_err(|_| {
            MandelError::collective(format!("block from unknown rank {}", rank))
        })?;
        if self.placed[rank] {
            return Err(MandelError::collective(format!(
                "rank {} delivered its block twice",
                rank
            )));
        }
        if block.len() != entry.element_count {
            return Err(MandelError::collective(format!(
                "rank {} delivered {} elements, expected {}",
                rank,
                block.len(),
                entry.element_count
            )));
        }
        if entry.row_count == 0 {
            warn!("rank {} had no rows to contribute", rank);
        }
        self.buffer[entry.elements()].copy_from_slice(block);
        self.placed[rank] = true;
        Ok(())
    }

    /// The finished image, once every rank has been placed.
    pub fn finish(self) -> Result<Image, MandelError> {
        if let Some(rank) = self.placed.iter().position(|&p| !p) {
            return Err(MandelError::collective(format!(
                "rank {} never delivered its block",
                rank
            )));
        }
        Ok(Image {
            width: self.partition.width(),
            height: self.partition.height(),
            max_iterations: self.max_iterations,
            raw: self.buffer,
        })
    }
}

/// Place a set of labelled blocks, in whatever order they come, into a
/// fresh image.
pub fn assemble<I>(partition: &Partition, max_iterations: u32, blocks: I) -> Result<Image, MandelError>
where
    I: IntoIterator<Item = (usize, Vec<u32>)>,
{
    let mut assembly = Assembly::allocate(partition, max_iterations)?;
    for (rank, block) in blocks {
        assembly.place(rank, &block)?;
    }
    assembly.finish()
}

/// The gather.  Every worker calls this exactly once with its own
/// block.  The coordinator, which must bring the `Assembly` it
/// allocated before computing, gets the image back; everyone else
/// gets `None`.
pub fn collect<C: Communicator>(
    comm: &C,
    block: Vec<u32>,
    partition: &Partition,
    assembly: Option<Assembly>,
) -> Result<Option<Image>, MandelError> {
    let entry = partition.entry(comm.rank())?;
    if block.len() != entry.element_count {
        return Err(MandelError::collective(format!(
            "rank {} computed {} elements, expected {}",
            comm.rank(),
            block.len(),
            entry.element_count
        )));
    }
    if comm.is_coordinator() && assembly.is_none() {
        return Err(MandelError::collective("the coordinator has no image buffer"));
    }

    match (comm.gather_rows(block)?, assembly) {
        (Some(blocks), Some(mut assembly)) => {
            for (rank, payload) in blocks {
                assembly.place(rank, &payload)?;
            }
            assembly.finish().map(Some)
        }
        (Some(_), None) => Err(MandelError::collective(
            "received blocks without an image buffer",
        )),
        (None, _) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks_for(partition: &Partition) -> Vec<(usize, Vec<u32>)> {
        partition
            .entries()
            .iter()
            .enumerate()
            .map(|(rank, e)| (rank, e.elements().map(|i| i as u32).collect()))
            .collect()
    }

    #[test]
    fn blocks_land_at_their_offsets() {
        let p = Partition::new(3, 5, 2).unwrap();
        let image = assemble(&p, 100, blocks_for(&p)).unwrap();
        assert_eq!(image.raw(), &(0..15).collect::<Vec<u32>>()[..]);
        assert_eq!(image.raw_at(4, 2), Some(14));
        assert_eq!(image.raw_at(5, 0), None);
    }

    #[test]
    fn reversed_arrival_gives_the_same_image() {
        let p = Partition::new(4, 9, 4).unwrap();
        let forward = assemble(&p, 100, blocks_for(&p)).unwrap();
        let backward = assemble(&p, 100, blocks_for(&p).into_iter().rev()).unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn wrong_lengths_are_rejected() {
        let p = Partition::new(2, 2, 2).unwrap();
        let mut assembly = Assembly::allocate(&p, 10).unwrap();
        assert!(assembly.place(0, &[1, 2, 3]).is_err());
        assert!(assembly.place(0, &[1, 2]).is_ok());
    }

    #[test]
    fn duplicates_and_unknown_ranks_are_rejected() {
        let p = Partition::new(2, 2, 2).unwrap();
        let mut assembly = Assembly::allocate(&p, 10).unwrap();
        assembly.place(1, &[1, 2]).unwrap();
        match assembly.place(1, &[1, 2]) {
            Err(MandelError::Collective(_)) => {}
            other => panic!("expected a collective error, got {:?}", other),
        }
        assert!(assembly.place(2, &[]).is_err());
    }

    #[test]
    fn missing_blocks_leave_no_image() {
        let p = Partition::new(2, 4, 2).unwrap();
        let mut assembly = Assembly::allocate(&p, 10).unwrap();
        assembly.place(0, &[1, 2, 3, 4]).unwrap();
        assert!(assembly.finish().is_err());
    }

    #[test]
    fn empty_blocks_from_idle_workers_are_accepted() {
        let p = Partition::new(2, 2, 4).unwrap();
        let blocks = vec![(3, vec![]), (0, vec![7, 8]), (2, vec![]), (1, vec![9, 10])];
        let image = assemble(&p, 10, blocks).unwrap();
        assert_eq!(image.raw(), &[7, 8, 9, 10]);
    }

    #[test]
    fn interior_counts_display_as_zero() {
        let p = Partition::new(2, 1, 1).unwrap();
        let image = assemble(&p, 50, vec![(0, vec![50, 3])]).unwrap();
        assert_eq!(image.escape_counts(), vec![0, 3]);
        assert_eq!(image.get(0, 0), Some(0));
        assert_eq!(image.is_interior(0, 0), Some(true));
        assert_eq!(image.raw_at(0, 0), Some(50));
    }

    #[test]
    fn impossible_allocations_fail_cleanly() {
        let p = Partition::new(std::usize::MAX / 8, 4, 1).unwrap();
        match Assembly::allocate(&p, 10) {
            Err(MandelError::Allocation { .. }) => {}
            other => panic!("expected an allocation error, got {:?}", other.map(|_| ())),
        }
    }
}
