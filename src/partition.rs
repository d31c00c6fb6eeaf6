// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Static row decomposition of the image.
//!
//! Every worker builds the same table from the same `(width, height,
//! workers)` triple, so the offsets the collector needs are agreed on
//! without any exchange.  Rows are handed out in rank order; the
//! `height % workers` leftover rows go one each to the lowest ranks,
//! so no two workers differ by more than one row.

use crate::config::pixel_count;
use crate::error::MandelError;

/// One worker's share of the image.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// First row this worker computes.
    pub start_row: usize,
    /// Number of consecutive rows, possibly zero.
    pub row_count: usize,
    /// Where this worker's block starts in the flat image buffer.
    pub element_offset: usize,
    /// Length of this worker's block in the flat image buffer.
    pub element_count: usize,
}

impl Entry {
    /// The rows this entry covers.
    pub fn rows(&self) -> std::ops::Range<usize> {
        self.start_row..self.start_row + self.row_count
    }

    /// The span of the flat image buffer this entry fills.
    pub fn elements(&self) -> std::ops::Range<usize> {
        self.element_offset..self.element_offset + self.element_count
    }
}

/// The complete, ordered, non-overlapping cover of an image's rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    width: usize,
    height: usize,
    total: usize,
    entries: Vec<Entry>,
}

impl Partition {
    /// Split `height` rows of `width` pixels across `workers` workers.
    pub fn new(width: usize, height: usize, workers: usize) -> Result<Partition, MandelError> {
        if width == 0 || height == 0 {
            return Err(MandelError::config("cannot partition an empty image"));
        }
        if workers == 0 {
            return Err(MandelError::config("cannot partition across zero workers"));
        }
        let total = pixel_count(width, height)?;

        let base = height / workers;
        let extra = height % workers;
        let mut start_row = 0;
        let entries = (0..workers)
            .map(|rank| {
                let row_count = if rank < extra { base + 1 } else { base };
                let entry = Entry {
                    start_row,
                    row_count,
                    element_offset: start_row * width,
                    element_count: row_count * width,
                };
                start_row += row_count;
                entry
            })
            .collect();

        Ok(Partition {
            width,
            height,
            total,
            entries,
        })
    }

    /// Columns per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Rows in the whole image.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of workers the table was built for.
    pub fn workers(&self) -> usize {
        self.entries.len()
    }

    /// Size of the flat image buffer.
    pub fn total_elements(&self) -> usize {
        self.total
    }

    /// All entries in rank order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The entry belonging to `rank`.
    pub fn entry(&self, rank: usize) -> Result<&Entry, MandelError> {
        self.entries.get(rank).ok_or_else(|| {
            MandelError::config(format!(
                "rank {} is outside a partition of {} workers",
                rank,
                self.entries.len()
            ))
        })
    }
}

/// The row table for `height` rows across `workers` workers, ignoring
/// the pixel offsets.
pub fn partition(height: usize, workers: usize) -> Result<Vec<Entry>, MandelError> {
    Partition::new(1, height, workers).map(|p| p.entries)
}
