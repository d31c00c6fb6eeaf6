#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Row-partitioned Mandelbrot renderer
//!
//! The Mandelbrot set is the set of points `c` on the complex plane
//! for which the sequence `z -> z^2 + c`, starting at zero, never
//! goes to infinity.  We approximate it by iterating each pixel's
//! point until it escapes or an iteration cap runs out, and record
//! how many steps that took.
//!
//! The rows of the image are split across a fixed group of workers.
//! Each worker computes the same partition table on its own, renders
//! its rows into a local buffer, and hands that buffer to a single
//! coordinator, which drops every block into place in one full-size
//! image.  Because the table is identical everywhere, the gather
//! needs nothing but the sender's rank to know where a block goes.

extern crate crossbeam;
extern crate failure;
extern crate itertools;
extern crate log;
extern crate num;
extern crate num_cpus;

pub mod collector;
pub mod config;
pub mod error;
pub mod escape;
pub mod group;
pub mod partition;
pub mod planes;
pub mod render;

pub use collector::{assemble, collect, Assembly, Image};
pub use config::Config;
pub use error::MandelError;
pub use escape::{evaluate, render_rows, RowBlock};
pub use group::{Communicator, ThreadComm, ThreadGroup, COORDINATOR};
pub use partition::{partition, Entry, Partition};
pub use planes::{Pixel, PlaneMapper};
pub use render::{render, render_all, run, Report};
