// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The process group: a fixed set of workers that know their count
//! and their own rank, and can meet at a barrier or gather payloads
//! at the coordinator.
//!
//! `Communicator` is the seam the renderer talks to.  `ThreadGroup`
//! is the in-process implementation: one scoped thread per rank, the
//! gathers carried over crossbeam channels.

use crossbeam::channel::{unbounded, Receiver, Sender};
use log::debug;
use std::sync::{Arc, Condvar, Mutex};

use crate::error::MandelError;

/// The rank that owns the final image.
pub const COORDINATOR: usize = 0;

/// A labelled row payload: the sender's rank and its block.
pub type Labelled = (usize, Vec<u32>);

/// What a worker may ask of its group.  Every member must make the
/// same sequence of collective calls.
pub trait Communicator {
    /// Number of workers in the group.
    fn size(&self) -> usize;

    /// This worker's rank, in `0..size()`.
    fn rank(&self) -> usize;

    /// True for the worker that receives the gathers.
    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR
    }

    /// Block until every member has arrived.
    fn barrier(&self) -> Result<(), MandelError>;

    /// Contribute a variable-length payload.  The coordinator receives
    /// every member's payload, its own first and the rest in arrival
    /// order; everyone else gets `None`.
    fn gather_rows(&self, payload: Vec<u32>) -> Result<Option<Vec<Labelled>>, MandelError>;

    /// Contribute one operation count.  The coordinator receives all
    /// of them in rank order; everyone else gets `None`.
    fn gather_ops(&self, ops: u64) -> Result<Option<Vec<u64>>, MandelError>;
}

struct BarrierState {
    arrived: usize,
    generation: usize,
    abandoned: bool,
}

// A reusable generation barrier that fails, instead of hanging, once
// any member has left the group.
struct Barrier {
    size: usize,
    state: Mutex<BarrierState>,
    cvar: Condvar,
}

impl Barrier {
    fn new(size: usize) -> Self {
        Barrier {
            size,
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
                abandoned: false,
            }),
            cvar: Condvar::new(),
        }
    }

    fn wait(&self) -> Result<(), MandelError> {
        let mut state = self.state.lock().map_err(poisoned)?;
        if state.abandoned {
            return Err(abandoned());
        }
        state.arrived += 1;
        if state.arrived == self.size {
            state.arrived = 0;
            state.generation += 1;
            self.cvar.notify_all();
            return Ok(());
        }
        let generation = state.generation;
        while state.generation == generation && !state.abandoned {
            state = self.cvar.wait(state).map_err(poisoned)?;
        }
        if state.generation == generation {
            Err(abandoned())
        } else {
            Ok(())
        }
    }

    fn abandon(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.abandoned = true;
            self.cvar.notify_all();
        }
    }
}

fn poisoned<T>(_: T) -> MandelError {
    MandelError::collective("barrier state poisoned")
}

fn abandoned() -> MandelError {
    MandelError::collective("a worker left the group before reaching the barrier")
}

enum Link {
    Coordinator {
        rows: Receiver<Labelled>,
        ops: Receiver<(usize, u64)>,
    },
    Peer {
        rows: Sender<Labelled>,
        ops: Sender<(usize, u64)>,
    },
}

/// One member's handle on a `ThreadGroup`.  Dropping it counts as
/// leaving the group.
pub struct ThreadComm {
    rank: usize,
    size: usize,
    barrier: Arc<Barrier>,
    link: Link,
}

impl Communicator for ThreadComm {
    fn size(&self) -> usize {
        self.size
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn barrier(&self) -> Result<(), MandelError> {
        self.barrier.wait()
    }

    fn gather_rows(&self, payload: Vec<u32>) -> Result<Option<Vec<Labelled>>, MandelError> {
        match &self.link {
            Link::Peer { rows, .. } => {
                debug!("rank {} sending {} elements", self.rank, payload.len());
                rows.send((self.rank, payload))
                    .map_err(|_| MandelError::collective("the coordinator left the group"))?;
                Ok(None)
            }
            Link::Coordinator { rows, .. } => {
                let mut received = Vec::with_capacity(self.size);
                received.push((self.rank, payload));
                for _ in 1..self.size {
                    let block = rows.recv().map_err(|_| {
                        MandelError::collective("a worker left before contributing its rows")
                    })?;
                    debug!("coordinator received {} elements from rank {}", block.1.len(), block.0);
                    received.push(block);
                }
                Ok(Some(received))
            }
        }
    }

    fn gather_ops(&self, ops: u64) -> Result<Option<Vec<u64>>, MandelError> {
        match &self.link {
            Link::Peer { ops: tx, .. } => {
                tx.send((self.rank, ops))
                    .map_err(|_| MandelError::collective("the coordinator left the group"))?;
                Ok(None)
            }
            Link::Coordinator { ops: rx, .. } => {
                let mut all = vec![0; self.size];
                all[self.rank] = ops;
                for _ in 1..self.size {
                    let (rank, count) = rx.recv().map_err(|_| {
                        MandelError::collective("a worker left before reporting its operations")
                    })?;
                    match all.get_mut(rank) {
                        Some(slot) => *slot = count,
                        None => {
                            return Err(MandelError::collective(format!(
                                "operation count from unknown rank {}",
                                rank
                            )))
                        }
                    }
                }
                Ok(Some(all))
            }
        }
    }
}

impl Drop for ThreadComm {
    fn drop(&mut self) {
        self.barrier.abandon();
    }
}

/// A fixed-size group of workers, each run on its own scoped thread.
#[derive(Copy, Clone, Debug)]
pub struct ThreadGroup {
    size: usize,
}

impl ThreadGroup {
    /// A group of `size` workers.  Fails if `size` is zero.
    pub fn new(size: usize) -> Result<Self, MandelError> {
        if size == 0 {
            return Err(MandelError::config("a worker group needs at least one worker"));
        }
        Ok(ThreadGroup { size })
    }

    fn communicators(&self) -> Vec<ThreadComm> {
        let barrier = Arc::new(Barrier::new(self.size));
        let (rows_tx, rows_rx) = unbounded();
        let (ops_tx, ops_rx) = unbounded();

        let mut comms = Vec::with_capacity(self.size);
        comms.push(ThreadComm {
            rank: COORDINATOR,
            size: self.size,
            barrier: barrier.clone(),
            link: Link::Coordinator {
                rows: rows_rx,
                ops: ops_rx,
            },
        });
        for rank in 1..self.size {
            comms.push(ThreadComm {
                rank,
                size: self.size,
                barrier: barrier.clone(),
                link: Link::Peer {
                    rows: rows_tx.clone(),
                    ops: ops_tx.clone(),
                },
            });
        }
        comms
    }

    /// Run `worker` once on every member and return what each one
    /// produced, in rank order.  A member that panics is reported as
    /// a collective failure.
    pub fn run<F, R>(&self, worker: F) -> Result<Vec<R>, MandelError>
    where
        F: Fn(&ThreadComm) -> R + Sync,
        R: Send,
    {
        let comms = self.communicators();
        let worker = &worker;
        debug!("spawning {} workers", self.size);
        crossbeam::scope(|spawner| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| spawner.spawn(move |_| worker(&comm)))
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(rank, handle)| {
                    handle
                        .join()
                        .map_err(|_| MandelError::collective(format!("worker {} panicked", rank)))
                })
                .collect::<Result<Vec<R>, MandelError>>()
        })
        .map_err(|_| MandelError::collective("the worker group panicked"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_groups_are_rejected() {
        assert!(ThreadGroup::new(0).is_err());
    }

    #[test]
    fn results_come_back_in_rank_order() {
        let group = ThreadGroup::new(6).unwrap();
        let ranks = group.run(|comm| (comm.rank(), comm.size())).unwrap();
        assert_eq!(ranks, (0..6).map(|r| (r, 6)).collect::<Vec<_>>());
    }

    #[test]
    fn only_the_coordinator_receives_rows() {
        let group = ThreadGroup::new(4).unwrap();
        let results = group
            .run(|comm| {
                comm.barrier().unwrap();
                comm.gather_rows(vec![comm.rank() as u32; comm.rank()]).unwrap()
            })
            .unwrap();

        let mut gathered = results[0].clone().unwrap();
        assert_eq!(gathered[0], (0, vec![]));
        gathered.sort();
        assert_eq!(
            gathered,
            vec![(0, vec![]), (1, vec![1]), (2, vec![2, 2]), (3, vec![3, 3, 3])]
        );
        assert!(results[1..].iter().all(|r| r.is_none()));
    }

    #[test]
    fn operation_counts_are_rank_ordered() {
        let group = ThreadGroup::new(5).unwrap();
        let results = group
            .run(|comm| comm.gather_ops(10 * comm.rank() as u64).unwrap())
            .unwrap();
        assert_eq!(results[0], Some(vec![0, 10, 20, 30, 40]));
        assert!(results[1..].iter().all(|r| r.is_none()));
    }

    #[test]
    fn barrier_is_reusable() {
        let group = ThreadGroup::new(3).unwrap();
        let results = group
            .run(|comm| (0..5).map(|_| comm.barrier()).collect::<Result<Vec<_>, _>>())
            .unwrap();
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn a_departed_worker_fails_the_barrier() {
        let group = ThreadGroup::new(3).unwrap();
        let results = group
            .run(|comm| {
                if comm.rank() == 2 {
                    return Ok(());
                }
                comm.barrier()
            })
            .unwrap();
        assert!(results[2].is_ok());
        match &results[0] {
            Err(MandelError::Collective(_)) => {}
            other => panic!("expected a collective error, got {:?}", other),
        }
    }

    #[test]
    fn a_missing_contribution_fails_the_gather() {
        let group = ThreadGroup::new(3).unwrap();
        let results = group
            .run(|comm| {
                if comm.rank() == 1 {
                    return Ok(None);
                }
                comm.gather_rows(vec![1, 2])
            })
            .unwrap();
        match &results[0] {
            Err(MandelError::Collective(_)) => {}
            other => panic!("expected a collective error, got {:?}", other),
        }
    }

    #[test]
    fn a_panicking_worker_is_reported() {
        let group = ThreadGroup::new(2).unwrap();
        let result = group.run(|comm| {
            if comm.rank() == 1 {
                panic!("worker failure");
            }
            comm.rank()
        });
        match result {
            Err(MandelError::Collective(_)) => {}
            other => panic!("expected a collective error, got {:?}", other),
        }
    }
}
