//! Request/response orchestrator.
//!
//! Owns the store, the replacement tree, the outstanding-request tracker and
//! the response buffer, and advances all four atomically once per tick. Each
//! tick runs in two phases: probes are sampled against the previous tick's
//! committed state, then mutations commit in a fixed order so that capacity
//! freed within the tick is visible to later consumers of the same tick:
//!
//! 1. upstream delivery pops the response buffer,
//! 2. a downstream response resolves its CAM slot, fills the store and is
//!    pushed (downstream wins the last free buffer slot over a hit),
//! 3. read-with-invalidate commits its invalidation,
//! 4. the fill port writes, preferring any way freed in step 3,
//! 5. the upstream request commits: hit push (sees the pop of step 1) or miss
//!    reserve+forward (sees the CAM slot freed in step 2).

use thiserror::Error;

use crate::{
    common::{PortCap, ReqId, Request, Response, WayIndex, Word},
    config::CacheConfig,
    replace::PlruTree,
    respbuf::ResponseBuffer,
    store::{CacheStore, Hit, OccupancyView},
    tracker::RequestTracker,
};

/// Fill-port command. `valid = false` clears the resident entry for
/// `address` instead of writing one.
#[derive(Clone, Copy, Debug)]
pub struct FillCmd {
    pub valid: bool,
    pub address: Word,
    pub data: Word,
}

/// Read-port command. `invalidate` is ignored unless the cache was configured
/// with the read-with-invalidate capability.
#[derive(Clone, Copy, Debug)]
pub struct ReadCmd {
    pub address: Word,
    pub invalidate: bool,
}

/// Everything sampled at one tick. Offers left at `None` are idle ports.
#[derive(Default)]
pub struct TickInputs {
    pub fill: Option<FillCmd>,
    pub read: Option<ReadCmd>,
    pub request: Option<Request>,
    pub response: Option<Response>,
    pub downstream_ready: bool,
    pub upstream_ready: bool,
}

impl TickInputs {
    /// Idle ports with both consumers ready; the common test fixture.
    pub fn quiet() -> Self {
        Self {
            downstream_ready: true,
            upstream_ready: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct TickOutputs {
    /// read-port data, valid on a hit this tick
    pub read: Option<Word>,
    /// upstream request offer was accepted
    pub request_accepted: bool,
    /// downstream response offer was accepted
    pub response_accepted: bool,
    /// miss forwarded to the backing store this tick
    pub forwarded: Option<Request>,
    /// response delivered upstream this tick
    pub delivered: Option<Response>,
    /// post-tick store occupancy
    pub occupancy: OccupancyView,
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A response that was never requested, or answered twice. Absorbing it
    /// would desynchronize the response buffer, so it is fatal.
    #[error("downstream response {id} matches no outstanding request")]
    UnmatchedResponse { id: ReqId },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

pub struct CacheCtrl {
    store: CacheStore,
    plru: PlruTree,
    tracker: RequestTracker,
    respbuf: ResponseBuffer,
    read_caps: PortCap,
    #[cfg(feature = "stat")]
    pub c_stat: stat::CtrlStat,
}

impl CacheCtrl {
    pub fn new(config: &CacheConfig) -> Self {
        let read_caps = if config.read_invalidate {
            PortCap::Read | PortCap::Invalidate
        } else {
            PortCap::Read
        };
        Self {
            store: CacheStore::new(config.ways),
            plru: PlruTree::new(config.ways),
            tracker: RequestTracker::new(config.cam_ways),
            respbuf: ResponseBuffer::new(config.buffer_depth()),
            read_caps,
            #[cfg(feature = "stat")]
            c_stat: Default::default(),
        }
    }

    pub fn occupancy(&self) -> OccupancyView {
        self.store.view()
    }

    pub fn outstanding(&self) -> usize {
        self.tracker.outstanding()
    }

    pub fn buffered(&self) -> usize {
        self.respbuf.len()
    }

    /// Victim nomination: any invalid way first, else the recency tree. Run
    /// against current state so a same-tick invalidation is eligible.
    fn victim(&self) -> WayIndex {
        self.store
            .find_invalid()
            .unwrap_or_else(|| self.plru.victim())
    }

    fn fill_at(&mut self, resident: Option<Hit>, address: Word, data: Word) {
        // overwrite a resident entry for the same address rather than
        // allocating a second way, keeping tags unique
        let way = match resident {
            Some(hit) => hit.way,
            None => self.victim(),
        };
        self.store.fill(way, address, data);
        self.plru.touch(way);
        #[cfg(feature = "stat")]
        self.c_stat.on_fill();
    }

    fn invalidate_way(&mut self, way: WayIndex) {
        self.store.invalidate(way);
        self.plru.forget(way);
        #[cfg(feature = "stat")]
        self.c_stat.on_invalidate();
    }

    /// Evaluates one tick: consumes the sampled inputs, commits the next
    /// state, returns this tick's outputs.
    pub fn step(&mut self, inputs: &TickInputs) -> Result<TickOutputs> {
        let mut out = TickOutputs::default();

        // phase 1: hit detection and returned data sample pre-tick state
        let read_probe = inputs.read.map(|cmd| (cmd, self.store.probe(cmd.address)));
        let req_probe = inputs
            .request
            .map(|req| (req, self.store.probe(req.address)));

        // phase 2, step 1: upstream delivery
        if inputs.upstream_ready {
            out.delivered = self.respbuf.pop();
        }

        // step 2: downstream response; backpressured when the buffer is full
        if let Some(resp) = inputs.response {
            if self.respbuf.is_full() {
                log::trace!("backpressure downstream {resp}");
            } else {
                let address = self
                    .tracker
                    .resolve(resp.id)
                    .ok_or(ProtocolError::UnmatchedResponse { id: resp.id })?;
                let resident = self.store.probe(address);
                self.fill_at(resident, address, resp.data);
                let pushed = self.respbuf.push(resp);
                debug_assert!(pushed);
                out.response_accepted = true;
                log::trace!("resolved {resp} for {address}");
            }
        }

        // step 3: read port; data answered from the pre-tick probe even when
        // the entry is invalidated for the next tick. The matched way may
        // have been refilled by step 2, so mutations go through a fresh probe
        if let Some((cmd, probe)) = read_probe {
            #[cfg(feature = "stat")]
            self.c_stat.on_read(probe.is_some());
            if let Some(hit) = probe {
                out.read = Some(hit.data);
                let resident = self.store.probe(cmd.address);
                if cmd.invalidate && self.read_caps.contains(PortCap::Invalidate) {
                    if let Some(cur) = resident {
                        self.invalidate_way(cur.way);
                    }
                } else if let Some(cur) = resident {
                    self.plru.touch(cur.way);
                }
            }
        }

        // step 4: fill port, never backpressured. Residency is decided
        // against current state: step 2 may have just filled this address,
        // and allocating a second way would duplicate the tag
        if let Some(cmd) = inputs.fill {
            let resident = self.store.probe(cmd.address);
            if cmd.valid {
                self.fill_at(resident, cmd.address, cmd.data);
            } else if let Some(hit) = resident {
                self.invalidate_way(hit.way);
            }
        }

        // step 5: upstream request
        if let Some((req, probe)) = req_probe {
            match probe {
                Some(hit) => {
                    // hit path: gated by buffer capacity only. Data comes
                    // from the pre-tick probe; the matched way may since have
                    // been reassigned by steps 2-4, so invalidate and touch
                    // go through a fresh probe and skip an evicted entry
                    if self.respbuf.push(Response::new(req.id, hit.data)) {
                        let resident = self.store.probe(req.address);
                        if req.invalidate && self.read_caps.contains(PortCap::Invalidate) {
                            if let Some(cur) = resident {
                                self.invalidate_way(cur.way);
                            }
                        } else if let Some(cur) = resident {
                            self.plru.touch(cur.way);
                        }
                        out.request_accepted = true;
                        #[cfg(feature = "stat")]
                        self.c_stat.on_request(true);
                    } else {
                        log::trace!("backpressure hit {req}");
                    }
                }
                None => {
                    // miss path: gated by tracker capacity and the downstream
                    // handshake, never by a full response buffer
                    if inputs.downstream_ready && self.tracker.reserve(req.id, req.address) {
                        out.forwarded = Some(req);
                        out.request_accepted = true;
                        #[cfg(feature = "stat")]
                        {
                            self.c_stat.on_request(false);
                            self.c_stat.on_outstanding(self.tracker.outstanding());
                        }
                    } else {
                        log::trace!("backpressure miss {req}");
                    }
                }
            }
        }

        out.occupancy = self.store.view();
        Ok(out)
    }
}

#[cfg(feature = "stat")]
mod stat {
    use std::fmt;

    use crate::stat::*;

    #[derive(Clone, Copy, Default)]
    pub struct CtrlStat {
        hit_count: usize,
        miss_count: usize,
        read_hit_count: usize,
        read_miss_count: usize,
        fill_count: usize,
        invalidate_count: usize,
        outstanding_high_water: usize,
    }

    impl CtrlStat {
        pub fn on_request(&mut self, hit: bool) {
            if hit {
                self.hit_count += 1;
            } else {
                self.miss_count += 1;
            }
        }
        pub fn on_read(&mut self, hit: bool) {
            if hit {
                self.read_hit_count += 1;
            } else {
                self.read_miss_count += 1;
            }
        }
        pub fn on_fill(&mut self) {
            self.fill_count += 1;
        }
        pub fn on_invalidate(&mut self) {
            self.invalidate_count += 1;
        }
        pub fn on_outstanding(&mut self, outstanding: usize) {
            self.outstanding_high_water = self.outstanding_high_water.max(outstanding);
        }
    }

    impl Stat for CtrlStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(CtrlStatView { stat: self })
        }
    }

    pub struct CtrlStatView<'a> {
        stat: &'a CtrlStat,
    }

    impl StatView for CtrlStatView<'_> {
        fn header(&self) -> &'static str {
            "cache controller stat"
        }
        fn width(&self) -> usize {
            36
        }
    }

    impl fmt::Display for CtrlStatView<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            macro_rules! output {
                ($kind:ident => $name:expr) => {
                    writeln!(f, "  {:>22}:{:>11}", $name, self.stat.$kind)
                };
            }
            output!(hit_count => "request hits")?;
            output!(miss_count => "request misses")?;
            output!(read_hit_count => "read-port hits")?;
            output!(read_miss_count => "read-port misses")?;
            output!(fill_count => "fills")?;
            output!(invalidate_count => "invalidations")?;
            output!(outstanding_high_water => "outstanding high water")
        }
    }
}
