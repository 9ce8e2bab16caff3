//! Tick-stepped harness around the controller and a backing store.
//!
//! The harness owns both valid/ready handshakes: a backpressured request or
//! downstream response stays offered, unchanged, until it is taken.

use std::collections::VecDeque;

use anyhow::{anyhow, Result};

use crate::{
    backing::Backing,
    common::{Request, Response},
    config::CacheConfig,
    ctrl::{CacheCtrl, FillCmd, ReadCmd, TickInputs, TickOutputs},
    port::Handshake,
    trace::{Event, Trace},
};

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

/// ticks allowed for the system to drain after the last stimulus
const QUIESCE_LIMIT: usize = 10_000;

pub struct Simulator<B> {
    ctrl: CacheCtrl,
    backing: B,
    req_offer: Handshake<Request>,
    resp_offer: Handshake<Response>,
    pending: VecDeque<Request>,
    stall: usize,
    cycle: usize,
    delivered: Vec<Response>,
    #[cfg(feature = "stat")]
    stat_builder: stat::SimStatBuilder,
}

impl<B: Backing> Simulator<B> {
    pub fn new(config: &CacheConfig, backing: B) -> Result<Self> {
        let config = config.validated()?;
        Ok(Self {
            ctrl: CacheCtrl::new(&config),
            backing,
            req_offer: Handshake::new(),
            resp_offer: Handshake::new(),
            pending: VecDeque::new(),
            stall: 0,
            cycle: 0,
            delivered: Vec::new(),
            #[cfg(feature = "stat")]
            stat_builder: stat::SimStatBuilder::new(),
        })
    }

    /// Queues an upstream request; it is offered, in order, as soon as the
    /// request handshake frees up.
    pub fn push_request(&mut self, req: Request) {
        self.pending.push_back(req);
    }

    /// Requester refuses delivery for the next `ticks` ticks.
    pub fn stall_upstream(&mut self, ticks: usize) {
        self.stall += ticks;
    }

    pub fn cycle(&self) -> usize {
        self.cycle
    }

    pub fn delivered(&self) -> &[Response] {
        &self.delivered
    }

    pub fn ctrl(&self) -> &CacheCtrl {
        &self.ctrl
    }

    pub fn into_delivered(self) -> Vec<Response> {
        self.delivered
    }

    /// Advances one tick with the given port stimulus.
    pub fn step(&mut self, fill: Option<FillCmd>, read: Option<ReadCmd>) -> Result<TickOutputs> {
        if !self.req_offer.is_pending() {
            if let Some(req) = self.pending.pop_front() {
                self.req_offer.offer(req);
            }
        }
        if !self.resp_offer.is_pending() {
            if let Some(resp) = self.backing.pop_response() {
                self.resp_offer.offer(resp);
            }
        }
        let inputs = TickInputs {
            fill,
            read,
            request: self.req_offer.peek().copied(),
            response: self.resp_offer.peek().copied(),
            downstream_ready: self.backing.ready(),
            upstream_ready: self.stall == 0,
        };
        let out = self.ctrl.step(&inputs)?;
        if out.request_accepted {
            self.req_offer.take();
        }
        if out.response_accepted {
            self.resp_offer.take();
        }
        if let Some(fwd) = out.forwarded {
            self.backing.accept(fwd)?;
        }
        if let Some(resp) = out.delivered {
            log::trace!("cycle {}: delivered {resp}", self.cycle);
            self.delivered.push(resp);
        }
        self.stall = self.stall.saturating_sub(1);
        self.backing.step();
        self.cycle += 1;
        Ok(out)
    }

    /// Plays a stimulus trace, one event per tick, then drains.
    pub fn run_trace(&mut self, trace: &Trace) -> Result<()> {
        for &event in &trace.events {
            match event {
                Event::Request(req) => {
                    self.push_request(req);
                    self.step(None, None)?;
                }
                Event::Fill { address, data } => {
                    self.step(
                        Some(FillCmd {
                            valid: true,
                            address,
                            data,
                        }),
                        None,
                    )?;
                }
                Event::Clear { address } => {
                    self.step(
                        Some(FillCmd {
                            valid: false,
                            address,
                            data: Default::default(),
                        }),
                        None,
                    )?;
                }
                Event::Read {
                    address,
                    invalidate,
                } => {
                    self.step(None, Some(ReadCmd {
                        address,
                        invalidate,
                    }))?;
                }
                Event::Stall(n) => self.stall_upstream(n),
                Event::Idle(n) => {
                    for _ in 0..n {
                        self.step(None, None)?;
                    }
                }
            }
        }
        self.quiesce()
    }

    /// Steps until every queued request is answered and delivered.
    pub fn quiesce(&mut self) -> Result<()> {
        for _ in 0..QUIESCE_LIMIT {
            if self.is_idle() {
                #[cfg(feature = "stat")]
                self.stat_builder.cycle(self.cycle);
                #[cfg(feature = "stat")]
                self.stat_builder.stop_timer();
                return Ok(());
            }
            self.step(None, None)?;
        }
        Err(anyhow!(
            "simulation did not quiesce within {QUIESCE_LIMIT} ticks"
        ))
    }

    fn is_idle(&self) -> bool {
        self.pending.is_empty()
            && !self.req_offer.is_pending()
            && !self.resp_offer.is_pending()
            && self.ctrl.outstanding() == 0
            && self.ctrl.buffered() == 0
    }
}

#[cfg(feature = "stat")]
impl<B> Simulator<B> {
    pub fn collect_stat(&self) -> Stats {
        let mut ss = Stats::default();
        self.add_stats(&mut ss);
        ss
    }
}

#[cfg(feature = "stat")]
impl<B> AddStats for Simulator<B> {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(self.stat_builder.finish()));
        buf.push(Box::new(self.ctrl.c_stat));
    }
}

#[cfg(feature = "stat")]
mod stat {
    use std::{fmt, time};

    use crate::stat::*;

    pub struct SimStatBuilder {
        begin: time::Instant,
        cycle: Option<usize>,
        elapsed: Option<time::Duration>,
    }

    impl SimStatBuilder {
        pub fn new() -> Self {
            Self {
                begin: time::Instant::now(),
                cycle: None,
                elapsed: None,
            }
        }
        pub fn cycle(&mut self, cycle: usize) {
            self.cycle = Some(cycle)
        }
        pub fn stop_timer(&mut self) {
            self.elapsed = Some(time::Instant::now() - self.begin)
        }
        pub fn finish(&self) -> SimStat {
            SimStat {
                cycle: self.cycle.unwrap_or_default(),
                elapsed: self.elapsed.unwrap_or_default(),
            }
        }
    }

    impl Default for SimStatBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    pub struct SimStat {
        cycle: usize,
        elapsed: time::Duration,
    }

    impl Stat for SimStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(self)
        }
    }

    impl StatView for &'_ SimStat {
        fn header(&self) -> &'static str {
            "simulator stat"
        }
        fn width(&self) -> usize {
            33
        }
    }

    impl fmt::Display for &'_ SimStat {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let ms = format!("{} ms", self.elapsed.as_millis());
            writeln!(f, "  elapsed total: {ms:>9}")?;
            let cycle = format!("#{}", self.cycle);
            writeln!(f, "  ticks total: {cycle:>11}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backing::{DelayedMemory, NullBacking},
        common::{ReqId, Word},
    };

    fn w(v: u32) -> Word {
        Word::new(v)
    }
    fn id(v: u32) -> ReqId {
        ReqId::new(v)
    }

    fn sim(latency: usize) -> Simulator<DelayedMemory> {
        Simulator::new(
            &CacheConfig::new(2, 2).unwrap(),
            DelayedMemory::new(latency),
        )
        .unwrap()
    }

    #[test]
    fn trace_end_to_end() {
        let trace = Trace::parse(
            "mem 0x10 0xAA\n\
             mem 0x14 0xBB\n\
             req 1 0x10\n\
             req 2 0x14\n\
             idle 8\n\
             req 3 0x10\n",
        )
        .unwrap();
        let mut s = sim(3);
        for &(a, d) in &trace.preload {
            // preload is applied by the caller owning the concrete backing
            s.backing.preload(a, d);
        }
        s.run_trace(&trace).unwrap();
        assert_eq!(
            s.delivered(),
            &[
                Response::new(id(1), w(0xAA)),
                Response::new(id(2), w(0xBB)),
                Response::new(id(3), w(0xAA)),
            ]
        );
        // the repeat of 0x10 was a hit, not a third backing access
        assert_eq!(s.ctrl().outstanding(), 0);
    }

    #[test]
    fn burst_of_misses_multiplexes_over_the_cam() {
        let mut s = sim(5);
        for rid in 1..=4 {
            s.push_request(Request::new(id(rid), w(0x100 + rid * 4)));
        }
        s.quiesce().unwrap();
        let ids: Vec<_> = s.delivered().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![id(1), id(2), id(3), id(4)]);
        // 2 CAM slots, latency 5, 4 misses: both slots were needed
        assert!(s.cycle() >= 10);
    }

    #[test]
    fn stalled_requester_backpressures_delivery_without_loss() {
        let mut s = sim(1);
        s.stall_upstream(20);
        for rid in 1..=3 {
            s.push_request(Request::new(id(rid), w(0x10 + rid * 4)));
        }
        s.quiesce().unwrap();
        assert_eq!(s.delivered().len(), 3);
        assert!(s.cycle() > 20);
    }

    #[test]
    fn null_backing_rejects_misses() {
        let mut s = Simulator::new(&CacheConfig::new(2, 2).unwrap(), NullBacking::new()).unwrap();
        s.push_request(Request::new(id(1), w(0x10)));
        // downstream never ready: the offer can never be accepted
        assert!(s.quiesce().is_err());
    }
}
