//! Line-oriented stimulus traces driving the simulator.
//!
//! One event per line, `#` starts a comment:
//!
//! ```text
//! mem 0x10 0xAA       # preload the backing store
//! req 1 0x10          # upstream request, id then address
//! reqinv 2 0x10       # request carrying read-with-invalidate semantics
//! fill 0x20 0xBB      # fill port write
//! clear 0x20          # fill port write with valid low
//! read 0x20           # read port probe
//! readinv 0x20        # read-with-invalidate probe
//! stall 3             # requester not ready for the next 3 ticks
//! idle 2              # 2 ticks without stimulus
//! ```

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{digit1, hex_digit1, space1},
    combinator::{all_consuming, map, map_res},
    sequence::{preceded, tuple},
    IResult,
};
use thiserror::Error;

use crate::common::{ReqId, Request, Word};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Request(Request),
    Fill { address: Word, data: Word },
    Clear { address: Word },
    Read { address: Word, invalidate: bool },
    Stall(usize),
    Idle(usize),
}

#[derive(Debug, Default)]
pub struct Trace {
    /// backing-store words to install before the first tick
    pub preload: Vec<(Word, Word)>,
    pub events: Vec<Event>,
}

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("stimulus line {line}: failed to parse {src:?}")]
    Parse { line: usize, src: String },
}

enum Line {
    Mem(Word, Word),
    Event(Event),
}

fn number(input: &str) -> IResult<&str, u32> {
    alt((
        preceded(
            tag("0x"),
            map_res(hex_digit1, |s| u32::from_str_radix(s, 16)),
        ),
        map_res(digit1, str::parse),
    ))(input)
}

fn word(input: &str) -> IResult<&str, Word> {
    map(number, Word::new)(input)
}

fn count(input: &str) -> IResult<&str, usize> {
    map(number, |n| n as usize)(input)
}

fn addr_pair<'a>(key: &'static str, input: &'a str) -> IResult<&'a str, (Word, Word)> {
    preceded(
        tuple((tag(key), space1)),
        tuple((word, preceded(space1, word))),
    )(input)
}

fn line(input: &str) -> IResult<&str, Line> {
    alt((
        map(|i| addr_pair("mem", i), |(a, d)| Line::Mem(a, d)),
        map(|i| addr_pair("fill", i), |(address, data)| {
            Line::Event(Event::Fill { address, data })
        }),
        // reqinv before req, clear/readinv before read: prefix keywords
        map(
            preceded(
                tuple((tag("reqinv"), space1)),
                tuple((number, preceded(space1, word))),
            ),
            |(id, address)| Line::Event(Event::Request(Request::with_invalidate(
                ReqId::new(id),
                address,
            ))),
        ),
        map(
            preceded(
                tuple((tag("req"), space1)),
                tuple((number, preceded(space1, word))),
            ),
            |(id, address)| Line::Event(Event::Request(Request::new(ReqId::new(id), address))),
        ),
        map(preceded(tuple((tag("clear"), space1)), word), |address| {
            Line::Event(Event::Clear { address })
        }),
        map(preceded(tuple((tag("readinv"), space1)), word), |address| {
            Line::Event(Event::Read {
                address,
                invalidate: true,
            })
        }),
        map(preceded(tuple((tag("read"), space1)), word), |address| {
            Line::Event(Event::Read {
                address,
                invalidate: false,
            })
        }),
        map(preceded(tuple((tag("stall"), space1)), count), |n| {
            Line::Event(Event::Stall(n))
        }),
        map(preceded(tuple((tag("idle"), space1)), count), |n| {
            Line::Event(Event::Idle(n))
        }),
    ))(input)
}

impl Trace {
    pub fn parse(input: &str) -> Result<Self, TraceError> {
        let mut trace = Trace::default();
        for (index, raw) in input.lines().enumerate() {
            let src = match raw.find('#') {
                Some(at) => &raw[..at],
                None => raw,
            }
            .trim();
            if src.is_empty() {
                continue;
            }
            let (_, parsed) =
                all_consuming(line)(src).map_err(|_| TraceError::Parse {
                    line: index + 1,
                    src: src.to_string(),
                })?;
            match parsed {
                Line::Mem(address, data) => trace.preload.push((address, data)),
                Line::Event(e) => trace.events.push(e),
            }
        }
        Ok(trace)
    }
}
