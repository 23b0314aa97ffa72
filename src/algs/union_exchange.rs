//! Gather-and-replay of union knowledge across blocks.
//!
//! Every round runs three phases over the communicator, each with its own tag:
//!
//! 1. Exchange record counts with every peer (`WireCount`).
//! 2. Exchange the `WireUnion` payloads (header + records) and replay them.
//! 3. All-to-all sum of the number of links that changed local state.
//!
//! The loop stops as soon as the global changed count is zero. All handles are
//! drained before any error is returned.

use std::fmt::Debug;
use std::hash::Hash;

use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::algs::wire::{
    WireCount, WireHdr, WirePoint, WireUnion, WIRE_VERSION, cast_slice, cast_slice_mut,
    decode_records, expect_exact_len,
};
use crate::debug_invariants::DebugInvariants;
use crate::topology::distributed_union_find::DistributedUnionFind;
use crate::track_error::TrackError;

#[derive(Clone, Debug)]
pub struct ExchangeConfig {
    /// Give up with [`TrackError::NotConverged`] after this many rounds.
    pub max_rounds: usize,
    pub base_tag: CommTag,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            max_rounds: 8,
            base_tag: CommTag::new(0x5A00),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExchangeReport {
    pub rounds: usize,
    /// Global number of changed links per round; the last entry is zero on success.
    pub changed_per_round: Vec<usize>,
}

/// Exchange locally known unions with every other block until no block changes.
pub fn exchange_unions<Id, C>(
    uf: &mut DistributedUnionFind<Id>,
    comm: &C,
    cfg: &ExchangeConfig,
) -> Result<ExchangeReport, TrackError>
where
    Id: WirePoint + Eq + Hash + Ord + Debug,
    C: Communicator,
{
    let mut report = ExchangeReport::default();
    let peers: Vec<usize> = (0..comm.size()).filter(|&r| r != comm.rank()).collect();
    if peers.is_empty() {
        return Ok(report);
    }

    for round in 0..cfg.max_rounds {
        let tag = cfg.base_tag.offset((round * 3) as u16);
        let records: Vec<WireUnion> = uf
            .known_unions()
            .into_iter()
            .map(|(id, parent, io, po)| WireUnion::new(id, parent, io, po))
            .collect();

        let counts = exchange_counts(comm, tag, &peers, |_| records.len())?;
        let received = exchange_payloads(comm, tag.offset(1), &peers, &records, &counts)?;

        let mut changed = 0usize;
        for (_, recs) in received {
            changed += uf.replay(recs.iter().map(|r| r.decode::<Id>()));
        }

        let others = exchange_counts(comm, tag.offset(2), &peers, |_| changed)?;
        let total = changed + others.iter().map(|(_, n)| *n).sum::<usize>();
        report.changed_per_round.push(total);
        report.rounds = round + 1;
        log::debug!(
            "rank {}: union exchange round {} sent {} links, {} changed globally",
            comm.rank(),
            round,
            records.len(),
            total
        );
        uf.debug_assert_invariants();
        if total == 0 {
            return Ok(report);
        }
    }
    log::warn!(
        "rank {}: union exchange still changing after {} rounds",
        comm.rank(),
        cfg.max_rounds
    );
    Err(TrackError::NotConverged {
        rounds: cfg.max_rounds,
    })
}

/// Send one count to each peer and receive one from each. Results are in
/// `peers` order.
fn exchange_counts<C, F>(
    comm: &C,
    tag: CommTag,
    peers: &[usize],
    count_for: F,
) -> Result<Vec<(usize, usize)>, TrackError>
where
    C: Communicator,
    F: Fn(usize) -> usize,
{
    let mut pending_recvs = Vec::with_capacity(peers.len());
    for &nbr in peers {
        let mut cnt = WireCount::new(0);
        let h = comm.irecv(
            nbr,
            tag.as_u16(),
            cast_slice_mut(std::slice::from_mut(&mut cnt)),
        );
        pending_recvs.push((nbr, h));
    }

    let mut pending_sends = Vec::with_capacity(peers.len());
    for &nbr in peers {
        let count = WireCount::new(count_for(nbr));
        pending_sends.push(comm.isend(
            nbr,
            tag.as_u16(),
            cast_slice(std::slice::from_ref(&count)),
        ));
    }

    let mut out = Vec::with_capacity(peers.len());
    let mut maybe_err = None;
    for (nbr, h) in pending_recvs {
        match h.wait() {
            Some(data) if data.len() == std::mem::size_of::<WireCount>() => {
                let mut cnt = WireCount::new(0);
                cast_slice_mut(std::slice::from_mut(&mut cnt)).copy_from_slice(&data);
                out.push((nbr, cnt.get()));
            }
            Some(data) => {
                maybe_err.get_or_insert_with(|| TrackError::CommError {
                    neighbor: nbr,
                    message: format!(
                        "expected {} bytes for count, got {}",
                        std::mem::size_of::<WireCount>(),
                        data.len()
                    ),
                });
            }
            None => {
                maybe_err.get_or_insert_with(|| TrackError::CommError {
                    neighbor: nbr,
                    message: "failed to receive count".into(),
                });
            }
        }
    }
    for send in pending_sends {
        let _ = send.wait();
    }
    match maybe_err {
        Some(err) => Err(err),
        None => Ok(out),
    }
}

fn exchange_payloads<C>(
    comm: &C,
    tag: CommTag,
    peers: &[usize],
    records: &[WireUnion],
    counts: &[(usize, usize)],
) -> Result<Vec<(usize, Vec<WireUnion>)>, TrackError>
where
    C: Communicator,
{
    let hdr_len = std::mem::size_of::<WireHdr>();
    let mut pending_recvs = Vec::with_capacity(counts.len());
    for &(nbr, n) in counts {
        let mut buf = vec![0u8; hdr_len + n * std::mem::size_of::<WireUnion>()];
        let h = comm.irecv(nbr, tag.as_u16(), &mut buf);
        pending_recvs.push((nbr, buf.len(), h));
    }

    let hdr = WireHdr::new(WireHdr::KIND_UNIONS);
    let mut payload = Vec::with_capacity(hdr_len + std::mem::size_of_val(records));
    payload.extend_from_slice(cast_slice(std::slice::from_ref(&hdr)));
    payload.extend_from_slice(cast_slice(records));
    let pending_sends: Vec<_> = peers
        .iter()
        .map(|&nbr| comm.isend(nbr, tag.as_u16(), &payload))
        .collect();

    let mut out = Vec::with_capacity(counts.len());
    let mut maybe_err = None;
    for (nbr, expected, h) in pending_recvs {
        let result = match h.wait() {
            Some(data) => decode_payload(&data, expected, nbr),
            None => Err(TrackError::CommError {
                neighbor: nbr,
                message: "failed to receive union payload".into(),
            }),
        };
        match result {
            Ok(recs) => out.push((nbr, recs)),
            Err(e) => {
                maybe_err.get_or_insert(e);
            }
        }
    }
    for send in pending_sends {
        let _ = send.wait();
    }
    match maybe_err {
        Some(err) => Err(err),
        None => Ok(out),
    }
}

fn decode_payload(data: &[u8], expected: usize, nbr: usize) -> Result<Vec<WireUnion>, TrackError> {
    expect_exact_len(data.len(), expected).map_err(|message| TrackError::CommError {
        neighbor: nbr,
        message,
    })?;
    let hdr_len = std::mem::size_of::<WireHdr>();
    if data.len() < hdr_len {
        return Err(TrackError::CommError {
            neighbor: nbr,
            message: format!("payload of {} bytes has no header", data.len()),
        });
    }
    let hdr: Vec<WireHdr> = decode_records(&data[..hdr_len], nbr)?;
    if hdr[0].version() != WIRE_VERSION || hdr[0].kind() != WireHdr::KIND_UNIONS {
        return Err(TrackError::CommError {
            neighbor: nbr,
            message: format!(
                "unexpected header (version {}, kind {})",
                hdr[0].version(),
                hdr[0].kind()
            ),
        });
    }
    decode_records(&data[hdr_len..], nbr)
}
