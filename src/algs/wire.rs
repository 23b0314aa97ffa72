//! Fixed, versioned, little-endian wire records for the union exchange.

use bytemuck::{Pod, Zeroable};
use std::mem::{align_of, size_of};

use crate::track_error::TrackError;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

/// Decode a received byte buffer into owned records.
///
/// Copies into a freshly allocated `Vec<T>` so alignment of the incoming
/// buffer does not matter.
pub fn decode_records<T: Pod>(bytes: &[u8], neighbor: usize) -> Result<Vec<T>, TrackError> {
    let rec = size_of::<T>();
    if rec == 0 || bytes.len() % rec != 0 {
        return Err(TrackError::CommError {
            neighbor,
            message: format!(
                "payload of {} bytes is not a multiple of the {rec}-byte record",
                bytes.len()
            ),
        });
    }
    let mut out = vec![T::zeroed(); bytes.len() / rec];
    cast_slice_mut(&mut out).copy_from_slice(bytes);
    Ok(out)
}

pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} bytes, got {actual}"))
    }
}

/// Ids that travel as a plain `u64`.
pub trait WirePoint: Copy {
    fn to_wire(self) -> u64;
    fn from_wire(w: u64) -> Self;
}

impl WirePoint for u64 {
    #[inline]
    fn to_wire(self) -> u64 {
        self
    }
    #[inline]
    fn from_wire(w: u64) -> Self {
        w
    }
}

/// Bump when the layout or semantics change in incompatible ways.
pub const WIRE_VERSION: u16 = 1;

// All multi-byte integers below are little-endian on the wire: stored with
// `.to_le()`, decoded with `::from_le()`.

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireHdr {
    pub version_le: u16,
    pub kind_le: u16,
    pub reserved_le: u32,
}

impl WireHdr {
    pub const KIND_UNIONS: u16 = 1;

    pub fn new(kind: u16) -> Self {
        Self {
            version_le: WIRE_VERSION.to_le(),
            kind_le: kind.to_le(),
            reserved_le: 0,
        }
    }
    pub fn kind(&self) -> u16 {
        u16::from_le(self.kind_le)
    }
    pub fn version(&self) -> u16 {
        u16::from_le(self.version_le)
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u32,
}

impl WireCount {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (u32::try_from(n).unwrap_or(u32::MAX)).to_le(),
        }
    }
    pub fn get(&self) -> usize {
        u32::from_le(self.n_le) as usize
    }
}

/// One parent link `id -> parent` plus the owning ranks of both ends.
///
/// Ranks are `u32` on the wire, never `usize`; an unknown owner travels as
/// [`WireUnion::NO_OWNER`].
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireUnion {
    pub id_le: u64,
    pub parent_le: u64,
    pub id_owner_le: u32,
    pub parent_owner_le: u32,
}

impl WireUnion {
    pub const SIZE: usize = 24;
    pub const NO_OWNER: u32 = u32::MAX;

    pub fn new<P: WirePoint>(
        id: P,
        parent: P,
        id_owner: Option<usize>,
        parent_owner: Option<usize>,
    ) -> Self {
        Self {
            id_le: id.to_wire().to_le(),
            parent_le: parent.to_wire().to_le(),
            id_owner_le: encode_owner(id_owner).to_le(),
            parent_owner_le: encode_owner(parent_owner).to_le(),
        }
    }

    pub fn decode<P: WirePoint>(&self) -> (P, P, Option<usize>, Option<usize>) {
        (
            P::from_wire(u64::from_le(self.id_le)),
            P::from_wire(u64::from_le(self.parent_le)),
            decode_owner(u32::from_le(self.id_owner_le)),
            decode_owner(u32::from_le(self.parent_owner_le)),
        )
    }
}

fn encode_owner(owner: Option<usize>) -> u32 {
    owner.map_or(WireUnion::NO_OWNER, |o| {
        u32::try_from(o).unwrap_or(WireUnion::NO_OWNER - 1)
    })
}

fn decode_owner(raw: u32) -> Option<usize> {
    (raw != WireUnion::NO_OWNER).then_some(raw as usize)
}

const _: () = {
    assert!(size_of::<WireHdr>() == 8);
    assert!(size_of::<WireCount>() == 4);
    assert!(size_of::<WireUnion>() == WireUnion::SIZE);
    assert!(align_of::<WireUnion>() == 8);
};
