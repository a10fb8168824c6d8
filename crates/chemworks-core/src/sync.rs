//! Network replication of infuser state.
//!
//! Two packet shapes travel from the authoritative machine to observers:
//!
//! - [`SyncPacket`]: the full picture, sent when an observer first starts
//!   watching. Layout (little-endian): `f64` energy used last tick, then for
//!   each tank in left, center, right order a presence byte (`0`/`1`) and,
//!   if present, `u32` gas id followed by `u32` amount.
//! - [`DeltaPacket`]: only what changed since the last sync, driven by the
//!   per-field flags in [`SyncTracker`]. Layout: a field mask byte, then the
//!   fields named by the mask in bit order.
//!
//! Transport framing is the host's concern; these are payload bytes only.

use crate::gas::{GasError, GasStack};
use crate::id::GasTypeId;
use crate::side::TankSlot;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error("packet truncated: needed {needed} more bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },
    #[error("invalid presence byte {0}")]
    BadPresence(u8),
    #[error("invalid field mask 0b{0:08b}")]
    BadMask(u8),
    #[error("invalid energy value {0}")]
    InvalidEnergy(f64),
    #[error("{0} trailing bytes after packet")]
    TrailingBytes(usize),
    #[error(transparent)]
    Gas(#[from] GasError),
}

// ---------------------------------------------------------------------------
// Byte cursor
// ---------------------------------------------------------------------------

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], SyncError> {
        if self.buf.len() < N {
            return Err(SyncError::Truncated {
                needed: N,
                remaining: self.buf.len(),
            });
        }
        let (head, rest) = self.buf.split_at(N);
        self.buf = rest;
        let mut out = [0u8; N];
        out.copy_from_slice(head);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, SyncError> {
        Ok(self.take::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32, SyncError> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn f64(&mut self) -> Result<f64, SyncError> {
        let v = f64::from_le_bytes(self.take()?);
        if !v.is_finite() {
            return Err(SyncError::InvalidEnergy(v));
        }
        Ok(v)
    }

    fn tank(&mut self) -> Result<Option<GasStack>, SyncError> {
        match self.u8()? {
            0 => Ok(None),
            1 => {
                let gas = GasTypeId(self.u32()?);
                let amount = self.u32()?;
                Ok(Some(GasStack::new(gas, amount)))
            }
            other => Err(SyncError::BadPresence(other)),
        }
    }

    fn bool(&mut self) -> Result<bool, SyncError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SyncError::BadPresence(other)),
        }
    }

    fn finish(self) -> Result<(), SyncError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(SyncError::TrailingBytes(self.buf.len()))
        }
    }
}

fn write_tank(out: &mut Vec<u8>, tank: Option<GasStack>) {
    match tank.filter(|s| !s.is_empty()) {
        None => out.push(0),
        Some(stack) => {
            out.push(1);
            out.extend_from_slice(&stack.gas.0.to_le_bytes());
            out.extend_from_slice(&stack.amount.to_le_bytes());
        }
    }
}

// ---------------------------------------------------------------------------
// Full packet
// ---------------------------------------------------------------------------

/// Complete replicated state of one infuser.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncPacket {
    pub energy_used: f64,
    pub left: Option<GasStack>,
    pub center: Option<GasStack>,
    pub right: Option<GasStack>,
}

impl SyncPacket {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + 3 * 9);
        out.extend_from_slice(&self.energy_used.to_le_bytes());
        write_tank(&mut out, self.left);
        write_tank(&mut out, self.center);
        write_tank(&mut out, self.right);
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, SyncError> {
        let mut r = Reader::new(buf);
        let packet = Self {
            energy_used: r.f64()?,
            left: r.tank()?,
            center: r.tank()?,
            right: r.tank()?,
        };
        r.finish()?;
        Ok(packet)
    }
}

// ---------------------------------------------------------------------------
// Delta packet
// ---------------------------------------------------------------------------

pub const FIELD_LEFT: u8 = 1 << 0;
pub const FIELD_CENTER: u8 = 1 << 1;
pub const FIELD_RIGHT: u8 = 1 << 2;
pub const FIELD_ACTIVE: u8 = 1 << 3;
pub const FIELD_ENERGY: u8 = 1 << 4;
const FIELD_ALL: u8 = FIELD_LEFT | FIELD_CENTER | FIELD_RIGHT | FIELD_ACTIVE | FIELD_ENERGY;

/// The changed subset of an infuser's replicated state.
///
/// A tank field of `Some(None)` means "the tank is now empty"; `None` means
/// "unchanged".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeltaPacket {
    pub left: Option<Option<GasStack>>,
    pub center: Option<Option<GasStack>>,
    pub right: Option<Option<GasStack>>,
    pub active: Option<bool>,
    pub energy_used: Option<f64>,
}

impl DeltaPacket {
    pub fn mask(&self) -> u8 {
        let mut mask = 0;
        if self.left.is_some() {
            mask |= FIELD_LEFT;
        }
        if self.center.is_some() {
            mask |= FIELD_CENTER;
        }
        if self.right.is_some() {
            mask |= FIELD_RIGHT;
        }
        if self.active.is_some() {
            mask |= FIELD_ACTIVE;
        }
        if self.energy_used.is_some() {
            mask |= FIELD_ENERGY;
        }
        mask
    }

    pub fn is_empty(&self) -> bool {
        self.mask() == 0
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.mask()];
        if let Some(tank) = self.left {
            write_tank(&mut out, tank);
        }
        if let Some(tank) = self.center {
            write_tank(&mut out, tank);
        }
        if let Some(tank) = self.right {
            write_tank(&mut out, tank);
        }
        if let Some(active) = self.active {
            out.push(active as u8);
        }
        if let Some(energy) = self.energy_used {
            out.extend_from_slice(&energy.to_le_bytes());
        }
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, SyncError> {
        let mut r = Reader::new(buf);
        let mask = r.u8()?;
        if mask & !FIELD_ALL != 0 {
            return Err(SyncError::BadMask(mask));
        }
        let mut packet = Self::default();
        if mask & FIELD_LEFT != 0 {
            packet.left = Some(r.tank()?);
        }
        if mask & FIELD_CENTER != 0 {
            packet.center = Some(r.tank()?);
        }
        if mask & FIELD_RIGHT != 0 {
            packet.right = Some(r.tank()?);
        }
        if mask & FIELD_ACTIVE != 0 {
            packet.active = Some(r.bool()?);
        }
        if mask & FIELD_ENERGY != 0 {
            packet.energy_used = Some(r.f64()?);
        }
        r.finish()?;
        Ok(packet)
    }
}

// ---------------------------------------------------------------------------
// Change tracking
// ---------------------------------------------------------------------------

/// Tracks which replicated fields changed since the last sync.
///
/// The machine marks fields as it mutates them; the host asks
/// [`is_dirty`](SyncTracker::is_dirty) each tick and only builds a packet
/// when something changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncTracker {
    fields: u8,
}

impl SyncTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_tank(&mut self, slot: TankSlot) {
        self.fields |= match slot {
            TankSlot::Left => FIELD_LEFT,
            TankSlot::Center => FIELD_CENTER,
            TankSlot::Right => FIELD_RIGHT,
        };
    }

    pub fn mark_active(&mut self) {
        self.fields |= FIELD_ACTIVE;
    }

    pub fn mark_energy(&mut self) {
        self.fields |= FIELD_ENERGY;
    }

    /// Mark every field, forcing the next delta to carry full state.
    pub fn mark_all(&mut self) {
        self.fields = FIELD_ALL;
    }

    pub fn is_dirty(&self) -> bool {
        self.fields != 0
    }

    pub fn is_tank_dirty(&self, slot: TankSlot) -> bool {
        let bit = match slot {
            TankSlot::Left => FIELD_LEFT,
            TankSlot::Center => FIELD_CENTER,
            TankSlot::Right => FIELD_RIGHT,
        };
        self.fields & bit != 0
    }

    pub fn is_active_dirty(&self) -> bool {
        self.fields & FIELD_ACTIVE != 0
    }

    pub fn is_energy_dirty(&self) -> bool {
        self.fields & FIELD_ENERGY != 0
    }

    /// The dirty fields as a packet mask.
    pub fn fields(&self) -> u8 {
        self.fields
    }

    pub fn mark_clean(&mut self) {
        self.fields = 0;
    }
}
