//! Durable persistence of an infuser's tank contents.
//!
//! Records are encoded with `bitcode` behind a versioned header so that a
//! stale or foreign blob is rejected before any tank is touched.

use crate::gas::{GasError, GasStack, GasTank};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a tank record.
pub const RECORD_MAGIC: u32 = 0xC4E3_0001;

/// Current record format version.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", RECORD_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("record from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("record does not fit the machine: {0}")]
    Capacity(#[from] GasError),
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHeader {
    pub magic: u32,
    pub version: u32,
}

impl Default for RecordHeader {
    fn default() -> Self {
        Self {
            magic: RECORD_MAGIC,
            version: FORMAT_VERSION,
        }
    }
}

impl RecordHeader {
    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != RECORD_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// The persisted contents of the three tanks, in left, right, center order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TankRecord {
    pub left: Option<GasStack>,
    pub right: Option<GasStack>,
    pub center: Option<GasStack>,
}

impl TankRecord {
    pub fn from_tanks(left: &GasTank, right: &GasTank, center: &GasTank) -> Self {
        Self {
            left: left.gas(),
            right: right.gas(),
            center: center.gas(),
        }
    }

    /// Check every stack against a tank capacity without mutating anything.
    pub fn check_fits(&self, capacity: u32) -> Result<(), GasError> {
        GasTank::check_fits(self.left, capacity)?;
        GasTank::check_fits(self.right, capacity)?;
        GasTank::check_fits(self.center, capacity)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordEnvelope {
    header: RecordHeader,
    tanks: TankRecord,
}

pub fn encode_record(record: &TankRecord) -> Result<Vec<u8>, SerializeError> {
    let envelope = RecordEnvelope {
        header: RecordHeader::default(),
        tanks: *record,
    };
    bitcode::serialize(&envelope).map_err(|e| SerializeError::Encode(e.to_string()))
}

/// Decode a record and validate it against the receiving tanks' capacity.
pub fn decode_record(data: &[u8], capacity: u32) -> Result<TankRecord, DeserializeError> {
    let envelope: RecordEnvelope =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    envelope.header.validate()?;
    envelope.tanks.check_fits(capacity)?;
    Ok(envelope.tanks)
}
