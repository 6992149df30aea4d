//! SCALE-encoded backup of the shared state
//!
//! A compact admin export of ledger and log. Restoring replaces both
//! wholesale, the same way a pull does.

use alloc::vec::Vec;
use parity_scale_codec::{Decode, Encode};
use scale_info::TypeInfo;

use crate::error::{GachaError, GachaResult};
use crate::ledger::PointsLedger;
use crate::records::DrawRecords;
use crate::types::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct Snapshot {
    pub ledger: PointsLedger,
    pub logs: DrawRecords,
    pub exported_at: Timestamp,
}

impl Snapshot {
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode()
    }

    pub fn from_bytes(bytes: &[u8]) -> GachaResult<Self> {
        let mut input = bytes;
        let snapshot = Self::decode(&mut input).map_err(|_| GachaError::CorruptSnapshot)?;
        if !input.is_empty() {
            return Err(GachaError::CorruptSnapshot);
        }
        Ok(snapshot)
    }
}
