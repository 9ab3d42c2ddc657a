//! Tape drive operation types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TapeError {
    #[error("unknown tape operation code: {0}")]
    UnknownOperation(i32),
}

/// Kind of work a tape drive is asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    ReadAggr = 1,
    WriteAggr = 2,
    LoadTape = 3,
    UnloadTape = 4,
    Inventory = 5,
    RollTape = 6,
}

impl OperationKind {
    pub const ALL: [OperationKind; 6] = [
        OperationKind::ReadAggr,
        OperationKind::WriteAggr,
        OperationKind::LoadTape,
        OperationKind::UnloadTape,
        OperationKind::Inventory,
        OperationKind::RollTape,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::ReadAggr => "read_aggr",
            OperationKind::WriteAggr => "write_aggr",
            OperationKind::LoadTape => "load_tape",
            OperationKind::UnloadTape => "unload_tape",
            OperationKind::Inventory => "inventory",
            OperationKind::RollTape => "roll_tape",
        }
    }

    /// True for operations that move the cartridge rather than data.
    pub fn is_mechanical(self) -> bool {
        matches!(
            self,
            OperationKind::LoadTape | OperationKind::UnloadTape | OperationKind::RollTape
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i32> for OperationKind {
    type Error = TapeError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| *kind as i32 == code)
            .ok_or(TapeError::UnknownOperation(code))
    }
}

/// One queued drive operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapeOperation {
    kind: OperationKind,
}

impl TapeOperation {
    pub fn new(kind: OperationKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: OperationKind) {
        self.kind = kind;
    }
}

impl From<OperationKind> for TapeOperation {
    fn from(kind: OperationKind) -> Self {
        Self::new(kind)
    }
}
