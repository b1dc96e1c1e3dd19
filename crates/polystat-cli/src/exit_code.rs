//! Process exit codes.

pub const SUCCESS: u8 = 0;
pub const GENERAL_ERROR: u8 = 1;
/// The panel record is not valid JSON or has the wrong shape.
pub const CONFIG_INVALID: u8 = 3;
/// Series data could not be parsed or ingested.
pub const DATA_INVALID: u8 = 4;
pub const NOT_FOUND: u8 = 5;
