/// Errors raised by settlement commands.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementError {
    #[error("tile ({row}, {col}) is outside the {rows}x{cols} map")]
    TileOutOfRange {
        row: i64,
        col: i64,
        rows: u32,
        cols: u32,
    },
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}
