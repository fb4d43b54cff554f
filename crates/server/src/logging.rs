use crate::error::ServerError;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Sends `tracing` events up to `level` to standard output.
///
/// Fails if a global subscriber is already installed.
pub fn init(level: Level) -> Result<(), ServerError> {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).map_err(ServerError::logging)
}
