use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Consumer of collection operations that maintains some derived state.
pub trait CollectionsOperationHandler<Op>: Send + Sync {
    fn handle_operation(&self, operation: Op);

    /// Called when the handler fell behind and `skipped` operations were lost.
    /// Implementations that need exact state should rebuild it here.
    fn on_lagged(&self, skipped: u64) {
        warn!(skipped, "operation handler lagged behind its collection");
    }
}

/// Drives `handler` with every operation received on `receiver` until the
/// collection is dropped.
pub fn spawn_operation_handler<Op, H>(
    mut receiver: broadcast::Receiver<Op>,
    handler: Arc<H>,
) -> JoinHandle<()>
where
    Op: Clone + Send + 'static,
    H: CollectionsOperationHandler<Op> + ?Sized + 'static,
{
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(operation) => handler.handle_operation(operation),
                Err(RecvError::Lagged(skipped)) => handler.on_lagged(skipped),
                Err(RecvError::Closed) => {
                    debug!("collection closed, stopping operation handler");
                    break;
                }
            }
        }
    })
}
