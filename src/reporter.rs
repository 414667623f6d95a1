//! Global backstop for faults that escape the update handlers.

use std::fmt::Debug;
use std::sync::Arc;

use futures::future::BoxFuture;
use teloxide::error_handlers::ErrorHandler;
use tracing::error;

/// Logs dispatcher-level faults at error severity and swallows them; the
/// event loop keeps serving subsequent updates. The user-facing apology lives
/// in the relay's own failure path, the only place a reply target exists.
pub struct ErrorReporter;

impl<E> ErrorHandler<E> for ErrorReporter
where
    E: Debug + Send + 'static,
{
    fn handle_error(self: Arc<Self>, error: E) -> BoxFuture<'static, ()> {
        error!("Unhandled error while processing an update: {error:?}");
        Box::pin(async {})
    }
}
