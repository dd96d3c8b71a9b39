use crate::{Result, StatementResult};

/// A connection that can run SQL batches and be released.
///
/// Implementations must return exactly one [`StatementResult`] per statement
/// in `sql`, in submission order. A statement that fails is reported through
/// [`StatementResult::is_error`]; `Err` is reserved for failures of the
/// channel itself (transport, protocol decoding).
///
/// `release` consumes the connection, so it can run at most once.
#[allow(async_fn_in_trait)]
pub trait ExecutionChannel: Sized {
    async fn execute(&mut self, sql: &str) -> Result<Vec<StatementResult>>;

    async fn release(self) -> Result<()>;
}
