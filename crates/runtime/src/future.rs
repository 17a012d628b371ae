use std::future::Future;
use std::pin::Pin;

/// Boxed future that can be sent between threads.
///
/// Collaborator traits return this instead of `async fn` so they stay
/// dyn-compatible.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
