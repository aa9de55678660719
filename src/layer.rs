//! Tower integration.
//!
//! `BackoffLayer` wraps a service so every request goes through `Backoff::run` on a shared
//! instance. Inner errors are retryable unless `should_bail` says otherwise; the service error
//! type is the inner error, unchanged.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use autobackoff::{Backoff, BackoffLayer};
//! use tower::{service_fn, ServiceBuilder};
//!
//! let backoff = Arc::new(Backoff::new(3, Duration::from_millis(50), Duration::from_secs(1)).unwrap());
//! let svc = ServiceBuilder::new()
//!     .layer(BackoffLayer::<std::io::Error>::new(backoff))
//!     .service(service_fn(|req: u32| async move { Ok::<_, std::io::Error>(req * 2) }));
//! # let _ = svc;
//! ```

use std::sync::Arc;

use futures::future::BoxFuture;
use tower::ServiceExt;
use tower_layer::Layer;
use tower_service::Service;

use crate::backoff::Backoff;
use crate::outcome::Outcome;

/// Tower layer running requests through a shared [`Backoff`].
pub struct BackoffLayer<E> {
    backoff: Arc<Backoff>,
    should_bail: Arc<dyn Fn(&E) -> bool + Send + Sync>,
}

impl<E> BackoffLayer<E> {
    /// Every inner error is retried.
    pub fn new(backoff: Arc<Backoff>) -> Self {
        Self { backoff, should_bail: Arc::new(|_| false) }
    }

    /// Predicate marking inner errors that must not be retried.
    pub fn should_bail<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.should_bail = Arc::new(predicate);
        self
    }
}

impl<E> Clone for BackoffLayer<E> {
    fn clone(&self) -> Self {
        Self { backoff: self.backoff.clone(), should_bail: self.should_bail.clone() }
    }
}

impl<E> std::fmt::Debug for BackoffLayer<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackoffLayer")
            .field("backoff", &self.backoff)
            .field("should_bail", &"<predicate>")
            .finish()
    }
}

impl<S, E> Layer<S> for BackoffLayer<E> {
    type Service = BackoffService<S, E>;

    fn layer(&self, service: S) -> Self::Service {
        BackoffService { inner: service, layer: self.clone() }
    }
}

/// Service produced by [`BackoffLayer`].
pub struct BackoffService<S, E> {
    inner: S,
    layer: BackoffLayer<E>,
}

impl<S: Clone, E> Clone for BackoffService<S, E> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), layer: self.layer.clone() }
    }
}

impl<S, E, Request> Service<Request> for BackoffService<S, E>
where
    Request: Clone + Send + 'static,
    S: Service<Request, Error = E> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Future: Send + 'static,
    E: Send + 'static,
{
    type Response = S::Response;
    type Error = E;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let backoff = self.layer.backoff.clone();
        let should_bail = self.layer.should_bail.clone();
        // The instance polled ready serves the first attempt; later attempts use fresh clones.
        let clone = self.inner.clone();
        let ready = std::mem::replace(&mut self.inner, clone);
        let template = ready.clone();

        Box::pin(async move {
            let mut ready = Some(ready);
            backoff
                .run(move || {
                    let req = req.clone();
                    let should_bail = should_bail.clone();
                    let first = ready.take();
                    let svc = template.clone();
                    async move {
                        let result = match first {
                            Some(mut first) => first.call(req).await,
                            None => svc.oneshot(req).await,
                        };
                        match result {
                            Ok(resp) => Outcome::Success(resp),
                            Err(err) if should_bail(&err) => Outcome::bail(err),
                            Err(err) => Outcome::Retry(err),
                        }
                    }
                })
                .await
        })
    }
}
