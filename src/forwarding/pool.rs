//! Shared outbound client and admission bounds.
//!
//! # Responsibilities
//! - Own the single pooled HTTP client used for every backend
//! - Bound in-flight exchanges in total and per backend origin
//! - Provide RAII guards that release their slot when the relay ends
//!
//! # Design Decisions
//! - Keep-alive reuse and idle bounds come from the client's own pool
//! - Waiting for a slot happens inside the request deadline
//! - Per-origin slots are acquired before the global one so a saturated
//!   backend cannot starve the others

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::redirect::Policy;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::{PoolConfig, TimeoutConfig};
use crate::forwarding::error::ForwardError;
use crate::routing::ServiceMap;

/// Build the pooled client shared by all requests.
pub fn build_client(
    timeouts: &TimeoutConfig,
    pool: &PoolConfig,
) -> Result<reqwest::Client, reqwest::Error> {
    let redirect = if pool.max_redirects == 0 {
        Policy::none()
    } else {
        Policy::limited(pool.max_redirects)
    };

    reqwest::Client::builder()
        .connect_timeout(timeouts.connect())
        .pool_idle_timeout(timeouts.pool_idle())
        .pool_max_idle_per_host(pool.max_idle_per_backend)
        .redirect(redirect)
        .no_proxy()
        .build()
}

/// The client plus the semaphores that bound how much of it is in use.
#[derive(Debug)]
pub struct UpstreamPool {
    client: reqwest::Client,
    total: Arc<Semaphore>,
    per_backend: HashMap<String, Arc<Semaphore>>,
    max_total: usize,
}

impl UpstreamPool {
    /// Create the pool, with one admission bound per distinct backend origin.
    pub fn new(
        services: &ServiceMap,
        timeouts: &TimeoutConfig,
        pool: &PoolConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = build_client(timeouts, pool)?;

        let per_backend = services
            .backends()
            .map(|b| {
                (
                    b.origin().to_string(),
                    Arc::new(Semaphore::new(pool.max_connections_per_backend)),
                )
            })
            .collect();

        Ok(Self {
            client,
            total: Arc::new(Semaphore::new(pool.max_connections)),
            per_backend,
            max_total: pool.max_connections,
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Wait for a free exchange slot towards `origin`.
    pub async fn admit(&self, origin: &str) -> Result<ExchangeGuard, ForwardError> {
        let backend = match self.per_backend.get(origin) {
            Some(sem) => Some(
                sem.clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| ForwardError::ShuttingDown)?,
            ),
            None => None,
        };

        let total = self
            .total
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ForwardError::ShuttingDown)?;

        tracing::trace!(
            origin = %origin,
            available = self.total.available_permits(),
            "Exchange admitted"
        );

        Ok(ExchangeGuard {
            _backend: backend,
            _total: total,
        })
    }

    /// Number of exchanges currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.max_total - self.total.available_permits()
    }

    /// Refuse further admissions. Exchanges already admitted run to the end.
    pub fn close(&self) {
        self.total.close();
        for sem in self.per_backend.values() {
            sem.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.total.is_closed()
    }
}

/// Holds an exchange slot; dropping it frees the slot.
#[derive(Debug)]
pub struct ExchangeGuard {
    _backend: Option<OwnedSemaphorePermit>,
    _total: OwnedSemaphorePermit,
}
