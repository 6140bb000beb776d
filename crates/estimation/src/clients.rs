use stable_lp_domain::error::EstimateError;
use stable_lp_protocols::{PoolQuery, QueryError, RouterQuery};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// The read collaborators every estimator needs.
#[derive(Clone)]
pub struct QueryClients {
    pub pool: Arc<dyn PoolQuery>,
    pub router: Arc<dyn RouterQuery>,
}

impl QueryClients {
    pub fn new(pool: Arc<dyn PoolQuery>, router: Arc<dyn RouterQuery>) -> Self {
        Self { pool, router }
    }

    /// Uses one backend for both pool and router reads.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: PoolQuery + RouterQuery + 'static,
    {
        Self {
            pool: backend.clone(),
            router: backend,
        }
    }

    pub fn router_address(&self) -> &str {
        self.router.address()
    }
}

impl fmt::Debug for QueryClients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClients")
            .field("router", &self.router.address())
            .finish_non_exhaustive()
    }
}

/// Logs a failed read and converts it into the estimator outcome.
pub(crate) fn upstream(
    operation: &'static str,
    pool: &str,
) -> impl FnOnce(QueryError) -> EstimateError {
    let pool = pool.to_string();
    move |err| {
        warn!(operation, pool = %pool, error = %err, "Upstream read failed");
        err.into()
    }
}
