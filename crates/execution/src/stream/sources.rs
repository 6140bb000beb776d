//! Estimate sources reading from the shared registry.
//!
//! Each source holds the registry read lock only while preparing the plan;
//! the on-chain reads run after it is released so the updater is never
//! blocked behind a slow quote.

use super::EstimateSource;
use crate::sync::SharedRegistry;
use async_trait::async_trait;
use stable_lp_domain::error::EstimateError;
use stable_lp_domain::value_objects::{DepositEstimate, SwapEstimate, WithdrawEstimate};
use stable_lp_estimation::deposit::{DepositEstimator, DepositPlan, DepositRequest};
use stable_lp_estimation::swap::{SwapEstimator, SwapPlan, SwapRequest};
use stable_lp_estimation::withdraw::{WithdrawEstimator, WithdrawPlan, WithdrawRequest};
use stable_lp_estimation::QueryClients;

/// Swap estimates for a [`SwapRequest`].
#[derive(Debug, Clone)]
pub struct SwapSource {
    estimator: SwapEstimator,
    registry: SharedRegistry,
}

impl SwapSource {
    pub fn new(clients: QueryClients, registry: SharedRegistry) -> Self {
        Self {
            estimator: SwapEstimator::new(clients),
            registry,
        }
    }
}

#[async_trait]
impl EstimateSource for SwapSource {
    type Input = SwapRequest;
    type Output = SwapEstimate;

    async fn estimate(&self, input: &SwapRequest) -> Result<SwapEstimate, EstimateError> {
        let plan = SwapPlan::prepare(&*self.registry.read().await, input)?;
        self.estimator.quote(&plan).await
    }
}

/// Deposit estimates for a [`DepositRequest`].
#[derive(Debug, Clone)]
pub struct DepositSource {
    estimator: DepositEstimator,
    registry: SharedRegistry,
}

impl DepositSource {
    pub fn new(clients: QueryClients, registry: SharedRegistry) -> Self {
        Self {
            estimator: DepositEstimator::new(clients),
            registry,
        }
    }
}

#[async_trait]
impl EstimateSource for DepositSource {
    type Input = DepositRequest;
    type Output = DepositEstimate;

    async fn estimate(&self, input: &DepositRequest) -> Result<DepositEstimate, EstimateError> {
        let plan = DepositPlan::prepare(&*self.registry.read().await, input)?;
        self.estimator.quote(&plan).await
    }
}

/// Withdraw estimates for a [`WithdrawRequest`].
#[derive(Debug, Clone)]
pub struct WithdrawSource {
    estimator: WithdrawEstimator,
    registry: SharedRegistry,
}

impl WithdrawSource {
    pub fn new(clients: QueryClients, registry: SharedRegistry) -> Self {
        Self {
            estimator: WithdrawEstimator::new(clients),
            registry,
        }
    }
}

#[async_trait]
impl EstimateSource for WithdrawSource {
    type Input = WithdrawRequest;
    type Output = WithdrawEstimate;

    async fn estimate(&self, input: &WithdrawRequest) -> Result<WithdrawEstimate, EstimateError> {
        let plan = WithdrawPlan::prepare(&*self.registry.read().await, input)?;
        self.estimator.quote(&plan).await
    }
}
