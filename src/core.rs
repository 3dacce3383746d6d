//! Core defi-queries functionality
//!
//! This module contains the `DefiQueries` coordinator: it owns the shared
//! query cache, the remote service and the wallet session, and hands out
//! hooks already keyed on the connected account.

use std::sync::Arc;

use crate::errors::DefiQueriesError;
use crate::hooks::defi::{self, ClaimsHook, LiquidationHook, ProposalHook, ProposalsHook};
use crate::services::{Asset, DefiService};
use crate::session::{Address, Session, WalletProvider};
use config::AppConfig;
use query_cache::QueryCache;

/// Main coordinator for the query layer
#[derive(Clone)]
pub struct DefiQueries {
    cache: QueryCache,
    service: Arc<dyn DefiService>,
    session: Session,
}

impl DefiQueries {
    /// Create a coordinator from configuration. Does not start background work.
    pub fn new(config: &AppConfig, service: Arc<dyn DefiService>) -> Result<Self, DefiQueriesError> {
        config.validate()?;
        Ok(Self {
            cache: QueryCache::from_config(config),
            service,
            session: Session::new(),
        })
    }

    /// Load configuration from the environment, then start the collector.
    /// Must be called from within a Tokio runtime.
    pub fn init(service: Arc<dyn DefiService>) -> Result<Self, DefiQueriesError> {
        let config = AppConfig::load()?;
        let queries = Self::new(&config, service)?;
        queries.cache.start_gc()?;
        tracing::info!("defi-queries initialised");
        Ok(queries)
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn service(&self) -> Arc<dyn DefiService> {
        Arc::clone(&self.service)
    }

    pub fn connect(&self, raw_address: &str) -> Result<Address, DefiQueriesError> {
        let address = Address::parse(raw_address)?;
        self.session.connect(address.clone());
        Ok(address)
    }

    pub fn disconnect(&self) {
        self.session.disconnect();
    }

    /// Claims of the connected account; idle while no wallet is connected
    pub fn claims(&self) -> ClaimsHook {
        defi::use_check_claims(&self.cache, self.service(), self.session.current_address())
    }

    pub fn liquidation(&self, asset: Option<Asset>) -> LiquidationHook {
        defi::use_check_liquidation(&self.cache, self.service(), asset)
    }

    /// Proposal `id` with the connected account's vote
    pub fn proposal(&self, id: Option<u64>) -> ProposalHook {
        defi::use_proposal_by_id(&self.cache, self.service(), id, self.session.current_address())
    }

    pub fn proposals(&self) -> ProposalsHook {
        defi::use_proposals(&self.cache, self.service())
    }

    /// Refresh what a claim transaction changed
    pub fn after_claim(&self) -> Result<usize, DefiQueriesError> {
        let address = self.session.current_address();
        Ok(defi::invalidate_claims(&self.cache, address.as_ref())?)
    }

    /// Refresh what a vote changed
    pub fn after_vote(&self) -> Result<usize, DefiQueriesError> {
        Ok(defi::invalidate_proposals(&self.cache)?)
    }

    /// Refresh a liquidation queue after placing or retracting a bid
    pub fn after_bid(&self, asset: &Asset) -> Result<usize, DefiQueriesError> {
        Ok(defi::invalidate_liquidation(&self.cache, Some(asset))?)
    }

    pub fn shutdown(&self) {
        self.session.disconnect();
        self.cache.shutdown();
    }
}

impl std::fmt::Debug for DefiQueries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefiQueries")
            .field("cache", &self.cache)
            .field("session", &self.session)
            .finish()
    }
}
