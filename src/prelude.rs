//! Convenience re-exports for common defi-queries usage
//!
//! ```rust
//! use defi_queries::prelude::*;
//! ```

// Core components
pub use crate::core::DefiQueries;
pub use crate::errors::DefiQueriesError;
pub use crate::hooks::QueryHook;
pub use crate::hooks::defi::{
    ClaimsHook, LiquidationHook, ProposalHook, ProposalsHook, follow_session, invalidate_claims,
    invalidate_liquidation, invalidate_proposals, use_check_claims, use_check_liquidation,
    use_proposal_by_id, use_proposals,
};
pub use crate::services::{
    Asset, ClaimItem, Claims, DefiService, LiquidationBid, LiquidationQueue, Proposal,
    ProposalStatus, ServiceError, VoteChoice,
};
pub use crate::session::{Address, Session, WalletProvider};

// Re-export centralized config
pub use config::{AppConfig, QueryConfig, SignalConfig};

// Re-export query cache, keys and signals
pub use query_cache::prelude::*;

// Common external dependencies
pub use async_trait::async_trait;
