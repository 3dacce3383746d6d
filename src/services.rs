//! Remote service contract
//!
//! The chain and indexer clients live outside this crate. Hooks only need
//! the reads below, each keyed by the identifiers that select its data.

use crate::errors::DefiQueriesError;
use crate::session::Address;
use async_trait::async_trait;
use query_key::KeyPart;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors reported by remote services
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Asset symbol, stored uppercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Asset(String);

impl Asset {
    pub fn new(symbol: &str) -> Result<Self, DefiQueriesError> {
        let symbol = symbol.trim();
        if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
            return Err(DefiQueriesError::InvalidAsset(symbol.to_string()));
        }
        Ok(Self(symbol.to_ascii_uppercase()))
    }

    pub fn symbol(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Asset {
    type Error = DefiQueriesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Asset> for String {
    fn from(asset: Asset) -> Self {
        asset.0
    }
}

impl From<&Asset> for KeyPart {
    fn from(asset: &Asset) -> Self {
        KeyPart::Text(asset.0.clone())
    }
}

/// A reward or unlocked position the user can claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimItem {
    pub asset: Asset,
    pub amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub address: Address,
    pub items: Vec<ClaimItem>,
}

impl Claims {
    pub fn is_empty(&self) -> bool {
        self.items.iter().all(|item| item.amount == 0)
    }

    pub fn total_for(&self, asset: &Asset) -> u128 {
        self.items
            .iter()
            .filter(|item| &item.asset == asset)
            .map(|item| item.amount)
            .sum()
    }
}

/// A bid waiting in a liquidation queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationBid {
    pub bidder: Address,
    /// Discount requested by the bidder, in basis points
    pub premium_bps: u16,
    pub amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationQueue {
    pub asset: Asset,
    pub bids: Vec<LiquidationBid>,
}

impl LiquidationQueue {
    pub fn total_bid(&self) -> u128 {
        self.bids.iter().map(|bid| bid.amount).sum()
    }

    /// Bids of one user, used by the "my bids" view
    pub fn bids_of<'a>(&'a self, bidder: &'a Address) -> impl Iterator<Item = &'a LiquidationBid> {
        self.bids.iter().filter(move |bid| &bid.bidder == bidder)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Active,
    Passed,
    Rejected,
    Executed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    Yes,
    No,
    Abstain,
}

/// Governance proposal, optionally annotated with a voter's choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    pub title: String,
    pub status: ProposalStatus,
    pub votes_for: u128,
    pub votes_against: u128,
    #[serde(default)]
    pub voter_choice: Option<VoteChoice>,
}

/// Reads the hooks are built on
#[async_trait]
pub trait DefiService: Send + Sync {
    /// Claimable rewards and unlocked positions of an account
    async fn user_claims(&self, address: &Address) -> Result<Claims, ServiceError>;

    /// Open bids for an asset's liquidation queue
    async fn liquidation_queue(&self, asset: &Asset) -> Result<LiquidationQueue, ServiceError>;

    /// One proposal, with `voter`'s choice filled in
    async fn proposal_by_id(&self, id: u64, voter: &Address) -> Result<Proposal, ServiceError>;

    async fn all_proposals(&self) -> Result<Vec<Proposal>, ServiceError>;
}
