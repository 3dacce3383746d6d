//! DeFi query hooks
//!
//! Thin bindings of `DefiService` reads to cache keys. Each hook is inactive
//! until its identifiers are all present (wallet connected, asset selected,
//! proposal chosen).

use super::QueryHook;
use crate::services::{Asset, Claims, DefiService, LiquidationQueue, Proposal};
use crate::session::Address;
use anyhow::Context;
use query_cache::{QueryCache, QueryError};
use query_key::QueryKey;
use std::sync::Arc;
use tokio::sync::watch;

pub const CLAIMS_SCOPE: &str = "claims";
pub const LIQUIDATION_SCOPE: &str = "liquidation";
pub const PROPOSAL_SCOPE: &str = "proposal";
pub const PROPOSALS_SCOPE: &str = "proposals";

pub type ClaimsHook = QueryHook<Option<Address>, Claims>;
pub type LiquidationHook = QueryHook<Option<Asset>, LiquidationQueue>;
/// Identifiers are `(proposal id, voter)`
pub type ProposalHook = QueryHook<(Option<u64>, Option<Address>), Proposal>;
pub type ProposalsHook = QueryHook<(), Vec<Proposal>>;

pub fn claims_key(address: Option<&Address>) -> QueryKey {
    QueryKey::new(CLAIMS_SCOPE).with(address)
}

pub fn liquidation_key(asset: Option<&Asset>) -> QueryKey {
    QueryKey::new(LIQUIDATION_SCOPE).with(asset)
}

pub fn proposal_key(id: Option<u64>, voter: Option<&Address>) -> QueryKey {
    QueryKey::new(PROPOSAL_SCOPE).with(voter).with(id)
}

pub fn proposals_key() -> QueryKey {
    QueryKey::new(PROPOSALS_SCOPE)
}

/// Claimable rewards of the connected account
pub fn use_check_claims(
    cache: &QueryCache,
    service: Arc<dyn DefiService>,
    address: Option<Address>,
) -> ClaimsHook {
    let mut hook = QueryHook::new(
        cache.clone(),
        |address: &Option<Address>| claims_key(address.as_ref()),
        move |address: Option<Address>| {
            let service = Arc::clone(&service);
            async move {
                let address = address.context("wallet not connected")?;
                Ok::<_, anyhow::Error>(service.user_claims(&address).await?)
            }
        },
    );
    hook.set_identifiers(address);
    hook
}

/// Liquidation queue of the selected asset
pub fn use_check_liquidation(
    cache: &QueryCache,
    service: Arc<dyn DefiService>,
    asset: Option<Asset>,
) -> LiquidationHook {
    let mut hook = QueryHook::new(
        cache.clone(),
        |asset: &Option<Asset>| liquidation_key(asset.as_ref()),
        move |asset: Option<Asset>| {
            let service = Arc::clone(&service);
            async move {
                let asset = asset.context("no asset selected")?;
                Ok::<_, anyhow::Error>(service.liquidation_queue(&asset).await?)
            }
        },
    );
    hook.set_identifiers(asset);
    hook
}

/// One proposal as seen by `voter`
pub fn use_proposal_by_id(
    cache: &QueryCache,
    service: Arc<dyn DefiService>,
    id: Option<u64>,
    voter: Option<Address>,
) -> ProposalHook {
    let mut hook = QueryHook::new(
        cache.clone(),
        |(id, voter): &(Option<u64>, Option<Address>)| proposal_key(*id, voter.as_ref()),
        move |(id, voter): (Option<u64>, Option<Address>)| {
            let service = Arc::clone(&service);
            async move {
                let id = id.context("no proposal selected")?;
                let voter = voter.context("wallet not connected")?;
                let proposal = service
                    .proposal_by_id(id, &voter)
                    .await
                    .with_context(|| format!("loading proposal {id}"))?;
                Ok::<_, anyhow::Error>(proposal)
            }
        },
    );
    hook.set_identifiers((id, voter));
    hook
}

/// Every proposal, no identifiers required
pub fn use_proposals(cache: &QueryCache, service: Arc<dyn DefiService>) -> ProposalsHook {
    let mut hook = QueryHook::new(
        cache.clone(),
        |_: &()| proposals_key(),
        move |_: ()| {
            let service = Arc::clone(&service);
            async move { Ok::<_, anyhow::Error>(service.all_proposals().await?) }
        },
    );
    hook.set_identifiers(());
    hook
}

/// Mark claims stale after a claim transaction. `None` covers every account.
pub fn invalidate_claims(cache: &QueryCache, address: Option<&Address>) -> Result<usize, QueryError> {
    match address {
        Some(address) => cache.invalidate_prefix(&claims_key(Some(address))),
        None => cache.invalidate_prefix(&QueryKey::new(CLAIMS_SCOPE)),
    }
}

/// Mark a liquidation queue stale after placing or retracting a bid
pub fn invalidate_liquidation(cache: &QueryCache, asset: Option<&Asset>) -> Result<usize, QueryError> {
    match asset {
        Some(asset) => cache.invalidate_prefix(&liquidation_key(Some(asset))),
        None => cache.invalidate_prefix(&QueryKey::new(LIQUIDATION_SCOPE)),
    }
}

/// Mark every proposal read stale after a vote
pub fn invalidate_proposals(cache: &QueryCache) -> Result<usize, QueryError> {
    let single = cache.invalidate_prefix(&QueryKey::new(PROPOSAL_SCOPE))?;
    let lists = cache.invalidate_prefix(&proposals_key())?;
    Ok(single + lists)
}

/// Wait for the next wallet change and re-key `hook` with it.
///
/// `identifiers` maps the new address onto the hook's identifier tuple.
/// Returns `false` once the session is gone.
pub async fn follow_session<I, T, M>(
    hook: &mut QueryHook<I, T>,
    wallet: &mut watch::Receiver<Option<Address>>,
    identifiers: M,
) -> bool
where
    I: Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
    M: FnOnce(Option<Address>) -> I,
{
    if wallet.changed().await.is_err() {
        return false;
    }
    let address = wallet.borrow_and_update().clone();
    hook.set_identifiers(identifiers(address));
    true
}
