//! Integration tests for the DeFi hooks
//!
//! Drives the claims, liquidation and proposal hooks against an in-memory
//! service: activation on wallet state, shared invocations, account
//! switches while a request is pending, failures kept as data, and
//! invalidation after user actions.

use async_trait::async_trait;
use defi_queries::prelude::{
    Address, AppConfig, Asset, ClaimItem, Claims, DefiQueries, DefiQueriesError, DefiService,
    EventType, LiquidationBid, LiquidationQueue, Proposal, ProposalStatus, QueryCache,
    QueryKey, ServiceError, Session, VoteChoice, follow_session, use_check_claims,
    use_check_liquidation, use_proposal_by_id, use_proposals,
};
use defi_queries::hooks::defi::{claims_key, proposal_key};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// In-memory service with call counters and a gate for one slow voter
struct MockDefi {
    claims_calls: AtomicUsize,
    liquidation_calls: AtomicUsize,
    proposal_calls: Mutex<Vec<(u64, String)>>,
    list_calls: AtomicUsize,
    reject_claims: AtomicBool,
    slow_voter: Option<(String, Arc<Semaphore>)>,
}

impl MockDefi {
    fn new() -> Self {
        Self {
            claims_calls: AtomicUsize::new(0),
            liquidation_calls: AtomicUsize::new(0),
            proposal_calls: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
            reject_claims: AtomicBool::new(false),
            slow_voter: None,
        }
    }

    /// Proposal reads for `voter` wait for a permit on `gate`
    fn with_slow_voter(voter: &str, gate: Arc<Semaphore>) -> Self {
        Self {
            slow_voter: Some((voter.to_string(), gate)),
            ..Self::new()
        }
    }

    fn claims_calls(&self) -> usize {
        self.claims_calls.load(Ordering::SeqCst)
    }

    fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DefiService for MockDefi {
    async fn user_claims(&self, address: &Address) -> Result<Claims, ServiceError> {
        self.claims_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.reject_claims.load(Ordering::SeqCst) {
            return Err(ServiceError::Rejected("claims contract paused".to_string()));
        }
        Ok(Claims {
            address: address.clone(),
            items: vec![ClaimItem {
                asset: Asset::new("USK").map_err(|e| ServiceError::Rejected(e.to_string()))?,
                amount: 1_500,
            }],
        })
    }

    async fn liquidation_queue(&self, asset: &Asset) -> Result<LiquidationQueue, ServiceError> {
        self.liquidation_calls.fetch_add(1, Ordering::SeqCst);
        let bidder =
            Address::parse("0xb1d").map_err(|e| ServiceError::Transport(e.to_string()))?;
        Ok(LiquidationQueue {
            asset: asset.clone(),
            bids: vec![
                LiquidationBid { bidder: bidder.clone(), premium_bps: 100, amount: 40 },
                LiquidationBid { bidder, premium_bps: 300, amount: 60 },
            ],
        })
    }

    async fn proposal_by_id(&self, id: u64, voter: &Address) -> Result<Proposal, ServiceError> {
        self.proposal_calls
            .lock()
            .unwrap()
            .push((id, voter.to_string()));
        if let Some((slow, gate)) = &self.slow_voter {
            if slow == voter.as_str() {
                gate.acquire()
                    .await
                    .map_err(|e| ServiceError::Transport(e.to_string()))?
                    .forget();
            }
        }
        Ok(Proposal {
            id,
            title: format!("Proposal {id}"),
            status: ProposalStatus::Active,
            votes_for: 10,
            votes_against: 2,
            voter_choice: match voter.as_str() {
                "0xdef" => Some(VoteChoice::Yes),
                _ => Some(VoteChoice::No),
            },
        })
    }

    async fn all_proposals(&self) -> Result<Vec<Proposal>, ServiceError> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst) as u64;
        Ok(vec![Proposal {
            id: call,
            title: "Lower liquidation fee".to_string(),
            status: ProposalStatus::Passed,
            votes_for: 100,
            votes_against: 1,
            voter_choice: None,
        }])
    }
}

fn address(raw: &str) -> Address {
    Address::parse(raw).unwrap()
}

// ============================================================================
// Claims
// ============================================================================

#[tokio::test]
async fn test_claims_idle_without_wallet() {
    let cache = QueryCache::default();
    let service = Arc::new(MockDefi::new());

    let mut hook = use_check_claims(&cache, service.clone(), None);
    let state = hook.settled().await;

    assert!(state.is_idle());
    assert!(!state.is_loading());
    assert!(state.data().is_none());
    assert!(state.error().is_none());
    assert_eq!(service.claims_calls(), 0);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_claims_fetched_once_for_address() {
    let cache = QueryCache::default();
    let service = Arc::new(MockDefi::new());
    let started = Arc::new(AtomicUsize::new(0));
    let counter = started.clone();
    cache
        .signals()
        .add_callback(move |event| {
            if event.event_type == EventType::FetchStarted {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .unwrap();

    let mut first = use_check_claims(&cache, service.clone(), Some(address("0xABC")));
    let mut second = use_check_claims(&cache, service.clone(), Some(address("0xabc")));
    assert!(first.is_loading());

    let state = first.settled().await;
    let again = second.settled().await;

    assert!(state.is_success());
    assert_eq!(state.data().unwrap().total_for(&Asset::new("usk").unwrap()), 1_500);
    assert!(Arc::ptr_eq(
        state.data.as_ref().unwrap(),
        again.data.as_ref().unwrap()
    ));
    assert_eq!(service.claims_calls(), 1);
    assert_eq!(started.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_claims_rejection_is_data() {
    let cache = QueryCache::default();
    let service = Arc::new(MockDefi::new());
    service.reject_claims.store(true, Ordering::SeqCst);

    let mut hook = use_check_claims(&cache, service.clone(), Some(address("0xabc")));
    let state = hook.settled().await;

    assert!(state.is_error());
    assert!(!state.is_loading());
    let error = state.error().unwrap();
    assert_eq!(
        error.downcast_ref::<ServiceError>(),
        Some(&ServiceError::Rejected("claims contract paused".to_string()))
    );
    assert!(error.to_string().contains("claims contract paused"));
}

#[tokio::test]
async fn test_failed_refetch_keeps_claims() {
    let cache = QueryCache::default();
    let service = Arc::new(MockDefi::new());
    let mut hook = use_check_claims(&cache, service.clone(), Some(address("0xabc")));
    assert!(hook.settled().await.is_success());

    service.reject_claims.store(true, Ordering::SeqCst);
    assert!(hook.refetch());
    let state = hook.settled().await;

    assert!(state.is_error());
    assert_eq!(state.data().unwrap().address, address("0xabc"));
    assert_eq!(service.claims_calls(), 2);

    service.reject_claims.store(false, Ordering::SeqCst);
    assert!(hook.refetch());
    let state = hook.settled().await;
    assert!(state.is_success());
    assert!(state.error().is_none());
}

// ============================================================================
// Proposals
// ============================================================================

#[tokio::test]
async fn test_voter_switch_reflects_only_new_key() {
    let cache = QueryCache::default();
    let gate = Arc::new(Semaphore::new(0));
    let service = Arc::new(MockDefi::with_slow_voter("0xabc", gate.clone()));

    let mut hook = use_proposal_by_id(&cache, service.clone(), Some(42), Some(address("0xABC")));
    assert!(hook.is_loading());

    hook.set_identifiers((Some(42), Some(address("0xDEF"))));
    let state = hook.settled().await;

    assert!(state.is_success());
    assert_eq!(hook.key(), Some(&proposal_key(Some(42), Some(&address("0xdef")))));
    let proposal = state.data().unwrap();
    assert_eq!(proposal.id, 42);
    assert_eq!(proposal.voter_choice, Some(VoteChoice::Yes));

    // The old request resolves into its own entry only
    gate.add_permits(1);
    let old_key = proposal_key(Some(42), Some(&address("0xabc")));
    let old = cache
        .fetch_query(old_key, || async {
            Err::<Proposal, _>(anyhow::anyhow!("entry should already be in flight"))
        })
        .await
        .unwrap();
    assert_eq!(old.voter_choice, Some(VoteChoice::No));
    assert_eq!(hook.data().unwrap().voter_choice, Some(VoteChoice::Yes));
    assert_eq!(service.proposal_calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_proposal_waits_for_both_identifiers() {
    let cache = QueryCache::default();
    let service = Arc::new(MockDefi::new());

    let mut hook = use_proposal_by_id(&cache, service.clone(), None, Some(address("0xabc")));
    assert!(hook.state().is_idle());
    hook.set_identifiers((Some(7), None));
    assert!(hook.state().is_idle());
    assert!(cache.is_empty());

    hook.set_identifiers((Some(7), Some(address("0xabc"))));
    let state = hook.settled().await;
    assert_eq!(state.data().unwrap().title, "Proposal 7");
    assert_eq!(
        *service.proposal_calls.lock().unwrap(),
        vec![(7, "0xabc".to_string())]
    );
}

#[tokio::test]
async fn test_vote_invalidates_proposals() {
    let config = AppConfig::default();
    let service = Arc::new(MockDefi::new());
    let queries = DefiQueries::new(&config, service.clone()).unwrap();
    queries.connect("0xabc").unwrap();

    let mut list = queries.proposals();
    let mut single = queries.proposal(Some(1));
    assert_eq!(list.settled().await.data().unwrap()[0].id, 0);
    single.settled().await;

    assert_eq!(queries.after_vote().unwrap(), 2);
    assert!(list.is_loading());

    let state = list.settled().await;
    assert_eq!(state.data().unwrap()[0].id, 1);
    single.settled().await;
    assert_eq!(service.list_calls(), 2);
    assert_eq!(service.proposal_calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_proposals_always_enabled() {
    let cache = QueryCache::default();
    let service = Arc::new(MockDefi::new());
    let mut hook = use_proposals(&cache, service.clone());

    assert!(hook.is_active());
    let state = hook.settled().await;
    assert_eq!(state.data().unwrap().len(), 1);
    assert_eq!(service.list_calls(), 1);
}

// ============================================================================
// Liquidation
// ============================================================================

#[tokio::test]
async fn test_liquidation_requires_asset() {
    let cache = QueryCache::default();
    let service = Arc::new(MockDefi::new());

    let mut hook = use_check_liquidation(&cache, service.clone(), None);
    assert!(hook.settled().await.is_idle());
    assert_eq!(service.liquidation_calls.load(Ordering::SeqCst), 0);

    let eth = Asset::new("eth").unwrap();
    hook.set_identifiers(Some(eth.clone()));
    let state = hook.settled().await;
    let queue = state.data().unwrap();
    assert_eq!(queue.asset, eth);
    assert_eq!(queue.total_bid(), 100);
    assert_eq!(queue.bids_of(&address("0xb1d")).count(), 2);
}

// ============================================================================
// Session and invalidation
// ============================================================================

#[tokio::test]
async fn test_hook_follows_session() {
    let cache = QueryCache::default();
    let service = Arc::new(MockDefi::new());
    let session = Session::new();
    let mut wallet = session.subscribe();
    let mut hook = use_check_claims(&cache, service.clone(), None);

    session.connect(address("0xABC"));
    assert!(follow_session(&mut hook, &mut wallet, |address| address).await);
    let state = hook.settled().await;
    assert_eq!(state.data().unwrap().address.as_str(), "0xabc");

    session.disconnect();
    assert!(follow_session(&mut hook, &mut wallet, |address| address).await);
    assert!(hook.state().is_idle());
    assert_eq!(cache.observer_count(&claims_key(Some(&address("0xabc")))), 0);

    drop(session);
    assert!(!follow_session(&mut hook, &mut wallet, |address| address).await);
}

#[tokio::test]
async fn test_claim_refreshes_next_observer() {
    let service = Arc::new(MockDefi::new());
    let queries = DefiQueries::new(&AppConfig::default(), service.clone()).unwrap();
    queries.connect("0xabc").unwrap();

    let mut hook = queries.claims();
    hook.settled().await;
    drop(hook);

    // Unobserved: marked stale, refetched on the next attach
    assert_eq!(queries.after_claim().unwrap(), 1);
    assert_eq!(service.claims_calls(), 1);

    let mut hook = queries.claims();
    assert!(hook.is_loading());
    hook.settled().await;
    assert_eq!(service.claims_calls(), 2);
}

#[tokio::test]
async fn test_disconnected_wallet_yields_idle_hooks() {
    let service = Arc::new(MockDefi::new());
    let queries = DefiQueries::new(&AppConfig::default(), service.clone()).unwrap();

    assert!(queries.claims().state().is_idle());
    assert!(queries.proposal(Some(3)).state().is_idle());
    assert!(queries.cache().is_empty());
    assert!(matches!(
        queries.connect("0xnothex"),
        Err(DefiQueriesError::InvalidAddress(_))
    ));
}

#[tokio::test]
async fn test_shutdown_reports_error_state() {
    let service = Arc::new(MockDefi::new());
    let queries = DefiQueries::new(&AppConfig::default(), service.clone()).unwrap();
    queries.connect("0xabc").unwrap();
    queries.shutdown();

    assert!(!queries.session().is_connected());
    let mut hook = use_check_claims(queries.cache(), service.clone(), Some(address("0xabc")));
    let state = hook.settled().await;
    assert!(state.is_error());
    assert_eq!(service.claims_calls(), 0);
    assert!(!queries.cache().contains(&QueryKey::new("claims").with(&address("0xabc"))));
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = AppConfig::default();
    config.query.gc_interval_ms = 0;
    let service = Arc::new(MockDefi::new());

    assert!(matches!(
        DefiQueries::new(&config, service),
        Err(DefiQueriesError::Config(_))
    ));
}
