//! # Dashboard Walkthrough
//!
//! This demo drives the hooks the way a dashboard page would:
//! - Hooks stay idle until a wallet is connected
//! - Two widgets reading the same claims share one request
//! - Switching accounts while a proposal is loading
//! - Refreshing proposals after a vote
//!
//! Run with `RUST_LOG=debug cargo run --example dashboard --features debug-logging`
//! to see the cache events.

use defi_queries::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Service answering from memory after a short delay
struct SlowChain {
    latency: Duration,
}

impl SlowChain {
    fn asset(symbol: &str) -> Result<Asset, ServiceError> {
        Asset::new(symbol).map_err(|e| ServiceError::Rejected(e.to_string()))
    }
}

#[async_trait]
impl DefiService for SlowChain {
    async fn user_claims(&self, address: &Address) -> Result<Claims, ServiceError> {
        tokio::time::sleep(self.latency).await;
        Ok(Claims {
            address: address.clone(),
            items: vec![
                ClaimItem { asset: Self::asset("USK")?, amount: 2_500_000 },
                ClaimItem { asset: Self::asset("KUJI")?, amount: 120_000 },
            ],
        })
    }

    async fn liquidation_queue(&self, asset: &Asset) -> Result<LiquidationQueue, ServiceError> {
        tokio::time::sleep(self.latency).await;
        let bidder = Address::parse("0x5eed").map_err(|e| ServiceError::Transport(e.to_string()))?;
        Ok(LiquidationQueue {
            asset: asset.clone(),
            bids: vec![LiquidationBid { bidder, premium_bps: 250, amount: 10_000 }],
        })
    }

    async fn proposal_by_id(&self, id: u64, voter: &Address) -> Result<Proposal, ServiceError> {
        tokio::time::sleep(self.latency).await;
        if id == 0 {
            return Err(ServiceError::NotFound(format!("proposal {id}")));
        }
        Ok(Proposal {
            id,
            title: format!("Proposal #{id}"),
            status: ProposalStatus::Active,
            votes_for: 1_000,
            votes_against: 250,
            voter_choice: voter.as_str().ends_with('c').then_some(VoteChoice::Yes),
        })
    }

    async fn all_proposals(&self) -> Result<Vec<Proposal>, ServiceError> {
        tokio::time::sleep(self.latency).await;
        Ok((1..=3)
            .map(|id| Proposal {
                id,
                title: format!("Proposal #{id}"),
                status: if id < 3 { ProposalStatus::Passed } else { ProposalStatus::Active },
                votes_for: 100 * id as u128,
                votes_against: 10,
                voter_choice: None,
            })
            .collect())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("🚀 defi-queries Dashboard Walkthrough");
    println!("=====================================");

    // 1. Setup
    let service = Arc::new(SlowChain { latency: Duration::from_millis(50) });
    let queries = DefiQueries::new(&AppConfig::default(), service.clone())?;
    queries.cache().start_gc()?;
    queries.cache().signals().add_callback(|event| {
        println!("   📡 {:?} {}", event.event_type, event.key);
    })?;

    // 2. Nothing connected
    println!("\n🔌 No wallet connected");
    let claims = queries.claims();
    println!("   claims idle: {}", claims.state().is_idle());

    // 3. Connect and load claims twice
    println!("\n👛 Connecting 0xABC");
    let address = queries.connect("0xABC")?;
    let mut header = use_check_claims(queries.cache(), service.clone(), Some(address.clone()));
    let mut sidebar = use_check_claims(queries.cache(), service.clone(), Some(address.clone()));
    let state = header.settled().await;
    sidebar.settled().await;
    if let Some(claims) = state.data() {
        for item in &claims.items {
            println!("   {} claimable: {}", item.asset, item.amount);
        }
    }

    // 4. Switch accounts while a proposal is loading
    println!("\n🗳️  Proposal 7 for 0xABC, then switching to 0xDEF");
    let mut proposal = queries.proposal(Some(7));
    let other = Address::parse("0xDEF")?;
    proposal.set_identifiers((Some(7), Some(other)));
    let state = proposal.settled().await;
    if let Some(p) = state.data() {
        println!("   {} seen by {:?}: choice {:?}", p.title, proposal.key(), p.voter_choice);
    }

    // 5. A missing proposal is reported as state
    proposal.set_identifiers((Some(0), Some(address.clone())));
    let state = proposal.settled().await;
    if let Some(error) = state.error() {
        println!("   ❌ {}", error);
    }

    // 6. Liquidation queue
    println!("\n💧 Liquidation queue for ATOM");
    let mut queue = queries.liquidation(Some(Asset::new("atom")?));
    if let Some(queue) = queue.settled().await.data() {
        println!("   {} bids, {} total", queue.bids.len(), queue.total_bid());
    }

    // 7. Vote, then refresh
    println!("\n✅ Voting and refreshing proposals");
    let mut list = queries.proposals();
    list.settled().await;
    let refreshed = queries.after_vote()?;
    println!("   invalidated {} entries", refreshed);
    let state = list.settled().await;
    println!("   {} proposals", state.data().map(|list| list.len()).unwrap_or_default());

    queries.shutdown();
    println!("\n👋 Done");
    Ok(())
}
