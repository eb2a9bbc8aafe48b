//! Public façade over the ledger service.
//!
//! [`WalletClient`] binds a session to one player via
//! [`for_player`](WalletClient::for_player), routes every call through the
//! [`DispatchRouter`], and keeps the shared [`WalletStore`] in step with
//! what the ledger has confirmed.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::WalletError;
use crate::cache::WalletStore;
use crate::config::WalletConfig;
use crate::models::transaction::parse_uuid;
use crate::models::{
    BalanceResponse, CreateWalletRequest, PlayerId, SumResponse, TransactionContext,
    TransactionRequest,
};
use crate::pager::{PaginationState, TransactionPage, TransactionPager};
use crate::transport::{
    DispatchRouter, DurableDispatcher, DurableQueue, HttpTransport, LedgerEndpoint,
    ReqwestTransport, SynchronousDispatcher, TransportResult,
};

const WALLET_CREATE_ENDPOINT: &str = "/api/v1/wallets/create";
const SUM_OF_WALLET_BALANCES_ENDPOINT: &str = "/api/v1/metrics/sum_of_wallet_balances";

fn balance_path(player: &PlayerId) -> String {
    format!("/api/v1/wallets/{player}/balance")
}

fn deposit_path(player: &PlayerId) -> String {
    format!("/api/v1/wallets/{player}/deposit")
}

fn withdraw_path(player: &PlayerId) -> String {
    format!("/api/v1/wallets/{player}/withdraw")
}

fn rollback_path(transaction_id: &uuid::Uuid) -> String {
    format!("/api/v1/transactions/{transaction_id}/rollback")
}

/// Direction of a money movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Movement {
    Deposit,
    Withdraw,
}

impl Movement {
    fn operation(self) -> &'static str {
        match self {
            Movement::Deposit => "deposit",
            Movement::Withdraw => "withdraw",
        }
    }

    fn path(self, player: &PlayerId) -> String {
        match self {
            Movement::Deposit => deposit_path(player),
            Movement::Withdraw => withdraw_path(player),
        }
    }
}

/// Client session against one ledger service.
pub struct WalletClient {
    endpoint: Arc<LedgerEndpoint>,
    router: DispatchRouter,
    pager: TransactionPager,
    store: Arc<WalletStore>,
    player: Option<PlayerId>,
    durable_delivery: bool,
    queue_priority: Option<u32>,
}

impl fmt::Debug for WalletClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletClient")
            .field("endpoint", &self.endpoint)
            .field("player", &self.player)
            .field("durable_delivery", &self.durable_delivery)
            .field("queue_priority", &self.queue_priority)
            .finish_non_exhaustive()
    }
}

impl WalletClient {
    /// Creates a client talking HTTP to the configured ledger.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Config`] if the configuration is invalid and
    /// [`WalletError::Http`] if the HTTP client cannot be built.
    pub fn new(config: WalletConfig) -> crate::Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new()?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Shorthand for [`new`](Self::new) with default retry settings.
    pub fn create(base_url: &str, username: &str, password: &str) -> crate::Result<Self> {
        Self::new(WalletConfig::new(base_url, username, password))
    }

    /// Creates a client on top of any [`HttpTransport`], with a fresh store
    /// and no durable queue.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Config`] if the configuration is invalid.
    pub fn with_transport(
        config: WalletConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> crate::Result<Self> {
        config.validate()?;

        let endpoint = Arc::new(LedgerEndpoint::new(&config));
        let synchronous = Arc::new(SynchronousDispatcher::new(transport, config.retry.clone()));
        let pager = TransactionPager::new(endpoint.clone(), synchronous.clone());

        Ok(Self {
            endpoint,
            router: DispatchRouter::new(synchronous, None),
            pager,
            store: Arc::new(WalletStore::new()),
            player: None,
            durable_delivery: false,
            queue_priority: None,
        })
    }

    /// Attaches a durable queue backend, enabling
    /// [`use_durable_delivery`](Self::use_durable_delivery).
    #[must_use]
    pub fn with_durable_queue(mut self, queue: Arc<dyn DurableQueue>) -> Self {
        self.router = DispatchRouter::new(
            self.router.synchronous().clone(),
            Some(DurableDispatcher::new(queue)),
        );
        self
    }

    /// Replaces the store, typically with one shared by other clients.
    #[must_use]
    pub fn with_store(mut self, store: Arc<WalletStore>) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &Arc<WalletStore> {
        &self.store
    }

    /// Binds the session to `player`. Later per-player calls act on this wallet.
    pub fn for_player(&mut self, player: impl Into<PlayerId>) -> &mut Self {
        let next = player.into();
        self.store
            .balances()
            .invalidate_on_identity_switch(self.player.as_ref(), &next);
        self.player = Some(next);
        self
    }

    pub fn player(&self) -> Option<&PlayerId> {
        self.player.as_ref()
    }

    /// Turns queued delivery of deposits and withdrawals on or off.
    ///
    /// While enabled, money movements return no balance: they have been
    /// persisted for delivery, not executed.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Config`] when enabling without a durable
    /// queue attached.
    pub fn use_durable_delivery(&mut self, enabled: bool) -> crate::Result<&mut Self> {
        if enabled && !self.router.has_durable_backend() {
            return Err(WalletError::Config(
                "durable delivery requires a durable queue; attach one with with_durable_queue"
                    .to_string(),
            ));
        }
        self.durable_delivery = enabled;
        Ok(self)
    }

    pub fn is_durable_delivery(&self) -> bool {
        self.durable_delivery
    }

    /// Sets the priority handed to the queue for durable deliveries.
    pub fn set_queue_priority(&mut self, priority: Option<u32>) -> &mut Self {
        self.queue_priority = priority;
        self
    }

    /// Creates the player's wallet unless this process already did.
    ///
    /// A queued creation is not remembered, so calling again after it
    /// re-issues the request; the ledger treats creation idempotently.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Config`] before [`for_player`](Self::for_player),
    /// or any delivery error.
    pub async fn create_wallet(&self) -> crate::Result<()> {
        let player = self.require_player("create_wallet")?;
        if self.store.has_created_wallet(player) {
            debug!(player_id = %player, "wallet already created by this process");
            return Ok(());
        }

        let body = serde_json::to_value(CreateWalletRequest { player_id: player })?;
        let request = self.endpoint.post(WALLET_CREATE_ENDPOINT, body);
        let result = self
            .router
            .dispatch(&request, self.durable_delivery, self.queue_priority)
            .await?;

        if let TransportResult::Synchronous(_) = result {
            self.store.mark_wallet_created(player);
            info!(player_id = %player, "wallet created");
        }

        Ok(())
    }

    /// Returns the player's balance, from the store unless `force_fresh` is
    /// set or nothing is known yet.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Config`] before [`for_player`](Self::for_player),
    /// any delivery error, or [`WalletError::MalformedResponse`].
    pub async fn get_balance(&self, force_fresh: bool) -> crate::Result<Decimal> {
        let player = self.require_player("get_balance")?;
        let balances = self.store.balances();

        if !balances.should_refresh(player, force_fresh) {
            if let Some(balance) = balances.read(player) {
                debug!(player_id = %player, %balance, "balance served from cache");
                return Ok(balance);
            }
        }

        let request = self.endpoint.get(&balance_path(player), Vec::new());
        let response = self.router.dispatch(&request, false, None).await?.into_synchronous()?;
        let BalanceResponse { balance } = response.parse()?;
        balances.write(player, balance);

        Ok(balance)
    }

    /// Deposits `amount` into the player's wallet.
    ///
    /// Returns the new balance, or `None` when the deposit was queued.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Config`] before [`for_player`](Self::for_player),
    /// [`WalletError::Validation`] for a non-positive amount or malformed
    /// ids, or any delivery error.
    pub async fn deposit(
        &self,
        amount: Decimal,
        transaction_id: &str,
        context: TransactionContext,
        external_id: Option<&str>,
    ) -> crate::Result<Option<Decimal>> {
        self.move_money(Movement::Deposit, amount, transaction_id, context, external_id)
            .await
    }

    /// Withdraws `amount` from the player's wallet.
    ///
    /// Returns the new balance, or `None` when the withdrawal was queued.
    ///
    /// # Errors
    ///
    /// Same as [`deposit`](Self::deposit).
    pub async fn withdraw(
        &self,
        amount: Decimal,
        transaction_id: &str,
        context: TransactionContext,
        external_id: Option<&str>,
    ) -> crate::Result<Option<Decimal>> {
        self.move_money(Movement::Withdraw, amount, transaction_id, context, external_id)
            .await
    }

    async fn move_money(
        &self,
        movement: Movement,
        amount: Decimal,
        transaction_id: &str,
        context: TransactionContext,
        external_id: Option<&str>,
    ) -> crate::Result<Option<Decimal>> {
        let player = self.require_player(movement.operation())?;
        let transaction = TransactionRequest::new(amount, transaction_id, context, external_id)?;

        let request = self
            .endpoint
            .post(&movement.path(player), serde_json::to_value(&transaction)?);
        let result = self
            .router
            .dispatch(&request, self.durable_delivery, self.queue_priority)
            .await?;

        if result.is_accepted() {
            info!(
                operation = movement.operation(),
                player_id = %player,
                transaction_id = %transaction.transaction_id(),
                "money movement queued"
            );
            return Ok(None);
        }

        let balance = self.store.record_mutation(player, &result).ok_or_else(|| {
            WalletError::MalformedResponse(format!(
                "{} response carries no balance",
                movement.operation()
            ))
        })?;
        info!(
            operation = movement.operation(),
            player_id = %player,
            transaction_id = %transaction.transaction_id(),
            %amount,
            %balance,
            "money movement confirmed"
        );

        Ok(Some(balance))
    }

    /// Rolls back a transaction. Always delivered synchronously.
    ///
    /// Every cached balance is dropped afterwards, whether or not the call
    /// succeeded: the owner of the transaction is unknown here and a failed
    /// call may still have reached the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Validation`] for a malformed id, or any
    /// delivery error.
    pub async fn rollback_transaction(&self, transaction_id: &str) -> crate::Result<()> {
        let transaction_id = parse_uuid("transaction id", transaction_id)?;
        let request = self.endpoint.post(
            &rollback_path(&transaction_id),
            serde_json::Value::Object(serde_json::Map::new()),
        );

        let outcome = self.router.send_synchronous(&request).await;
        self.store.invalidate_balances();
        outcome?;

        info!(%transaction_id, "transaction rolled back");
        Ok(())
    }

    /// Lists the player's transactions between `from` and `to` (inclusive
    /// calendar dates), optionally restricted to `contexts`.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Config`] before [`for_player`](Self::for_player),
    /// [`WalletError::Validation`] for page 0, or any delivery error.
    pub async fn get_paginated_transactions(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        contexts: &[TransactionContext],
        page: u32,
        per_page: Option<u32>,
    ) -> crate::Result<TransactionPage> {
        let player = self.require_player("get_paginated_transactions")?;
        let state = PaginationState::new(player.clone(), from, to)
            .with_contexts(contexts)
            .with_page(page)
            .with_per_page(per_page);

        self.pager.fetch_page(state).await
    }

    /// Returns the sum of every wallet balance held by the ledger.
    ///
    /// # Errors
    ///
    /// Returns any delivery error or [`WalletError::MalformedResponse`].
    pub async fn get_sum_of_wallet_balances(&self) -> crate::Result<Decimal> {
        if let Some(sum) = self.store.sum_of_balances() {
            return Ok(sum);
        }

        let request = self.endpoint.get(SUM_OF_WALLET_BALANCES_ENDPOINT, Vec::new());
        let response = self.router.dispatch(&request, false, None).await?.into_synchronous()?;
        let SumResponse { sum } = response.parse()?;
        self.store.set_sum_of_balances(sum);

        Ok(sum)
    }

    fn require_player(&self, operation: &str) -> crate::Result<&PlayerId> {
        self.player.as_ref().ok_or_else(|| {
            WalletError::Config(format!(
                "player is not set - call for_player() before {operation}()"
            ))
        })
    }
}
