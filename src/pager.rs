//! Replayable cursor over the paginated transaction listing.
//!
//! A page keeps the full query that produced it. Moving to a neighbouring
//! page builds a new [`PaginationState`] with every filter carried over and
//! only the page number changed, then fetches it again. No server-side
//! cursor is held, so page numbers are only stable while the underlying
//! transaction set is: a mutation between two fetches can shift entries
//! across page boundaries or change the last page.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::WalletError;
use crate::models::{
    PaginatorBody, PaginatorLink, PlayerId, Transaction, TransactionContext, TransactionsResponse,
};
use crate::transport::{LedgerEndpoint, SynchronousDispatcher};

/// Path of the transaction listing for `player`.
pub(crate) fn transactions_path(player: &PlayerId) -> String {
    format!("/api/v1/wallets/{player}/transactions")
}

/// Query that selects one page of a player's transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    pub player_id: PlayerId,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub contexts: Vec<TransactionContext>,
    /// 1-based page number.
    pub page: u32,
    /// Page size; the ledger picks its default when `None`.
    pub per_page: Option<u32>,
}

impl PaginationState {
    /// Selects the first page of transactions between `from` and `to`, inclusive.
    pub fn new(player_id: PlayerId, from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            player_id,
            from,
            to,
            contexts: Vec::new(),
            page: 1,
            per_page: None,
        }
    }

    /// Restricts the listing to `contexts`. Duplicates are dropped.
    #[must_use]
    pub fn with_contexts(mut self, contexts: &[TransactionContext]) -> Self {
        self.contexts.clear();
        for context in contexts {
            if !self.contexts.contains(context) {
                self.contexts.push(*context);
            }
        }
        self
    }

    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Sets the page size. Zero means "ledger default".
    #[must_use]
    pub fn with_per_page(mut self, per_page: Option<u32>) -> Self {
        self.per_page = per_page.filter(|n| *n > 0);
        self
    }

    /// Encodes the state as query parameters.
    ///
    /// Dates are sent without a time component, contexts as a comma-joined
    /// list of ids. Empty contexts and an unset page size are omitted.
    pub fn query(&self) -> Vec<(String, String)> {
        let mut query = vec![
            ("from".to_string(), self.from.format("%Y-%m-%d").to_string()),
            ("to".to_string(), self.to.format("%Y-%m-%d").to_string()),
            ("page".to_string(), self.page.to_string()),
        ];

        if !self.contexts.is_empty() {
            let contexts: Vec<String> = self.contexts.iter().map(|c| c.id().to_string()).collect();
            query.push(("contexts".to_string(), contexts.join(",")));
        }

        if let Some(per_page) = self.per_page {
            query.push(("per_page".to_string(), per_page.to_string()));
        }

        query
    }
}

/// One page of transactions, exactly as the ledger returned it.
#[derive(Clone)]
pub struct TransactionPage {
    state: PaginationState,
    transactions: Vec<Transaction>,
    total: u64,
    current_page: u32,
    last_page: u32,
    first_index: Option<u64>,
    last_index: Option<u64>,
    per_page: Option<u32>,
    path: String,
    first_page_url: Option<String>,
    last_page_url: Option<String>,
    next_page_url: Option<String>,
    prev_page_url: Option<String>,
    links: Vec<PaginatorLink>,
    pager: TransactionPager,
}

impl TransactionPage {
    fn from_body(state: PaginationState, body: PaginatorBody, pager: TransactionPager) -> Self {
        Self {
            state,
            transactions: body.data,
            total: body.total,
            current_page: body.current_page,
            last_page: body.last_page,
            first_index: body.from,
            last_index: body.to,
            per_page: body.per_page,
            path: body.path,
            first_page_url: body.first_page_url,
            last_page_url: body.last_page_url,
            next_page_url: body.next_page_url,
            prev_page_url: body.prev_page_url,
            links: body.links,
            pager,
        }
    }

    /// The query that produced this page.
    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }

    /// Number of matching transactions across all pages.
    pub fn total_entries(&self) -> u64 {
        self.total
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn last_page(&self) -> u32 {
        self.last_page
    }

    /// 1-based position of the first entry of this page in the whole listing.
    pub fn first_index_in_page(&self) -> Option<u64> {
        self.first_index
    }

    pub fn last_index_in_page(&self) -> Option<u64> {
        self.last_index
    }

    pub fn entries_per_page(&self) -> Option<u32> {
        self.per_page
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn first_page_url(&self) -> Option<&str> {
        self.first_page_url.as_deref()
    }

    pub fn last_page_url(&self) -> Option<&str> {
        self.last_page_url.as_deref()
    }

    pub fn next_page_url(&self) -> Option<&str> {
        self.next_page_url.as_deref()
    }

    pub fn prev_page_url(&self) -> Option<&str> {
        self.prev_page_url.as_deref()
    }

    pub fn links(&self) -> &[PaginatorLink] {
        &self.links
    }

    pub fn has_next_page(&self) -> bool {
        self.current_page < self.last_page
    }

    pub fn has_previous_page(&self) -> bool {
        self.current_page > 1
    }

    fn is_valid_target(&self, target: u32) -> bool {
        (1..=self.last_page).contains(&target)
    }

    /// Fetches the following page with the same filters.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::NoSuchPage`] on the last page, or any error of
    /// the fetch itself.
    pub async fn next_page(&self) -> crate::Result<TransactionPage> {
        self.pager.next_page(self).await
    }

    /// Fetches the preceding page with the same filters.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::NoSuchPage`] on page 1, or any error of the
    /// fetch itself.
    pub async fn previous_page(&self) -> crate::Result<TransactionPage> {
        self.pager.previous_page(self).await
    }
}

impl fmt::Debug for TransactionPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionPage")
            .field("state", &self.state)
            .field("current_page", &self.current_page)
            .field("last_page", &self.last_page)
            .field("total", &self.total)
            .field("transactions", &self.transactions.len())
            .finish_non_exhaustive()
    }
}

/// Issues listing queries on the synchronous path.
#[derive(Clone)]
pub struct TransactionPager {
    endpoint: Arc<LedgerEndpoint>,
    dispatcher: Arc<SynchronousDispatcher>,
}

impl TransactionPager {
    pub fn new(endpoint: Arc<LedgerEndpoint>, dispatcher: Arc<SynchronousDispatcher>) -> Self {
        Self {
            endpoint,
            dispatcher,
        }
    }

    /// Fetches the page `state` describes.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Validation`] for page 0 and propagates
    /// delivery errors and malformed responses.
    pub async fn fetch_page(&self, state: PaginationState) -> crate::Result<TransactionPage> {
        if state.page == 0 {
            return Err(WalletError::Validation(
                "page numbers start at 1".to_string(),
            ));
        }

        let request = self
            .endpoint
            .get(&transactions_path(&state.player_id), state.query());
        let response = self.dispatcher.send(&request).await?.into_synchronous()?;
        let body: TransactionsResponse = response.parse()?;
        debug!(
            player_id = %state.player_id,
            page = body.transactions.current_page,
            last_page = body.transactions.last_page,
            entries = body.transactions.data.len(),
            "fetched transaction page"
        );

        Ok(TransactionPage::from_body(state, body.transactions, self.clone()))
    }

    /// Fetches the page after `page`.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::NoSuchPage`] with the attempted page number
    /// when it falls outside `1..=last_page`.
    pub async fn next_page(&self, page: &TransactionPage) -> crate::Result<TransactionPage> {
        let target = page.current_page.saturating_add(1);
        if !page.is_valid_target(target) {
            return Err(no_such_page(page, target));
        }
        self.fetch_page(page.state.clone().with_page(target)).await
    }

    /// Fetches the page before `page`.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::NoSuchPage`] with the attempted page number
    /// when it falls outside `1..=last_page`.
    pub async fn previous_page(&self, page: &TransactionPage) -> crate::Result<TransactionPage> {
        let target = page.current_page.saturating_sub(1);
        if !page.is_valid_target(target) {
            return Err(no_such_page(page, target));
        }
        self.fetch_page(page.state.clone().with_page(target)).await
    }
}

impl fmt::Debug for TransactionPager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionPager")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

fn no_such_page(page: &TransactionPage, target: u32) -> WalletError {
    let path = if page.path.is_empty() {
        transactions_path(&page.state.player_id)
    } else {
        page.path.clone()
    };
    WalletError::NoSuchPage {
        page: target,
        last_page: page.last_page,
        path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn lookup<'a>(query: &'a [(String, String)], key: &str) -> Option<&'a str> {
        query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn minimal_query_has_dates_and_page_only() {
        let state = PaginationState::new(PlayerId::from("7"), date("2021-03-01"), date("2021-03-31"));
        let query = state.query();

        assert_eq!(query.len(), 3);
        assert_eq!(lookup(&query, "from"), Some("2021-03-01"));
        assert_eq!(lookup(&query, "to"), Some("2021-03-31"));
        assert_eq!(lookup(&query, "page"), Some("1"));
        assert_eq!(lookup(&query, "contexts"), None);
        assert_eq!(lookup(&query, "per_page"), None);
    }

    #[test]
    fn contexts_and_page_size_are_encoded() {
        let state = PaginationState::new(PlayerId::from("7"), date("2021-03-01"), date("2021-03-01"))
            .with_contexts(&[
                TransactionContext::Payment,
                TransactionContext::Payout,
                TransactionContext::Payment,
            ])
            .with_per_page(Some(25))
            .with_page(3);
        let query = state.query();

        assert_eq!(lookup(&query, "contexts"), Some("14,10"));
        assert_eq!(lookup(&query, "per_page"), Some("25"));
        assert_eq!(lookup(&query, "page"), Some("3"));
    }

    #[test]
    fn zero_page_size_means_ledger_default() {
        let state = PaginationState::new(PlayerId::from("7"), date("2021-03-01"), date("2021-03-01"))
            .with_per_page(Some(0));
        assert_eq!(state.per_page, None);
    }

    #[test]
    fn changing_page_keeps_filters() {
        let state = PaginationState::new(PlayerId::from("7"), date("2021-03-01"), date("2021-03-02"))
            .with_contexts(&[TransactionContext::Bonus])
            .with_per_page(Some(10));
        let moved = state.clone().with_page(2);

        assert_eq!(moved.page, 2);
        assert_eq!(moved.with_page(1), state);
    }
}
