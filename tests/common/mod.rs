//! Shared test doubles for the ledger HTTP seam.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use seamless_wallet::WalletConfig;
use seamless_wallet::transport::{
    HttpTransport, LedgerRequest, Method, RawResponse, RetryPolicy, TransportFailure,
};

pub const BASE_URL: &str = "http://ledger.test";

/// Calendar day the fake ledger stamps on every transaction.
pub const LEDGER_DAY: &str = "2021-03-04";

pub fn ledger_day() -> NaiveDate {
    NaiveDate::from_str(LEDGER_DAY).unwrap()
}

/// Config with no delay between attempts so retry tests run instantly.
pub fn test_config() -> WalletConfig {
    WalletConfig::new(BASE_URL, "root", "secret123").with_retry(RetryPolicy {
        max_attempts: 3,
        delay: Duration::ZERO,
        timeout: Duration::from_secs(1),
    })
}

pub fn new_transaction_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Replays a fixed script of outcomes and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Result<RawResponse, TransportFailure>>>,
    requests: Mutex<Vec<LedgerRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, status: u16, body: Value) -> &Self {
        self.outcomes.lock().unwrap().push_back(Ok(RawResponse {
            status,
            body: body.to_string(),
        }));
        self
    }

    pub fn fail(&self, failure: TransportFailure) -> &Self {
        self.outcomes.lock().unwrap().push_back(Err(failure));
        self
    }

    pub fn requests(&self) -> Vec<LedgerRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(
        &self,
        request: &LedgerRequest,
        _timeout: Duration,
    ) -> Result<RawResponse, TransportFailure> {
        self.requests.lock().unwrap().push(request.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportFailure::Connection("script exhausted".into())))
    }
}

/// Transport that never answers within any reasonable timeout.
pub struct HangingTransport;

#[async_trait]
impl HttpTransport for HangingTransport {
    async fn execute(
        &self,
        _request: &LedgerRequest,
        _timeout: Duration,
    ) -> Result<RawResponse, TransportFailure> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(TransportFailure::Connection("unreachable".into()))
    }
}

struct StoredTransaction {
    id: u64,
    wallet_id: u64,
    player: String,
    transaction_id: String,
    amount: Decimal,
    type_id: u8,
    context_id: u8,
    new_balance: Decimal,
    rolled_back: bool,
}

#[derive(Default)]
struct LedgerState {
    wallets: HashMap<String, (u64, Decimal)>,
    transactions: Vec<StoredTransaction>,
    requests: Vec<LedgerRequest>,
}

/// In-memory ledger speaking the service's HTTP API.
///
/// Deposits and withdrawals are idempotent on `transaction_id`, listings
/// paginate the way the real service does.
#[derive(Default)]
pub struct FakeLedger {
    state: Mutex<LedgerState>,
}

impl FakeLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn requests(&self) -> Vec<LedgerRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn count(&self, method: Method, path_suffix: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.method == method && r.url.ends_with(path_suffix))
            .count()
    }

    pub fn balance_of(&self, player: &str) -> Option<Decimal> {
        self.state
            .lock()
            .unwrap()
            .wallets
            .get(player)
            .map(|(_, balance)| *balance)
    }

    fn handle(&self, request: &LedgerRequest) -> (u16, Value) {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());

        let path = request.url.strip_prefix(BASE_URL).unwrap_or(&request.url);
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let payload = request.payload.clone().unwrap_or(Value::Null);

        match (request.method, segments.as_slice()) {
            (Method::Post, ["api", "v1", "wallets", "create"]) => {
                let player = payload["player_id"].as_str().unwrap_or_default().to_string();
                let next_id = state.wallets.len() as u64 + 1;
                state.wallets.entry(player).or_insert((next_id, Decimal::ZERO));
                (201, json!({"success": true}))
            }
            (Method::Get, ["api", "v1", "wallets", player, "balance"]) => {
                match state.wallets.get(*player) {
                    Some((_, balance)) => (200, json!({"balance": balance.to_string()})),
                    None => (404, json!({"message": "wallet not found"})),
                }
            }
            (Method::Post, ["api", "v1", "wallets", player, action @ ("deposit" | "withdraw")]) => {
                move_money(&mut state, player, action, &payload)
            }
            (Method::Post, ["api", "v1", "transactions", transaction_id, "rollback"]) => {
                rollback(&mut state, transaction_id)
            }
            (Method::Get, ["api", "v1", "wallets", player, "transactions"]) => {
                list(&state, player, &request.url, &request.query)
            }
            (Method::Get, ["api", "v1", "metrics", "sum_of_wallet_balances"]) => {
                let sum: Decimal = state.wallets.values().map(|(_, balance)| *balance).sum();
                (200, json!({"sum": sum.to_string()}))
            }
            _ => (404, json!({"message": "no such endpoint"})),
        }
    }
}

#[async_trait]
impl HttpTransport for FakeLedger {
    async fn execute(
        &self,
        request: &LedgerRequest,
        _timeout: Duration,
    ) -> Result<RawResponse, TransportFailure> {
        let (status, body) = self.handle(request);
        Ok(RawResponse {
            status,
            body: body.to_string(),
        })
    }
}

fn move_money(state: &mut LedgerState, player: &str, action: &str, payload: &Value) -> (u16, Value) {
    let Some(&(wallet_id, balance)) = state.wallets.get(player) else {
        return (404, json!({"message": "wallet not found"}));
    };
    let Some(amount) = payload["amount"].as_str().and_then(|a| Decimal::from_str(a).ok()) else {
        return (422, json!({"message": "invalid amount"}));
    };
    let transaction_id = payload["transaction_id"].as_str().unwrap_or_default().to_string();

    if state.transactions.iter().any(|t| t.transaction_id == transaction_id) {
        return (200, json!({"success": true, "balance": balance.to_string()}));
    }

    let (type_id, new_balance) = if action == "deposit" {
        (1, balance + amount)
    } else if amount > balance {
        return (422, json!({"message": "insufficient funds"}));
    } else {
        (2, balance - amount)
    };

    let id = state.transactions.len() as u64 + 1;
    state.transactions.push(StoredTransaction {
        id,
        wallet_id,
        player: player.to_string(),
        transaction_id,
        amount,
        type_id,
        context_id: payload["transaction_context"].as_u64().unwrap_or(1) as u8,
        new_balance,
        rolled_back: false,
    });
    state.wallets.insert(player.to_string(), (wallet_id, new_balance));

    (200, json!({"success": true, "message": "", "balance": new_balance.to_string()}))
}

fn rollback(state: &mut LedgerState, transaction_id: &str) -> (u16, Value) {
    let Some(index) = state
        .transactions
        .iter()
        .position(|t| t.transaction_id == transaction_id && !t.rolled_back)
    else {
        return (404, json!({"message": "transaction not found"}));
    };

    let (player, amount, type_id) = {
        let tx = &mut state.transactions[index];
        tx.rolled_back = true;
        (tx.player.clone(), tx.amount, tx.type_id)
    };
    if let Some((_, balance)) = state.wallets.get_mut(&player) {
        if type_id == 1 {
            *balance -= amount;
        } else {
            *balance += amount;
        }
    }

    (200, json!({"success": true}))
}

fn list(state: &LedgerState, player: &str, url: &str, query: &[(String, String)]) -> (u16, Value) {
    let param = |key: &str| {
        query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    };
    let (Some(from), Some(to)) = (param("from"), param("to")) else {
        return (422, json!({"message": "from and to are required"}));
    };
    let day = ledger_day();
    let in_range = NaiveDate::from_str(&from).map(|f| f <= day).unwrap_or(false)
        && NaiveDate::from_str(&to).map(|t| day <= t).unwrap_or(false);

    let contexts: Option<Vec<u8>> = param("contexts")
        .map(|raw| raw.split(',').filter_map(|c| c.parse().ok()).collect());
    let per_page: usize = param("per_page").and_then(|p| p.parse().ok()).unwrap_or(15);
    let page: usize = param("page").and_then(|p| p.parse().ok()).unwrap_or(1);

    let matching: Vec<&StoredTransaction> = state
        .transactions
        .iter()
        .filter(|t| in_range && t.player == player)
        .filter(|t| contexts.as_ref().is_none_or(|c| c.contains(&t.context_id)))
        .collect();

    let total = matching.len();
    let last_page = total.div_ceil(per_page).max(1);
    let start = (page - 1) * per_page;
    let data: Vec<Value> = matching
        .iter()
        .skip(start)
        .take(per_page)
        .map(|t| {
            json!({
                "id": t.id,
                "wallet_id": t.wallet_id,
                "amount": t.amount.to_string(),
                "transaction_type_id": t.type_id,
                "transaction_context_id": t.context_id,
                "external_id": null,
                "new_balance": t.new_balance.to_string(),
                "rolled_back_at": if t.rolled_back { json!("2021-03-04T12:00:00.000000Z") } else { Value::Null },
                "created_at": "2021-03-04T10:00:00.000000Z",
                "updated_at": "2021-03-04T10:00:00.000000Z"
            })
        })
        .collect();
    let (first_index, last_index) = if data.is_empty() {
        (Value::Null, Value::Null)
    } else {
        (json!(start + 1), json!(start + data.len()))
    };
    let page_url = |n: usize| format!("{url}?page={n}");

    let body = json!({
        "transactions": {
            "current_page": page,
            "data": data,
            "first_page_url": page_url(1),
            "from": first_index,
            "last_page": last_page,
            "last_page_url": page_url(last_page),
            "links": [],
            "next_page_url": if page < last_page { json!(page_url(page + 1)) } else { Value::Null },
            "path": url,
            "per_page": per_page.to_string(),
            "prev_page_url": if page > 1 { json!(page_url(page - 1)) } else { Value::Null },
            "to": last_index,
            "total": total
        }
    });

    (200, body)
}
