//! Wire shape of the paginated transaction listing.

use serde::{Deserialize, Deserializer};

use super::transaction::Transaction;

/// Top-level body of the transactions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionsResponse {
    pub transactions: PaginatorBody,
}

/// One page of a server-side paginator.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginatorBody {
    #[serde(deserialize_with = "count")]
    pub current_page: u32,
    #[serde(default)]
    pub data: Vec<Transaction>,
    #[serde(default)]
    pub first_page_url: Option<String>,
    /// 1-based index of the first entry on this page; absent when empty.
    #[serde(default)]
    pub from: Option<u64>,
    #[serde(deserialize_with = "count")]
    pub last_page: u32,
    #[serde(default)]
    pub last_page_url: Option<String>,
    #[serde(default)]
    pub links: Vec<PaginatorLink>,
    #[serde(default)]
    pub next_page_url: Option<String>,
    #[serde(default)]
    pub path: String,
    #[serde(default, deserialize_with = "optional_count")]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub prev_page_url: Option<String>,
    #[serde(default)]
    pub to: Option<u64>,
    pub total: u64,
}

/// Navigation link rendered by the server for paginator UIs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaginatorLink {
    pub url: Option<String>,
    #[serde(deserialize_with = "label")]
    pub label: String,
    #[serde(default)]
    pub active: bool,
}

/// Paginator counters arrive as numbers, or as strings when echoed from
/// the query string.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(u64),
    Text(String),
}

impl Scalar {
    fn into_count<E: serde::de::Error>(self) -> Result<u32, E> {
        match self {
            Scalar::Number(n) => u32::try_from(n).map_err(E::custom),
            Scalar::Text(s) => s.trim().parse().map_err(E::custom),
        }
    }
}

fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Scalar::deserialize(deserializer)?.into_count()
}

fn optional_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Option::<Scalar>::deserialize(deserializer)?
        .map(Scalar::into_count)
        .transpose()
}

fn label<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Number(n) => n.to_string(),
        Scalar::Text(s) => s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_stringly_typed_per_page() {
        let json = r#"{
            "current_page": 1,
            "data": [],
            "last_page": 1,
            "path": "http://ledger/api/v1/wallets/1/transactions",
            "per_page": "100",
            "total": 0,
            "links": [
                {"url": null, "label": "&laquo; Previous", "active": false},
                {"url": "http://ledger/api/v1/wallets/1/transactions?page=1", "label": 1, "active": true}
            ]
        }"#;
        let body: PaginatorBody = serde_json::from_str(json).unwrap();

        assert_eq!(body.per_page, Some(100));
        assert_eq!(body.from, None);
        assert_eq!(body.links[1].label, "1");
        assert!(body.links[1].active);
    }

    #[test]
    fn rejects_non_numeric_page_counter() {
        let json = r#"{"current_page": "one", "last_page": 1, "total": 0}"#;
        assert!(serde_json::from_str::<PaginatorBody>(json).is_err());
    }
}
