//! Block explorer client.
//!
//! The wallet never talks to peers directly. Address, UTXO and transaction
//! lookups and broadcast all go through an Insight-style REST explorer:
//!
//! | call          | request                          |
//! |---------------|----------------------------------|
//! | address info  | `GET  {base}/addr/{address}`     |
//! | UTXO listing  | `GET  {base}/addr/{address}/utxo`|
//! | transaction   | `GET  {base}/tx/{txid}`          |
//! | broadcast     | `POST {base}/tx/send {"rawtx"}`  |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use satchel_core::address::Address;
use satchel_core::types::{Hash256, OutPoint, Utxo};

use crate::error::WalletError;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Explorer response to a successful broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResult {
    pub txid: String,
}

/// Read and submit access to the chain through an explorer service.
#[async_trait]
pub trait BlockExplorer: Send + Sync {
    /// Balance and history summary for an address, as returned by the explorer.
    async fn address_info(&self, address: &Address) -> Result<Value, WalletError>;

    /// Unspent outputs of an address, in the explorer's listing order.
    async fn utxos(&self, address: &Address) -> Result<Vec<Utxo>, WalletError>;

    async fn transaction(&self, txid: &Hash256) -> Result<Value, WalletError>;

    /// Submit a hex-encoded signed transaction.
    async fn broadcast(&self, raw_hex: &str) -> Result<BroadcastResult, WalletError>;
}

/// One entry of an explorer UTXO listing.
///
/// Extra fields (confirmations, script, float amount) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct UtxoRecord {
    pub txid: String,
    pub vout: u64,
    pub address: String,
    pub satoshis: u64,
}

impl UtxoRecord {
    /// Convert to a [`Utxo`], validating the txid and address.
    pub fn into_utxo(self) -> Result<Utxo, WalletError> {
        let txid = Hash256::from_hex(&self.txid)
            .map_err(|e| WalletError::Network(format!("malformed utxo txid {}: {e}", self.txid)))?;
        let address: Address = self.address.parse().map_err(|e| {
            WalletError::Network(format!("malformed utxo address {}: {e}", self.address))
        })?;
        Ok(Utxo {
            outpoint: OutPoint {
                txid,
                index: self.vout,
            },
            value: self.satoshis,
            address,
        })
    }
}

/// Parse a UTXO listing body. Any malformed entry fails the whole listing.
pub fn parse_utxo_listing(body: Value) -> Result<Vec<Utxo>, WalletError> {
    let records: Vec<UtxoRecord> = serde_json::from_value(body)
        .map_err(|e| WalletError::Network(format!("malformed utxo listing: {e}")))?;
    records.into_iter().map(UtxoRecord::into_utxo).collect()
}

/// [`BlockExplorer`] over HTTP.
pub struct HttpExplorer {
    client: Client,
    base_url: String,
}

impl HttpExplorer {
    pub fn new(base_url: &str) -> Result<Self, WalletError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, WalletError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| WalletError::Network(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str) -> Result<Value, WalletError> {
        let url = self.url(path);
        debug!(%url, "explorer GET");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WalletError::Network(e.to_string()))?;
        read_json(resp, path).await
    }
}

/// Map the status to an error, then decode the body as JSON.
async fn read_json(resp: Response, what: &str) -> Result<Value, WalletError> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(WalletError::NotFound(what.to_string()));
    }
    if status.is_client_error() {
        let body = resp.text().await.unwrap_or_default();
        return Err(WalletError::Rejected(format!("{status}: {}", body.trim())));
    }
    if !status.is_success() {
        return Err(WalletError::Network(format!("{what}: HTTP {status}")));
    }
    resp.json::<Value>()
        .await
        .map_err(|e| WalletError::Network(format!("{what}: invalid JSON: {e}")))
}

#[async_trait]
impl BlockExplorer for HttpExplorer {
    async fn address_info(&self, address: &Address) -> Result<Value, WalletError> {
        self.get_json(&format!("addr/{address}")).await
    }

    async fn utxos(&self, address: &Address) -> Result<Vec<Utxo>, WalletError> {
        let body = self.get_json(&format!("addr/{address}/utxo")).await?;
        parse_utxo_listing(body)
    }

    async fn transaction(&self, txid: &Hash256) -> Result<Value, WalletError> {
        self.get_json(&format!("tx/{txid}")).await
    }

    async fn broadcast(&self, raw_hex: &str) -> Result<BroadcastResult, WalletError> {
        let url = self.url("tx/send");
        debug!(%url, size = raw_hex.len() / 2, "explorer broadcast");
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "rawtx": raw_hex }))
            .send()
            .await
            .map_err(|e| WalletError::Network(e.to_string()))?;
        let body = read_json(resp, "tx/send").await?;
        serde_json::from_value(body)
            .map_err(|e| WalletError::Network(format!("malformed broadcast response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satchel_core::address::Network;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn addr() -> Address {
        Address::from_pubkey_hash(Hash256([0x42; 32]), Network::Testnet)
    }

    async fn read_request(sock: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = sock.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).into_owned();
            if let Some(end) = text.find("\r\n\r\n") {
                let len = text[..end]
                    .lines()
                    .filter_map(|l| l.split_once(':'))
                    .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serve a single canned response; the handle yields the raw request.
    async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let request = read_request(&mut sock).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(response.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
            request
        });
        (base, handle)
    }

    #[test]
    fn utxo_record_conversion() {
        let body = json!([
            { "txid": "11".repeat(32), "vout": 1, "address": addr().to_string(),
              "satoshis": 5000, "amount": 0.00005, "confirmations": 3 },
            { "txid": "22".repeat(32), "vout": 0, "address": addr().to_string(), "satoshis": 7 }
        ]);
        let utxos = parse_utxo_listing(body).unwrap();
        assert_eq!(utxos.len(), 2);
        assert_eq!(utxos[0].outpoint.txid, Hash256([0x11; 32]));
        assert_eq!(utxos[0].outpoint.index, 1);
        assert_eq!(utxos[0].value, 5000);
        assert_eq!(utxos[1].value, 7);
        assert_eq!(utxos[1].address, addr());
    }

    #[test]
    fn malformed_record_fails_listing() {
        let body = json!([
            { "txid": "11".repeat(32), "vout": 0, "address": addr().to_string(), "satoshis": 1 },
            { "txid": "nothex", "vout": 0, "address": addr().to_string(), "satoshis": 1 }
        ]);
        assert!(matches!(
            parse_utxo_listing(body).unwrap_err(),
            WalletError::Network(_)
        ));
        let missing_field = json!([{ "txid": "11".repeat(32), "vout": 0 }]);
        assert!(matches!(
            parse_utxo_listing(missing_field).unwrap_err(),
            WalletError::Network(_)
        ));
        assert!(parse_utxo_listing(json!({ "not": "a list" })).is_err());
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let explorer = HttpExplorer::new("http://localhost:3001/api/").unwrap();
        assert_eq!(explorer.base_url(), "http://localhost:3001/api");
        assert_eq!(explorer.url("tx/send"), "http://localhost:3001/api/tx/send");
    }

    #[tokio::test]
    async fn http_utxo_listing() {
        let body = json!([
            { "txid": "ab".repeat(32), "vout": 2, "address": addr().to_string(), "satoshis": 900 }
        ])
        .to_string();
        let (base, handle) = serve_once("200 OK", body).await;
        let explorer = HttpExplorer::new(&base).unwrap();
        let utxos = explorer.utxos(&addr()).await.unwrap();
        assert_eq!(utxos.len(), 1);
        assert_eq!(utxos[0].value, 900);
        let request = handle.await.unwrap();
        assert!(request.starts_with(&format!("GET /api/addr/{}/utxo ", addr())));
    }

    #[tokio::test]
    async fn http_broadcast_posts_rawtx() {
        let (base, handle) = serve_once("200 OK", json!({ "txid": "cafe" }).to_string()).await;
        let explorer = HttpExplorer::new(&base).unwrap();
        let result = explorer.broadcast("deadbeef").await.unwrap();
        assert_eq!(result.txid, "cafe");
        let request = handle.await.unwrap();
        assert!(request.starts_with("POST /api/tx/send "));
        assert!(request.contains(r#"{"rawtx":"deadbeef"}"#));
    }

    #[tokio::test]
    async fn http_not_found() {
        let (base, _handle) = serve_once("404 Not Found", "{}".into()).await;
        let explorer = HttpExplorer::new(&base).unwrap();
        let err = explorer.transaction(&Hash256([1; 32])).await.unwrap_err();
        assert!(matches!(err, WalletError::NotFound(_)));
    }

    #[tokio::test]
    async fn http_client_error_is_rejection() {
        let (base, _handle) = serve_once("400 Bad Request", "\"tx rejected\"".into()).await;
        let explorer = HttpExplorer::new(&base).unwrap();
        let err = explorer.broadcast("00").await.unwrap_err();
        assert!(matches!(err, WalletError::Rejected(ref m) if m.contains("tx rejected")));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn http_server_error_is_transient() {
        let (base, _handle) = serve_once("503 Service Unavailable", "{}".into()).await;
        let explorer = HttpExplorer::new(&base).unwrap();
        let err = explorer.address_info(&addr()).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn http_connection_refused_is_transient() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let explorer = HttpExplorer::with_timeout(&base, Duration::from_secs(2)).unwrap();
        let err = explorer.address_info(&addr()).await.unwrap_err();
        assert!(matches!(err, WalletError::Network(_)));
    }
}
