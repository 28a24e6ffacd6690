//! 后端API客户端
//!
//! 后端所有接口都返回统一信封，客户端只在信封成功时交出数据。
//! 存储本身从不访问网络，由这里拉取后通过 `update_core_data` 写入。

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vitalred_core::{Result, VitalRedError};
use vitalred_store::{CoreRecord, DataStore};

/// 后端响应信封
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// 拆开信封
    pub fn into_result(self) -> Result<T> {
        if !self.success {
            return Err(VitalRedError::Backend(
                self.error.unwrap_or_else(|| "unknown backend error".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| VitalRedError::Backend("successful response without data".to_string()))
    }
}

/// 客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub auth_token: Option<String>,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout: Duration::from_secs(30),
            auth_token: None,
        }
    }
}

/// API客户端
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    config: ApiClientConfig,
}

fn network_error(e: reqwest::Error) -> VitalRedError {
    VitalRedError::Network(e.to_string())
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(network_error)?;

        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await.map_err(network_error)?;
        decode_envelope(status, &body)
    }

    /// GET 请求
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(network_error)?;
        Self::read_envelope(response).await
    }

    /// POST 请求
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self
            .with_auth(self.client.post(&url).json(body))
            .send()
            .await
            .map_err(network_error)?;
        Self::read_envelope(response).await
    }

    /// 拉取一个核心集合并整体写入存储，返回记录数
    pub async fn sync_core<T: CoreRecord>(&self, store: &DataStore, path: &str) -> Result<usize> {
        let fetched = self.get::<Vec<T>>(path).await;
        store_fetched(store, path, fetched)
    }
}

/// 按HTTP状态解析信封；非成功状态且响应体不是信封时报告状态码
fn decode_envelope<T: DeserializeOwned>(status: reqwest::StatusCode, body: &str) -> Result<T> {
    match serde_json::from_str::<ApiEnvelope<T>>(body) {
        Ok(envelope) => envelope.into_result(),
        Err(e) if !status.is_success() => {
            Err(VitalRedError::Backend(format!("HTTP {}: {}", status, e)))
        }
        Err(e) => Err(e.into()),
    }
}

/// 拉取成功时整体替换集合，失败时存储保持不变
fn store_fetched<T: CoreRecord>(store: &DataStore, path: &str, fetched: Result<Vec<T>>) -> Result<usize> {
    match fetched {
        Ok(items) => {
            let count = items.len();
            store.update_core_data(items);
            info!("Synchronized {} records into '{}'", count, T::COLLECTION);
            Ok(count)
        }
        Err(e) => {
            warn!("Failed to synchronize '{}' from {}: {}", T::COLLECTION, path, e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitalred_core::InventoryItem;

    #[test]
    fn test_envelope_success() {
        let json = r#"{"success": true, "data": [1, 2, 3]}"#;
        let envelope: ApiEnvelope<Vec<u32>> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.into_result().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_envelope_error() {
        let json = r#"{"success": false, "error": "Paciente no encontrado"}"#;
        let envelope: ApiEnvelope<Vec<InventoryItem>> = serde_json::from_str(json).unwrap();
        match envelope.into_result() {
            Err(VitalRedError::Backend(message)) => assert_eq!(message, "Paciente no encontrado"),
            other => panic!("unexpected result: {:?}", other),
        }

        let empty: ApiEnvelope<u32> = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(empty.into_result().is_err());
    }

    const INVENTORY_BODY: &str = r#"{
        "success": true,
        "data": [
            {"id": "i1", "name": "Guantes", "category": "Insumos", "quantity": 4, "minimumStock": 10, "unit": "caja"},
            {"id": "i2", "name": "Suero", "category": "Fluidos", "quantity": 40, "minimumStock": 10, "unit": "bolsa"}
        ]
    }"#;

    fn sync_body(store: &DataStore, status: reqwest::StatusCode, body: &str) -> Result<usize> {
        store_fetched(store, "/inventory", decode_envelope::<Vec<InventoryItem>>(status, body))
    }

    #[test]
    fn test_sync_envelope_into_store() {
        let store = DataStore::in_memory();
        let count = sync_body(&store, reqwest::StatusCode::OK, INVENTORY_BODY).unwrap();
        assert_eq!(count, 2);

        let items = store.get_core_data::<InventoryItem>();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "i1");
        assert_eq!(items[0].minimum_stock, 10);
        assert!(items[0].is_low_stock());
        assert_eq!(items[1].unit, "bolsa");
        assert_eq!(store.get_analytics().total_records, 2);
    }

    #[test]
    fn test_failed_sync_leaves_store_unchanged() {
        let store = DataStore::in_memory();
        sync_body(&store, reqwest::StatusCode::OK, INVENTORY_BODY).unwrap();

        let rejected = sync_body(
            &store,
            reqwest::StatusCode::OK,
            r#"{"success": false, "error": "Inventario no disponible"}"#,
        );
        assert!(matches!(rejected, Err(VitalRedError::Backend(ref m)) if m == "Inventario no disponible"));

        let gateway = sync_body(&store, reqwest::StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>");
        match gateway {
            Err(VitalRedError::Backend(message)) => assert!(message.starts_with("HTTP 502")),
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(sync_body(&store, reqwest::StatusCode::OK, "not json").is_err());
        assert_eq!(store.get_core_data::<InventoryItem>().len(), 2);
    }

    #[test]
    fn test_url_join() {
        let client = ApiClient::new(ApiClientConfig {
            base_url: "http://backend/api/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.url("/patients"), "http://backend/api/patients");
        assert_eq!(client.url("beds"), "http://backend/api/beds");
    }
}
