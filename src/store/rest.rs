use super::{Filter, Store, Table};
use crate::config::StoreConfig;
use crate::errors::{Operation, StoreError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, error};

/// PostgREST endpoint (Supabase `rest/v1`) authenticated with the public key.
#[derive(Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent(concat!("hydration_app/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| StoreError::NotConfigured(err.to_string()))?;

        Ok(Self {
            client,
            base_url: format!("{}/rest/v1", config.url.trim_end_matches('/')),
            api_key: config.anon_key.clone(),
        })
    }

    fn endpoint(&self, table: Table) -> String {
        format!("{}/{}", self.base_url, table.name())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn execute(
        &self,
        operation: Operation,
        table: Table,
        request: RequestBuilder,
    ) -> Result<Vec<Value>, StoreError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|err| {
                error!(%operation, table = table.name(), "store unreachable: {err}");
                StoreError::Unreachable {
                    operation,
                    table: table.name(),
                    message: err.to_string(),
                }
            })?;

        let response = check_status(operation, table, response).await?;
        let rows = response.json::<Vec<Value>>().await.map_err(|err| {
            error!(%operation, table = table.name(), "unreadable store response: {err}");
            StoreError::Decode {
                operation,
                table: table.name(),
                message: err.to_string(),
            }
        })?;

        debug!(%operation, table = table.name(), rows = rows.len(), "store call finished");
        Ok(rows)
    }
}

async fn check_status(
    operation: Operation,
    table: Table,
    response: Response,
) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    error!(%operation, table = table.name(), status = status.as_u16(), "store rejected call: {message}");
    Err(StoreError::Rejected {
        operation,
        table: table.name(),
        status: status.as_u16(),
        message,
    })
}

fn query(filters: &[Filter]) -> Vec<(&'static str, String)> {
    filters
        .iter()
        .map(|filter| (filter.column, format!("eq.{}", filter.value)))
        .collect()
}

#[async_trait]
impl Store for RestStore {
    async fn select(&self, table: Table, filters: &[Filter]) -> Result<Vec<Value>, StoreError> {
        let request = self
            .client
            .get(self.endpoint(table))
            .query(&[("select", "*")])
            .query(&query(filters));
        self.execute(Operation::Select, table, request).await
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Vec<Value>, StoreError> {
        let request = self
            .client
            .post(self.endpoint(table))
            .header("Prefer", "return=representation")
            .json(&row);
        self.execute(Operation::Insert, table, request).await
    }

    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, StoreError> {
        let request = self
            .client
            .patch(self.endpoint(table))
            .header("Prefer", "return=representation")
            .query(&query(filters))
            .json(&patch);
        self.execute(Operation::Update, table, request).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let request = self
            .client
            .get(self.endpoint(Table::Profiles))
            .query(&[("select", "id"), ("limit", "1")]);
        self.execute(Operation::Select, Table::Profiles, request)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::{RawQuery, State};
    use axum::http::{HeaderMap, Method, StatusCode};
    use axum::response::{IntoResponse, Response as AxumResponse};
    use axum::routing::any;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<(Method, Option<String>, HeaderMap)>>>;

    /// Stand-in PostgREST: inserts conflict, patches answer with an object
    /// instead of an array, reads return no rows.
    async fn record(
        State(seen): State<Seen>,
        method: Method,
        RawQuery(query): RawQuery,
        headers: HeaderMap,
    ) -> AxumResponse {
        let reply = match method {
            Method::POST => (
                StatusCode::CONFLICT,
                "duplicate key value violates unique constraint \"profiles_user_id_key\"",
            )
                .into_response(),
            Method::PATCH => axum::Json(json!({ "not": "an array" })).into_response(),
            _ => axum::Json(json!([])).into_response(),
        };
        if let Ok(mut seen) = seen.lock() {
            seen.push((method, query, headers));
        }
        reply
    }

    async fn spawn_postgrest() -> (RestStore, Seen) {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route("/rest/v1/:table", any(record))
            .with_state(Arc::clone(&seen));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let store = RestStore::new(&StoreConfig {
            url: format!("http://{addr}"),
            anon_key: "key".into(),
        })
        .unwrap();
        (store, seen)
    }

    #[test]
    fn builds_postgrest_urls_and_filters() {
        let store = RestStore::new(&StoreConfig {
            url: "https://abc.supabase.co/".into(),
            anon_key: "key".into(),
        })
        .unwrap();

        assert_eq!(
            store.endpoint(Table::WaterIntake),
            "https://abc.supabase.co/rest/v1/water_intake"
        );
        assert_eq!(
            query(&[Filter::eq("user_id", "42"), Filter::eq("date", "2026-01-05")]),
            vec![
                ("user_id", "eq.42".to_string()),
                ("date", "eq.2026-01-05".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_connectivity_error() {
        let store = RestStore::new(&StoreConfig {
            url: "http://127.0.0.1:9".into(),
            anon_key: "key".into(),
        })
        .unwrap();

        let err = store.select(Table::Profiles, &[]).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Unreachable {
                operation: Operation::Select,
                table: "profiles",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn sends_auth_and_representation_headers() {
        let (store, seen) = spawn_postgrest().await;

        let rows = store
            .select(Table::Profiles, &[Filter::eq("user_id", "42")])
            .await
            .unwrap();
        assert!(rows.is_empty());
        let _ = store.insert(Table::Profiles, json!({ "user_id": "42" })).await;
        let _ = store
            .update(
                Table::Profiles,
                &[Filter::eq("user_id", "42")],
                json!({ "daily_goal": 3000 }),
            )
            .await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        for (_, _, headers) in seen.iter() {
            assert_eq!(headers["apikey"], "key");
            assert_eq!(headers["authorization"], "Bearer key");
        }

        let (method, query, headers) = &seen[0];
        assert_eq!(*method, Method::GET);
        assert!(query.as_deref().unwrap().contains("user_id=eq.42"));
        assert!(headers.get("prefer").is_none());

        let (method, _, headers) = &seen[1];
        assert_eq!(*method, Method::POST);
        assert_eq!(headers["prefer"], "return=representation");

        let (method, query, headers) = &seen[2];
        assert_eq!(*method, Method::PATCH);
        assert_eq!(headers["prefer"], "return=representation");
        assert!(query.as_deref().unwrap().contains("user_id=eq.42"));
    }

    #[tokio::test]
    async fn conflict_status_and_body_are_kept() {
        let (store, _) = spawn_postgrest().await;

        let err = store
            .insert(Table::Profiles, json!({ "user_id": "42" }))
            .await
            .unwrap_err();
        match err {
            StoreError::Rejected {
                operation,
                status,
                message,
                ..
            } => {
                assert_eq!(operation, Operation::Insert);
                assert_eq!(status, 409);
                assert!(message.contains("duplicate key value"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_array_body_is_a_decode_error() {
        let (store, _) = spawn_postgrest().await;

        let err = store
            .update(
                Table::Profiles,
                &[Filter::eq("user_id", "42")],
                json!({ "daily_goal": 3000 }),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Decode {
                operation: Operation::Update,
                table: "profiles",
                ..
            }
        ));
    }
}
