//! Gremlin Server HTTP adapter
//!
//! Sends parameterised traversals as `POST {"gremlin": ..., "bindings": ...}`
//! and asks for untyped GraphSON so `result.data` is a plain JSON array. The
//! length of that array is the number of returned elements.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

use super::{ElementKind, EndpointMatch, GraphStore, InsertResult, StoreError};
use crate::config::StoreConfig;

/// Untyped GraphSON, so results come back as plain JSON
const GRAPHSON_V1: &str = "application/vnd.gremlin-v1.0+json";

#[derive(Debug, Serialize)]
struct GremlinRequest<'a> {
    gremlin: &'a str,
    bindings: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct GremlinResponse {
    #[serde(default)]
    status: Option<GremlinStatus>,
    #[serde(default)]
    result: Option<GremlinResult>,
}

#[derive(Debug, Deserialize)]
struct GremlinStatus {
    code: u16,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct GremlinResult {
    #[serde(default)]
    data: Value,
}

/// Traversal text plus its bindings
#[derive(Debug, Default)]
struct Traversal {
    script: String,
    bindings: Map<String, Value>,
}

impl Traversal {
    fn new(script: &str) -> Self {
        Self {
            script: script.to_string(),
            bindings: Map::new(),
        }
    }

    fn bind(mut self, name: &str, value: &str) -> Self {
        self.bindings
            .insert(name.to_string(), Value::String(value.to_string()));
        self
    }

    fn step(mut self, step: &str) -> Self {
        self.script.push_str(step);
        self
    }

    fn properties(mut self, properties: &[(String, String)]) -> Self {
        for (i, (key, value)) in properties.iter().enumerate() {
            let key_name = format!("p{}k", i);
            let value_name = format!("p{}v", i);
            self.script
                .push_str(&format!(".property({}, {})", key_name, value_name));
            self = self.bind(&key_name, key).bind(&value_name, value);
        }
        self
    }
}

/// Graph store reached through a Gremlin Server HTTP endpoint
pub struct GremlinHttpStore {
    client: Client,
    endpoint: String,
    credentials: Option<(String, String)>,
}

impl GremlinHttpStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        // Cosmos DB style credentials when a key is configured
        let credentials = config.auth_key.as_ref().map(|key| {
            let username = match (&config.database, &config.collection) {
                (Some(db), Some(coll)) => format!("/dbs/{}/colls/{}", db, coll),
                _ => String::new(),
            };
            (username, key.clone())
        });

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            credentials,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn submit(&self, traversal: Traversal) -> Result<Vec<Value>, StoreError> {
        debug!(gremlin = %traversal.script, "Submitting traversal");

        let body = GremlinRequest {
            gremlin: &traversal.script,
            bindings: traversal.bindings,
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, GRAPHSON_V1)
            .json(&body);
        if let Some((username, key)) = &self.credentials {
            request = request.basic_auth(username, Some(key));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                code: status.as_u16(),
                message,
            });
        }

        let parsed: GremlinResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        if let Some(status) = parsed.status {
            // 204 is "no content", a successful empty result
            if status.code != 200 && status.code != 204 {
                return Err(StoreError::Status {
                    code: status.code,
                    message: status.message,
                });
            }
        }

        Ok(parsed.result.map(|r| result_items(r.data)).unwrap_or_default())
    }
}

/// Flatten `result.data` into its elements, accepting typed GraphSON lists too
fn result_items(data: Value) -> Vec<Value> {
    match data {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        Value::Object(mut object) if object.contains_key("@value") => {
            result_items(object.remove("@value").unwrap_or(Value::Null))
        },
        other => vec![other],
    }
}

#[async_trait]
impl GraphStore for GremlinHttpStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.submit(Traversal::new("g.inject(1)")).await.map(|_| ())
    }

    async fn existing_identities(
        &self,
        kind: ElementKind,
        label: &str,
    ) -> Result<Vec<String>, StoreError> {
        let script = match kind {
            ElementKind::Vertex => "g.V().hasLabel(lbl).values(key)",
            ElementKind::Edge => "g.E().hasLabel(lbl).values(key)",
        };
        let traversal = Traversal::new(script)
            .bind("lbl", label)
            .bind("key", kind.identity_key());

        let items = self.submit(traversal).await?;
        Ok(items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect())
    }

    async fn insert_node(
        &self,
        label: &str,
        properties: &[(String, String)],
    ) -> Result<InsertResult, StoreError> {
        let traversal = Traversal::new("g.addV(lbl)")
            .bind("lbl", label)
            .properties(properties);

        let items = self.submit(traversal).await?;
        Ok(InsertResult::new(items.len()))
    }

    async fn insert_edge(
        &self,
        label: &str,
        source: &EndpointMatch,
        destination: &EndpointMatch,
        properties: &[(String, String)],
    ) -> Result<InsertResult, StoreError> {
        let traversal = Traversal::new("g.V().has(sk, sv).as('s')")
            .step(".V().has(dk, dv).addE(lbl).from('s')")
            .bind("sk", &source.attribute)
            .bind("sv", &source.value)
            .bind("dk", &destination.attribute)
            .bind("dv", &destination.value)
            .bind("lbl", label)
            .properties(properties);

        let items = self.submit(traversal).await?;
        Ok(InsertResult::new(items.len()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn store_for(server: &MockServer) -> GremlinHttpStore {
        let config = StoreConfig {
            endpoint: format!("{}/gremlin", server.uri()),
            ..StoreConfig::default()
        };
        GremlinHttpStore::new(&config).unwrap()
    }

    fn ok(data: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "requestId": "0f1b1b1e-0000-0000-0000-000000000000",
            "status": { "code": 200, "message": "", "attributes": {} },
            "result": { "data": data, "meta": {} }
        }))
    }

    #[test]
    fn test_traversal_property_bindings() {
        let traversal = Traversal::new("g.addV(lbl)").bind("lbl", "Person").properties(&[
            ("id".to_string(), "1".to_string()),
            ("name".to_string(), "O'Brien".to_string()),
        ]);

        assert_eq!(
            traversal.script,
            "g.addV(lbl).property(p0k, p0v).property(p1k, p1v)"
        );
        assert_eq!(traversal.bindings["p1v"], json!("O'Brien"));
        assert_eq!(traversal.bindings["lbl"], json!("Person"));
    }

    #[test]
    fn test_result_items_shapes() {
        assert!(result_items(Value::Null).is_empty());
        assert_eq!(result_items(json!([1, 2])).len(), 2);
        assert_eq!(
            result_items(json!({ "@type": "g:List", "@value": ["a"] })),
            vec![json!("a")]
        );
    }

    #[tokio::test]
    async fn test_existing_identities() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gremlin"))
            .and(header("accept", GRAPHSON_V1))
            .and(body_partial_json(json!({
                "gremlin": "g.V().hasLabel(lbl).values(key)",
                "bindings": { "lbl": "Person", "key": "NodeId_Internal" }
            })))
            .respond_with(ok(json!(["Person1", "Person2"])))
            .mount(&server)
            .await;

        let ids = store_for(&server)
            .existing_identities(ElementKind::Vertex, "Person")
            .await
            .unwrap();
        assert_eq!(ids, vec!["Person1", "Person2"]);
    }

    #[tokio::test]
    async fn test_insert_edge_counts_returned_elements() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "gremlin": "g.V().has(sk, sv).as('s').V().has(dk, dv).addE(lbl).from('s').property(p0k, p0v)",
                "bindings": { "sv": "1", "dv": "2", "lbl": "PersonPerson" }
            })))
            .respond_with(ok(json!([])))
            .mount(&server)
            .await;

        let result = store_for(&server)
            .insert_edge(
                "PersonPerson",
                &EndpointMatch::new("id", "1"),
                &EndpointMatch::new("id", "2"),
                &[("EdgeId_Internal".to_string(), "Knows12".to_string())],
            )
            .await
            .unwrap();
        assert!(!result.created());
    }

    #[tokio::test]
    async fn test_insert_node_created() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ok(json!([{ "id": 7, "label": "Person", "type": "vertex" }])))
            .mount(&server)
            .await;

        let result = store_for(&server)
            .insert_node("Person", &[("id".to_string(), "1".to_string())])
            .await
            .unwrap();
        assert_eq!(result.returned, 1);
    }

    #[tokio::test]
    async fn test_server_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("script evaluation failed"))
            .mount(&server)
            .await;

        let err = store_for(&server).ping().await.unwrap_err();
        assert!(matches!(err, StoreError::Status { code: 500, .. }));
    }

    #[tokio::test]
    async fn test_error_status_in_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": { "code": 597, "message": "No such property: g" },
                "result": { "data": null }
            })))
            .mount(&server)
            .await;

        let err = store_for(&server).ping().await.unwrap_err();
        assert!(err.to_string().contains("597"));
    }
}
