use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{json, Map, Value};
use tokio::sync::{watch, Notify};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::FirebaseConfig;
use crate::models::{Listing, ListingRecord, ListingStatus};

use super::value::{decode_fields, encode_fields, encode_value, timestamp_value};
use super::{AnonymousAuth, ListingStore, Snapshot, StoreError, Subscription, COLLECTION};

/// Listings kept in a Firestore collection, accessed over the REST API.
///
/// Subscriptions poll the collection in the background and are woken early
/// after every write made through this store.
pub struct FirestoreStore {
    api: Arc<FirestoreApi>,
    poll_interval: Duration,
    wake: Arc<Notify>,
}

struct FirestoreApi {
    client: Client,
    documents_url: String,
    api_key: String,
    auth: Arc<AnonymousAuth>,
}

impl FirestoreStore {
    pub fn new(
        client: Client,
        config: &FirebaseConfig,
        api_key: impl Into<String>,
        auth: Arc<AnonymousAuth>,
        poll_interval: Duration,
    ) -> Self {
        let documents_url = format!(
            "{}/projects/{}/databases/(default)/documents",
            config.firestore_base.trim_end_matches('/'),
            config.project_id
        );
        Self {
            api: Arc::new(FirestoreApi {
                client,
                documents_url,
                api_key: api_key.into(),
                auth,
            }),
            poll_interval,
            wake: Arc::new(Notify::new()),
        }
    }
}

impl FirestoreApi {
    fn document_url(&self, id: &str) -> String {
        format!("{}/{}/{}", self.documents_url, COLLECTION, id)
    }

    async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, StoreError> {
        let token = self.auth.ensure_session().await?;
        Ok(self
            .client
            .request(method, url)
            .query(&[("key", self.api_key.as_str())])
            .bearer_auth(token))
    }

    async fn list(&self) -> Result<Snapshot, StoreError> {
        let url = format!("{}:runQuery", self.documents_url);
        let response = self
            .request(Method::POST, &url)
            .await?
            .json(&json!({
                "structuredQuery": {
                    "from": [{ "collectionId": COLLECTION }],
                    "orderBy": [{
                        "field": { "fieldPath": "createdAt" },
                        "direction": "DESCENDING"
                    }]
                }
            }))
            .send()
            .await?;

        let body: Value = check(response, None).await?.json().await?;
        decode_query_response(&body)
    }

    async fn create(&self, fields: Value) -> Result<String, StoreError> {
        let url = format!("{}/{}", self.documents_url, COLLECTION);
        let response = self
            .request(Method::POST, &url)
            .await?
            .json(&json!({ "fields": fields }))
            .send()
            .await?;

        let document: Value = check(response, None).await?.json().await?;
        document_id(&document)
    }

    async fn patch(&self, id: &str, fields: Value, mask: &[&str]) -> Result<(), StoreError> {
        let mut query: Vec<(&str, &str)> = mask.iter().map(|f| ("updateMask.fieldPaths", *f)).collect();
        query.push(("currentDocument.exists", "true"));

        let response = self
            .request(Method::PATCH, &self.document_url(id))
            .await?
            .query(&query)
            .json(&json!({ "fields": fields }))
            .send()
            .await?;

        check(response, Some(id)).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let response = self
            .request(Method::DELETE, &self.document_url(id))
            .await?
            .query(&[("currentDocument.exists", "true")])
            .send()
            .await?;

        check(response, Some(id)).await?;
        Ok(())
    }
}

/// Map a non-success response to a store error
async fn check(response: Response, id: Option<&str>) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return Err(StoreError::NotFound(id.to_string()));
        }
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or(body);
    warn!("Firestore returned {}: {}", status, message);
    Err(StoreError::Backend {
        status: status.as_u16(),
        message,
    })
}

/// Firestore `fields` for a full record
pub fn encode_record(record: &ListingRecord) -> Result<Value, StoreError> {
    let value = serde_json::to_value(record)?;
    let object = value
        .as_object()
        .ok_or_else(|| StoreError::Malformed("record is not an object".to_string()))?;

    let mut fields = encode_fields(object);
    fields["createdAt"] = timestamp_value(
        &record
            .created_at
            .to_rfc3339_opts(SecondsFormat::Micros, true),
    );
    Ok(fields)
}

fn document_id(document: &Value) -> Result<String, StoreError> {
    document["name"]
        .as_str()
        .and_then(|name| name.rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map(String::from)
        .ok_or_else(|| StoreError::Malformed("document without a name".to_string()))
}

pub fn decode_document(document: &Value) -> Result<Listing, StoreError> {
    let id = document_id(document)?;
    let fields = match &document["fields"] {
        Value::Object(fields) => decode_fields(fields)?,
        _ => Map::new(),
    };
    let record: ListingRecord = serde_json::from_value(Value::Object(fields))
        .map_err(|e| StoreError::Malformed(format!("listing {}: {}", id, e)))?;
    Ok(Listing { id, record })
}

/// Listings from a `runQuery` response. Documents that don't decode are
/// reported by id instead of failing the whole read.
pub fn decode_query_response(body: &Value) -> Result<Snapshot, StoreError> {
    let rows = body
        .as_array()
        .ok_or_else(|| StoreError::Malformed("runQuery response is not an array".to_string()))?;

    let mut snapshot = Snapshot::default();
    for row in rows {
        let Some(document) = row.get("document") else {
            continue;
        };
        match decode_document(document) {
            Ok(listing) => snapshot.listings.push(listing),
            Err(e) => {
                warn!("Skipping unreadable listing: {}", e);
                let id = document_id(document).unwrap_or_else(|_| "(unnamed)".to_string());
                snapshot.unreadable.push(id);
            }
        }
    }
    Ok(snapshot)
}

#[async_trait]
impl ListingStore for FirestoreStore {
    async fn subscribe(&self) -> Result<Subscription, StoreError> {
        let (sender, receiver) = watch::channel(None);
        let api = Arc::clone(&self.api);
        let wake = Arc::clone(&self.wake);
        let poll_interval = self.poll_interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = wake.notified() => {}
                }

                match api.list().await {
                    Ok(snapshot) => {
                        let changed = sender.send_if_modified(|current| {
                            if current.as_ref() == Some(&snapshot) {
                                false
                            } else {
                                *current = Some(snapshot);
                                true
                            }
                        });
                        if changed {
                            debug!("Listing feed updated");
                        }
                    }
                    Err(e) => warn!("Failed to refresh listings: {}", e),
                }

                if sender.is_closed() {
                    break;
                }
            }
        });

        info!("📡 Subscribed to {} (every {:?})", COLLECTION, poll_interval);
        Ok(Subscription::with_task(receiver, task))
    }

    async fn insert(&self, record: ListingRecord) -> Result<String, StoreError> {
        let id = self.api.create(encode_record(&record)?).await?;
        info!("Listing created: id={}", id);
        self.wake.notify_waiters();
        Ok(id)
    }

    async fn replace(&self, id: &str, record: ListingRecord) -> Result<(), StoreError> {
        self.api
            .patch(id, encode_record(&record)?, &ListingRecord::FIELD_GROUPS)
            .await?;
        info!("Listing updated: id={}", id);
        self.wake.notify_waiters();
        Ok(())
    }

    async fn set_status(&self, id: &str, status: ListingStatus) -> Result<(), StoreError> {
        let fields = json!({ "status": encode_value(&json!(status.as_str())) });
        self.api.patch(id, fields, &["status"]).await?;
        info!("Listing {} marked {}", id, status);
        self.wake.notify_waiters();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.api.delete(id).await?;
        info!("Listing deleted: id={}", id);
        self.wake.notify_waiters();
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "firestore"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{build_payload, Carry, DraftField, ListingDraft};
    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::{HeaderMap, Method as HttpMethod, StatusCode as HttpStatus, Uri};
    use axum::{Json, Router};
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use tokio::time::timeout;

    const DOCUMENTS: &str = "projects/demo/databases/(default)/documents/properties";

    #[derive(Debug, Clone)]
    struct Recorded {
        method: String,
        path: String,
        query: String,
        body: Value,
        bearer: Option<String>,
    }

    /// In-process stand-in for the Firestore and sign-up endpoints
    #[derive(Default)]
    struct FakeFirestore {
        documents: BTreeMap<String, Value>,
        next_id: u32,
        queries: usize,
        requests: Vec<Recorded>,
    }

    type Shared = Arc<Mutex<FakeFirestore>>;

    fn reply(status: HttpStatus, body: Value) -> (HttpStatus, Json<Value>) {
        (status, Json(body))
    }

    fn missing(id: &str) -> (HttpStatus, Json<Value>) {
        reply(
            HttpStatus::NOT_FOUND,
            json!({ "error": { "code": 404, "message": format!("No document to update: {}", id) } }),
        )
    }

    async fn handle(
        State(state): State<Shared>,
        method: HttpMethod,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> (HttpStatus, Json<Value>) {
        let path = uri.path().to_string();
        let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        let mut fake = state.lock().unwrap();
        fake.requests.push(Recorded {
            method: method.to_string(),
            path: path.clone(),
            query: uri.query().unwrap_or("").to_string(),
            body: body.clone(),
            bearer: headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(String::from),
        });

        if path.ends_with("/accounts:signUp") {
            return reply(
                HttpStatus::OK,
                json!({
                    "idToken": "token-1",
                    "refreshToken": "refresh-1",
                    "expiresIn": "3600",
                    "localId": "anon-1"
                }),
            );
        }
        if path.ends_with(":runQuery") {
            fake.queries += 1;
            let rows: Vec<Value> = fake
                .documents
                .iter()
                .map(|(id, fields)| {
                    json!({ "document": { "name": format!("{}/{}", DOCUMENTS, id), "fields": fields } })
                })
                .collect();
            return reply(HttpStatus::OK, Value::Array(rows));
        }

        let Some((_, rest)) = path.split_once("/documents/properties") else {
            return reply(HttpStatus::NOT_FOUND, json!({ "error": { "message": "no route" } }));
        };
        let id = rest.trim_start_matches('/').to_string();

        if method == HttpMethod::POST && id.is_empty() {
            fake.next_id += 1;
            let id = format!("doc-{}", fake.next_id);
            fake.documents.insert(id.clone(), body["fields"].clone());
            return reply(
                HttpStatus::OK,
                json!({ "name": format!("{}/{}", DOCUMENTS, id), "fields": body["fields"] }),
            );
        }
        if method == HttpMethod::PATCH {
            let Some(document) = fake.documents.get_mut(&id) else {
                return missing(&id);
            };
            if let Some(fields) = body["fields"].as_object() {
                for (key, value) in fields {
                    document[key] = value.clone();
                }
            }
            return reply(HttpStatus::OK, json!({ "name": format!("{}/{}", DOCUMENTS, id) }));
        }
        if method == HttpMethod::DELETE {
            if fake.documents.remove(&id).is_none() {
                return missing(&id);
            }
            return reply(HttpStatus::OK, json!({}));
        }
        reply(HttpStatus::BAD_REQUEST, json!({ "error": { "message": "unsupported" } }))
    }

    async fn spawn_fake_firestore() -> (String, Shared) {
        let state: Shared = Arc::default();
        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), state)
    }

    fn store_at(base: &str, poll_interval: Duration) -> FirestoreStore {
        let config = FirebaseConfig {
            project_id: "demo".into(),
            api_key: Some("k".into()),
            firestore_base: base.into(),
            identity_base: base.into(),
            token_base: base.into(),
        };
        let client = Client::new();
        let auth = Arc::new(AnonymousAuth::new(client.clone(), &config, "k"));
        FirestoreStore::new(client, &config, "k", auth, poll_interval)
    }

    fn update_mask(query: &str) -> Vec<String> {
        query
            .split('&')
            .filter_map(|pair| pair.strip_prefix("updateMask.fieldPaths="))
            .map(String::from)
            .collect()
    }

    async fn wait_until(mut done: impl FnMut() -> bool) {
        timeout(Duration::from_secs(5), async {
            while !done() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    fn sample_record() -> ListingRecord {
        let mut draft = ListingDraft::new();
        draft.title = "Sunrise PG".into();
        draft.phone = "9876543210".into();
        draft.price = "8500".into();
        draft.set_field(DraftField::TotalUnits, "3").unwrap();
        draft.toggle_unit(2).unwrap();
        build_payload(&draft, Carry::fresh()).unwrap()
    }

    #[test]
    fn test_record_survives_firestore_encoding() {
        let record = sample_record();
        let fields = encode_record(&record).unwrap();

        assert!(fields["createdAt"]["timestampValue"].is_string());
        assert_eq!(fields["status"], json!({ "stringValue": "available" }));

        let document = json!({
            "name": "projects/p/databases/(default)/documents/properties/abc123",
            "fields": fields,
            "createTime": "2024-01-01T00:00:00Z"
        });
        let listing = decode_document(&document).unwrap();
        assert_eq!(listing.id, "abc123");
        assert_eq!(listing.record, record);
    }

    #[test]
    fn test_query_response_skips_empty_and_bad_rows() {
        let good = json!({
            "name": "projects/p/databases/(default)/documents/properties/one",
            "fields": encode_record(&sample_record()).unwrap()
        });
        let bad = json!({
            "name": "projects/p/databases/(default)/documents/properties/two",
            "fields": { "info": { "stringValue": "not a map" } }
        });
        let body = json!([
            { "document": good, "readTime": "2024-01-01T00:00:00Z" },
            { "document": bad, "readTime": "2024-01-01T00:00:00Z" },
            { "readTime": "2024-01-01T00:00:00Z" }
        ]);

        let snapshot = decode_query_response(&body).unwrap();
        assert_eq!(snapshot.listings.len(), 1);
        assert_eq!(snapshot.listings[0].id, "one");
        assert_eq!(snapshot.unreadable, vec!["two"]);
        assert!(decode_query_response(&json!({})).is_err());
    }

    #[test]
    fn test_documents_url_shape() {
        let config = FirebaseConfig::default();
        let auth = Arc::new(AnonymousAuth::new(Client::new(), &config, "k"));
        let store = FirestoreStore::new(Client::new(), &config, "k", auth, Duration::from_secs(5));
        assert_eq!(
            store.api.document_url("xyz"),
            "https://firestore.googleapis.com/v1/projects/main-to-let/databases/(default)/documents/properties/xyz"
        );
    }

    #[tokio::test]
    async fn test_writes_send_expected_masks() {
        let (base, fake) = spawn_fake_firestore().await;
        let store = store_at(&base, Duration::from_secs(3600));

        let id = store.insert(sample_record()).await.unwrap();
        assert_eq!(id, "doc-1");
        store.replace(&id, sample_record()).await.unwrap();
        store.set_status(&id, ListingStatus::Booked).await.unwrap();

        let requests = fake.lock().unwrap().requests.clone();
        let patches: Vec<_> = requests.iter().filter(|r| r.method == "PATCH").collect();
        assert_eq!(patches.len(), 2);

        assert_eq!(update_mask(&patches[0].query), ListingRecord::FIELD_GROUPS.to_vec());
        assert!(patches[0].query.contains("currentDocument.exists=true"));

        assert_eq!(update_mask(&patches[1].query), vec!["status"]);
        let sent: Vec<_> = patches[1].body["fields"].as_object().unwrap().keys().collect();
        assert_eq!(sent, vec!["status"]);
        assert_eq!(
            patches[1].body["fields"]["status"],
            json!({ "stringValue": "booked" })
        );

        let sign_ups = requests.iter().filter(|r| r.path.ends_with("accounts:signUp")).count();
        assert_eq!(sign_ups, 1);
        assert!(requests
            .iter()
            .filter(|r| r.path.contains("/documents/"))
            .all(|r| r.bearer.as_deref() == Some("Bearer token-1") && r.query.contains("key=k")));
    }

    #[tokio::test]
    async fn test_missing_documents_are_not_found() {
        let (base, _fake) = spawn_fake_firestore().await;
        let store = store_at(&base, Duration::from_secs(3600));

        assert!(matches!(store.delete("ghost").await, Err(StoreError::NotFound(id)) if id == "ghost"));
        assert!(matches!(
            store.set_status("ghost", ListingStatus::Booked).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.replace("ghost", sample_record()).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_feed_publishes_only_real_changes() {
        let (base, fake) = spawn_fake_firestore().await;
        let store = store_at(&base, Duration::from_millis(30));

        let mut sub = store.subscribe().await.unwrap();
        timeout(Duration::from_secs(5), sub.changed()).await.unwrap().unwrap();
        assert_eq!(sub.latest(), Some(Snapshot::default()));

        let seen = fake.lock().unwrap().queries;
        wait_until(|| fake.lock().unwrap().queries >= seen + 3).await;
        assert!(!sub.has_changed());

        store.insert(sample_record()).await.unwrap();
        timeout(Duration::from_secs(5), sub.changed()).await.unwrap().unwrap();
        let snapshot = sub.latest().unwrap();
        assert_eq!(snapshot.listings.len(), 1);
        assert_eq!(snapshot.listings[0].id, "doc-1");
    }

    #[tokio::test]
    async fn test_local_write_wakes_the_feed() {
        let (base, _fake) = spawn_fake_firestore().await;
        let store = store_at(&base, Duration::from_secs(3600));

        let mut sub = store.subscribe().await.unwrap();
        timeout(Duration::from_secs(5), sub.changed()).await.unwrap().unwrap();
        sub.latest();
        tokio::time::sleep(Duration::from_millis(50)).await;

        store.insert(sample_record()).await.unwrap();
        timeout(Duration::from_secs(5), sub.changed()).await.unwrap().unwrap();
        assert_eq!(sub.latest().unwrap().listings.len(), 1);
    }

    #[test]
    fn test_nan_price_and_negative_capacity_stay_listed() {
        let mut fields = encode_record(&sample_record()).unwrap();
        fields["price"] = json!({ "mapValue": { "fields": {
            "amount": { "doubleValue": "NaN" }
        } } });
        fields["rules"] = json!({ "mapValue": { "fields": {
            "capacity": { "integerValue": "-1" },
            "totalUnits": { "integerValue": "3" }
        } } });
        let body = json!([{ "document": {
            "name": format!("{}/odd", DOCUMENTS),
            "fields": fields
        } }]);

        let snapshot = decode_query_response(&body).unwrap();
        assert!(snapshot.unreadable.is_empty());
        let record = &snapshot.listings[0].record;
        assert_eq!(record.price.amount, 0.0);
        assert_eq!(record.rules.capacity, 1);
        assert_eq!(record.rules.total_units, 3);
    }
}
