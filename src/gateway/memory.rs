//! In-process gateway with the same observable semantics as the hosted
//! backend: server-assigned ids and creation timestamps, equality filters,
//! ordering, and a flat media object map. Backs the test suite.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

use super::{Collection, Filter, Gateway, Order};

#[derive(Default)]
struct Tables {
    rows: HashMap<&'static str, Vec<Value>>,
    media: HashMap<String, (String, usize)>,
}

#[derive(Default)]
pub struct MemoryGateway {
    inner: RwLock<Tables>,
}

impl MemoryGateway {
    pub fn new() -> Self { Self::default() }

    /// Number of stored media objects (test inspection).
    pub fn media_count(&self) -> usize {
        self.inner.read().media.len()
    }

    fn matches(row: &Value, filter: &Filter) -> bool {
        filter.eq.iter().all(|(col, val)| {
            match row.get(col) {
                Some(Value::String(s)) => s == val,
                Some(Value::Number(n)) => n.to_string() == *val,
                Some(Value::Bool(b)) => b.to_string() == *val,
                _ => false,
            }
        })
    }

    fn sort(rows: &mut [Value], order: &Order) {
        rows.sort_by(|a, b| {
            let av = a.get(&order.column);
            let bv = b.get(&order.column);
            let ord = compare_values(av, bv);
            if order.ascending { ord } else { ord.reverse() }
        });
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn create(&self, collection: Collection, fields: Value) -> AppResult<Value> {
        let mut obj = match fields {
            Value::Object(m) => m,
            _ => return Err(AppError::user("bad_record", "record must be a JSON object")),
        };
        obj.entry("id".to_string())
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        obj.entry("created_at".to_string())
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        let row = Value::Object(obj);
        self.inner.write().rows.entry(collection.as_str()).or_default().push(row.clone());
        Ok(row)
    }

    async fn read(&self, collection: Collection, filter: Filter, order: Option<Order>) -> AppResult<Vec<Value>> {
        let inner = self.inner.read();
        let mut out: Vec<Value> = inner
            .rows
            .get(collection.as_str())
            .map(|rows| rows.iter().filter(|r| Self::matches(r, &filter)).cloned().collect())
            .unwrap_or_default();
        drop(inner);
        if let Some(o) = &order {
            Self::sort(&mut out, o);
        }
        Ok(out)
    }

    async fn read_one(&self, collection: Collection, id: &str) -> AppResult<Value> {
        let inner = self.inner.read();
        inner
            .rows
            .get(collection.as_str())
            .and_then(|rows| {
                rows.iter()
                    .find(|r| r.get("id").and_then(|v| v.as_str()) == Some(id))
                    .cloned()
            })
            .ok_or_else(|| {
                AppError::not_found("not_found", format!("{} {} does not exist", collection.as_str(), id))
            })
    }

    async fn update(&self, collection: Collection, id: &str, fields: Value) -> AppResult<Value> {
        let patch = match fields {
            Value::Object(m) => m,
            _ => return Err(AppError::user("bad_record", "patch must be a JSON object")),
        };
        let mut inner = self.inner.write();
        let rows = inner
            .rows
            .get_mut(collection.as_str())
            .ok_or_else(|| AppError::not_found("not_found", format!("{} {} does not exist", collection.as_str(), id)))?;
        let row = rows
            .iter_mut()
            .find(|r| r.get("id").and_then(|v| v.as_str()) == Some(id))
            .ok_or_else(|| AppError::not_found("not_found", format!("{} {} does not exist", collection.as_str(), id)))?;
        if let Value::Object(obj) = row {
            for (k, v) in patch {
                obj.insert(k, v);
            }
        }
        Ok(row.clone())
    }

    async fn delete(&self, collection: Collection, id: &str) -> AppResult<()> {
        let mut inner = self.inner.write();
        if let Some(rows) = inner.rows.get_mut(collection.as_str()) {
            rows.retain(|r| r.get("id").and_then(|v| v.as_str()) != Some(id));
        }
        Ok(())
    }

    async fn upsert(&self, collection: Collection, key_column: &str, fields: Value) -> AppResult<Value> {
        let obj = match &fields {
            Value::Object(m) => m.clone(),
            _ => return Err(AppError::user("bad_record", "record must be a JSON object")),
        };
        let key_val = obj
            .get(key_column)
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::user("bad_record", format!("upsert record missing key column {}", key_column)))?
            .to_string();
        let existing_id = {
            let inner = self.inner.read();
            inner.rows.get(collection.as_str()).and_then(|rows| {
                rows.iter()
                    .find(|r| r.get(key_column).and_then(|v| v.as_str()) == Some(key_val.as_str()))
                    .and_then(|r| r.get("id").and_then(|v| v.as_str()).map(|s| s.to_string()))
            })
        };
        match existing_id {
            Some(id) => self.update(collection, &id, Value::Object(obj)).await,
            None => self.create(collection, Value::Object(obj)).await,
        }
    }

    async fn upload_media(&self, name: &str, content_type: &str, bytes: Vec<u8>) -> AppResult<String> {
        let url = format!("memory://media/{}", name);
        self.inner
            .write()
            .media
            .insert(name.to_string(), (content_type.to_string(), bytes.len()));
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn crud_roundtrip_with_assigned_id() {
        let gw = MemoryGateway::new();
        let created = gw
            .create(Collection::Posts, json!({"title": "hello", "upvotes": 0}))
            .await
            .unwrap();
        let id = created.get("id").and_then(|v| v.as_str()).unwrap().to_string();
        assert!(created.get("created_at").is_some());

        let fetched = gw.read_one(Collection::Posts, &id).await.unwrap();
        assert_eq!(fetched.get("title").and_then(|v| v.as_str()), Some("hello"));

        gw.update(Collection::Posts, &id, json!({"upvotes": 3})).await.unwrap();
        let updated = gw.read_one(Collection::Posts, &id).await.unwrap();
        assert_eq!(updated.get("upvotes").and_then(|v| v.as_i64()), Some(3));

        gw.delete(Collection::Posts, &id).await.unwrap();
        assert!(gw.read_one(Collection::Posts, &id).await.is_err());
        // Deleting again is a no-op, not an error.
        gw.delete(Collection::Posts, &id).await.unwrap();
    }

    #[tokio::test]
    async fn filter_and_order() {
        let gw = MemoryGateway::new();
        for (t, n) in [("b", 2), ("a", 1), ("c", 3)] {
            gw.create(Collection::Posts, json!({"title": t, "upvotes": n, "pokemon_id": 25}))
                .await
                .unwrap();
        }
        gw.create(Collection::Posts, json!({"title": "z", "upvotes": 9, "pokemon_id": 1}))
            .await
            .unwrap();

        let rows = gw
            .read(Collection::Posts, Filter::by("pokemon_id", "25"), Some(Order::desc("upvotes")))
            .await
            .unwrap();
        let votes: Vec<i64> = rows.iter().map(|r| r["upvotes"].as_i64().unwrap()).collect();
        assert_eq!(votes, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn upsert_replaces_by_key() {
        let gw = MemoryGateway::new();
        gw.upsert(Collection::UserPreferences, "user_id", json!({"user_id": "u1", "color_scheme": "dark"}))
            .await
            .unwrap();
        gw.upsert(Collection::UserPreferences, "user_id", json!({"user_id": "u1", "color_scheme": "colorful"}))
            .await
            .unwrap();
        let rows = gw
            .read(Collection::UserPreferences, Filter::by("user_id", "u1"), None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["color_scheme"].as_str(), Some("colorful"));
    }
}
