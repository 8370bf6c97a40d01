//! Named cache stores.
//!
//! A store is a key/value container of captured responses keyed by request
//! identity. Opening a store that does not exist yet creates it; entries live
//! until the store itself is deleted.

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::Error;
use crate::message::{Request, Response, headers_from_json, headers_to_json};
use http::StatusCode;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

/// Raw entry columns as read from SQLite, converted outside the connection thread.
struct EntryRow {
    response_url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn into_response(self) -> Result<Response, Error> {
        let url = Url::parse(&self.response_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let status =
            StatusCode::from_u16(self.status).map_err(|e| Error::InvalidInput(format!("stored status: {e}")))?;
        let headers = headers_from_json(&self.headers_json)?;
        Ok(Response { url, status, headers, body: self.body.into() })
    }
}

impl CacheDb {
    /// Open the named store, creating it if it does not exist.
    pub async fn open(&self, name: &str) -> Result<Store, Error> {
        let store = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![store, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Store { db: self.clone(), name: name.to_string() })
    }

    /// Whether a store with this name has been opened before.
    pub async fn has(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM stores WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all stores, in creation order.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY created_at ASC, rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and every entry in it.
    ///
    /// Returns false if no such store existed.
    pub async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}

/// Handle to one named store.
#[derive(Clone, Debug)]
pub struct Store {
    db: CacheDb,
    name: String,
}

impl Store {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Write `response` under the identity of `request`, replacing any previous entry.
    ///
    /// Only GET requests can be stored, and partial (206) responses are refused.
    /// The write is a single statement, so readers see either the old or the
    /// new entry and never a mix.
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        if !request.is_get() {
            return Err(Error::InvalidInput(format!("cannot store {} request for {}", request.method, request.url)));
        }
        if response.status == StatusCode::PARTIAL_CONTENT {
            return Err(Error::InvalidInput(format!("cannot store partial response for {}", request.url)));
        }

        let store = self.name.clone();
        let key_hash = compute_cache_key(&request.method, &request.url);
        let method = request.method.to_string();
        let url = request.url.to_string();
        let response_url = response.url.to_string();
        let status = response.status.as_u16();
        let headers_json = headers_to_json(&response.headers)?;
        let body = response.body.to_vec();
        let cached_at = chrono::Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (
                    store, key_hash, method, url, response_url, status, headers_json, body, cached_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(store, key_hash) DO UPDATE SET
                    method = excluded.method,
                    url = excluded.url,
                    response_url = excluded.response_url,
                    status = excluded.status,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    cached_at = excluded.cached_at",
                    params![store, key_hash, method, url, response_url, status, headers_json, body, cached_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        tracing::trace!(store = %self.name, url = %request.url, "stored entry");
        Ok(())
    }

    /// Look up the entry stored for `request`.
    ///
    /// Non-GET requests never match.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        if !request.is_get() {
            return Ok(None);
        }

        let store = self.name.clone();
        let key_hash = compute_cache_key(&request.method, &request.url);
        let row = self
            .db
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT response_url, status, headers_json, body
                FROM entries WHERE store = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![store, key_hash], |row| {
                    Ok(EntryRow {
                        response_url: row.get(0)?,
                        status: row.get(1)?,
                        headers_json: row.get(2)?,
                        body: row.get(3)?,
                    })
                });

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(EntryRow::into_response).transpose()
    }

    /// Remove the entry stored for `request`.
    ///
    /// Returns false if there was nothing to remove.
    pub async fn delete(&self, request: &Request) -> Result<bool, Error> {
        let store = self.name.clone();
        let key_hash = compute_cache_key(&request.method, &request.url);
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted =
                    conn.execute("DELETE FROM entries WHERE store = ?1 AND key_hash = ?2", params![store, key_hash])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Request URLs of every entry in the store, oldest write first.
    pub async fn keys(&self) -> Result<Vec<Url>, Error> {
        let store = self.name.clone();
        let urls = self
            .db
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT url FROM entries WHERE store = ?1 ORDER BY cached_at ASC, rowid ASC")?;
                let urls = stmt
                    .query_map(params![store], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)?;

        urls.iter()
            .map(|u| Url::parse(u).map_err(|e| Error::InvalidUrl(e.to_string())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, Method};

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn make_response(u: &str, body: &str) -> Response {
        let mut response = Response::new(url(u), StatusCode::OK, body.to_string());
        response
            .headers
            .insert(http::header::CONTENT_TYPE, HeaderValue::from_static("application/javascript"));
        response
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::connect_in_memory().await.unwrap();
        let store = db.open("phaseout-static-assets").await.unwrap();
        let request = Request::get(url("https://example.com/app.main.js"));
        let response = make_response("https://example.com/app.main.js", "v1");

        store.put(&request, &response).await.unwrap();

        let cached = store.match_request(&request).await.unwrap().unwrap();
        assert_eq!(cached, response);
    }

    #[tokio::test]
    async fn test_put_keeps_non_utf8_header_values() {
        let db = CacheDb::connect_in_memory().await.unwrap();
        let store = db.open("offline").await.unwrap();
        let request = Request::get(url("https://example.com/offline.html"));
        let mut response = make_response("https://example.com/offline.html", "offline");
        response.headers.insert("x-name", HeaderValue::from_bytes(b"caf\xe9").unwrap());

        store.put(&request, &response).await.unwrap();

        let cached = store.match_request(&request).await.unwrap().unwrap();
        assert_eq!(cached.headers.get("x-name").unwrap().as_bytes(), b"caf\xe9");
        assert_eq!(cached, response);
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::connect_in_memory().await.unwrap();
        let store = db.open("offline").await.unwrap();
        let result = store.match_request(&Request::get(url("https://example.com/offline.html"))).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_entry() {
        let db = CacheDb::connect_in_memory().await.unwrap();
        let store = db.open("phaseout-static-assets").await.unwrap();
        let request = Request::get(url("https://example.com/app.css"));

        store.put(&request, &make_response("https://example.com/app.css", "v1")).await.unwrap();
        store.put(&request, &make_response("https://example.com/app.css", "v2")).await.unwrap();

        let cached = store.match_request(&request).await.unwrap().unwrap();
        assert_eq!(cached.body, "v2");
        assert_eq!(store.keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_rejects_non_get() {
        let db = CacheDb::connect_in_memory().await.unwrap();
        let store = db.open("phaseout-static-assets").await.unwrap();
        let request = Request::new(Method::POST, url("https://example.com/submit"));

        let result = store.put(&request, &make_response("https://example.com/submit", "ok")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_rejects_partial_content() {
        let db = CacheDb::connect_in_memory().await.unwrap();
        let store = db.open("phaseout-static-assets").await.unwrap();
        let request = Request::get(url("https://example.com/video.js"));
        let response = Response::new(url("https://example.com/video.js"), StatusCode::PARTIAL_CONTENT, "part");

        assert!(matches!(store.put(&request, &response).await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_non_get_never_matches() {
        let db = CacheDb::connect_in_memory().await.unwrap();
        let store = db.open("phaseout-static-assets").await.unwrap();
        let u = "https://example.com/app.js";
        store.put(&Request::get(url(u)), &make_response(u, "v1")).await.unwrap();

        let head = Request::new(Method::HEAD, url(u));
        assert!(store.match_request(&head).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stores_are_isolated() {
        let db = CacheDb::connect_in_memory().await.unwrap();
        let assets = db.open("phaseout-static-assets").await.unwrap();
        let cdn = db.open("phaseout-jsdelivr").await.unwrap();
        let request = Request::get(url("https://example.com/app.js"));

        assets.put(&request, &make_response("https://example.com/app.js", "v1")).await.unwrap();

        assert!(cdn.match_request(&request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_creates_store_lazily() {
        let db = CacheDb::connect_in_memory().await.unwrap();
        assert!(!db.has("offline").await.unwrap());

        db.open("offline").await.unwrap();
        db.open("offline").await.unwrap();

        assert!(db.has("offline").await.unwrap());
        assert_eq!(db.keys().await.unwrap(), vec!["offline".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_store_cascades() {
        let db = CacheDb::connect_in_memory().await.unwrap();
        let store = db.open("phaseout-workbox").await.unwrap();
        let request = Request::get(url("https://example.com/workbox-sw.js"));
        store.put(&request, &make_response("https://example.com/workbox-sw.js", "wb")).await.unwrap();

        assert!(db.delete("phaseout-workbox").await.unwrap());
        assert!(!db.delete("phaseout-workbox").await.unwrap());

        let reopened = db.open("phaseout-workbox").await.unwrap();
        assert!(reopened.match_request(&request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let db = CacheDb::connect_in_memory().await.unwrap();
        let store = db.open("offline").await.unwrap();
        let request = Request::get(url("https://example.com/offline.html"));
        store.put(&request, &make_response("https://example.com/offline.html", "offline")).await.unwrap();

        assert!(store.delete(&request).await.unwrap());
        assert!(!store.delete(&request).await.unwrap());
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entries_persist_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");
        let request = Request::get(url("https://example.com/offline.html"));

        {
            let db = CacheDb::connect(&path).await.unwrap();
            let store = db.open("offline").await.unwrap();
            store.put(&request, &make_response("https://example.com/offline.html", "offline")).await.unwrap();
        }

        let db = CacheDb::connect(&path).await.unwrap();
        let store = db.open("offline").await.unwrap();
        let cached = store.match_request(&request).await.unwrap().unwrap();
        assert_eq!(cached.body, "offline");
    }
}
