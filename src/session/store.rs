//! Backend session cookie storage.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use axum::http::{header::SET_COOKIE, HeaderMap};

/// Holder of the most recently observed backend session cookie.
///
/// Implementations must make every `set` atomic with respect to `get`;
/// readers either see the previous value or the new one, never a mix.
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Replace the current cookie header.
    fn set(&self, cookie_header: String);

    /// Current cookie header, if one has been captured.
    fn get(&self) -> Option<String>;

    fn has_session(&self) -> bool {
        self.get().is_some()
    }
}

/// Process-wide in-memory store. Last writer wins.
#[derive(Debug, Default)]
pub struct SharedSessionStore {
    cookie: ArcSwapOption<String>,
}

impl SharedSessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for SharedSessionStore {
    fn set(&self, cookie_header: String) {
        self.cookie.store(Some(Arc::new(cookie_header)));
    }

    fn get(&self) -> Option<String> {
        self.cookie.load_full().map(|c| c.as_ref().clone())
    }

    fn has_session(&self) -> bool {
        self.cookie.load().is_some()
    }
}

/// Record every `Set-Cookie` value in `headers`, joined with `"; "`.
///
/// Values that are not valid UTF-8 are skipped rather than rewritten, so what
/// is replayed is byte-identical to what the backend sent. Returns the number
/// of values captured. Nothing is written when there are none.
pub fn capture_set_cookies(store: &dyn SessionStore, headers: &HeaderMap) -> usize {
    let values: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| match std::str::from_utf8(v.as_bytes()) {
            Ok(text) => Some(text),
            Err(_) => {
                tracing::warn!("Skipping Set-Cookie value that is not valid UTF-8");
                None
            }
        })
        .collect();

    if values.is_empty() {
        return 0;
    }

    store.set(values.join("; "));
    values.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_absent_at_start() {
        let store = SharedSessionStore::new();
        assert!(store.get().is_none());
        assert!(!store.has_session());
    }

    #[test]
    fn test_last_writer_wins() {
        let store = SharedSessionStore::new();
        store.set("grafana_session=a".into());
        store.set("grafana_session=b".into());

        assert_eq!(store.get().as_deref(), Some("grafana_session=b"));
        assert!(store.has_session());
    }

    #[test]
    fn test_capture_joins_values() {
        let store = SharedSessionStore::new();
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("grafana_session=abc; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("grafana_session_expiry=123"));

        assert_eq!(capture_set_cookies(&store, &headers), 2);
        assert_eq!(
            store.get().as_deref(),
            Some("grafana_session=abc; Path=/; grafana_session_expiry=123")
        );
    }

    #[test]
    fn test_capture_without_set_cookie_keeps_session() {
        let store = SharedSessionStore::new();
        store.set("grafana_session=old".into());

        assert_eq!(capture_set_cookies(&store, &HeaderMap::new()), 0);
        assert_eq!(store.get().as_deref(), Some("grafana_session=old"));
    }

    #[test]
    fn test_capture_skips_non_utf8_values() {
        let store = SharedSessionStore::new();
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_bytes(b"bad=\xff\xfe").unwrap());
        headers.append(SET_COOKIE, HeaderValue::from_static("grafana_session=abc"));

        assert_eq!(capture_set_cookies(&store, &headers), 1);
        assert_eq!(store.get().as_deref(), Some("grafana_session=abc"));

        let mut only_bad = HeaderMap::new();
        only_bad.append(SET_COOKIE, HeaderValue::from_bytes(b"bad=\xff").unwrap());
        assert_eq!(capture_set_cookies(&store, &only_bad), 0);
        assert_eq!(store.get().as_deref(), Some("grafana_session=abc"));
    }

    #[test]
    fn test_capture_keeps_utf8_bytes_verbatim() {
        let store = SharedSessionStore::new();
        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_bytes("name=caf\u{e9}".as_bytes()).unwrap(),
        );

        assert_eq!(capture_set_cookies(&store, &headers), 1);
        assert_eq!(store.get().unwrap().as_bytes(), "name=caf\u{e9}".as_bytes());
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let store = Arc::new(SharedSessionStore::new());
        let mut handles = Vec::new();

        for i in 0..8 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                for j in 0..500 {
                    if i % 2 == 0 {
                        store.set(format!("session={}-{}", i, j));
                    } else if let Some(v) = store.get() {
                        assert!(v.starts_with("session="));
                    }
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        store.set("session=final".into());
        assert_eq!(store.get().as_deref(), Some("session=final"));
    }
}
