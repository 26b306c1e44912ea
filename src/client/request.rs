use reqwest::Method;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// A replayable description of one API call.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    /// Path relative to the client's base URL, e.g. `/api/auth/me`.
    pub path: String,
    pub body: Option<JsonValue>,
    /// Whether a 401 may trigger a refresh-and-replay. Replays always carry `false`.
    pub retry: bool,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            retry: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attaches a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn without_retry(mut self) -> Self {
        self.retry = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_to_retry() {
        let spec = RequestSpec::get("/api/auth/me");
        assert!(spec.retry);
        assert!(spec.body.is_none());
        assert!(!spec.clone().without_retry().retry);
    }

    #[test]
    fn json_body_is_captured() {
        let spec = RequestSpec::post("/x").json(&json!({"a": 1})).unwrap();
        assert_eq!(spec.body, Some(json!({"a": 1})));
        assert_eq!(spec.method, Method::POST);
    }
}
