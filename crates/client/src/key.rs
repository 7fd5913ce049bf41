//! Request fingerprinting.

use serde_json::Value;

/// Cache key for a request: `method:url:params`.
///
/// The method is lowercased and `params` is serialized as compact JSON,
/// with absent or null params written as `{}`.
pub fn generate_key(method: &str, url: &str, params: Option<&Value>) -> String {
    let params = match params {
        None | Some(Value::Null) => "{}".to_string(),
        Some(params) => params.to_string(),
    };
    format!("{}:{}:{}", method.to_ascii_lowercase(), url, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_without_params() {
        assert_eq!(generate_key("GET", "/esearch.fcgi", None), "get:/esearch.fcgi:{}");
        assert_eq!(generate_key("m", "/x", Some(&Value::Null)), "m:/x:{}");
    }

    #[test]
    fn test_key_with_params() {
        let params = json!({"db": "pmc", "id": "8401147"});
        assert_eq!(
            generate_key("get", "/efetch.fcgi", Some(&params)),
            r#"get:/efetch.fcgi:{"db":"pmc","id":"8401147"}"#
        );
    }

    #[test]
    fn test_key_stability() {
        let a = json!({"term": "cancer", "retmax": 20});
        let b = json!({"retmax": 20, "term": "cancer"});
        assert_eq!(generate_key("get", "/s", Some(&a)), generate_key("get", "/s", Some(&b)));
    }

    #[test]
    fn test_key_differs_by_method() {
        assert_ne!(generate_key("get", "/s", None), generate_key("post", "/s", None));
    }
}
