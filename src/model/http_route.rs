//! `gateway.networking.k8s.io/v1` HTTPRoute.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::meta::{kube_object, ObjectMeta, CORE_GROUP, GATEWAY_API_GROUP};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRoute {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: HttpRouteSpec,
}

kube_object!(HttpRoute, "HTTPRoute");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRouteSpec {
    #[serde(default)]
    pub parent_refs: Vec<ParentReference>,

    #[serde(default)]
    pub hostnames: Vec<String>,

    #[serde(default)]
    pub rules: Vec<HttpRouteRule>,
}

/// Attachment of a route to a Gateway (optionally to one of its listeners).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentReference {
    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub namespace: Option<String>,

    pub name: String,

    #[serde(default)]
    pub section_name: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,
}

impl ParentReference {
    pub fn group(&self) -> &str {
        self.group.as_deref().unwrap_or(GATEWAY_API_GROUP)
    }

    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or("Gateway")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRouteRule {
    #[serde(default)]
    pub matches: Vec<HttpRouteMatch>,

    #[serde(default)]
    pub filters: Vec<HttpRouteFilter>,

    #[serde(default)]
    pub backend_refs: Vec<HttpBackendRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRouteMatch {
    #[serde(default)]
    pub path: Option<HttpPathMatch>,

    #[serde(default)]
    pub headers: Vec<HttpHeaderMatch>,

    #[serde(default)]
    pub query_params: Vec<HttpQueryParamMatch>,

    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpPathMatch {
    #[serde(rename = "type", default)]
    pub match_type: PathMatchType,

    #[serde(default = "root_path")]
    pub value: String,
}

impl Default for HttpPathMatch {
    fn default() -> Self {
        Self { match_type: PathMatchType::PathPrefix, value: root_path() }
    }
}

fn root_path() -> String {
    "/".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathMatchType {
    Exact,
    #[default]
    PathPrefix,
    RegularExpression,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StringMatchType {
    #[default]
    Exact,
    RegularExpression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpHeaderMatch {
    #[serde(rename = "type", default)]
    pub match_type: StringMatchType,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpQueryParamMatch {
    #[serde(rename = "type", default)]
    pub match_type: StringMatchType,
    pub name: String,
    pub value: String,
}

/// Route filter. `type` is kept as a string so that kinds the translator does
/// not implement still deserialize and can be reported precisely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRouteFilter {
    #[serde(rename = "type")]
    pub filter_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_header_modifier: Option<HeaderModifier>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_header_modifier: Option<HeaderModifier>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_redirect: Option<RequestRedirect>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_rewrite: Option<UrlRewrite>,
}

pub const FILTER_REQUEST_HEADER_MODIFIER: &str = "RequestHeaderModifier";
pub const FILTER_RESPONSE_HEADER_MODIFIER: &str = "ResponseHeaderModifier";
pub const FILTER_REQUEST_REDIRECT: &str = "RequestRedirect";
pub const FILTER_URL_REWRITE: &str = "URLRewrite";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderModifier {
    #[serde(default)]
    pub set: Vec<HttpHeader>,

    #[serde(default)]
    pub add: Vec<HttpHeader>,

    #[serde(default)]
    pub remove: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRedirect {
    #[serde(default)]
    pub scheme: Option<String>,

    #[serde(default)]
    pub hostname: Option<String>,

    #[serde(default)]
    pub path: Option<HttpPathModifier>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub status_code: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRewrite {
    #[serde(default)]
    pub hostname: Option<String>,

    #[serde(default)]
    pub path: Option<HttpPathModifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpPathModifier {
    #[serde(rename = "type")]
    pub modifier_type: String,

    #[serde(default)]
    pub replace_full_path: Option<String>,

    #[serde(default)]
    pub replace_prefix_match: Option<String>,
}

pub const PATH_REPLACE_FULL: &str = "ReplaceFullPath";
pub const PATH_REPLACE_PREFIX: &str = "ReplacePrefixMatch";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpBackendRef {
    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub kind: Option<String>,

    pub name: String,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub port: Option<BackendPort>,

    #[serde(default)]
    pub weight: Option<u32>,

    #[serde(default)]
    pub filters: Vec<HttpRouteFilter>,
}

impl HttpBackendRef {
    pub fn group(&self) -> &str {
        self.group.as_deref().unwrap_or(CORE_GROUP)
    }

    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or("Service")
    }

    /// Gateway API defaults an omitted weight to 1.
    pub fn weight(&self) -> u32 {
        self.weight.unwrap_or(1)
    }
}

/// Backend port, addressed either by number or by the Service port name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackendPort {
    Number(u16),
    Name(String),
}

impl fmt::Display for BackendPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendPort::Number(port) => write!(f, "{}", port),
            BackendPort::Name(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_route_with_defaults() {
        let route: HttpRoute = serde_yaml::from_str(
            r#"
apiVersion: gateway.networking.k8s.io/v1
kind: HTTPRoute
metadata:
  name: r1
  namespace: ns1
spec:
  parentRefs:
    - name: g1
      sectionName: http
  hostnames: ["example.com"]
  rules:
    - matches:
        - path:
            value: /api
          headers:
            - name: x-env
              value: canary
          method: GET
      filters:
        - type: RequestMirror
      backendRefs:
        - name: svc1
          port: 8080
        - name: svc2
          port: http
          weight: 3
"#,
        )
        .expect("route manifest");

        let parent = &route.spec.parent_refs[0];
        assert_eq!(parent.group(), GATEWAY_API_GROUP);
        assert_eq!(parent.kind(), "Gateway");
        assert_eq!(parent.section_name.as_deref(), Some("http"));

        let rule = &route.spec.rules[0];
        let path = rule.matches[0].path.as_ref().expect("path");
        assert_eq!(path.match_type, PathMatchType::PathPrefix);
        assert_eq!(path.value, "/api");
        assert_eq!(rule.matches[0].headers[0].match_type, StringMatchType::Exact);
        assert_eq!(rule.filters[0].filter_type, "RequestMirror");

        assert_eq!(rule.backend_refs[0].port, Some(BackendPort::Number(8080)));
        assert_eq!(rule.backend_refs[0].weight(), 1);
        assert_eq!(rule.backend_refs[0].kind(), "Service");
        assert_eq!(rule.backend_refs[1].port, Some(BackendPort::Name("http".into())));
        assert_eq!(rule.backend_refs[1].weight(), 3);
    }

    #[test]
    fn path_match_defaults_to_root_prefix() {
        let path: HttpPathMatch = serde_json::from_str("{}").expect("empty path match");
        assert_eq!(path, HttpPathMatch::default());
    }
}
