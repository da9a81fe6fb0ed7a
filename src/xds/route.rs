//! Route configuration using envoy-types
//!
//! Intermediate representation of RouteConfigurations, VirtualHosts and Routes
//! and its conversion to the envoy-types protobuf definitions.

use envoy_types::pb::envoy::config::core::v3::{
    data_source::Specifier as DataSourceSpecifier, header_value_option::HeaderAppendAction,
    DataSource, HeaderValue, HeaderValueOption,
};
use envoy_types::pb::envoy::config::route::v3::{
    header_matcher::HeaderMatchSpecifier,
    query_parameter_matcher::QueryParameterMatchSpecifier,
    redirect_action::{PathRewriteSpecifier, RedirectResponseCode, SchemeRewriteSpecifier},
    route::Action,
    route_action::{ClusterSpecifier, HostRewriteSpecifier},
    route_match::PathSpecifier,
    weighted_cluster::ClusterWeight,
    DirectResponseAction, HeaderMatcher, QueryParameterMatcher, RedirectAction, Route, RouteAction,
    RouteConfiguration, RouteMatch, VirtualHost, WeightedCluster,
};
use envoy_types::pb::envoy::r#type::matcher::v3::{
    string_matcher::MatchPattern, RegexMatchAndSubstitute, RegexMatcher, StringMatcher,
};
use envoy_types::pb::google::protobuf::UInt32Value;

/// Pseudo-header Envoy exposes the request method under.
pub const METHOD_HEADER: &str = ":method";

#[derive(Debug, Clone, PartialEq)]
pub struct RouteConfig {
    pub name: String,
    pub virtual_hosts: Vec<VirtualHostConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualHostConfig {
    pub name: String,
    pub domains: Vec<String>,
    pub routes: Vec<RouteRule>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteRule {
    pub name: Option<String>,
    pub r#match: RouteMatchConfig,
    pub action: RouteActionConfig,
    pub request_headers: HeaderMutationConfig,
    pub response_headers: HeaderMutationConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatchConfig {
    pub path: PathMatch,
    pub headers: Option<Vec<HeaderMatchConfig>>,
    pub query_parameters: Option<Vec<QueryParameterMatchConfig>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathMatch {
    Exact(String),
    Prefix(String),
    /// Prefix matched on whole path segments (`/api` matches `/api/x`, not `/apix`)
    SegmentPrefix(String),
    Regex(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderMatchConfig {
    pub name: String,
    pub value: Option<String>,
    pub regex: Option<String>,
    pub present: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryParameterMatchConfig {
    pub name: String,
    pub value: Option<String>,
    pub regex: Option<String>,
    pub present: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteActionConfig {
    WeightedClusters {
        clusters: Vec<WeightedClusterConfig>,
        total_weight: Option<u32>,
        rewrite: Option<RewriteConfig>,
    },
    Redirect {
        scheme_redirect: Option<String>,
        host_redirect: Option<String>,
        port_redirect: Option<u32>,
        path_redirect: Option<String>,
        prefix_rewrite: Option<PrefixReplacement>,
        response_code: Option<u32>,
    },
    DirectResponse {
        status: u32,
        body: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightedClusterConfig {
    pub name: String,
    pub weight: u32,
}

/// Upstream request rewrites applied by a forwarding action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewriteConfig {
    pub host_rewrite: Option<String>,
    pub prefix_rewrite: Option<PrefixReplacement>,
    pub full_path_rewrite: Option<String>,
}

/// Replacement of a matched path prefix, segment-wise.
///
/// `/old` replaced by `/` maps `/old/x` to `/x`, and `/` replaced by `/new`
/// maps `/x` to `/new/x`. Emitted as a regex rewrite since Envoy's
/// `prefix_rewrite` swaps the literal matched string.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixReplacement {
    pub matched_prefix: String,
    pub replacement: String,
}

impl PrefixReplacement {
    pub fn new(matched_prefix: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self { matched_prefix: matched_prefix.into(), replacement: replacement.into() }
    }

    fn to_regex_rewrite(&self) -> RegexMatchAndSubstitute {
        let prefix = regex::escape(self.matched_prefix.trim_end_matches('/'));
        let replacement = self.replacement.trim_end_matches('/');

        let (pattern, substitution) = if replacement.is_empty() {
            (format!("^{}/*(.*)$", prefix), "/\\1".to_string())
        } else {
            (format!("^{}(/.*)?$", prefix), format!("{}\\1", replacement))
        };

        RegexMatchAndSubstitute {
            pattern: Some(regex_matcher(&pattern)),
            substitution,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMutationConfig {
    pub set: Vec<(String, String)>,
    pub add: Vec<(String, String)>,
    pub remove: Vec<String>,
}

impl HeaderMutationConfig {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.add.is_empty() && self.remove.is_empty()
    }

    fn to_envoy_header_options(&self) -> Vec<HeaderValueOption> {
        let set = self
            .set
            .iter()
            .map(|(name, value)| header_option(name, value, HeaderAppendAction::OverwriteIfExistsOrAdd));
        let add = self
            .add
            .iter()
            .map(|(name, value)| header_option(name, value, HeaderAppendAction::AppendIfExistsOrAdd));
        set.chain(add).collect()
    }
}

fn header_option(name: &str, value: &str, action: HeaderAppendAction) -> HeaderValueOption {
    HeaderValueOption {
        header: Some(HeaderValue {
            key: name.to_string(),
            value: value.to_string(),
            ..Default::default()
        }),
        append_action: action as i32,
        ..Default::default()
    }
}

impl RouteConfig {
    /// Convert RouteConfig to envoy-types RouteConfiguration
    pub fn to_envoy_route_configuration(&self) -> Result<RouteConfiguration, crate::Error> {
        let virtual_hosts: Result<Vec<VirtualHost>, crate::Error> =
            self.virtual_hosts.iter().map(|vh| vh.to_envoy_virtual_host()).collect();

        let route_config = RouteConfiguration {
            name: self.name.clone(),
            virtual_hosts: virtual_hosts?,
            ..Default::default()
        };

        Ok(route_config)
    }
}

impl VirtualHostConfig {
    /// Convert VirtualHostConfig to envoy-types VirtualHost
    fn to_envoy_virtual_host(&self) -> Result<VirtualHost, crate::Error> {
        let routes: Result<Vec<Route>, crate::Error> =
            self.routes.iter().map(|r| r.to_envoy_route()).collect();

        Ok(VirtualHost {
            name: self.name.clone(),
            domains: self.domains.clone(),
            routes: routes?,
            ..Default::default()
        })
    }
}

impl RouteRule {
    /// Convert RouteRule to envoy-types Route
    fn to_envoy_route(&self) -> Result<Route, crate::Error> {
        Ok(Route {
            name: self.name.clone().unwrap_or_default(),
            r#match: Some(self.r#match.to_envoy_route_match()),
            action: Some(self.action.to_envoy_route_action(self.name.as_deref())?),
            request_headers_to_add: self.request_headers.to_envoy_header_options(),
            request_headers_to_remove: self.request_headers.remove.clone(),
            response_headers_to_add: self.response_headers.to_envoy_header_options(),
            response_headers_to_remove: self.response_headers.remove.clone(),
            ..Default::default()
        })
    }
}

impl RouteMatchConfig {
    /// Convert RouteMatchConfig to envoy-types RouteMatch
    fn to_envoy_route_match(&self) -> RouteMatch {
        let path_specifier = match &self.path {
            PathMatch::Exact(path) => PathSpecifier::Path(path.clone()),
            PathMatch::Prefix(prefix) => PathSpecifier::Prefix(prefix.clone()),
            PathMatch::SegmentPrefix(prefix) => {
                let trimmed = prefix.trim_end_matches('/');
                if trimmed.is_empty() {
                    PathSpecifier::Prefix("/".to_string())
                } else {
                    PathSpecifier::PathSeparatedPrefix(trimmed.to_string())
                }
            }
            PathMatch::Regex(regex) => PathSpecifier::SafeRegex(regex_matcher(regex)),
        };

        let headers = self
            .headers
            .iter()
            .flatten()
            .map(|header| HeaderMatcher {
                name: header.name.clone(),
                header_match_specifier: match (&header.value, &header.regex, header.present) {
                    (Some(value), _, _) => {
                        Some(HeaderMatchSpecifier::StringMatch(exact_string_matcher(value)))
                    }
                    (None, Some(regex), _) => {
                        Some(HeaderMatchSpecifier::StringMatch(regex_string_matcher(regex)))
                    }
                    (None, None, Some(present)) => Some(HeaderMatchSpecifier::PresentMatch(present)),
                    (None, None, None) => Some(HeaderMatchSpecifier::PresentMatch(true)),
                },
                ..Default::default()
            })
            .collect();

        let query_parameters = self
            .query_parameters
            .iter()
            .flatten()
            .map(|param| QueryParameterMatcher {
                name: param.name.clone(),
                query_parameter_match_specifier: match (&param.value, &param.regex, param.present) {
                    (Some(value), _, _) => {
                        Some(QueryParameterMatchSpecifier::StringMatch(exact_string_matcher(value)))
                    }
                    (None, Some(regex), _) => {
                        Some(QueryParameterMatchSpecifier::StringMatch(regex_string_matcher(regex)))
                    }
                    (None, None, Some(present)) => {
                        Some(QueryParameterMatchSpecifier::PresentMatch(present))
                    }
                    (None, None, None) => Some(QueryParameterMatchSpecifier::PresentMatch(true)),
                },
                ..Default::default()
            })
            .collect();

        RouteMatch {
            path_specifier: Some(path_specifier),
            headers,
            query_parameters,
            ..Default::default()
        }
    }
}

fn regex_matcher(regex: &str) -> RegexMatcher {
    RegexMatcher { regex: regex.to_string(), ..Default::default() }
}

fn exact_string_matcher(value: &str) -> StringMatcher {
    StringMatcher { match_pattern: Some(MatchPattern::Exact(value.to_string())), ..Default::default() }
}

fn regex_string_matcher(regex: &str) -> StringMatcher {
    StringMatcher { match_pattern: Some(MatchPattern::SafeRegex(regex_matcher(regex))), ..Default::default() }
}

impl RouteActionConfig {
    /// Attach a prefix replacement to a forwarding or redirect action.
    pub fn with_prefix_replacement(mut self, prefix: PrefixReplacement) -> Self {
        match &mut self {
            RouteActionConfig::WeightedClusters { rewrite, .. } => {
                rewrite.get_or_insert_with(RewriteConfig::default).prefix_rewrite = Some(prefix);
            }
            RouteActionConfig::Redirect { prefix_rewrite, .. } => *prefix_rewrite = Some(prefix),
            RouteActionConfig::DirectResponse { .. } => {}
        }
        self
    }

    /// Convert RouteActionConfig to envoy-types route action
    fn to_envoy_route_action(&self, route_name: Option<&str>) -> Result<Action, crate::Error> {
        let action = match self {
            RouteActionConfig::WeightedClusters { clusters, total_weight, rewrite } => {
                if clusters.is_empty() {
                    return Err(crate::Error::inconsistent(
                        "Route",
                        route_name.unwrap_or_default(),
                        "has a weighted-cluster action without clusters",
                    ));
                }

                let weighted_clusters: Vec<ClusterWeight> = clusters
                    .iter()
                    .map(|wc| ClusterWeight {
                        name: wc.name.clone(),
                        weight: Some(UInt32Value { value: wc.weight }),
                        ..Default::default()
                    })
                    .collect();

                #[allow(deprecated)]
                let weighted = WeightedCluster {
                    clusters: weighted_clusters,
                    total_weight: total_weight.map(|value| UInt32Value { value }),
                    ..Default::default()
                };

                #[allow(deprecated)]
                let mut route_action = RouteAction {
                    cluster_specifier: Some(ClusterSpecifier::WeightedClusters(weighted)),
                    ..Default::default()
                };

                if let Some(rewrite) = rewrite {
                    if let Some(host) = &rewrite.host_rewrite {
                        route_action.host_rewrite_specifier =
                            Some(HostRewriteSpecifier::HostRewriteLiteral(host.clone()));
                    }
                    if let Some(prefix) = &rewrite.prefix_rewrite {
                        route_action.regex_rewrite = Some(prefix.to_regex_rewrite());
                    }
                    if let Some(path) = &rewrite.full_path_rewrite {
                        route_action.regex_rewrite = Some(RegexMatchAndSubstitute {
                            pattern: Some(regex_matcher("^/.*$")),
                            substitution: path.clone(),
                            ..Default::default()
                        });
                    }
                }

                Action::Route(route_action)
            }
            RouteActionConfig::Redirect {
                scheme_redirect,
                host_redirect,
                port_redirect,
                path_redirect,
                prefix_rewrite,
                response_code,
            } => {
                let redirect_code = match response_code {
                    None | Some(301) => RedirectResponseCode::MovedPermanently,
                    Some(302) => RedirectResponseCode::Found,
                    Some(303) => RedirectResponseCode::SeeOther,
                    Some(307) => RedirectResponseCode::TemporaryRedirect,
                    Some(308) => RedirectResponseCode::PermanentRedirect,
                    Some(other) => {
                        return Err(crate::Error::inconsistent(
                            "Route",
                            route_name.unwrap_or_default(),
                            format!("has unsupported redirect status code {}", other),
                        ))
                    }
                };

                let path_rewrite_specifier = match (path_redirect, prefix_rewrite) {
                    (Some(path), _) => Some(PathRewriteSpecifier::PathRedirect(path.clone())),
                    (None, Some(prefix)) => Some(PathRewriteSpecifier::RegexRewrite(prefix.to_regex_rewrite())),
                    (None, None) => None,
                };

                let redirect_action = RedirectAction {
                    scheme_rewrite_specifier: scheme_redirect
                        .clone()
                        .map(SchemeRewriteSpecifier::SchemeRedirect),
                    host_redirect: host_redirect.clone().unwrap_or_default(),
                    port_redirect: port_redirect.unwrap_or_default(),
                    path_rewrite_specifier,
                    response_code: redirect_code as i32,
                    ..Default::default()
                };

                Action::Redirect(redirect_action)
            }
            RouteActionConfig::DirectResponse { status, body } => {
                Action::DirectResponse(DirectResponseAction {
                    status: *status,
                    body: body.as_ref().map(|body| DataSource {
                        specifier: Some(DataSourceSpecifier::InlineString(body.clone())),
                        ..Default::default()
                    }),
                    ..Default::default()
                })
            }
        };

        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(path: PathMatch, action: RouteActionConfig) -> RouteRule {
        RouteRule {
            name: Some("ns1/r1/rule/0/match/0".to_string()),
            r#match: RouteMatchConfig { path, headers: None, query_parameters: None },
            action,
            request_headers: HeaderMutationConfig::default(),
            response_headers: HeaderMutationConfig::default(),
        }
    }

    fn weighted(clusters: &[(&str, u32)]) -> RouteActionConfig {
        RouteActionConfig::WeightedClusters {
            clusters: clusters
                .iter()
                .map(|(name, weight)| WeightedClusterConfig { name: name.to_string(), weight: *weight })
                .collect(),
            total_weight: Some(clusters.iter().map(|(_, w)| w).sum()),
            rewrite: None,
        }
    }

    #[test]
    fn test_route_config_conversion() {
        let config = RouteConfig {
            name: "ns1/g1/http".to_string(),
            virtual_hosts: vec![VirtualHostConfig {
                name: "ns1/g1/http/example.com".to_string(),
                domains: vec!["example.com".to_string()],
                routes: vec![rule(PathMatch::SegmentPrefix("/".into()), weighted(&[("ns1/svc1/8080", 1)]))],
            }],
        };

        let route_config = config.to_envoy_route_configuration().expect("route config");
        assert_eq!(route_config.name, "ns1/g1/http");

        let vhost = &route_config.virtual_hosts[0];
        assert_eq!(vhost.domains, vec!["example.com"]);

        let route = &vhost.routes[0];
        assert_eq!(route.name, "ns1/r1/rule/0/match/0");
        assert_eq!(
            route.r#match.as_ref().and_then(|m| m.path_specifier.clone()),
            Some(PathSpecifier::Prefix("/".into()))
        );
    }

    #[test]
    #[allow(deprecated)]
    fn test_weights_are_carried_verbatim() {
        let route = rule(PathMatch::Prefix("/".into()), weighted(&[("a", 2), ("b", 1)]))
            .to_envoy_route()
            .expect("route");

        let Some(Action::Route(action)) = route.action else { panic!("expected route action") };
        let Some(ClusterSpecifier::WeightedClusters(weighted)) = action.cluster_specifier else {
            panic!("expected weighted clusters")
        };
        let weights: Vec<(String, u32)> = weighted
            .clusters
            .iter()
            .map(|c| (c.name.clone(), c.weight.as_ref().map(|w| w.value).unwrap_or_default()))
            .collect();
        assert_eq!(weights, vec![("a".to_string(), 2), ("b".to_string(), 1)]);
        assert_eq!(weighted.total_weight.map(|w| w.value), Some(3));
    }

    #[test]
    fn test_path_matching() {
        let convert = |path: PathMatch| {
            RouteMatchConfig { path, headers: None, query_parameters: None }
                .to_envoy_route_match()
                .path_specifier
        };

        assert_eq!(convert(PathMatch::Exact("/exact".into())), Some(PathSpecifier::Path("/exact".into())));
        assert_eq!(
            convert(PathMatch::SegmentPrefix("/api/".into())),
            Some(PathSpecifier::PathSeparatedPrefix("/api".into()))
        );
        assert!(matches!(convert(PathMatch::Regex(r"^/v\d+/.*".into())), Some(PathSpecifier::SafeRegex(_))));
    }

    #[test]
    fn test_header_and_query_matchers() {
        let route_match = RouteMatchConfig {
            path: PathMatch::Prefix("/".into()),
            headers: Some(vec![
                HeaderMatchConfig { name: METHOD_HEADER.into(), value: Some("GET".into()), regex: None, present: None },
                HeaderMatchConfig { name: "x-version".into(), value: None, regex: Some("v[0-9]+".into()), present: None },
            ]),
            query_parameters: Some(vec![QueryParameterMatchConfig {
                name: "debug".into(),
                value: None,
                regex: None,
                present: Some(true),
            }]),
        }
        .to_envoy_route_match();

        assert_eq!(route_match.headers[0].name, ":method");
        assert_eq!(
            route_match.headers[0].header_match_specifier,
            Some(HeaderMatchSpecifier::StringMatch(exact_string_matcher("GET")))
        );
        assert!(matches!(
            &route_match.headers[1].header_match_specifier,
            Some(HeaderMatchSpecifier::StringMatch(StringMatcher { match_pattern: Some(MatchPattern::SafeRegex(_)), .. }))
        ));
        assert_eq!(
            route_match.query_parameters[0].query_parameter_match_specifier,
            Some(QueryParameterMatchSpecifier::PresentMatch(true))
        );
    }

    #[test]
    fn test_header_mutations() {
        let mut rule = rule(PathMatch::Prefix("/".into()), weighted(&[("a", 1)]));
        rule.request_headers = HeaderMutationConfig {
            set: vec![("x-env".into(), "prod".into())],
            add: vec![("x-trace".into(), "1".into())],
            remove: vec!["x-internal".into()],
        };

        let route = rule.to_envoy_route().expect("route");
        assert_eq!(route.request_headers_to_add.len(), 2);
        assert_eq!(
            route.request_headers_to_add[0].append_action,
            HeaderAppendAction::OverwriteIfExistsOrAdd as i32
        );
        assert_eq!(
            route.request_headers_to_add[1].append_action,
            HeaderAppendAction::AppendIfExistsOrAdd as i32
        );
        assert_eq!(route.request_headers_to_remove, vec!["x-internal"]);
        assert!(route.response_headers_to_add.is_empty());
    }

    #[test]
    fn test_redirect_status_codes() {
        let redirect = |code: Option<u32>| RouteActionConfig::Redirect {
            scheme_redirect: Some("https".into()),
            host_redirect: None,
            port_redirect: Some(443),
            path_redirect: None,
            prefix_rewrite: None,
            response_code: code,
        };

        let action = redirect(Some(302)).to_envoy_route_action(None).expect("redirect");
        let Action::Redirect(redirect_action) = action else { panic!("expected redirect") };
        assert_eq!(redirect_action.response_code, RedirectResponseCode::Found as i32);
        assert_eq!(redirect_action.port_redirect, 443);
        assert_eq!(
            redirect_action.scheme_rewrite_specifier,
            Some(SchemeRewriteSpecifier::SchemeRedirect("https".into()))
        );

        assert!(redirect(Some(200)).to_envoy_route_action(None).is_err());
    }

    #[test]
    fn test_rewrites() {
        let action = RouteActionConfig::WeightedClusters {
            clusters: vec![WeightedClusterConfig { name: "a".into(), weight: 1 }],
            total_weight: Some(1),
            rewrite: Some(RewriteConfig {
                host_rewrite: Some("internal.example.com".into()),
                prefix_rewrite: None,
                full_path_rewrite: Some("/v2/status".into()),
            }),
        }
        .to_envoy_route_action(None)
        .expect("action");

        let Action::Route(route_action) = action else { panic!("expected route action") };
        assert_eq!(
            route_action.host_rewrite_specifier,
            Some(HostRewriteSpecifier::HostRewriteLiteral("internal.example.com".into()))
        );
        assert_eq!(route_action.regex_rewrite.map(|r| r.substitution), Some("/v2/status".to_string()));
    }

    #[test]
    fn test_prefix_replacement_patterns() {
        let rewrite = PrefixReplacement::new("/v1.0/", "/v2/").to_regex_rewrite();
        assert_eq!(rewrite.pattern.map(|p| p.regex), Some(r"^/v1\.0(/.*)?$".to_string()));
        assert_eq!(rewrite.substitution, r"/v2\1");

        let strip = PrefixReplacement::new("/old", "/").to_regex_rewrite();
        assert_eq!(strip.pattern.map(|p| p.regex), Some("^/old/*(.*)$".to_string()));
        assert_eq!(strip.substitution, r"/\1");

        let action = weighted(&[("a", 1)])
            .with_prefix_replacement(PrefixReplacement::new("/old", "/new"))
            .to_envoy_route_action(None)
            .expect("action");
        let Action::Route(route_action) = action else { panic!("expected route action") };
        assert!(route_action.prefix_rewrite.is_empty());
        assert_eq!(route_action.regex_rewrite.map(|r| r.substitution), Some(r"/new\1".to_string()));
    }

    #[test]
    fn test_direct_response_and_empty_clusters() {
        let action = RouteActionConfig::DirectResponse { status: 500, body: None }
            .to_envoy_route_action(None)
            .expect("direct response");
        assert!(matches!(action, Action::DirectResponse(DirectResponseAction { status: 500, .. })));

        let error = weighted(&[]).to_envoy_route_action(Some("r")).unwrap_err();
        assert_eq!(error.category(), "inconsistent-output");
    }
}
