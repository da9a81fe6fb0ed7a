//! HTTPRoutes to RouteConfigurations.
//!
//! For one Gateway listener this finds the attached routes, intersects their
//! hostnames with the listener's, and turns every rule match into an Envoy
//! route. Routes are visited in (namespace, name) order and rules in declared
//! order, so the first listed rule wins among equally specific matches.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

use super::cluster::{resolve_backend, ClusterBuilder};
use super::naming;
use crate::errors::{Error, Result};
use crate::model::gateway::FromNamespaces;
use crate::model::http_route::{
    HeaderModifier, HttpPathModifier, HttpRouteFilter, HttpRouteMatch, PathMatchType,
    RequestRedirect, StringMatchType, UrlRewrite, FILTER_REQUEST_HEADER_MODIFIER,
    FILTER_REQUEST_REDIRECT, FILTER_RESPONSE_HEADER_MODIFIER, FILTER_URL_REWRITE,
    PATH_REPLACE_FULL, PATH_REPLACE_PREFIX,
};
use crate::model::{Gateway, HttpRoute, HttpRouteRule, KubeObject, Listener, GATEWAY_API_GROUP};
use crate::store::ResourceStore;
use crate::xds::route::{
    HeaderMatchConfig, HeaderMutationConfig, PathMatch, PrefixReplacement, QueryParameterMatchConfig,
    RewriteConfig, RouteActionConfig, RouteConfig, RouteMatchConfig, RouteRule,
    VirtualHostConfig, WeightedClusterConfig, METHOD_HEADER,
};

/// Label Kubernetes puts on every Namespace.
const NAMESPACE_NAME_LABEL: &str = "kubernetes.io/metadata.name";

const DEFAULT_REDIRECT_STATUS: u16 = 302;
const REDIRECT_STATUS_CODES: [u16; 5] = [301, 302, 303, 307, 308];

/// Status returned by rules that have nowhere to send traffic.
const NO_BACKEND_STATUS: u32 = 500;

/// Build the RouteConfiguration for one listener of `gateway`.
pub fn build_route_configuration<S: ResourceStore + ?Sized>(
    store: &S,
    clusters: &mut ClusterBuilder<'_>,
    gateway: &Gateway,
    listener: &Listener,
) -> Result<RouteConfig> {
    let route_config_name = naming::route_config_name(&gateway.key(), &listener.name);

    let mut routes = store.http_routes();
    routes.sort_by_key(|route| route.key());

    let mut virtual_hosts: Vec<VirtualHostConfig> = Vec::new();
    let mut by_hostnames: HashMap<Vec<String>, usize> = HashMap::new();

    for route in routes {
        if !attaches_to(store, gateway, listener, route) {
            continue;
        }

        let Some(hostnames) =
            intersect_hostnames(listener.hostname.as_deref(), &route.spec.hostnames)
        else {
            debug!(
                route = %route.key(),
                listener = %listener.name,
                "Route hostnames do not intersect the listener hostname; skipping"
            );
            continue;
        };
        let domains = if hostnames.is_empty() { vec!["*".to_string()] } else { hostnames };

        let mut rules = Vec::new();
        for (rule_index, rule) in route.spec.rules.iter().enumerate() {
            rules.extend(build_rule(store, clusters, route, rule_index, rule)?);
        }

        debug!(
            route = %route.key(),
            route_config = %route_config_name,
            domains = ?domains,
            routes = rules.len(),
            "Attached HTTPRoute"
        );

        match by_hostnames.get(&domains) {
            Some(&index) => virtual_hosts[index].routes.extend(rules),
            None => {
                by_hostnames.insert(domains.clone(), virtual_hosts.len());
                virtual_hosts.push(VirtualHostConfig {
                    name: naming::virtual_host_name(&route_config_name, &domains),
                    domains,
                    routes: rules,
                });
            }
        }
    }

    warn_on_shared_domains(&route_config_name, &virtual_hosts);

    Ok(RouteConfig { name: route_config_name, virtual_hosts })
}

/// Whether `route` has a parentRef selecting `listener` of `gateway`, and the
/// listener admits routes from the route's namespace.
pub fn attaches_to<S: ResourceStore + ?Sized>(
    store: &S,
    gateway: &Gateway,
    listener: &Listener,
    route: &HttpRoute,
) -> bool {
    let gateway_key = gateway.key();
    let route_namespace = route.metadata.namespace();

    let targeted = route.spec.parent_refs.iter().any(|parent| {
        parent.group() == GATEWAY_API_GROUP
            && parent.kind() == "Gateway"
            && parent.namespace.as_deref().unwrap_or(route_namespace) == gateway_key.namespace
            && parent.name == gateway_key.name
            && parent.section_name.as_deref().map_or(true, |section| section == listener.name)
            && parent.port.map_or(true, |port| port == listener.port)
    });

    targeted && allows_namespace(store, &gateway_key.namespace, listener, route_namespace)
}

fn allows_namespace<S: ResourceStore + ?Sized>(
    store: &S,
    gateway_namespace: &str,
    listener: &Listener,
    route_namespace: &str,
) -> bool {
    let Some(allowed) = &listener.allowed_routes else {
        return route_namespace == gateway_namespace;
    };

    if !allowed.kinds.is_empty()
        && !allowed
            .kinds
            .iter()
            .any(|kind| kind.group() == GATEWAY_API_GROUP && kind.kind == "HTTPRoute")
    {
        return false;
    }

    let Some(namespaces) = &allowed.namespaces else {
        return route_namespace == gateway_namespace;
    };

    match namespaces.from {
        FromNamespaces::Same => route_namespace == gateway_namespace,
        FromNamespaces::All => true,
        FromNamespaces::Selector => {
            let Some(selector) = &namespaces.selector else {
                return false;
            };
            let mut labels = store
                .namespace(route_namespace)
                .map(|namespace| namespace.metadata.labels.clone())
                .unwrap_or_else(BTreeMap::new);
            labels
                .entry(NAMESPACE_NAME_LABEL.to_string())
                .or_insert_with(|| route_namespace.to_string());
            selector.matches(&labels)
        }
    }
}

/// Intersect a listener hostname with route hostnames.
///
/// Returns `None` when nothing intersects, and an empty list when both sides
/// accept any host. Otherwise the result is sorted and deduplicated.
pub fn intersect_hostnames(listener: Option<&str>, route: &[String]) -> Option<Vec<String>> {
    let listener = listener.filter(|hostname| !hostname.is_empty());

    let hostnames: BTreeSet<String> = match (listener, route.is_empty()) {
        (None, true) => return Some(Vec::new()),
        (None, false) => route.iter().cloned().collect(),
        (Some(listener), true) => BTreeSet::from([listener.to_string()]),
        (Some(listener), false) => route
            .iter()
            .filter_map(|hostname| intersect_hostname(listener, hostname))
            .collect(),
    };

    if hostnames.is_empty() {
        None
    } else {
        Some(hostnames.into_iter().collect())
    }
}

fn intersect_hostname(a: &str, b: &str) -> Option<String> {
    if a == b {
        return Some(a.to_string());
    }
    if wildcard_covers(a, b) {
        return Some(b.to_string());
    }
    if wildcard_covers(b, a) {
        return Some(a.to_string());
    }
    None
}

/// `*.example.com` covers `foo.example.com` and `*.foo.example.com`, never
/// `example.com`.
fn wildcard_covers(wildcard: &str, hostname: &str) -> bool {
    match wildcard.strip_prefix('*') {
        Some(suffix) if suffix.starts_with('.') => {
            hostname.len() > suffix.len() && hostname.ends_with(suffix)
        }
        _ => false,
    }
}

fn warn_on_shared_domains(route_config: &str, virtual_hosts: &[VirtualHostConfig]) {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for virtual_host in virtual_hosts {
        for domain in &virtual_host.domains {
            let first = *seen.entry(domain.as_str()).or_insert(virtual_host.name.as_str());
            if first != virtual_host.name {
                warn!(
                    route_config = %route_config,
                    domain = %domain,
                    first = %first,
                    second = %virtual_host.name,
                    "Domain appears in more than one virtual host; Envoy rejects duplicate domains"
                );
            }
        }
    }
}

/// Filters of one rule, validated.
#[derive(Debug, Default)]
struct RuleFilters<'r> {
    request_headers: HeaderMutationConfig,
    response_headers: HeaderMutationConfig,
    redirect: Option<&'r RequestRedirect>,
    rewrite: Option<&'r UrlRewrite>,
}

impl<'r> RuleFilters<'r> {
    fn parse(route: &HttpRoute, filters: &'r [HttpRouteFilter], field: &str) -> Result<Self> {
        let mut parsed = RuleFilters::default();
        let mut seen = BTreeSet::new();

        for (index, filter) in filters.iter().enumerate() {
            let field = format!("{}.filters[{}]", field, index);

            if !seen.insert(filter.filter_type.as_str()) {
                return Err(Error::invalid(
                    route.object_ref(),
                    field,
                    format!("filter {} appears more than once in the rule", filter.filter_type),
                ));
            }

            match filter.filter_type.as_str() {
                FILTER_REQUEST_HEADER_MODIFIER => {
                    let modifier = required(route, &field, "requestHeaderModifier", &filter.request_header_modifier)?;
                    parsed.request_headers = header_mutation(modifier);
                }
                FILTER_RESPONSE_HEADER_MODIFIER => {
                    let modifier = required(route, &field, "responseHeaderModifier", &filter.response_header_modifier)?;
                    parsed.response_headers = header_mutation(modifier);
                }
                FILTER_REQUEST_REDIRECT => {
                    parsed.redirect = Some(required(route, &field, "requestRedirect", &filter.request_redirect)?);
                }
                FILTER_URL_REWRITE => {
                    parsed.rewrite = Some(required(route, &field, "urlRewrite", &filter.url_rewrite)?);
                }
                other => {
                    return Err(Error::unsupported(
                        route.object_ref(),
                        field,
                        format!("filter type {} is not supported", other),
                    ))
                }
            }
        }

        if parsed.redirect.is_some() && parsed.rewrite.is_some() {
            return Err(Error::invalid(
                route.object_ref(),
                format!("{}.filters", field),
                "RequestRedirect and URLRewrite cannot be used in the same rule",
            ));
        }

        Ok(parsed)
    }
}

fn required<'r, T>(route: &HttpRoute, field: &str, name: &str, value: &'r Option<T>) -> Result<&'r T> {
    value.as_ref().ok_or_else(|| {
        Error::invalid(route.object_ref(), format!("{}.{}", field, name), "must be set for this filter type")
    })
}

fn header_mutation(modifier: &HeaderModifier) -> HeaderMutationConfig {
    HeaderMutationConfig {
        set: modifier.set.iter().map(|h| (h.name.clone(), h.value.clone())).collect(),
        add: modifier.add.iter().map(|h| (h.name.clone(), h.value.clone())).collect(),
        remove: modifier.remove.clone(),
    }
}

/// Path change requested by a redirect or rewrite filter.
enum PathChange {
    Full(String),
    Prefix(String),
}

fn path_change(route: &HttpRoute, modifier: &HttpPathModifier, field: &str) -> Result<PathChange> {
    match modifier.modifier_type.as_str() {
        PATH_REPLACE_FULL => modifier
            .replace_full_path
            .clone()
            .map(PathChange::Full)
            .ok_or_else(|| Error::invalid(route.object_ref(), format!("{}.replaceFullPath", field), "must be set")),
        PATH_REPLACE_PREFIX => modifier
            .replace_prefix_match
            .clone()
            .map(PathChange::Prefix)
            .ok_or_else(|| Error::invalid(route.object_ref(), format!("{}.replacePrefixMatch", field), "must be set")),
        other => Err(Error::unsupported(
            route.object_ref(),
            format!("{}.type", field),
            format!("path modifier {} is not supported", other),
        )),
    }
}

fn build_rule<S: ResourceStore + ?Sized>(
    store: &S,
    clusters: &mut ClusterBuilder<'_>,
    route: &HttpRoute,
    rule_index: usize,
    rule: &HttpRouteRule,
) -> Result<Vec<RouteRule>> {
    let field = format!("spec.rules[{}]", rule_index);
    let filters = RuleFilters::parse(route, &rule.filters, &field)?;

    let (action, prefix_replacement) = match filters.redirect {
        Some(redirect) => redirect_action(route, redirect, &field)?,
        None => backend_action(store, clusters, route, rule, filters.rewrite, &field)?,
    };

    let default_match = [HttpRouteMatch::default()];
    let matches = if rule.matches.is_empty() { &default_match[..] } else { &rule.matches[..] };

    let key = route.key();
    matches
        .iter()
        .enumerate()
        .map(|(match_index, route_match)| {
            let match_field = format!("{}.matches[{}]", field, match_index);
            let path = route_match.path.clone().unwrap_or_default();
            let action = match &prefix_replacement {
                Some(_) if path.match_type != PathMatchType::PathPrefix => {
                    return Err(Error::invalid(
                        route.object_ref(),
                        format!("{}.path", match_field),
                        "ReplacePrefixMatch requires a PathPrefix match",
                    ));
                }
                Some(replacement) => action
                    .clone()
                    .with_prefix_replacement(PrefixReplacement::new(path.value, replacement.as_str())),
                None => action.clone(),
            };

            Ok(RouteRule {
                name: Some(naming::route_name(&key, rule_index, match_index)),
                r#match: route_match_config(route_match),
                action,
                request_headers: filters.request_headers.clone(),
                response_headers: filters.response_headers.clone(),
            })
        })
        .collect()
}

fn route_match_config(route_match: &HttpRouteMatch) -> RouteMatchConfig {
    let path = route_match.path.clone().unwrap_or_default();
    let path = match path.match_type {
        PathMatchType::Exact => PathMatch::Exact(path.value),
        PathMatchType::PathPrefix => PathMatch::SegmentPrefix(path.value),
        PathMatchType::RegularExpression => PathMatch::Regex(path.value),
    };

    let mut headers: Vec<HeaderMatchConfig> = route_match
        .headers
        .iter()
        .map(|header| {
            let (value, regex) = string_match(header.match_type, &header.value);
            HeaderMatchConfig { name: header.name.clone(), value, regex, present: None }
        })
        .collect();

    if let Some(method) = &route_match.method {
        headers.push(HeaderMatchConfig {
            name: METHOD_HEADER.to_string(),
            value: Some(method.clone()),
            regex: None,
            present: None,
        });
    }

    let query_parameters: Vec<QueryParameterMatchConfig> = route_match
        .query_params
        .iter()
        .map(|param| {
            let (value, regex) = string_match(param.match_type, &param.value);
            QueryParameterMatchConfig { name: param.name.clone(), value, regex, present: None }
        })
        .collect();

    RouteMatchConfig {
        path,
        headers: (!headers.is_empty()).then_some(headers),
        query_parameters: (!query_parameters.is_empty()).then_some(query_parameters),
    }
}

fn string_match(match_type: StringMatchType, value: &str) -> (Option<String>, Option<String>) {
    match match_type {
        StringMatchType::Exact => (Some(value.to_string()), None),
        StringMatchType::RegularExpression => (None, Some(value.to_string())),
    }
}

/// Redirect action for a rule; backends of a redirecting rule are ignored.
///
/// A `ReplacePrefixMatch` value is returned separately since it depends on
/// the prefix of each match.
fn redirect_action(
    route: &HttpRoute,
    redirect: &RequestRedirect,
    field: &str,
) -> Result<(RouteActionConfig, Option<String>)> {
    let status = redirect.status_code.unwrap_or(DEFAULT_REDIRECT_STATUS);
    if !REDIRECT_STATUS_CODES.contains(&status) {
        return Err(Error::invalid(
            route.object_ref(),
            format!("{}.filters.requestRedirect.statusCode", field),
            format!("redirect status {} is not one of 301, 302, 303, 307, 308", status),
        ));
    }

    let change = redirect
        .path
        .as_ref()
        .map(|path| path_change(route, path, &format!("{}.filters.requestRedirect.path", field)))
        .transpose()?;

    let (path_redirect, prefix_replacement) = match change {
        Some(PathChange::Full(path)) => (Some(path), None),
        Some(PathChange::Prefix(prefix)) => (None, Some(prefix)),
        None => (None, None),
    };

    Ok((
        RouteActionConfig::Redirect {
            scheme_redirect: redirect.scheme.clone(),
            host_redirect: redirect.hostname.clone(),
            port_redirect: redirect.port.map(u32::from),
            path_redirect,
            prefix_rewrite: None,
            response_code: Some(u32::from(status)),
        },
        prefix_replacement,
    ))
}

/// Weighted-cluster action over the rule's backends.
///
/// Backends resolving to the same Cluster are merged by summing their weights.
/// A rule with no usable weight answers with a direct 500.
fn backend_action<S: ResourceStore + ?Sized>(
    store: &S,
    clusters: &mut ClusterBuilder<'_>,
    route: &HttpRoute,
    rule: &HttpRouteRule,
    rewrite: Option<&UrlRewrite>,
    field: &str,
) -> Result<(RouteActionConfig, Option<String>)> {
    let mut prefix_replacement = None;
    let rewrite = rewrite
        .map(|rewrite| {
            let change = rewrite
                .path
                .as_ref()
                .map(|path| path_change(route, path, &format!("{}.filters.urlRewrite.path", field)))
                .transpose()?;
            let full_path_rewrite = match change {
                Some(PathChange::Full(path)) => Some(path),
                Some(PathChange::Prefix(prefix)) => {
                    prefix_replacement = Some(prefix);
                    None
                }
                None => None,
            };
            Ok::<_, Error>(RewriteConfig {
                host_rewrite: rewrite.hostname.clone(),
                prefix_rewrite: None,
                full_path_rewrite,
            })
        })
        .transpose()?;

    let mut weighted: Vec<WeightedClusterConfig> = Vec::new();
    for (index, backend) in rule.backend_refs.iter().enumerate() {
        let backend_field = format!("{}.backendRefs[{}]", field, index);
        let name = resolve_backend(store, clusters, route, backend, &backend_field)?;
        let weight = backend.weight();

        match weighted.iter_mut().find(|cluster| cluster.name == name) {
            Some(existing) => {
                existing.weight = existing.weight.checked_add(weight).ok_or_else(|| {
                    Error::invalid(route.object_ref(), format!("{}.weight", backend_field), "weight overflows")
                })?;
            }
            None => weighted.push(WeightedClusterConfig { name, weight }),
        }
    }

    weighted.retain(|cluster| cluster.weight > 0);
    let total = weighted
        .iter()
        .try_fold(0u32, |total, cluster| total.checked_add(cluster.weight))
        .ok_or_else(|| {
            Error::invalid(route.object_ref(), format!("{}.backendRefs", field), "total weight overflows")
        })?;

    if total == 0 {
        debug!(
            route = %route.key(),
            rule = %field,
            "Rule has no backend with weight; responding with 500"
        );
        return Ok((
            RouteActionConfig::DirectResponse { status: NO_BACKEND_STATUS, body: None },
            prefix_replacement,
        ));
    }

    Ok((
        RouteActionConfig::WeightedClusters { clusters: weighted, total_weight: Some(total), rewrite },
        prefix_replacement,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslatorConfig;
    use crate::store::{parse_manifests, Snapshot};
    use crate::translator::endpoints::ClusterIpPolicy;
    use envoy_types::pb::envoy::config::route::v3::{
        redirect_action::PathRewriteSpecifier, route::Action,
    };
    use envoy_types::pb::envoy::r#type::matcher::v3::RegexMatchAndSubstitute;

    const BASE: &str = r#"
apiVersion: gateway.networking.k8s.io/v1
kind: Gateway
metadata: { name: g1, namespace: ns1 }
spec:
  gatewayClassName: envoy
  listeners:
    - { name: http, port: 80, protocol: HTTP }
---
apiVersion: v1
kind: Service
metadata: { name: svc1, namespace: ns1 }
spec:
  clusterIP: 10.0.0.1
  ports: [{ name: http, port: 8080 }]
---
apiVersion: v1
kind: Service
metadata: { name: svc2, namespace: ns1 }
spec:
  clusterIP: 10.0.0.2
  ports: [{ port: 9090 }]
"#;

    fn snapshot(routes: &str) -> Snapshot {
        let mut snapshot = Snapshot::from_resources(parse_manifests("base", BASE).expect("base"));
        for resource in parse_manifests("routes", routes).expect("routes") {
            snapshot.insert(resource);
        }
        snapshot
    }

    fn build(store: &Snapshot) -> Result<RouteConfig> {
        let config = TranslatorConfig::default();
        let mut clusters = ClusterBuilder::new(&config, &ClusterIpPolicy);
        let gateway = store.gateway("ns1", "g1").expect("gateway");
        build_route_configuration(store, &mut clusters, gateway, &gateway.spec.listeners[0])
    }

    fn listener(hostname: Option<&str>) -> Listener {
        Listener {
            name: "http".into(),
            port: 80,
            protocol: "HTTP".into(),
            hostname: hostname.map(str::to_string),
            tls: None,
            allowed_routes: None,
        }
    }

    fn hosts(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_hostname_intersection() {
        assert_eq!(intersect_hostnames(None, &[]), Some(vec![]));
        assert_eq!(intersect_hostnames(Some("a.com"), &[]), Some(hosts(&["a.com"])));
        assert_eq!(intersect_hostnames(None, &hosts(&["b.com", "a.com"])), Some(hosts(&["a.com", "b.com"])));
        assert_eq!(intersect_hostnames(Some("a.com"), &hosts(&["b.com"])), None);
        assert_eq!(
            intersect_hostnames(Some("*.example.com"), &hosts(&["foo.example.com", "example.com"])),
            Some(hosts(&["foo.example.com"]))
        );
        assert_eq!(
            intersect_hostnames(Some("foo.example.com"), &hosts(&["*.example.com"])),
            Some(hosts(&["foo.example.com"]))
        );
        assert_eq!(intersect_hostnames(Some(""), &hosts(&["a.com"])), Some(hosts(&["a.com"])));
    }

    #[test]
    fn test_section_name_and_port_select_listener() {
        let store = snapshot(
            r#"
kind: HTTPRoute
metadata: { name: r1, namespace: ns1 }
spec:
  parentRefs: [{ name: g1, sectionName: https }]
"#,
        );
        let gateway = store.gateway("ns1", "g1").expect("gateway");
        let route = store.http_routes()[0];
        assert!(!attaches_to(&store, gateway, &listener(None), route));

        let mut https = listener(None);
        https.name = "https".into();
        assert!(attaches_to(&store, gateway, &https, route));
    }

    #[test]
    fn test_routes_from_other_namespaces_need_allowed_routes() {
        let store = snapshot(
            r#"
kind: Namespace
metadata: { name: team, labels: { shared: "true" } }
---
kind: HTTPRoute
metadata: { name: r1, namespace: team }
spec:
  parentRefs: [{ name: g1, namespace: ns1 }]
"#,
        );
        let gateway = store.gateway("ns1", "g1").expect("gateway");
        let route = store.http_routes()[0];
        assert!(!attaches_to(&store, gateway, &listener(None), route));

        let mut selected = listener(None);
        selected.allowed_routes = Some(
            serde_yaml::from_str("namespaces: { from: Selector, selector: { matchLabels: { shared: \"true\" } } }")
                .expect("allowedRoutes"),
        );
        assert!(attaches_to(&store, gateway, &selected, route));

        let mut by_name = listener(None);
        by_name.allowed_routes = Some(
            serde_yaml::from_str(
                "namespaces: { from: Selector, selector: { matchLabels: { kubernetes.io/metadata.name: team } } }",
            )
            .expect("allowedRoutes"),
        );
        assert!(attaches_to(&store, gateway, &by_name, route));

        let mut other_kinds = listener(None);
        other_kinds.allowed_routes =
            Some(serde_yaml::from_str("namespaces: { from: All }\nkinds: [{ kind: GRPCRoute }]").expect("allowedRoutes"));
        assert!(!attaches_to(&store, gateway, &other_kinds, route));
    }

    #[test]
    fn test_rule_translation() {
        let store = snapshot(
            r#"
kind: HTTPRoute
metadata: { name: r1, namespace: ns1 }
spec:
  parentRefs: [{ name: g1 }]
  hostnames: [example.com]
  rules:
    - matches:
        - path: { type: Exact, value: /login }
          method: POST
        - path: { type: PathPrefix, value: /api }
          headers: [{ name: x-version, value: "2" }]
          queryParams: [{ type: RegularExpression, name: debug, value: "^(1|true)$" }]
      filters:
        - type: RequestHeaderModifier
          requestHeaderModifier:
            set: [{ name: x-env, value: prod }]
            remove: [x-internal]
      backendRefs:
        - { name: svc1, port: 8080, weight: 2 }
        - { name: svc2, port: 9090 }
"#,
        );

        let route_config = build(&store).expect("route config");
        assert_eq!(route_config.name, "ns1/g1/http");
        assert_eq!(route_config.virtual_hosts.len(), 1);

        let vhost = &route_config.virtual_hosts[0];
        assert_eq!(vhost.name, "ns1/g1/http/example.com");
        assert_eq!(vhost.domains, vec!["example.com"]);
        assert_eq!(vhost.routes.len(), 2);

        let first = &vhost.routes[0];
        assert_eq!(first.name.as_deref(), Some("ns1/r1/rule/0/match/0"));
        assert_eq!(first.r#match.path, PathMatch::Exact("/login".into()));
        let method = &first.r#match.headers.as_ref().expect("headers")[0];
        assert_eq!(method.name, ":method");
        assert_eq!(method.value.as_deref(), Some("POST"));

        let second = &vhost.routes[1];
        assert_eq!(second.r#match.path, PathMatch::SegmentPrefix("/api".into()));
        let query = &second.r#match.query_parameters.as_ref().expect("query")[0];
        assert_eq!(query.regex.as_deref(), Some("^(1|true)$"));
        assert_eq!(second.request_headers.set, vec![("x-env".to_string(), "prod".to_string())]);
        assert_eq!(second.request_headers.remove, vec!["x-internal".to_string()]);

        match &second.action {
            RouteActionConfig::WeightedClusters { clusters, total_weight, .. } => {
                assert_eq!(
                    clusters,
                    &vec![
                        WeightedClusterConfig { name: "ns1/svc1/8080".into(), weight: 2 },
                        WeightedClusterConfig { name: "ns1/svc2/9090".into(), weight: 1 },
                    ]
                );
                assert_eq!(*total_weight, Some(3));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_backends_are_merged() {
        let store = snapshot(
            r#"
kind: HTTPRoute
metadata: { name: r1, namespace: ns1 }
spec:
  parentRefs: [{ name: g1 }]
  rules:
    - backendRefs:
        - { name: svc1, port: 8080 }
        - { name: svc1, port: http, weight: 3 }
"#,
        );

        let route_config = build(&store).expect("route config");
        let route = &route_config.virtual_hosts[0].routes[0];
        assert_eq!(route_config.virtual_hosts[0].domains, vec!["*"]);
        assert_eq!(route.r#match.path, PathMatch::SegmentPrefix("/".into()));
        assert_eq!(
            route.action,
            RouteActionConfig::WeightedClusters {
                clusters: vec![WeightedClusterConfig { name: "ns1/svc1/8080".into(), weight: 4 }],
                total_weight: Some(4),
                rewrite: None,
            }
        );
    }

    #[test]
    fn test_rules_without_backends_respond_500() {
        let store = snapshot(
            r#"
kind: HTTPRoute
metadata: { name: r1, namespace: ns1 }
spec:
  parentRefs: [{ name: g1 }]
  rules:
    - matches: [{ path: { value: /none } }]
    - matches: [{ path: { value: /zero } }]
      backendRefs: [{ name: svc1, port: 8080, weight: 0 }]
"#,
        );

        let route_config = build(&store).expect("route config");
        for route in &route_config.virtual_hosts[0].routes {
            assert_eq!(route.action, RouteActionConfig::DirectResponse { status: 500, body: None });
        }
    }

    #[test]
    fn test_redirect_and_rewrite_filters() {
        let store = snapshot(
            r#"
kind: HTTPRoute
metadata: { name: r1, namespace: ns1 }
spec:
  parentRefs: [{ name: g1 }]
  rules:
    - matches: [{ path: { value: /old } }]
      filters:
        - type: RequestRedirect
          requestRedirect:
            scheme: https
            path: { type: ReplacePrefixMatch, replacePrefixMatch: /new }
    - matches: [{ path: { value: /app } }]
      filters:
        - type: URLRewrite
          urlRewrite:
            hostname: internal.example.com
            path: { type: ReplaceFullPath, replaceFullPath: /index.html }
      backendRefs: [{ name: svc1, port: 8080 }]
"#,
        );

        let routes = build(&store).expect("route config").virtual_hosts.remove(0).routes;
        assert_eq!(
            routes[0].action,
            RouteActionConfig::Redirect {
                scheme_redirect: Some("https".into()),
                host_redirect: None,
                port_redirect: None,
                path_redirect: None,
                prefix_rewrite: Some(PrefixReplacement::new("/old", "/new")),
                response_code: Some(302),
            }
        );
        match &routes[1].action {
            RouteActionConfig::WeightedClusters { rewrite: Some(rewrite), .. } => {
                assert_eq!(rewrite.host_rewrite.as_deref(), Some("internal.example.com"));
                assert_eq!(rewrite.full_path_rewrite.as_deref(), Some("/index.html"));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    /// Apply an Envoy regex rewrite the way Envoy does.
    fn rewrite_path(rewrite: &RegexMatchAndSubstitute, path: &str) -> String {
        let pattern = rewrite.pattern.as_ref().expect("pattern");
        let regex = regex::Regex::new(&pattern.regex).expect("valid regex");
        regex.replace(path, rewrite.substitution.replace("\\1", "${1}").as_str()).into_owned()
    }

    #[test]
    fn test_prefix_replacement_keeps_path_segments() {
        let store = snapshot(
            r#"
kind: HTTPRoute
metadata: { name: r1, namespace: ns1 }
spec:
  parentRefs: [{ name: g1 }]
  rules:
    - matches: [{ path: { value: /old } }]
      filters:
        - type: URLRewrite
          urlRewrite:
            path: { type: ReplacePrefixMatch, replacePrefixMatch: / }
      backendRefs: [{ name: svc1, port: 8080 }]
    - matches: [{ path: { value: /api/ } }, { path: { value: / } }]
      filters:
        - type: RequestRedirect
          requestRedirect:
            path: { type: ReplacePrefixMatch, replacePrefixMatch: /new }
"#,
        );

        let route_config = build(&store).expect("route config").to_envoy_route_configuration().expect("envoy");
        let routes = &route_config.virtual_hosts[0].routes;
        assert_eq!(routes.len(), 3);

        let Some(Action::Route(forward)) = &routes[0].action else { panic!("expected route action") };
        assert!(forward.prefix_rewrite.is_empty());
        let rewrite = forward.regex_rewrite.as_ref().expect("regex rewrite");
        assert_eq!(rewrite_path(rewrite, "/old/x"), "/x");
        assert_eq!(rewrite_path(rewrite, "/old"), "/");
        assert_eq!(rewrite_path(rewrite, "/old/"), "/");
        assert_eq!(rewrite_path(rewrite, "/old/a/b"), "/a/b");

        let redirect_rewrite = |route: &envoy_types::pb::envoy::config::route::v3::Route| {
            let Some(Action::Redirect(redirect)) = &route.action else { panic!("expected redirect") };
            match &redirect.path_rewrite_specifier {
                Some(PathRewriteSpecifier::RegexRewrite(rewrite)) => rewrite.clone(),
                other => panic!("expected regex rewrite, got {:?}", other),
            }
        };

        let api = redirect_rewrite(&routes[1]);
        assert_eq!(rewrite_path(&api, "/api"), "/new");
        assert_eq!(rewrite_path(&api, "/api/v1"), "/new/v1");

        let root = redirect_rewrite(&routes[2]);
        assert_eq!(rewrite_path(&root, "/x"), "/new/x");
        assert_eq!(rewrite_path(&root, "/a/b"), "/new/a/b");
    }

    #[test]
    fn test_invalid_and_unsupported_filters() {
        let mirror = snapshot(
            r#"
kind: HTTPRoute
metadata: { name: r1, namespace: ns1 }
spec:
  parentRefs: [{ name: g1 }]
  rules:
    - filters: [{ type: RequestMirror }]
      backendRefs: [{ name: svc1, port: 8080 }]
"#,
        );
        let error = build(&mirror).unwrap_err();
        assert_eq!(error.category(), "unsupported-construct");
        assert!(error.to_string().contains("spec.rules[0].filters[0]"));

        let prefix_on_exact = snapshot(
            r#"
kind: HTTPRoute
metadata: { name: r1, namespace: ns1 }
spec:
  parentRefs: [{ name: g1 }]
  rules:
    - matches: [{ path: { type: Exact, value: /a } }]
      filters:
        - type: URLRewrite
          urlRewrite: { path: { type: ReplacePrefixMatch, replacePrefixMatch: /b } }
      backendRefs: [{ name: svc1, port: 8080 }]
"#,
        );
        let error = build(&prefix_on_exact).unwrap_err();
        assert_eq!(error.category(), "invalid-input");

        let bad_status = snapshot(
            r#"
kind: HTTPRoute
metadata: { name: r1, namespace: ns1 }
spec:
  parentRefs: [{ name: g1 }]
  rules:
    - filters: [{ type: RequestRedirect, requestRedirect: { statusCode: 304 } }]
"#,
        );
        let error = build(&bad_status).unwrap_err();
        assert!(error.to_string().contains("statusCode"));
    }

    #[test]
    fn test_missing_backend_port_is_invalid() {
        let store = snapshot(
            r#"
kind: HTTPRoute
metadata: { name: r1, namespace: ns1 }
spec:
  parentRefs: [{ name: g1 }]
  rules:
    - backendRefs: [{ name: svc1, port: 7000 }]
"#,
        );
        let error = build(&store).unwrap_err();
        assert_eq!(error.category(), "invalid-input");
        assert!(error.to_string().contains("spec.rules[0].backendRefs[0].port"));
    }
}
