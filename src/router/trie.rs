//! Per-method segment tries.

use std::collections::HashMap;

use crate::params::{PathSegment, PathSpec};
use crate::parser::Method;
use crate::router::handler::Route;

/// A node in the route trie.
///
/// Literal children are keyed by their exact text. Named and wildcard
/// segments share the single parameter slot, so two patterns that differ
/// only in a parameter name end up on the same node.
#[derive(Default)]
struct Node {
    /// `None` for a root.
    segment: Option<PathSegment>,
    /// Present on terminal nodes only.
    route: Option<Route>,
    literals: HashMap<String, Node>,
    param: Option<Box<Node>>,
}

impl Node {
    fn with_segment(segment: PathSegment) -> Self {
        Self {
            segment: Some(segment),
            ..Self::default()
        }
    }

    fn is_terminal(&self) -> bool {
        self.route.is_some()
    }

    fn child(&self, text: &str) -> Option<&Node> {
        self.literals.get(text).or(self.param.as_deref())
    }

    fn collect(&self, prefix: &str, out: &mut Vec<String>) {
        if self.is_terminal() {
            out.push(if prefix.is_empty() { "/".to_string() } else { prefix.to_string() });
        }

        let mut literals: Vec<(&String, &Node)> = self.literals.iter().collect();
        literals.sort_by(|a, b| a.0.cmp(b.0));

        let children = literals
            .into_iter()
            .map(|(_, node)| node)
            .chain(self.param.as_deref());

        for child in children {
            let label = match &child.segment {
                Some(PathSegment::Literal(text)) if text == PathSpec::ROOT => String::new(),
                Some(PathSegment::Literal(text)) => format!("/{text}"),
                Some(PathSegment::Named(name)) => format!("/#{name}"),
                Some(PathSegment::Wildcard(name)) => format!("/*{name}"),
                None => String::new(),
            };
            child.collect(&format!("{prefix}{label}"), out);
        }
    }
}

/// A successful lookup.
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    /// Captured parameters, percent-decoded.
    pub params: HashMap<String, String>,
}

/// Routes keyed by method, plus a default trie for routes registered
/// without one.
#[derive(Default)]
pub struct RouteTrie {
    roots: HashMap<Method, Node>,
    default: Node,
}

impl RouteTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `route` for `pattern`. `None` registers on the default trie.
    ///
    /// Re-registering the same structure replaces the handler; a different
    /// parameter name at an occupied parameter slot renames the capture.
    pub fn insert(&mut self, method: Option<Method>, pattern: &PathSpec, route: Route) {
        let mut current = match method {
            Some(method) => self.roots.entry(method).or_default(),
            None => &mut self.default,
        };

        for segment in pattern.segments() {
            current = match segment {
                PathSegment::Literal(text) => current
                    .literals
                    .entry(text.clone())
                    .or_insert_with(|| Node::with_segment(segment.clone())),
                PathSegment::Named(_) | PathSegment::Wildcard(_) => {
                    let slot: &mut Node = current
                        .param
                        .get_or_insert_with(|| Box::new(Node::with_segment(segment.clone())));
                    slot.segment = Some(segment.clone());
                    slot
                }
            };
        }

        current.route = Some(route);
    }

    /// Find the route for a request path.
    ///
    /// Literal children take priority over the parameter slot. Reaching a
    /// wildcard node captures every remaining segment joined by `/` and ends
    /// the walk. The method's own trie is used if it has one, otherwise the
    /// default trie.
    pub fn lookup(&self, method: Method, path: &PathSpec) -> Option<RouteMatch<'_>> {
        let mut current = self.roots.get(&method).unwrap_or(&self.default);
        let mut captures: Vec<(&str, String)> = Vec::new();
        let segments = path.segments();

        for (i, segment) in segments.iter().enumerate() {
            let child = current.child(segment.text())?;
            current = child;

            match &child.segment {
                Some(PathSegment::Wildcard(name)) => {
                    let rest: Vec<&str> = segments[i..].iter().map(PathSegment::text).collect();
                    captures.push((name.as_str(), rest.join("/")));
                    break;
                }
                Some(PathSegment::Named(name)) => captures.push((name.as_str(), segment.text().to_string())),
                _ => {}
            }
        }

        let route = current.route.as_ref()?;
        let params = captures
            .into_iter()
            .map(|(name, raw)| {
                let value = urlencoding::decode(&raw)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| raw.clone());
                (name.to_string(), value)
            })
            .collect();

        Some(RouteMatch { route, params })
    }

    /// Every registered pattern, by method. `None` is the default trie.
    pub fn patterns(&self) -> Vec<(Option<Method>, String)> {
        let mut patterns = Vec::new();

        let mut methods: Vec<&Method> = self.roots.keys().collect();
        methods.sort_by_key(|method| method.as_str());

        for method in methods {
            let mut paths = Vec::new();
            self.roots[method].collect("", &mut paths);
            patterns.extend(paths.into_iter().map(|path| (Some(*method), path)));
        }

        let mut paths = Vec::new();
        self.default.collect("", &mut paths);
        patterns.extend(paths.into_iter().map(|path| (None, path)));

        patterns
    }
}
