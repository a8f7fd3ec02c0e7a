//! Tests for the route trie and the dispatcher.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::conn::{Conn, WriteState};
    use crate::params::{ParamValue, PathSpec};
    use crate::parser::{parse_request, HttpRequest, HttpVersion, HeaderMap, Method};
    use crate::router::{pipe, Error, HandlerResult, Route, RouteTrie, Router};
    use crate::server::StatusCode;

    fn route(tag: &'static str) -> Route {
        Route {
            pipes: Vec::new(),
            handler: Arc::new(move |conn: &mut Conn, _: &HashMap<String, ParamValue>| -> HandlerResult {
                conn.text(StatusCode::Ok, tag);
                Ok(())
            }),
        }
    }

    fn tag_of(trie: &RouteTrie, method: Method, path: &str) -> Option<(String, HashMap<String, String>)> {
        let matched = trie.lookup(method, &PathSpec::parse(path, false))?;
        let mut conn = test_conn(Method::GET, "/");
        (matched.route.handler)(&mut conn, &HashMap::new()).unwrap();
        let body = conn.response().body.clone().unwrap_or_default();
        Some((String::from_utf8(body).unwrap(), matched.params))
    }

    fn test_conn(method: Method, uri: &str) -> Conn {
        Router::new().conn(HttpRequest::new(method, uri, HttpVersion::Http11, HeaderMap::new()))
    }

    fn request(raw: &str) -> Conn {
        Router::new().conn(parse_request(raw.as_bytes()).unwrap())
    }

    fn body_text(conn: &Conn) -> String {
        String::from_utf8(conn.response().body.clone().unwrap_or_default()).unwrap()
    }

    #[test]
    fn test_lookup_literal_route() {
        let mut trie = RouteTrie::new();
        trie.insert(Some(Method::GET), &PathSpec::parse("/hello", true), route("hello"));

        assert_eq!(tag_of(&trie, Method::GET, "/hello").unwrap().0, "hello");
        assert!(tag_of(&trie, Method::GET, "/notfound").is_none());
        assert!(tag_of(&trie, Method::GET, "/hello/there").is_none());
    }

    #[test]
    fn test_root_route() {
        let mut trie = RouteTrie::new();
        trie.insert(Some(Method::GET), &PathSpec::parse("/", true), route("root"));

        assert_eq!(tag_of(&trie, Method::GET, "/").unwrap().0, "root");
        assert_eq!(tag_of(&trie, Method::GET, "").unwrap().0, "root");
    }

    #[test]
    fn test_named_parameters_are_captured_and_decoded() {
        let mut trie = RouteTrie::new();
        trie.insert(Some(Method::GET), &PathSpec::parse("/users/#id/posts/#post", true), route("post"));

        let (tag, params) = tag_of(&trie, Method::GET, "/users/jo%20e/posts/7").unwrap();
        assert_eq!(tag, "post");
        assert_eq!(params["id"], "jo e");
        assert_eq!(params["post"], "7");
    }

    #[test]
    fn test_wildcard_captures_rest_of_path() {
        let mut trie = RouteTrie::new();
        trie.insert(Some(Method::GET), &PathSpec::parse("/files/*rest", true), route("files"));

        let (_, params) = tag_of(&trie, Method::GET, "/files/a/b/c").unwrap();
        assert_eq!(params["rest"], "a/b/c");

        let (_, params) = tag_of(&trie, Method::GET, "/files/one%2Etxt").unwrap();
        assert_eq!(params["rest"], "one.txt");

        assert!(tag_of(&trie, Method::GET, "/files").is_none());
    }

    #[test]
    fn test_literal_beats_parameter() {
        let mut trie = RouteTrie::new();
        trie.insert(Some(Method::GET), &PathSpec::parse("/users/#id", true), route("by-id"));
        trie.insert(Some(Method::GET), &PathSpec::parse("/users/me", true), route("me"));

        let (tag, params) = tag_of(&trie, Method::GET, "/users/me").unwrap();
        assert_eq!(tag, "me");
        assert!(params.is_empty());

        let (tag, params) = tag_of(&trie, Method::GET, "/users/42").unwrap();
        assert_eq!(tag, "by-id");
        assert_eq!(params["id"], "42");
    }

    #[test]
    fn test_parameter_slot_is_shared() {
        let mut trie = RouteTrie::new();
        trie.insert(Some(Method::GET), &PathSpec::parse("/items/#id", true), route("first"));
        trie.insert(Some(Method::GET), &PathSpec::parse("/items/#slug/edit", true), route("edit"));

        let (tag, params) = tag_of(&trie, Method::GET, "/items/x").unwrap();
        assert_eq!(tag, "first");
        assert_eq!(params.get("slug").map(String::as_str), Some("x"));
        assert!(!params.contains_key("id"));

        let (tag, params) = tag_of(&trie, Method::GET, "/items/x/edit").unwrap();
        assert_eq!(tag, "edit");
        assert_eq!(params["slug"], "x");
    }

    #[test]
    fn test_reinsert_replaces_handler() {
        let mut trie = RouteTrie::new();
        trie.insert(Some(Method::GET), &PathSpec::parse("/a", true), route("old"));
        trie.insert(Some(Method::GET), &PathSpec::parse("/a", true), route("new"));

        assert_eq!(tag_of(&trie, Method::GET, "/a").unwrap().0, "new");
    }

    #[test]
    fn test_default_root_only_when_method_has_no_routes() {
        let mut trie = RouteTrie::new();
        trie.insert(None, &PathSpec::parse("/any", true), route("any"));
        trie.insert(Some(Method::GET), &PathSpec::parse("/get-only", true), route("get"));

        assert_eq!(tag_of(&trie, Method::DELETE, "/any").unwrap().0, "any");
        // GET has its own root, so the default trie is never consulted.
        assert!(tag_of(&trie, Method::GET, "/any").is_none());
        assert!(tag_of(&trie, Method::POST, "/get-only").is_none());
    }

    #[test]
    fn test_non_terminal_node_does_not_match() {
        let mut trie = RouteTrie::new();
        trie.insert(Some(Method::GET), &PathSpec::parse("/a/b/c", true), route("abc"));

        assert!(tag_of(&trie, Method::GET, "/a/b").is_none());
    }

    #[test]
    fn test_patterns_lists_routes() {
        let mut trie = RouteTrie::new();
        trie.insert(Some(Method::GET), &PathSpec::parse("/", true), route("root"));
        trie.insert(Some(Method::GET), &PathSpec::parse("/users/#id", true), route("user"));
        trie.insert(Some(Method::POST), &PathSpec::parse("/files/*rest", true), route("files"));
        trie.insert(None, &PathSpec::parse("/any", true), route("any"));

        let patterns = trie.patterns();
        assert_eq!(
            patterns,
            vec![
                (Some(Method::GET), "/".to_string()),
                (Some(Method::GET), "/users/#id".to_string()),
                (Some(Method::POST), "/files/*rest".to_string()),
                (None, "/any".to_string()),
            ]
        );
    }

    #[test]
    fn test_dispatch_runs_handler_with_params() {
        let mut router = Router::new();
        router.get("/greet/#name", |conn, params| {
            let name = params["name"].as_str().unwrap_or_default();
            let greeting = params.get("greeting").and_then(ParamValue::as_str).unwrap_or("Hello");
            conn.text(StatusCode::Ok, format!("{greeting}, {name}!"));
            Ok(())
        });

        let mut conn = test_conn(Method::GET, "/greet/ada?greeting=Hi&name=ignored");
        router.dispatch(&mut conn);

        assert_eq!(conn.write_state(), WriteState::Closed);
        assert_eq!(conn.status(), StatusCode::Ok);
        assert_eq!(body_text(&conn), "Hi, ada!");
        assert_eq!(conn.path_params["name"], "ada");
    }

    #[test]
    fn test_dispatch_not_found() {
        let router = Router::new();
        let mut conn = test_conn(Method::GET, "/missing");
        router.dispatch(&mut conn);

        assert_eq!(conn.status(), StatusCode::NotFound);
        assert_eq!(body_text(&conn), "404 - Not Found.");
        assert!(conn.take_response().is_some());
        assert!(conn.take_response().is_none());
    }

    #[test]
    fn test_dispatch_handler_failure() {
        let mut router = Router::new();
        router.get("/boom", |conn, _| {
            conn.text(StatusCode::Ok, "partial");
            Err(Error::HandlerFailure("boom".to_string()))
        });

        let mut conn = test_conn(Method::GET, "/boom");
        router.dispatch(&mut conn);

        assert_eq!(conn.status(), StatusCode::InternalServerError);
        assert_eq!(body_text(&conn), "500 - Server Error.");
    }

    #[test]
    fn test_header_errors_propagate_from_handlers() {
        let mut router = Router::new();
        router.get("/evil", |conn, _| {
            conn.add_header("Evil: Header", "x")?;
            conn.text(StatusCode::Ok, "unreachable");
            Ok(())
        });

        let mut conn = test_conn(Method::GET, "/evil");
        router.dispatch(&mut conn);
        assert_eq!(conn.status(), StatusCode::InternalServerError);
    }

    #[test]
    fn test_custom_responders() {
        let mut router = Router::new();
        router.set_not_found(|conn| conn.html(StatusCode::NotFound, "<h1>gone</h1>"));
        router.set_server_error(|conn| conn.text(StatusCode::ServiceUnavailable, "later"));
        router.get("/fail", |_, _| Err(Error::HandlerFailure("nope".to_string())));

        let mut conn = test_conn(Method::GET, "/nothing");
        router.dispatch(&mut conn);
        assert_eq!(body_text(&conn), "<h1>gone</h1>");

        let mut conn = router.conn(HttpRequest::new(Method::GET, "/fail", HttpVersion::Http11, HeaderMap::new()));
        router.dispatch(&mut conn);
        assert_eq!(conn.status(), StatusCode::ServiceUnavailable);
    }

    #[test]
    fn test_dispatch_uses_own_responders_for_foreign_conn() {
        let mut router = Router::new();
        router.set_server_error(|conn| conn.text(StatusCode::ServiceUnavailable, "later"));
        router.get("/fail", |_, _| Err(Error::HandlerFailure("nope".to_string())));

        let mut conn = test_conn(Method::GET, "/fail");
        router.dispatch(&mut conn);
        assert_eq!(conn.status(), StatusCode::ServiceUnavailable);
        assert_eq!(body_text(&conn), "later");
    }

    #[test]
    fn test_pipeline_runs_in_order_and_halt_is_sticky() {
        let calls = Arc::new(Mutex::new(Vec::new()));

        let log = |tag: &'static str, calls: Arc<Mutex<Vec<&'static str>>>| {
            pipe(move |_conn| calls.lock().unwrap().push(tag))
        };
        let halting = {
            let calls = calls.clone();
            pipe(move |conn| {
                calls.lock().unwrap().push("halt");
                conn.halt();
            })
        };

        let mut router = Router::new();
        let handler_calls = calls.clone();
        router.register(
            Method::GET,
            "/guarded",
            vec![log("first", calls.clone()), halting, log("second", calls.clone()), log("third", calls.clone())],
            move |conn, _| {
                handler_calls.lock().unwrap().push("handler");
                conn.text(StatusCode::Forbidden, "halted");
                Ok(())
            },
        );

        let mut conn = test_conn(Method::GET, "/guarded");
        router.dispatch(&mut conn);

        assert_eq!(*calls.lock().unwrap(), vec!["first", "halt", "handler"]);
        assert!(conn.is_halted());
        assert_eq!(conn.status(), StatusCode::Forbidden);
        assert_eq!(conn.write_state(), WriteState::Closed);
    }

    #[test]
    fn test_pipeline_group_shares_pipes() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = {
            let count = count.clone();
            pipe(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };

        let mut router = Router::new();
        router
            .pipeline(vec![counter])
            .get("/a", |conn, _| {
                conn.text(StatusCode::Ok, "a");
                Ok(())
            })
            .post("/b", |conn, _| {
                conn.text(StatusCode::Ok, "b");
                Ok(())
            });

        router.dispatch(&mut test_conn(Method::GET, "/a"));
        router.dispatch(&mut test_conn(Method::POST, "/b"));
        router.dispatch(&mut test_conn(Method::GET, "/b"));

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_method_override_routes_post_as_delete() {
        let mut router = Router::new();
        router.delete("/posts/#id", |conn, params| {
            let id = params["id"].as_str().unwrap_or_default().to_string();
            conn.text(StatusCode::Ok, format!("deleted {id}"));
            Ok(())
        });

        let mut conn = request(
            "POST /posts/9 HTTP/1.1\r\nHost: x\r\nContent-Type: application/x-www-form-urlencoded\r\n\r\n_method=DELETE",
        );
        router.dispatch(&mut conn);

        assert_eq!(conn.request_method(), Method::POST);
        assert_eq!(conn.method(), Method::DELETE);
        assert_eq!(body_text(&conn), "deleted 9");
    }

    #[test]
    fn test_handler_sees_merged_params() {
        let seen = Arc::new(Mutex::new(None));
        let mut router = Router::new();
        let captured = seen.clone();
        router.post("/items/#id", move |conn, params| {
            *captured.lock().unwrap() = Some(params.clone());
            conn.text(StatusCode::Created, "ok");
            Ok(())
        });

        let mut conn = request(
            "POST /items/path?id=query&q=1 HTTP/1.1\r\nHost: x\r\nContent-Type: application/x-www-form-urlencoded\r\n\r\nid=body&tags[]=a&tags[]=b",
        );
        router.dispatch(&mut conn);

        let params = seen.lock().unwrap().clone().unwrap();
        assert_eq!(params["id"], "path");
        assert_eq!(params["q"], "1");
        assert_eq!(params["tags"], ParamValue::Sequence(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn test_exactly_one_write_per_dispatch() {
        let mut router = Router::new();
        router.get("/ok", |conn, _| {
            conn.text(StatusCode::Ok, "ok");
            Ok(())
        });
        router.get("/no-body", |_, _| Ok(()));
        router.get("/early", |conn, _| {
            conn.text(StatusCode::Ok, "early");
            conn.write_resp(false);
            Ok(())
        });

        for path in ["/ok", "/no-body", "/early", "/missing"] {
            let mut conn = test_conn(Method::GET, path);
            router.dispatch(&mut conn);
            assert_eq!(conn.write_state(), WriteState::Closed, "{path}");
            assert!(conn.take_response().is_some(), "{path}");
            assert!(!conn.write_resp(true), "{path}");
        }

        let mut conn = test_conn(Method::GET, "/no-body");
        router.dispatch(&mut conn);
        assert_eq!(conn.status(), StatusCode::InternalServerError);
    }

    #[test]
    fn test_find_reports_not_found() {
        let router = Router::new();
        let result = router.find(Method::PUT, &PathSpec::parse("/a/b", false));
        assert!(matches!(result, Err(Error::NotFound { method: Method::PUT, ref path }) if path == "a/b"));
    }

    #[test]
    fn test_default_routes_registered() {
        let router = Router::with_defaults();
        let patterns: Vec<String> = router.routes().patterns().into_iter().map(|(_, p)| p).collect();
        assert_eq!(patterns, vec!["/favicon.ico", "/robots.txt", "/static/*file"]);
    }
}
