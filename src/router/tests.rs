//! Tests for pattern compilation, registration and dispatch.

#[cfg(test)]
mod router_tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::parser::{HttpRequest, HttpVersion, Method};
    use crate::router::{CompiledPattern, Router};
    use crate::server::{Error, StatusCode};

    fn request(method: Method, target: &str) -> HttpRequest {
        let mut headers = HashMap::new();
        headers.insert("Host".to_string(), "localhost".to_string());
        HttpRequest::new(method, target, HttpVersion::Http11, headers)
    }

    fn request_with_header(method: Method, target: &str, name: &str, value: &str) -> HttpRequest {
        let mut req = request(method, target);
        req.headers.insert(name.to_string(), value.to_string());
        req
    }

    fn body(response: &crate::server::HttpResponse) -> String {
        String::from_utf8_lossy(&response.body).to_string()
    }

    #[test]
    fn test_compile_default_capture() {
        let pattern = CompiledPattern::new("/person/:last/:first").unwrap();
        assert_eq!(pattern.params(), &["last".to_string(), "first".to_string()]);
        assert!(pattern.is_match("/person/lastname/firstname"));
        assert!(!pattern.is_match("/person/lastname"));
        assert!(!pattern.is_match("/person/a/b/c"));

        let captures = pattern.captures("/person/lastname/firstname").unwrap();
        assert_eq!(captures, vec![("last", "lastname"), ("first", "firstname")]);
    }

    #[test]
    fn test_compile_custom_capture() {
        let pattern = CompiledPattern::new("/user/:id([0-9]+)").unwrap();
        assert_eq!(pattern.params(), &["id".to_string()]);
        assert!(pattern.is_match("/user/42"));
        assert!(!pattern.is_match("/user/abc"));
        assert!(!pattern.is_match("/user/42abc"));
    }

    #[test]
    fn test_compile_custom_default_capture() {
        let pattern = CompiledPattern::with_default_capture("/files/:name", "[a-z]+").unwrap();
        assert!(pattern.is_match("/files/readme"));
        assert!(!pattern.is_match("/files/README"));
    }

    #[test]
    fn test_param_indexes_skip_literal_segments() {
        let pattern = CompiledPattern::new("/a/:x/b/c/:y/d").unwrap();
        let captures = pattern.captures("/a/1/b/c/2/d").unwrap();
        assert_eq!(captures, vec![("x", "1"), ("y", "2")]);
    }

    #[test]
    fn test_compiled_pattern_requires_full_path() {
        let pattern = CompiledPattern::new("/:id").unwrap();
        assert!(pattern.is_match("/admin"));
        assert!(!pattern.is_match("/admin/profile"));
        assert!(!pattern.is_match("/prefix/admin"));
    }

    #[test]
    fn test_literal_segments_are_not_regex() {
        let pattern = CompiledPattern::new("/file.txt").unwrap();
        assert!(pattern.is_match("/file.txt"));
        assert!(!pattern.is_match("/fileXtxt"));
        assert!(!pattern.has_params());
    }

    #[test]
    fn test_invalid_capture_expression_fails() {
        let result = CompiledPattern::new("/user/:id([0-9+)");
        assert!(matches!(result, Err(Error::InvalidPattern { ref pattern, .. }) if pattern == "/user/:id([0-9+)"));
    }

    #[test]
    fn test_empty_param_name_fails() {
        let result = CompiledPattern::new("/user/:([0-9]+)");
        assert!(matches!(result, Err(Error::MalformedPattern { .. })));
    }

    #[test]
    fn test_capture_count_mismatch_fails() {
        let result = CompiledPattern::new("/user/:id((a)(b))");
        assert!(matches!(result, Err(Error::MalformedPattern { .. })));

        let result = CompiledPattern::new("/user/:id(?:[0-9]+)");
        assert!(matches!(result, Err(Error::MalformedPattern { .. })));
    }

    #[test]
    fn test_capture_expression_may_span_slashes() {
        let pattern = CompiledPattern::new("/files/:path([a-z]+/[a-z]+)/raw").unwrap();
        assert_eq!(pattern.params(), ["path"]);
        assert_eq!(pattern.captures("/files/docs/intro/raw").unwrap(), vec![("path", "docs/intro")]);
        assert!(!pattern.is_match("/files/docs/raw"));

        let pattern = CompiledPattern::new("/:p(a/b)").unwrap();
        assert!(pattern.is_match("/a/b"));
    }

    #[test]
    fn test_registration_error_is_returned() {
        let mut router = Router::new();
        let result = router.get("/broken/:id([)", |_req, _w| async { Ok(()) });
        assert!(result.is_err());
        assert!(router.routes().is_empty());
    }

    #[tokio::test]
    async fn test_path_params_merged_with_query() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let mut router = Router::new();
        router.handle("/person/:last/:first", move |req, w| {
            let seen = seen_clone.clone();
            async move {
                let mut seen = seen.lock().unwrap();
                for name in ["last", "first", "learn"] {
                    seen.push(req.get_query_param(name).map(str::to_string));
                }
                w.write_str("hello world");
                Ok(())
            }
        }).unwrap();

        let response = router
            .dispatch(request(Method::GET, "/person/lastname/firstname?learn=x"))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(body(&response), "hello world");
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                Some("lastname".to_string()),
                Some("firstname".to_string()),
                Some("x".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_path_param_does_not_replace_query_param() {
        let values = Arc::new(Mutex::new(Vec::new()));
        let values_clone = values.clone();

        let mut router = Router::new();
        router.get("/item/:id", move |req, _w| {
            let values = values_clone.clone();
            async move {
                let all: Vec<String> = req.get_query_params("id").into_iter().map(String::from).collect();
                *values.lock().unwrap() = all;
                Ok(())
            }
        }).unwrap();

        router.dispatch(request(Method::GET, "/item/7?id=3")).await.unwrap();
        assert_eq!(*values.lock().unwrap(), vec!["3".to_string(), "7".to_string()]);
    }

    #[tokio::test]
    async fn test_custom_capture_rejects_non_matching_path() {
        let mut router = Router::new();
        router.get("/user/:id([0-9]+)", |req, w| async move {
            let id = req.get_query_param("id").unwrap_or_default().to_string();
            w.write_str(&id);
            Ok(())
        }).unwrap();

        let response = router.dispatch(request(Method::GET, "/user/abc")).await.unwrap();
        assert_eq!(response.status, StatusCode::NotFound);

        let response = router.dispatch(request(Method::GET, "/user/42")).await.unwrap();
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(body(&response), "42");
    }

    #[tokio::test]
    async fn test_not_found_runs_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_handler = calls.clone();
        let calls_filter = calls.clone();

        let mut router = Router::new();
        router.get("/exists", move |_req, _w| {
            let calls = calls_handler.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }).unwrap();
        router.filter("/exists/:id", move |_req, _w| {
            let calls = calls_filter.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }).unwrap();

        let response = router.dispatch(request(Method::GET, "/missing")).await.unwrap();
        assert_eq!(response.status, StatusCode::NotFound);
        assert_eq!(body(&response), "404 page not found\n");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_router_returns_not_found() {
        let router = Router::new();
        let response = router.dispatch(request(Method::GET, "/")).await.unwrap();
        assert_eq!(response.status, StatusCode::NotFound);
    }

    #[tokio::test]
    async fn test_filter_short_circuits_chain() {
        let mut router = Router::new();
        router.filter("/:id", |_req, w| async move {
            w.write_str("first");
            Ok(())
        }).unwrap();
        router.filter("/:id", |_req, w| async move {
            w.write_str("second");
            Ok(())
        }).unwrap();
        router.handle("/:id", |_req, w| async move {
            w.write_str("handler");
            Ok(())
        }).unwrap();

        let response = router.dispatch(request(Method::GET, "/myid")).await.unwrap();
        assert_eq!(body(&response), "first");
    }

    #[tokio::test]
    async fn test_header_only_filter_does_not_short_circuit() {
        let mut router = Router::new();
        router.use_filter(|_req, w| async move {
            w.set_header("X-Filtered", "yes");
            Ok(())
        });
        router.get("/ok", |_req, w| async move {
            w.write_str("ok");
            Ok(())
        }).unwrap();

        let response = router.dispatch(request(Method::GET, "/ok")).await.unwrap();
        assert_eq!(body(&response), "ok");
        assert_eq!(response.get_header("X-Filtered").unwrap(), "yes");
    }

    #[tokio::test]
    async fn test_prefix_filter_rejects_unauthenticated() {
        let handled = Arc::new(AtomicUsize::new(0));
        let handled_clone = handled.clone();

        let mut router = Router::new();
        router.filter("/", |req, w| async move {
            if req.get_header("Authorization").map(String::as_str) != Some("Basic admin") {
                w.error(StatusCode::Unauthorized, "");
            }
            Ok(())
        }).unwrap();
        router.handle("/ok", move |_req, w| {
            let handled = handled_clone.clone();
            async move {
                handled.fetch_add(1, Ordering::SeqCst);
                w.write_status(StatusCode::Ok);
                w.write_str("hello world");
                Ok(())
            }
        }).unwrap();

        let response = router.dispatch(request(Method::GET, "/ok")).await.unwrap();
        assert_eq!(response.status, StatusCode::Unauthorized);
        assert_eq!(handled.load(Ordering::SeqCst), 0);

        let authed = request_with_header(Method::GET, "/ok", "Authorization", "Basic admin");
        let response = router.dispatch(authed).await.unwrap();
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(handled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prefix_filter_only_applies_under_prefix() {
        let mut router = Router::new();
        router.filter("/admin", |_req, w| async move {
            w.error(StatusCode::Forbidden, "forbidden");
            Ok(())
        }).unwrap();
        router.get("/public", |_req, w| async move {
            w.write_str("public");
            Ok(())
        }).unwrap();
        router.get("/admin/panel", |_req, w| async move {
            w.write_str("panel");
            Ok(())
        }).unwrap();

        let response = router.dispatch(request(Method::GET, "/public")).await.unwrap();
        assert_eq!(body(&response), "public");

        let response = router.dispatch(request(Method::GET, "/admin/panel")).await.unwrap();
        assert_eq!(response.status, StatusCode::Forbidden);
    }

    #[tokio::test]
    async fn test_prefix_filters_run_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut router = Router::new();
        for (prefix, tag) in [("/", "root"), ("/api", "api"), ("/", "root2")] {
            let order = order.clone();
            router.filter(prefix, move |_req, _w| {
                let order = order.clone();
                async move {
                    order.lock().unwrap().push(tag);
                    Ok(())
                }
            }).unwrap();
        }
        router.get("/api/x", |_req, _w| async { Ok(()) }).unwrap();

        router.dispatch(request(Method::GET, "/api/x")).await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["root", "root2", "api"]);
    }

    #[tokio::test]
    async fn test_same_pattern_replaces_handler() {
        let mut router = Router::new();
        router.get("/user/:id", |_req, w| async move {
            w.write_str("first");
            Ok(())
        }).unwrap();
        router.get("/user/:id", |_req, w| async move {
            w.write_str("second");
            Ok(())
        }).unwrap();

        assert_eq!(router.routes().len(), 1);

        let response = router.dispatch(request(Method::GET, "/user/1")).await.unwrap();
        assert_eq!(body(&response), "second");
    }

    #[tokio::test]
    async fn test_filter_attaches_to_existing_route() {
        let mut router = Router::new();
        router.handle("/:id", |req, w| async move {
            w.write_str(&req.path);
            Ok(())
        }).unwrap();
        router.filter("/:id", |_req, w| async move {
            w.set_header("X-Seen", "1");
            Ok(())
        }).unwrap();

        assert_eq!(router.routes().len(), 1);
        assert_eq!(router.routes().iter().next().unwrap().filters().len(), 1);

        let response = router.dispatch(request(Method::GET, "/myid")).await.unwrap();
        assert_eq!(body(&response), "/myid");
        assert_eq!(response.get_header("X-Seen").unwrap(), "1");
    }

    #[tokio::test]
    async fn test_filter_sees_path_params() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();

        let mut router = Router::new();
        router.filter("/api/:id", move |req, _w| {
            let seen = seen_clone.clone();
            async move {
                *seen.lock().unwrap() = req.get_query_param("id").map(str::to_string);
                Ok(())
            }
        }).unwrap();
        router.get("/api/:id", |_req, _w| async { Ok(()) }).unwrap();

        router.dispatch(request(Method::GET, "/api/myid")).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), Some("myid".to_string()));
    }

    #[tokio::test]
    async fn test_match_all_in_order_reaches_later_route() {
        let mut router = Router::new();
        router.filter("/:section/:page", |_req, w| async move {
            w.set_header("X-Layer", "outer");
            Ok(())
        }).unwrap();
        router.get("/docs/:page", |req, w| async move {
            let page = req.get_query_param("page").unwrap_or_default().to_string();
            w.write_str(&page);
            Ok(())
        }).unwrap();

        let response = router.dispatch(request(Method::GET, "/docs/intro")).await.unwrap();
        assert_eq!(body(&response), "intro");
        assert_eq!(response.get_header("X-Layer").unwrap(), "outer");
    }

    #[tokio::test]
    async fn test_layered_routes_add_each_param_once() {
        let values = Arc::new(Mutex::new(Vec::new()));
        let values_clone = values.clone();

        let mut router = Router::new();
        router.filter("/user/:id", |_req, _w| async { Ok(()) }).unwrap();
        router.get("/user/:id([0-9]+)", move |req, _w| {
            let values = values_clone.clone();
            async move {
                let all: Vec<String> = req.get_query_params("id").into_iter().map(String::from).collect();
                *values.lock().unwrap() = all;
                Ok(())
            }
        }).unwrap();

        router.dispatch(request(Method::GET, "/user/42")).await.unwrap();
        assert_eq!(*values.lock().unwrap(), vec!["42".to_string()]);

        // A query value with the same name and value is still kept
        router.dispatch(request(Method::GET, "/user/42?id=42")).await.unwrap();
        assert_eq!(*values.lock().unwrap(), vec!["42".to_string(), "42".to_string()]);
    }

    #[tokio::test]
    async fn test_layered_routes_keep_params_from_each_route() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let mut router = Router::new();
        router.filter("/:section/:page", |_req, _w| async { Ok(()) }).unwrap();
        router.get("/docs/:page", move |req, _w| {
            let seen = seen_clone.clone();
            async move {
                let pairs: Vec<(String, String)> = req
                    .query_params
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect();
                *seen.lock().unwrap() = pairs;
                Ok(())
            }
        }).unwrap();

        router.dispatch(request(Method::GET, "/docs/intro")).await.unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("section".to_string(), "docs".to_string()),
                ("page".to_string(), "intro".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_first_handler_ends_dispatch() {
        let mut router = Router::new();
        router.get("/:id", |_req, _w| async { Ok(()) }).unwrap();
        router.get("/special", |_req, w| async move {
            w.write_str("special");
            Ok(())
        }).unwrap();

        let response = router.dispatch(request(Method::GET, "/special")).await.unwrap();
        assert_eq!(response.status, StatusCode::Ok);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_method_specific_handlers() {
        let mut router = Router::new();
        router.get("/items/:id", |_req, w| async move {
            w.write_str("get");
            Ok(())
        }).unwrap();
        router.put("/items/:id", |_req, w| async move {
            w.write_status(StatusCode::Accepted);
            w.write_str("put");
            Ok(())
        }).unwrap();
        router.delete("/items/:id", |_req, w| async move {
            w.write_status(StatusCode::NoContent);
            Ok(())
        }).unwrap();

        assert_eq!(router.routes().len(), 1);

        let response = router.dispatch(request(Method::GET, "/items/1")).await.unwrap();
        assert_eq!(body(&response), "get");

        let response = router.dispatch(request(Method::PUT, "/items/1")).await.unwrap();
        assert_eq!(response.status, StatusCode::Accepted);
        assert_eq!(body(&response), "put");

        let response = router.dispatch(request(Method::DELETE, "/items/1")).await.unwrap();
        assert_eq!(response.status, StatusCode::NoContent);
    }

    #[tokio::test]
    async fn test_exact_method_preferred_over_any() {
        let mut router = Router::new();
        router.handle("/thing", |_req, w| async move {
            w.write_str("any");
            Ok(())
        }).unwrap();
        router.post("/thing", |_req, w| async move {
            w.write_str("post");
            Ok(())
        }).unwrap();

        let response = router.dispatch(request(Method::POST, "/thing")).await.unwrap();
        assert_eq!(body(&response), "post");

        let response = router.dispatch(request(Method::PATCH, "/thing")).await.unwrap();
        assert_eq!(body(&response), "any");
    }

    #[tokio::test]
    async fn test_method_mismatch_is_not_found_with_allow_hint() {
        let mut router = Router::new();
        router.get("/items/:id", |_req, _w| async { Ok(()) }).unwrap();
        router.patch("/items/:id", |_req, _w| async { Ok(()) }).unwrap();

        let response = router.dispatch(request(Method::POST, "/items/1")).await.unwrap();
        assert_eq!(response.status, StatusCode::NotFound);
        assert_eq!(body(&response), "404 page not found\n");
        assert_eq!(response.get_header("Allow").unwrap(), "GET, PATCH");

        let mut router = Router::new();
        router.get("/ok", |_req, _w| async { Ok(()) }).unwrap();
        let response = router.dispatch(request(Method::POST, "/ok")).await.unwrap();
        assert_eq!(response.status, StatusCode::NotFound);
    }

    #[tokio::test]
    async fn test_use_param_runs_when_param_present() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let mut router = Router::new();
        router.use_param(":id", move |req, w| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if req.get_query_param("id") == Some("0") {
                    w.error(StatusCode::BadRequest, "id must not be zero");
                }
                Ok(())
            }
        });
        router.get("/user/:id", |_req, w| async move {
            w.write_str("user");
            Ok(())
        }).unwrap();
        router.get("/about", |_req, w| async move {
            w.write_str("about");
            Ok(())
        }).unwrap();

        let response = router.dispatch(request(Method::GET, "/about")).await.unwrap();
        assert_eq!(body(&response), "about");
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let response = router.dispatch(request(Method::GET, "/user/5")).await.unwrap();
        assert_eq!(body(&response), "user");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let response = router.dispatch(request(Method::GET, "/user/0")).await.unwrap();
        assert_eq!(response.status, StatusCode::BadRequest);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let mut router = Router::new();
        router.get("/fail", |_req, _w| async {
            Err(Error::InternalError("boom".to_string()))
        }).unwrap();

        let result = router.dispatch(request(Method::GET, "/fail")).await;
        assert!(matches!(result, Err(Error::InternalError(ref m)) if m == "boom"));
    }

    #[tokio::test]
    async fn test_filter_error_stops_handler() {
        let handled = Arc::new(AtomicUsize::new(0));
        let handled_clone = handled.clone();

        let mut router = Router::new();
        router.use_filter(|_req, _w| async {
            Err(Error::InternalError("filter failed".to_string()))
        });
        router.get("/x", move |_req, _w| {
            let handled = handled_clone.clone();
            async move {
                handled.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }).unwrap();

        assert!(router.dispatch(request(Method::GET, "/x")).await.is_err());
        assert_eq!(handled.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_status_write_is_ignored() {
        let mut router = Router::new();
        router.get("/twice", |_req, w| async move {
            w.write_status(StatusCode::Created);
            w.write_status(StatusCode::BadGateway);
            Ok(())
        }).unwrap();

        let response = router.dispatch(request(Method::GET, "/twice")).await.unwrap();
        assert_eq!(response.status, StatusCode::Created);
        assert_eq!(response.get_header("Content-Length").unwrap(), "0");
    }

    #[tokio::test]
    async fn test_static_files_serves_and_refuses_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public");
        std::fs::create_dir(&public).unwrap();
        std::fs::write(public.join("hello.txt"), b"hello static").unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"top secret").unwrap();

        let mut router = Router::new();
        router.static_files("/static", &public).unwrap();

        let response = router.dispatch(request(Method::GET, "/static/hello.txt")).await.unwrap();
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.body, b"hello static".to_vec());
        assert_eq!(response.get_header("Content-Type").unwrap(), "text/plain; charset=utf-8");

        let response = router.dispatch(request(Method::GET, "/static/../secret.txt")).await.unwrap();
        assert_ne!(response.body, b"top secret".to_vec());

        let response = router.dispatch(request(Method::GET, "/static/a/../../../secret.txt")).await.unwrap();
        assert_ne!(response.body, b"top secret".to_vec());
        assert_eq!(response.status, StatusCode::NotFound);

        let response = router.dispatch(request(Method::GET, "/static/missing.txt")).await.unwrap();
        assert_eq!(response.status, StatusCode::NotFound);
    }

    #[tokio::test]
    async fn test_static_files_answer_head() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), b"hello static").unwrap();

        let mut router = Router::new();
        router.static_files("/static", dir.path()).unwrap();
        assert_eq!(router.routes().len(), 1);

        let response = router.dispatch(request(Method::HEAD, "/static/hello.txt")).await.unwrap();
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.get_header("Content-Length").unwrap(), "12");

        let response = router.dispatch(request(Method::POST, "/static/hello.txt")).await.unwrap();
        assert_eq!(response.status, StatusCode::NotFound);
        assert_eq!(response.get_header("Allow").unwrap(), "GET, HEAD");
    }

    #[tokio::test]
    async fn test_static_files_at_root() {
        let dir = tempfile::tempdir().unwrap();
        let contents = b"fn main() {}\n".to_vec();
        std::fs::write(dir.path().join("main.rs"), &contents).unwrap();

        let mut router = Router::new();
        router.static_files("/", dir.path()).unwrap();

        let response = router.dispatch(request(Method::GET, "/main.rs")).await.unwrap();
        assert_eq!(response.body, contents);
    }
}
