//! A small site demonstrating the sound-rs router and server API.
//!
//! Run with `RUST_LOG=info cargo run --example http_server` and try:
//!
//! - `curl localhost:8080/hello/ann?greeting=hi`
//! - `curl localhost:8080/search?tags[]=a&tags[]=b&filter[size]=xl`
//! - `curl -X POST -d '_method=DELETE' localhost:8080/users/7`
//! - `curl -X POST -H 'X-Token: secret' -d 'title=hello' localhost:8080/admin/posts`

use std::collections::HashMap;

use sound_rs::{pipe, HttpServer, Method, ServerConfig, StatusCode};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut server = HttpServer::new(ServerConfig::default());
    let router = server.router_mut();

    router.set_renderer(|name: &str, vars: &HashMap<String, String>| match name {
        "hello" => Some(format!(
            "<html><body><h1>{}, {}!</h1></body></html>",
            vars.get("greeting").map_or("Hello", String::as_str),
            vars.get("name").map_or("stranger", String::as_str),
        )),
        _ => None,
    });

    router.get("/", |conn, _| {
        conn.html(StatusCode::Ok, "<html><body><h1>Welcome to sound-rs!</h1></body></html>");
        Ok(())
    });

    // Path parameter, rendered through the template seam
    router.get("/hello/#name", |conn, params| {
        let vars: HashMap<String, String> = params
            .iter()
            .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())))
            .collect();
        conn.render("hello", &vars);
        Ok(())
    });

    // Nested query parameters echoed back as JSON
    router.get("/search", |conn, params| {
        conn.json(StatusCode::Ok, params)?;
        Ok(())
    });

    router.get("/users/#id", |conn, params| {
        conn.text(StatusCode::Ok, format!("User {}", params["id"]));
        Ok(())
    });

    // Reached from an HTML form via `_method=DELETE`
    router.register(Method::DELETE, "/users/#id", Vec::new(), |conn, params| {
        conn.text(StatusCode::Ok, format!("Deleted user {}", params["id"]));
        Ok(())
    });

    router.get("/files/*rest", |conn, params| {
        conn.json(StatusCode::Ok, params)?;
        Ok(())
    });

    // Everything under /admin requires a token
    router
        .pipeline(vec![
            pipe(|conn| {
                if conn.request_headers().get("X-Token") != Some("secret") {
                    conn.text(StatusCode::Unauthorized, "Missing or invalid token");
                    conn.halt();
                }
            }),
            pipe(|conn| {
                let _ = conn.add_header("Cache-Control", "no-store");
            }),
        ])
        .get("/admin", |conn, _| {
            if !conn.is_halted() {
                conn.text(StatusCode::Ok, "Admin dashboard");
            }
            Ok(())
        })
        .post("/admin/posts", |conn, params| {
            if !conn.is_halted() {
                conn.json(StatusCode::Created, params)?;
            }
            Ok(())
        });

    router.set_not_found(|conn| {
        conn.html(StatusCode::NotFound, "<html><body><h1>Nothing here</h1></body></html>");
    });

    server.listen("127.0.0.1", 8080).await?;

    Ok(())
}
