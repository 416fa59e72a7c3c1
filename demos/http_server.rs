//! A small JSON/XML API with parameter filters and per-method handlers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use microroute_rs::server::content::{read_json, send};
use microroute_rs::{HttpServer, Router, ServerConfig, ServerError, StatusCode};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    id: u32,
    name: String,
}

type Users = Arc<Mutex<HashMap<u32, User>>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = ServerConfig {
        addr: "127.0.0.1:8080".parse()?,
        max_connections: 1024,
        read_buffer_size: 8192,
    };

    let users: Users = Arc::new(Mutex::new(HashMap::new()));
    let mut router = Router::new();

    // Any route declaring :id gets its id checked once
    router.use_param("id", |req, w| async move {
        let valid = req
            .get_query_params("id")
            .last()
            .is_some_and(|id| id.parse::<u32>().is_ok());
        if !valid {
            w.error(StatusCode::BadRequest, "id must be a number");
        }
        Ok(())
    });

    let store = users.clone();
    router.get("/users/:id", move |req, w| {
        let store = store.clone();
        async move {
            let id: u32 = req
                .get_query_params("id")
                .last()
                .and_then(|id| id.parse().ok())
                .unwrap_or_default();
            let user = store
                .lock()
                .map_err(|e| ServerError::InternalError(e.to_string()))?
                .get(&id)
                .cloned();
            match user {
                Some(user) => send(&req, &w, &user),
                None => w.error(StatusCode::NotFound, "no such user"),
            }
            Ok(())
        }
    })?;

    let store = users.clone();
    router.post("/users", move |req, w| {
        let store = store.clone();
        async move {
            let user: User = match read_json(&req) {
                Ok(user) => user,
                Err(e) => {
                    w.error(StatusCode::BadRequest, &e.to_string());
                    return Ok(());
                }
            };
            store
                .lock()
                .map_err(|e| ServerError::InternalError(e.to_string()))?
                .insert(user.id, user.clone());
            // Headers must be in place before the body starts the response
            w.set_header("Location", format!("/users/{}", user.id));
            send(&req, &w, &user);
            Ok(())
        }
    })?;

    router.get("/headers", |req, w| async move {
        let mut body = String::from("Request Headers:\n\n");
        for (name, value) in &req.headers {
            body.push_str(&format!("{name}: {value}\n"));
        }
        w.set_header("Content-Type", "text/plain");
        w.set_header("X-Custom-Header", "Custom Value");
        w.write_str(&body);
        Ok(())
    })?;

    HttpServer::new(config, router).start().await?;

    Ok(())
}
