//! A basic server showing path parameters, filters and static files.

use log::info;
use microroute_rs::{HttpServer, Router, ServerConfig, StatusCode};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = ServerConfig {
        addr: "127.0.0.1:8081".parse()?,
        max_connections: 100,
        read_buffer_size: 4096,
    };

    let mut router = Router::new();

    // Log every request before anything else sees it
    router.use_filter(|req, _w| async move {
        info!("{} {}", req.method, req.path);
        Ok(())
    });

    // Everything under /admin/ needs a token
    router.filter("/admin/", |req, w| async move {
        if req.get_header("Authorization").map(String::as_str) != Some("Bearer secret") {
            w.error(StatusCode::Unauthorized, "401 unauthorized");
        }
        Ok(())
    })?;

    router.get("/", |_req, w| async move {
        w.set_header("Content-Type", "text/plain");
        w.write_str("Hello, World!");
        Ok(())
    })?;

    router.get("/hello/:name", |req, w| async move {
        let name = req.get_query_param("name").unwrap_or("World").to_string();
        w.set_header("Content-Type", "text/plain");
        w.write_str(&format!("Hello, {name}!"));
        Ok(())
    })?;

    router.get("/status/:code([0-9]{3})", |req, w| async move {
        let status = match req.get_query_param("code") {
            Some("404") => StatusCode::NotFound,
            Some("500") => StatusCode::InternalServerError,
            _ => StatusCode::Ok,
        };
        w.write_status(status);
        w.write_str(&format!("Status: {}", status.as_u16()));
        Ok(())
    })?;

    router.get("/admin/stats", |_req, w| async move {
        w.write_str("all good");
        Ok(())
    })?;

    router.static_files("/static/", "./public")?;

    HttpServer::new(config, router).start().await?;

    Ok(())
}
