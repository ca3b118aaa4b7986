#![cfg(feature = "api_server")]

use std::sync::Arc;

use actix_web::{web, App, HttpResponse, HttpServer};
use serde::Serialize;

use crate::engine::Engine;
use crate::queue::Category;

/// The `State()` JSON view (spec §6): a purely informational snapshot of
/// queue depth per category, served over the same `actix-web` stack
/// `tos_wallet`'s `api_server` feature pulls in for its own RPC surface.
/// This is the only HTTP route this crate exposes — the registration RPC
/// transport itself is an out-of-scope collaborator.
#[derive(Serialize)]
struct StateView {
    wallet_set: bool,
    queue_depth: std::collections::HashMap<String, usize>,
}

async fn state(engine: web::Data<Arc<Engine>>) -> HttpResponse {
    let mut queue_depth = std::collections::HashMap::new();
    for category in Category::ALL {
        let depth = engine.queue.scan(category).map(|rows| rows.len()).unwrap_or(0);
        queue_depth.insert(category.to_string(), depth);
    }
    let view = StateView {
        wallet_set: engine.wallet.is_set(),
        queue_depth,
    };
    HttpResponse::Ok().json(view)
}

pub async fn serve(engine: Arc<Engine>, bind_address: &str) -> std::io::Result<()> {
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(engine.clone()))
            .route("/state", web::get().to(state))
    })
    .bind(bind_address)?
    .run()
    .await
}
