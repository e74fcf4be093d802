use axum::http::{self, HeaderValue, Method};
use dotenvy::dotenv;
use env_logger::Builder;
use log::LevelFilter;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use werewolf_server::app;
use werewolf_server::utils::config::CONFIG;

// ログ設定
fn init_logger() {
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Info)
        .filter_module("tower_http", LevelFilter::Debug)
        .filter_module("werewolf_server", LevelFilter::Debug)
        .format_timestamp(Some(env_logger::TimestampPrecision::Millis))
        .format_target(true)
        .init();
}

#[tokio::main]
async fn main() {
    // 環境変数をロード
    if let Err(e) = dotenv() {
        eprintln!("Warning: failed to load .env file: {}", e);
    }

    init_logger();

    // CORSレイヤーの設定
    let origins = [CONFIG
        .cors_origin
        .parse::<HeaderValue>()
        .expect("CORS_ORIGIN must be a valid origin")];
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION]);

    // ルーティングの設定
    let app = app::create_app().layer(cors).layer(
        TraceLayer::new_for_http().make_span_with(|request: &http::Request<_>| {
            tracing::info_span!(
                "HTTP request",
                method = %request.method(),
                uri = %request.uri()
            )
        }),
    );

    // サーバーの起動
    let addr: SocketAddr = format!("{}:{}", CONFIG.server_host, CONFIG.server_port)
        .parse()
        .expect("SERVER_HOST/SERVER_PORT must form a valid address");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind server address");

    println!("werewolf server listening on http://{}", addr);
    axum::serve(listener, app).await.unwrap();
}
