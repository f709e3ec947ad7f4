use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use agora_api::auth::{self, AppState, AppStateInner};
use agora_api::middleware::require_auth;
use agora_api::{
    addresses, bulk, chain_events, comments, communities, invites, notifications, reactions,
    subscriptions, threads,
};
use agora_gateway::connection;
use agora_gateway::dispatcher::Dispatcher;
use agora_notify::{ChainEventHandler, Notifier, prune};

#[derive(Clone)]
struct ServerState {
    dispatcher: Dispatcher,
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("AGORA_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("AGORA_DB_PATH").unwrap_or_else(|_| "agora.db".into());
    let host = std::env::var("AGORA_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("AGORA_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let retention_days: u32 = std::env::var("AGORA_NOTIFICATION_RETENTION_DAYS")
        .unwrap_or_else(|_| "90".into())
        .parse()?;
    let prune_interval_secs: u64 = std::env::var("AGORA_PRUNE_INTERVAL_SECS")
        .unwrap_or_else(|_| "3600".into())
        .parse()?;
    // High-volume staking events are persisted but never notified on
    let excluded_kinds: Vec<String> = std::env::var("AGORA_EXCLUDED_EVENT_KINDS")
        .unwrap_or_else(|_| "reward,bonded,unbonded".into())
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    let admin_username = std::env::var("AGORA_ADMIN_USER").ok();

    // Init database
    let db = Arc::new(agora_db::Database::open(&PathBuf::from(&db_path))?);

    // Bootstrap admin: promote now if already registered, otherwise the
    // registration handler promotes on signup
    if let Some(name) = &admin_username {
        if let Some(user) = db.get_user_by_username(name)? {
            if !user.is_admin {
                db.set_user_admin(&user.id, true)?;
                info!("Promoted {} to admin", name);
            }
        }
    }

    // Shared state
    let dispatcher = Dispatcher::new();
    let notifier = Notifier::new(db.clone(), dispatcher.clone());
    let chain_event_handler = ChainEventHandler::new(notifier.clone(), excluded_kinds);

    let app_state: AppState = Arc::new(AppStateInner {
        db: db.clone(),
        jwt_secret: jwt_secret.clone(),
        notifier,
        dispatcher: dispatcher.clone(),
        chain_events: chain_event_handler,
        admin_username,
    });

    let server_state = ServerState {
        dispatcher,
        jwt_secret,
    };

    // Background retention pruning for read notifications
    tokio::spawn(prune::run_prune_loop(
        db.clone(),
        prune_interval_secs,
        retention_days,
    ));

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/api/waitlist", post(invites::join_waitlist))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/api/linkAddress", post(addresses::link_address))
        .route("/api/verifyAddress", post(addresses::verify_address))
        .route("/api/mergeAccounts", post(addresses::merge_accounts))
        .route("/api/bulkOffchain", get(bulk::bulk_offchain))
        .route(
            "/api/communities",
            get(communities::list_communities).post(communities::create_community),
        )
        .route(
            "/api/communities/{id}",
            get(communities::get_community).delete(communities::delete_community),
        )
        .route(
            "/api/communities/{id}/threads",
            get(threads::list_threads).post(threads::create_thread),
        )
        .route("/api/communities/{id}/webhook", post(communities::set_webhook))
        .route("/api/star", post(communities::star_community))
        .route(
            "/api/threads/{id}",
            get(threads::get_thread)
                .patch(threads::edit_thread)
                .delete(threads::delete_thread),
        )
        .route("/api/threads/{id}/collaborators", post(threads::add_collaborator))
        .route(
            "/api/threads/{id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/api/threads/{id}/reactions",
            get(reactions::list_thread_reactions).post(reactions::toggle_thread_reaction),
        )
        .route("/api/comments/{id}", delete(comments::delete_comment))
        .route(
            "/api/comments/{id}/reactions",
            get(reactions::list_comment_reactions).post(reactions::toggle_comment_reaction),
        )
        .route("/api/subscriptions", post(subscriptions::create_subscription))
        .route("/api/subscriptions", get(subscriptions::list_subscriptions))
        .route("/api/subscriptions/{id}/toggle", post(subscriptions::toggle_subscription))
        .route("/api/subscriptions/{id}", delete(subscriptions::delete_subscription))
        .route("/api/notifications", get(notifications::list_notifications))
        .route("/api/notifications/unread", get(notifications::unread_count))
        .route("/api/notifications/markRead", post(notifications::mark_read))
        .route("/api/notifications/clearRead", post(notifications::clear_read))
        .route("/api/invites", post(invites::create_invite))
        .route("/api/invites/redeem", post(invites::redeem_invite))
        .route("/api/chainEvents", post(chain_events::ingest_chain_event))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/api/ws", get(ws_upgrade))
        .with_state(server_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Agora server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<ServerState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.dispatcher, state.jwt_secret)
    })
}
