use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use messaging_cell::{MessageLog, MockSmsChannel, NotificationChannel, TwilioSmsClient};
use offer_cell::{
    AcceptanceResolver, DeclineResolver, HoldTimerSweeper, OfferBatchDispatcher,
    OfferEngineState, SlotLedger,
};
use shared_config::AppConfig;
use waitlist_cell::{PatientDirectory, ScoreRecalcService};

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting waitlist backfill API server");

    // Load configuration
    let config = AppConfig::from_env();

    // Shared stores
    let directory = Arc::new(PatientDirectory::new());
    let ledger = Arc::new(SlotLedger::new());
    let messages = Arc::new(MessageLog::new());

    let channel: Arc<dyn NotificationChannel> = if config.use_mock_sms {
        info!("Using mock SMS channel (no real SMS will be sent)");
        Arc::new(MockSmsChannel::new())
    } else {
        Arc::new(TwilioSmsClient::new(&config))
    };

    // Orchestration services
    let dispatcher = Arc::new(OfferBatchDispatcher::new(
        ledger.clone(),
        directory.clone(),
        channel.clone(),
        messages.clone(),
        &config,
    ));
    let acceptance = Arc::new(AcceptanceResolver::new(
        ledger.clone(),
        directory.clone(),
        channel.clone(),
        messages.clone(),
        &config,
    ));
    let decline = Arc::new(DeclineResolver::new(
        ledger.clone(),
        directory.clone(),
        dispatcher.clone(),
    ));

    // Background jobs
    let sweeper = Arc::new(HoldTimerSweeper::new(
        ledger.clone(),
        dispatcher.clone(),
        config.sweep_interval_seconds,
    ));
    tokio::spawn({
        let sweeper = sweeper.clone();
        async move { sweeper.start().await }
    });

    let recalc = Arc::new(ScoreRecalcService::new(
        directory.clone(),
        config.priority_recalc_interval_minutes,
    ));
    tokio::spawn({
        let recalc = recalc.clone();
        async move { recalc.start().await }
    });

    let engine = Arc::new(OfferEngineState {
        ledger,
        directory: directory.clone(),
        dispatcher,
        acceptance,
        decline,
        channel,
        messages,
        from_number: config.twilio_from_number.clone(),
    });

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(engine, directory)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
