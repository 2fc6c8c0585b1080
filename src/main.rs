//! Face Detection API - detection history service and command-line client.
//!
//! This binary starts the HTTP server or runs one of the client commands.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use facedetect_api::{
    client::{ApiClient, CaptureMode, DetectorClient, ImageSource, ServiceStatus, Session, Workflow},
    config::{CheckConfig, ClientArgs, Cli, Command, DeleteConfig, DetectConfig, HistoryConfig, ServeConfig},
    history::ListPolicy,
    server::{create_router, RouterConfig},
    store::open_store,
    ClientError, RecordId, UserId,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Detect(config) => run_detect(config).await,
        Command::History(config) => run_history(config).await,
        Command::Delete(config) => run_delete(config).await,
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Face Detection API v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Database: {}", config.database_url);
    info!("  Token TTL: {}s", config.token_ttl);
    info!("  Body limit: {} bytes", config.body_limit);

    match config.history_policy {
        ListPolicy::Open => {
            warn!("  History policy: open - any authenticated user can list any user's history");
            warn!("        Restrict with --history-policy=owner");
        }
        ListPolicy::OwnerOnly => info!("  History policy: owner"),
    }

    let store = match open_store(&config.database_url).await {
        Ok(store) => {
            info!("  Store backend: {}", store.backend());
            store
        }
        Err(e) => {
            error!("Failed to open store '{}': {}", config.database_url, e);
            return ExitCode::FAILURE;
        }
    };

    let router = create_router(store, build_router_config(&config));
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/", addr);
    info!("    curl http://{}/health", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "facedetect_api=debug,tower_http=debug"
    } else {
        "facedetect_api=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new(config.auth_secret_or_empty())
        .with_token_ttl(config.token_ttl())
        .with_body_limit(config.body_limit)
        .with_list_policy(config.history_policy)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

// =============================================================================
// Client Commands
// =============================================================================

async fn login(args: &ClientArgs) -> Result<(ApiClient, Session), ClientError> {
    let (email, password) = args.credentials().map_err(ClientError::State)?;
    let api = ApiClient::new(&args.api_url)?;
    let session = api.login(email, password).await?;
    Ok((api, session))
}

async fn run_detect(config: DetectConfig) -> ExitCode {
    if config.client.verbose {
        init_logging(true);
    }

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match detect(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn detect(config: &DetectConfig) -> Result<(), ClientError> {
    if let Some(ref name) = config.register_as {
        let (email, password) = config.client.credentials().map_err(ClientError::State)?;
        let api = ApiClient::new(&config.client.api_url)?;
        match api.register(name, email, password).await {
            Ok(user) => println!("✓ Registered {} ({})", user.email, user.id),
            Err(ClientError::Api { status: 400, message }) => {
                println!("• Registration skipped: {}", message)
            }
            Err(e) => return Err(e),
        }
    }

    let (api, session) = login(&config.client).await?;
    println!("✓ Logged in as {}", session.user.email);

    let detector = DetectorClient::new(&config.detector_url)?;
    let mut workflow = Workflow::new(detector, api, session);

    if workflow.check_service().await != ServiceStatus::Ready {
        return Err(ClientError::State(format!(
            "Detection service is not running at {}",
            config.detector_url
        )));
    }
    println!("✓ Detection service ready");

    workflow.select_mode(CaptureMode::Upload)?;
    let record = workflow
        .run_detection(ImageSource::File(config.image.clone()))
        .await?;

    println!();
    println!("Detection saved");
    println!("───────────────");
    println!("  Id:     {}", record.id);
    println!("  Faces:  {}", record.faces_detected);
    println!("  Method: {}", record.detection_method);
    println!("  Time:   {}", record.created_at.to_rfc3339());
    for (i, face) in record.face_coordinates.iter().enumerate() {
        println!(
            "  Face {}: x={} y={} {}x{}",
            i + 1,
            face.x,
            face.y,
            face.width,
            face.height
        );
    }

    Ok(())
}

async fn run_history(config: HistoryConfig) -> ExitCode {
    if config.client.verbose {
        init_logging(true);
    }

    match history(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn history(config: &HistoryConfig) -> Result<(), ClientError> {
    let (api, session) = login(&config.client).await?;

    let target = match config.user.as_deref() {
        Some(user) => user
            .parse::<UserId>()
            .map_err(|_| ClientError::State(format!("Invalid user id: {}", user)))?,
        None => session.user_id(),
    };

    let records = api.history(&session, &target).await?;

    if config.json {
        let json = serde_json::to_string_pretty(&records)
            .map_err(|e| ClientError::State(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    if records.is_empty() {
        println!("(no detections)");
        return Ok(());
    }

    for record in &records {
        println!(
            "{}  {}  {} face(s)  {}",
            record.id,
            record.created_at.to_rfc3339(),
            record.faces_detected,
            record.detection_method
        );
    }
    println!();
    println!("Total: {} detection(s)", records.len());

    Ok(())
}

async fn run_delete(config: DeleteConfig) -> ExitCode {
    if config.client.verbose {
        init_logging(true);
    }

    let result = async {
        let id: RecordId = config
            .detection_id
            .parse()
            .map_err(|_| ClientError::State(format!("Invalid detection id: {}", config.detection_id)))?;
        let (api, session) = login(&config.client).await?;
        api.delete_detection(&session, &id).await?;
        Ok::<_, ClientError>(id)
    }
    .await;

    match result {
        Ok(id) => {
            println!("✓ Deleted {}", id);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("Face Detection Check");
    println!("════════════════════");
    println!();

    let mut ok = true;

    print!("Detection service ({})... ", config.detector_url);
    match DetectorClient::new(&config.detector_url) {
        Ok(detector) => match detector.health().await {
            Ok(()) => println!("✓ ready"),
            Err(e) => {
                println!("✗ {}", e);
                ok = false;
            }
        },
        Err(e) => {
            println!("✗ {}", e);
            ok = false;
        }
    }

    print!("History API ({})... ", config.api_url);
    match ApiClient::new(&config.api_url) {
        Ok(api) => match api.ping().await {
            Ok(message) => println!("✓ {}", message),
            Err(e) => {
                println!("✗ {}", e);
                ok = false;
            }
        },
        Err(e) => {
            println!("✗ {}", e);
            ok = false;
        }
    }

    println!();
    println!("════════════════════");
    if ok {
        println!("✓ All checks passed!");
        ExitCode::SUCCESS
    } else {
        println!("✗ Some checks failed");
        println!();
        println!("Start the detection service (python-service) and the API (facedetect-api serve).");
        ExitCode::FAILURE
    }
}
