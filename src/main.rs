// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use sealed_request_server::{
    api::router,
    config::{init_tracing, AppConfig},
    crypto::ensure_initialized,
    state::AppState,
    sweeper::VerificationSweeper,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.log_format);

    if let Err(e) = ensure_initialized() {
        error!(error = %e, "Crypto backend failed its self-test");
        return ExitCode::FAILURE;
    }
    if config.using_dev_cpf_key {
        warn!("CPF_HASH_KEY is not set; using the development key");
    }

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to initialize application state");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(VerificationSweeper::new(state.gate.clone()).run(shutdown.clone()));

    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %config.bind_addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };

    info!(
        addr = %config.bind_addr,
        verifier = ?config.verifier_mode,
        persistent = config.data_dir.is_some(),
        "Sealed request server listening (docs at /docs)"
    );

    let app = router(state);
    let signal = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Received shutdown signal");
            signal.cancel();
        })
        .await;

    shutdown.cancel();
    let _ = sweeper.await;

    match served {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}
