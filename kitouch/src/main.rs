// KITouch - Keep-in-touch contact tracker
// Entry point: opens the store, restores reminders and delivers them

use anyhow::Context;
use kitouch::app::{resolve_data_dir, AppState};
use kitouch::config::DEFAULT_LOG_FILTER;
use kitouch::services::{AuthorizationStatus, NavigationIntent, NotificationRouter};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting KITouch");

    let data_dir = resolve_data_dir()?;
    let state = AppState::initialize(data_dir)
        .await
        .context("failed to initialize application state")?;

    if let Some(NavigationIntent::OpenContactDetail { contact_id }) =
        state.pending_navigation.take().await?
    {
        tracing::info!("Resuming navigation to contact {}", contact_id);
    }

    state.notification_center.start().await?;

    let delivery = state.settings_service.get_delivery().await?;
    if delivery.request_authorization_on_start
        && state.reminders_service.request_authorization().await? == AuthorizationStatus::Denied
    {
        tracing::warn!("Reminders stay registered but will not be shown");
    }

    let summary = state.reminders_service.reschedule_all().await?;
    tracing::info!("Start-up reschedule: {:?}", summary);

    let (intent_tx, mut intent_rx) = mpsc::channel(16);
    let router = tokio::spawn(NotificationRouter::run(
        state.notification_center.subscribe(),
        intent_tx,
    ));

    let pending_navigation = state.pending_navigation.clone();
    let navigator = tokio::spawn(async move {
        while let Some(intent) = intent_rx.recv().await {
            // In-process delivery has no separate "opened" signal, so a
            // delivered reminder counts as opened. The latest one wins.
            tracing::info!("Navigation requested: {:?}", intent);
            if let Err(e) = pending_navigation.stash(&intent).await {
                tracing::error!("Failed to store pending navigation: {}", e);
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutting down");

    state.notification_center.shutdown().await?;
    router.abort();
    navigator.abort();

    Ok(())
}
