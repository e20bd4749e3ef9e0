//! Main application orchestration.
//!
//! Coordinates all components:
//! - Chat gateway long polling and update dispatch
//! - Exchange client shared by replies and the price alert
//! - File-backed state (month baselines, alert clock)
//! - Periodic statistics summary

use crate::alert::PriceAlertService;
use crate::config::{AppConfig, EnvSettings};
use crate::context::{spawn_context_store, ContextStoreHandle};
use crate::dispatcher::{DispatcherSettings, UpdateDispatcher};
use crate::error::AppResult;
use crate::handlers::AccountService;
use crate::users::UserDirectory;
use chrono::Utc;
use desk_chat::{ChatGateway, ChatId, TelegramGateway};
use desk_exchange::{BybitClient, ExchangeApi};
use desk_persistence::{AlertClock, BaselineStore, FileStore, KeyValueStore};
use desk_telemetry::StatsReporter;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Main application.
pub struct Application {
    chat: Arc<dyn ChatGateway>,
    dispatcher: UpdateDispatcher,
    alert: PriceAlertService,
    contexts: ContextStoreHandle,
    contexts_task: JoinHandle<()>,
    stats: StatsReporter,
    last_stats_output: Instant,
    loop_sleep: Duration,
    error_sleep: Duration,
    stats_interval: Duration,
}

impl Application {
    /// Create the application with the production gateway, client and store.
    pub fn new(config: AppConfig, env: &EnvSettings, users: UserDirectory) -> AppResult<Self> {
        let chat: Arc<dyn ChatGateway> = Arc::new(TelegramGateway::new(
            config.gateway_settings(env.bot_token.clone()),
        )?);
        let exchange: Arc<dyn ExchangeApi> =
            Arc::new(BybitClient::new(config.client_settings(env.testnet))?);
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.persistence.state_dir)?);

        info!(
            testnet = env.testnet,
            allowed_chat = ?env.chat_id,
            users = users.len(),
            state_dir = %config.persistence.state_dir,
            "Application configured"
        );

        Ok(Self::from_parts(config, env.chat_id, users, chat, exchange, store))
    }

    /// Assemble from already-built collaborators.
    ///
    /// `allowed_chat` is both the served chat and the alert target.
    pub fn from_parts(
        config: AppConfig,
        allowed_chat: Option<ChatId>,
        users: UserDirectory,
        chat: Arc<dyn ChatGateway>,
        exchange: Arc<dyn ExchangeApi>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let baselines = Arc::new(BaselineStore::new(Arc::clone(&store)));
        let accounts = AccountService::new(
            Arc::clone(&exchange),
            baselines,
            config.dispatcher.position_cap,
        );

        let (contexts, contexts_task) = spawn_context_store(config.dispatcher.context_capacity);
        let dispatcher = UpdateDispatcher::new(
            Arc::clone(&chat),
            users,
            accounts,
            contexts.clone(),
            DispatcherSettings {
                allowed_chat,
                menu_delay: config.menu_delay(),
                command_delay: config.command_delay(),
            },
        );

        let alert = PriceAlertService::new(
            exchange,
            Arc::clone(&chat),
            AlertClock::new(store),
            allowed_chat,
            config.alert.symbol.clone(),
            config.alert.cooldown_secs,
        );

        Self {
            chat,
            dispatcher,
            alert,
            contexts,
            contexts_task,
            stats: StatsReporter::new(),
            last_stats_output: Instant::now(),
            loop_sleep: Duration::from_millis(config.dispatcher.loop_sleep_ms),
            error_sleep: Duration::from_millis(config.dispatcher.error_sleep_ms),
            stats_interval: Duration::from_secs(config.dispatcher.stats_interval_secs),
        }
    }

    pub fn dispatcher(&self) -> &UpdateDispatcher {
        &self.dispatcher
    }

    /// Switch to long polling and send the startup alert.
    pub async fn start(&mut self) {
        if let Err(e) = self.chat.delete_webhook(true).await {
            warn!(error = %e, "Failed to delete webhook, polling may conflict");
        }

        let outcome = self.alert.tick(Utc::now().timestamp(), true).await;
        info!(?outcome, "Startup alert");
    }

    /// One dispatcher cycle: poll and dispatch, alert tick, stats, sleep.
    ///
    /// A polling or transport failure ends the cycle early after the
    /// error sleep.
    pub async fn run_cycle(&mut self) {
        match self.dispatcher.poll_once().await {
            Ok(count) if count > 0 => debug!(count, "Updates dispatched"),
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Cycle aborted");
                tokio::time::sleep(self.error_sleep).await;
                return;
            }
        }

        self.alert.tick(Utc::now().timestamp(), false).await;

        if self.last_stats_output.elapsed() >= self.stats_interval {
            info!("Outputting periodic statistics summary");
            self.stats.output_summary();
            self.last_stats_output = Instant::now();
        }

        tokio::time::sleep(self.loop_sleep).await;
    }

    /// Run until ctrl-c.
    pub async fn run(self) -> AppResult<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for ctrl-c");
            }
        })
        .await
    }

    /// Start, then run cycles until `shutdown` completes.
    pub async fn run_until<F>(mut self, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await;
        tokio::pin!(shutdown);

        info!("Entering main event loop");
        loop {
            tokio::select! {
                _ = self.run_cycle() => {}
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Final statistics and context store shutdown.
    pub async fn shutdown(self) {
        info!(
            pending_cleanups = self.dispatcher.cleanup().pending(),
            pending_menus = self.contexts.len().await,
            "Shutting down"
        );

        info!("Final statistics summary:");
        self.stats.output_summary();

        self.contexts.shutdown().await;
        if let Err(e) = self.contexts_task.await {
            warn!(error = %e, "Context store task ended abnormally");
        }
    }
}
