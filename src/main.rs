//! CLI harness: drives the full event sequence (document → language →
//! mode) through the orchestrator against the real gateway and a
//! directory delivery sink. Useful for local smoke runs of the pipeline
//! without a chat transport attached.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use sublingo::config::Config;
use sublingo::delivery::DirectoryDelivery;
use sublingo::events::InboundEvent;
use sublingo::job::{Orchestrator, TranslateMode};
use sublingo::lang::Language;
use sublingo::metrics::MetricsRegistry;
use sublingo::session::SessionStore;
use sublingo::translate::cache::TranslationCache;
use sublingo::translate::gateway::HttpGateway;
use sublingo::translate::TranslationService;

#[derive(Parser)]
#[command(
    name = "sublingo",
    about = "Translate a subtitle/string file or a ZIP archive of them"
)]
struct Cli {
    /// Subtitle/string file or ZIP archive to translate.
    input: PathBuf,

    /// Target language code: my, en, ja, th, ko, zh.
    #[arg(long, default_value = "en")]
    lang: String,

    /// Translation mode: normal or adult.
    #[arg(long, default_value = "normal")]
    mode: String,

    /// Directory receiving translated outputs.
    #[arg(long, default_value = "out")]
    out_dir: PathBuf,
}

/// Synthetic user identity for local runs.
const CLI_USER: i64 = 0;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sublingo=info".parse().expect("valid default filter")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuration incomplete");
            std::process::exit(1);
        }
    };

    let Some(target) = Language::from_code(&cli.lang) else {
        error!(lang = %cli.lang, "unknown target language code");
        std::process::exit(2);
    };
    let Some(mode) = TranslateMode::from_wire(&cli.mode) else {
        error!(mode = %cli.mode, "unknown mode, expected normal or adult");
        std::process::exit(2);
    };

    let gateway = match HttpGateway::new(
        config.llm_api_key.clone(),
        config.llm_base_url.clone(),
        config.llm_model.clone(),
    ) {
        Ok(gateway) => gateway,
        Err(e) => {
            error!(error = %e, "gateway client init failed");
            std::process::exit(1);
        }
    };

    let metrics = Arc::new(MetricsRegistry::new());
    let cache = Arc::new(TranslationCache::new(512, Duration::from_secs(600)));
    let service = TranslationService::new(Arc::new(gateway), cache, Arc::clone(&metrics));
    let orchestrator = Orchestrator::new(
        Arc::new(SessionStore::new()),
        service,
        Arc::new(DirectoryDelivery::new(cli.out_dir.clone())),
        Arc::clone(&metrics),
        config.upload_dir.clone(),
        config.work_dir.clone(),
    );

    let file_name = cli
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let content = match tokio::fs::read(&cli.input).await {
        Ok(content) => content,
        Err(e) => {
            error!(input = %cli.input.display(), error = %e, "cannot read input");
            std::process::exit(1);
        }
    };

    info!(input = %cli.input.display(), target = %target, mode = ?mode, "starting");

    orchestrator
        .handle_event(InboundEvent::Document {
            user_id: CLI_USER,
            file_name,
            content,
        })
        .await;
    orchestrator
        .handle_event(InboundEvent::Callback {
            user_id: CLI_USER,
            data: format!("lang_{}", target.code()),
        })
        .await;
    orchestrator
        .handle_event(InboundEvent::Callback {
            user_id: CLI_USER,
            data: format!("mode_{}_{}", mode.wire(), target.code()),
        })
        .await;

    for (name, summary) in metrics.summary() {
        info!(
            metric = %name,
            p50_us = summary.p50_us,
            p95_us = summary.p95_us,
            count = summary.count,
            "timing"
        );
    }
}
