use std::sync::Arc;

use outreach::config::OutreachConfig;
use outreach::drafting::DraftProducer;
use outreach::engine::{Engine, EngineContext, tasks};
use outreach::intent::IntentClassifier;
use outreach::leads::ingest_file;
use outreach::llm::{LlmProvider, OpenRouterClient};
use outreach::mail::{ImapInbox, Inbox, Mailer, SmtpMailer};
use outreach::store::{LeadStore, LibSqlLeadStore};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = OutreachConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    eprintln!("📬 Outreach v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!(
        "   Mail: {}",
        config
            .mail
            .as_ref()
            .map_or("disabled".to_string(), |m| m.smtp_host.clone())
    );

    // Total store unavailability at startup is the one fatal condition.
    let store: Arc<dyn LeadStore> = Arc::new(
        LibSqlLeadStore::new_local(&config.db_path)
            .await
            .unwrap_or_else(|e| {
                eprintln!(
                    "Error: Failed to open database at {}: {e}",
                    config.db_path.display()
                );
                std::process::exit(1);
            }),
    );

    if let Some(path) = &config.leads_file {
        if path.exists() {
            match ingest_file(store.as_ref(), path).await {
                Ok(report) => tracing::info!(?report, "Startup lead ingestion done"),
                Err(e) => tracing::error!(error = %e, "Startup lead ingestion failed"),
            }
        } else {
            tracing::info!(path = %path.display(), "Leads file not found, skipping ingestion");
        }
    }

    let llm: Arc<dyn LlmProvider> = Arc::new(OpenRouterClient::new(
        config.llm.api_key.clone(),
        config.llm.model.clone(),
        config.llm.base_url.clone(),
    ));

    let mailer: Option<Arc<dyn Mailer>> = config
        .mail
        .clone()
        .map(|m| Arc::new(SmtpMailer::new(m)) as Arc<dyn Mailer>);
    let inbox: Option<Arc<dyn Inbox>> = config
        .mail
        .clone()
        .map(|m| Arc::new(ImapInbox::new(m)) as Arc<dyn Inbox>);

    let ctx = EngineContext {
        store,
        producer: DraftProducer::new(Arc::clone(&llm), config.persona.clone()),
        classifier: IntentClassifier::new(llm),
        mailer,
        inbox,
        settings: config.engine.clone(),
    };

    let mut engine = Engine::new(ctx);

    // Draft for any already-ingested leads right away instead of waiting a
    // full period.
    tasks::initial_draft_cycle(&engine.context()).await;

    engine.start();

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl-c");
    tracing::info!("Shutdown requested");
    engine.stop();
}
