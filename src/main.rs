use std::sync::Arc;
use std::sync::atomic::Ordering;

use support_triage::channels::{ImapMailbox, SmtpNotifier};
use support_triage::classify::IntentClassifier;
use support_triage::config::Config;
use support_triage::draft::ResponseDrafter;
use support_triage::knowledge::KnowledgeBase;
use support_triage::llm::create_provider;
use support_triage::poller::spawn_poller;
use support_triage::workflow::WorkflowEngine;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    eprintln!("Support Triage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   IMAP: {}:{}", config.mail.imap_host, config.mail.imap_port);
    eprintln!("   SMTP: {}:{}", config.mail.smtp_host, config.mail.smtp_port);
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Knowledge base: {}", config.knowledge_dir.display());

    // Ordered startup: LLM provider, then the knowledge index, then the
    // engine — nothing loads lazily at first use inside an execution.
    let llm = create_provider(&config.llm)?;

    let knowledge = Arc::new(KnowledgeBase::new(config.knowledge_dir.clone()));
    match knowledge.ensure_loaded().await {
        Ok(passages) => eprintln!("   Indexed {passages} knowledge passage(s)\n"),
        Err(e) => {
            eprintln!("   Warning: knowledge base unavailable ({e}); replies will lack context\n");
        }
    }

    let engine = Arc::new(WorkflowEngine::new(
        Arc::new(IntentClassifier::new(Arc::clone(&llm))),
        knowledge,
        Arc::new(ResponseDrafter::new(Arc::clone(&llm))),
        Arc::new(SmtpNotifier::new(config.mail.clone())),
    ));

    let mailbox = Arc::new(ImapMailbox::new(config.mail.clone()));
    let (poller, shutdown) = spawn_poller(mailbox, engine, config.mail.poll_interval_secs);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    shutdown.store(true, Ordering::Relaxed);
    poller.abort();
    eprintln!("Stopped.");

    Ok(())
}
