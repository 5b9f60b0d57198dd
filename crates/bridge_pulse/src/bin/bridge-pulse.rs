use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use bridge_datastore::NotionDataStore;
use clap::{Args, Parser, Subcommand};

use bridge_pulse::{
    auth::{
        google::{ClientSecrets, GoogleOAuth},
        provider::OAuthCredentialProvider,
        store::CredentialStore,
        CredentialProvider,
    },
    docs::{google::GoogleDocsClient, DocsPublisher},
    openai::OpenAIClient,
    retry::RetryPolicy,
    tracing::init_tracing_subscriber,
    yt::transcript::YtTranscriptClient,
    BridgeProcessorBuilder,
};

#[derive(Parser)]
#[command(
    name = "bridge-pulse",
    about = "Summarizes recordings queued in a Notion database into Google Docs"
)]
struct Cli {
    /// Path to the Google OAuth client secrets file
    #[arg(long, env = "GOOGLE_CLIENT_SECRETS", default_value = "credentials.json")]
    client_secrets: PathBuf,

    /// Path of the persisted Google credential
    #[arg(long, env = "GOOGLE_TOKEN_PATH", default_value = "token.json")]
    token_path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process the items ready right now and exit, without idle or trailing pacing sleeps
    Run(PipelineArgs),
    /// Poll the task database forever
    Watch(PipelineArgs),
    /// Authorize document access interactively and persist the credential
    Auth,
}

#[derive(Args, Clone)]
struct PipelineArgs {
    /// Notion integration token
    #[arg(long, env = "NOTION_API_KEY")]
    notion_api_key: String,

    /// Notion database holding the work items
    #[arg(long, env = "DATABASE_ID")]
    database_id: String,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY")]
    openai_key: String,

    /// Model used for summaries
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4o")]
    model: String,

    /// Ceiling on generated summary length, in tokens
    #[arg(long, env = "MAX_SUMMARY_TOKENS", default_value = "500")]
    max_tokens: u32,

    /// Prompt template containing a {{transcript}} placeholder
    #[arg(long, env = "PROMPT_PATH", default_value = "prompts/analyze_general.txt")]
    prompt_path: PathBuf,

    /// Seconds to wait after a poll that found nothing
    #[arg(long, env = "IDLE_INTERVAL_SECS", default_value = "300")]
    idle_interval_secs: u64,

    /// Seconds to wait between items
    #[arg(long, env = "PACING_INTERVAL_SECS", default_value = "30")]
    pacing_interval_secs: u64,

    /// Transcript fetch attempts per item
    #[arg(long, env = "FETCH_ATTEMPTS", default_value = "3")]
    fetch_attempts: u32,

    /// Seconds between transcript fetch attempts
    #[arg(long, env = "FETCH_RETRY_DELAY_SECS", default_value = "5")]
    fetch_retry_delay_secs: u64,

    /// Preferred caption languages, most preferred first
    #[arg(long, env = "TRANSCRIPT_LANGUAGES", value_delimiter = ',', default_value = "en")]
    languages: Vec<String>,
}

async fn credential_provider(cli: &Cli) -> anyhow::Result<OAuthCredentialProvider<GoogleOAuth>> {
    let secrets = ClientSecrets::load(&cli.client_secrets)
        .await
        .context("Failed to load Google client secrets")?;

    Ok(OAuthCredentialProvider::new(
        CredentialStore::new(&cli.token_path),
        GoogleOAuth::new(secrets),
    ))
}

async fn run_pipeline(cli: &Cli, args: &PipelineArgs, forever: bool) -> anyhow::Result<()> {
    let credentials = credential_provider(cli).await?;
    // fail before touching any work item if document access cannot be authorized
    credentials
        .acquire()
        .await
        .context("Failed to acquire document store credential")?;

    let store = NotionDataStore::new(&args.notion_api_key, &args.database_id);
    let fetcher = YtTranscriptClient::default().with_languages(args.languages.clone());
    let openai = OpenAIClient::new(&args.openai_key)
        .with_model(&args.model)
        .with_max_tokens(args.max_tokens);
    let publisher = DocsPublisher::new(credentials, GoogleDocsClient::default());

    let mut processor = BridgeProcessorBuilder::new(&args.prompt_path)
        .source(store)
        .fetcher(fetcher)
        .summarizer(openai)
        .publisher(publisher)
        .idle_interval(Duration::from_secs(args.idle_interval_secs))
        .pacing_interval(Duration::from_secs(args.pacing_interval_secs))
        .fetch_retry(RetryPolicy::new(
            args.fetch_attempts,
            Duration::from_secs(args.fetch_retry_delay_secs),
        ))
        .build();

    if forever {
        tracing::info!(database_id = %args.database_id, "Watching task database...");
        processor.run().await?;
    } else {
        tracing::info!(database_id = %args.database_id, "Running pipeline once...");
        processor.run_once().await?;
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some("production".into()),
            ..Default::default()
        },
    ));

    let cli = Cli::parse();
    init_tracing_subscriber()?;

    match &cli.command {
        Command::Run(args) => run_pipeline(&cli, args, false).await?,
        Command::Watch(args) => run_pipeline(&cli, args, true).await?,
        Command::Auth => {
            let credential = credential_provider(&cli).await?.acquire().await?;
            tracing::info!(
                path = ?cli.token_path,
                expiry = ?credential.expiry,
                "Document store authorization successful, credential saved"
            );
        }
    }

    Ok(())
}
