use std::io::Write;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use murmur_core::config::Config;
use murmur_core::history::StartIndex;
use murmur_core::store::{ChatStore, JsonlChatStore};
use murmur_core::types::{AgentProfile, TurnRequest};
use murmur_media::FsAudioStore;
use murmur_pipeline::TurnPipeline;
use murmur_providers::{ElevenLabsSynthesizer, OpenAiGenerator, WhisperTranscriber};

#[derive(Parser)]
#[command(
    name = "murmur",
    about = "Talk to a persona-driven agent by text or voice, with paged chat history",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new chat with an agent persona
    NewChat {
        /// Chat name
        #[arg(long)]
        name: String,

        /// Agent display name
        #[arg(long)]
        agent: String,

        /// Agent persona instructions
        #[arg(long)]
        system_prompt: String,
    },

    /// List chats
    Chats,

    /// Send text turns to a chat (one-shot or interactive)
    Chat {
        /// Chat id
        #[arg(long)]
        chat: u64,

        /// Message to send (omit for interactive mode)
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Send a recorded audio turn to a chat
    SendAudio {
        /// Chat id
        #[arg(long)]
        chat: u64,

        /// Path to the recording (any decodable format)
        #[arg(long)]
        file: String,

        /// Where to write the spoken reply (mp3)
        #[arg(long)]
        out: Option<String>,
    },

    /// Show one backward page of chat history
    History {
        /// Chat id
        #[arg(long)]
        chat: u64,

        /// Exclusive upper message id; omit for the most recent page
        #[arg(long)]
        before: Option<u64>,

        /// Page size
        #[arg(short = 'n', long)]
        page_size: Option<usize>,
    },

    /// Show current configuration
    Config,
}

fn build_pipeline(config: &Arc<Config>) -> anyhow::Result<TurnPipeline> {
    let store = Arc::new(JsonlChatStore::new(config.chats_dir()));
    let audio = Arc::new(FsAudioStore::new(config.audio_dir()));

    let transcription = config.transcription.clone().unwrap_or_else(|| {
        murmur_core::config::TranscriptionConfig {
            provider: "openai".into(),
            api_key: None,
            api_key_env: None,
            model: None,
        }
    });
    let synthesis = config.synthesis.clone().unwrap_or_else(|| {
        murmur_core::config::SynthesisConfig {
            api_key: None,
            api_key_env: None,
            voice: None,
            model: None,
        }
    });

    Ok(TurnPipeline::new(
        store,
        audio,
        Arc::new(WhisperTranscriber::from_config(&transcription)?),
        Arc::new(OpenAiGenerator::from_config(config)?),
        Arc::new(ElevenLabsSynthesizer::from_config(&synthesis)?),
        config.clone(),
    ))
}

async fn run_text_turn(pipeline: &TurnPipeline, chat: u64, message: &str) -> anyhow::Result<()> {
    let reply = pipeline
        .run_turn(TurnRequest::text(chat, message))
        .await?;
    println!("{}", reply.message.text);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    // Load config
    let config_path = cli
        .config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(Config::default_path);
    let config = Arc::new(Config::load(&config_path)?);

    match cli.command {
        Commands::NewChat {
            name,
            agent,
            system_prompt,
        } => {
            let store = JsonlChatStore::new(config.chats_dir());
            let chat = store
                .create_chat(
                    &name,
                    AgentProfile {
                        name: agent,
                        system_prompt,
                    },
                )
                .await?;
            println!("Created chat {} ({})", chat.id, chat.name);
        }

        Commands::Chats => {
            let store = JsonlChatStore::new(config.chats_dir());
            let chats = store.list_chats().await?;
            if chats.is_empty() {
                println!("No chats yet");
            }
            for chat in chats {
                println!("{}\t{}\t(agent: {})", chat.id, chat.name, chat.agent.name);
            }
        }

        Commands::Chat { chat, message } => {
            let pipeline = build_pipeline(&config)?;
            match message {
                Some(message) => run_text_turn(&pipeline, chat, &message).await?,
                None => loop {
                    print!("> ");
                    std::io::stdout().flush()?;
                    let mut line = String::new();
                    if std::io::stdin().read_line(&mut line)? == 0 {
                        break;
                    }
                    let line = line.trim();
                    if line.is_empty() || line == "exit" {
                        break;
                    }
                    run_text_turn(&pipeline, chat, line).await?;
                },
            }
        }

        Commands::SendAudio { chat, file, out } => {
            let pipeline = build_pipeline(&config)?;
            let recording = std::fs::read(&file)?;
            let upload = pipeline.ingest_user_audio(chat, &recording).await?;
            tracing::info!(message_id = upload.id, "Upload accepted");

            let reply = pipeline
                .run_turn(TurnRequest::audio(chat, upload.id))
                .await?;
            println!("{}", reply.message.text);

            if let Some(bytes) = reply.audio {
                let out = out.unwrap_or_else(|| format!("reply_{}.mp3", reply.message.id));
                std::fs::write(&out, &bytes)?;
                println!("Spoken reply written to {out}");
            } else {
                tracing::warn!("No spoken reply available for this turn");
            }
        }

        Commands::History {
            chat,
            before,
            page_size,
        } => {
            let store = JsonlChatStore::new(config.chats_dir());
            let start = match before {
                Some(id) => StartIndex::Before(id),
                None => StartIndex::Latest,
            };
            let n = page_size.unwrap_or_else(|| config.page_size());
            let page = store.page(chat, start, n).await?;

            for msg in &page.messages {
                let body = if msg.is_audio { "[audio]" } else { msg.text.as_str() };
                println!("#{}\t{:?}\t{}", msg.id, msg.sender, body);
            }
            match page.next_before {
                Some(cursor) => println!("-- older history: --before {cursor}"),
                None => println!("-- start of history --"),
            }
        }

        Commands::Config => {
            let json = serde_json::to_string_pretty(&*config)?;
            println!("{json}");
        }
    }

    Ok(())
}
