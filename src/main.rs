use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use mail_rag::commands::{
    answer, clear_knowledge_base, index_directory, ingest_file, search, show_health,
    show_intention, show_stats,
};
use mail_rag::config::{Config, run_interactive_config, show_config};
use mail_rag::rag::{EmailRequest, RagPipeline};

#[derive(Parser)]
#[command(name = "mail-rag")]
#[command(about = "Draft replies to customer emails from a local knowledge base")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the vector store
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Add a .txt or .md document to the knowledge base
    Ingest {
        file: PathBuf,
        /// Title stored with every chunk, defaults to the file name
        #[arg(long)]
        title: Option<String>,
        /// Source stored with every chunk, defaults to the file path
        #[arg(long)]
        source: Option<String>,
    },
    /// Add every .txt and .md document in a directory
    Index { dir: PathBuf },
    /// Show the stored chunks most similar to a query
    Search {
        query: String,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Draft a reply to an email
    Answer(AnswerArgs),
    /// Classify an email's intention
    Intention {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
    },
    /// Show knowledge base statistics
    Stats,
    /// Check the vector store and Ollama
    Health,
    /// Delete every chunk from the knowledge base
    Clear {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Args)]
struct AnswerArgs {
    #[arg(long)]
    from: String,
    #[arg(long)]
    subject: String,
    #[arg(long, required_unless_present = "body_file", conflicts_with = "body_file")]
    body: Option<String>,
    /// Read the email body from a file
    #[arg(long)]
    body_file: Option<PathBuf>,
    /// Print the full response as JSON
    #[arg(long)]
    json: bool,
}

impl AnswerArgs {
    async fn into_request(self) -> anyhow::Result<EmailRequest> {
        let body = match (self.body, self.body_file) {
            (Some(body), _) => body,
            (None, Some(path)) => tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?,
            (None, None) => anyhow::bail!("An email body is required"),
        };

        Ok(EmailRequest {
            from: self.from,
            subject: self.subject,
            body,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => Config::config_dir()?,
    };

    if let Commands::Config { show } = cli.command {
        if show {
            show_config(&Config::load(&config_dir)?);
        } else {
            run_interactive_config(&config_dir)?;
        }
        return Ok(());
    }

    let config = Config::load(&config_dir)?;
    let pipeline = RagPipeline::from_config(&config).await?;

    match cli.command {
        Commands::Config { .. } => {}
        Commands::Ingest {
            file,
            title,
            source,
        } => {
            ingest_file(&pipeline, &file, title, source).await?;
        }
        Commands::Index { dir } => {
            index_directory(&pipeline, &dir).await?;
        }
        Commands::Search { query, top_k } => {
            search(&pipeline, &query, top_k).await?;
        }
        Commands::Answer(args) => {
            let json = args.json;
            let request = args.into_request().await?;
            answer(&pipeline, &request, json).await?;
        }
        Commands::Intention { subject, body } => {
            show_intention(&pipeline, &subject, &body).await?;
        }
        Commands::Stats => {
            show_stats(&pipeline).await?;
        }
        Commands::Health => {
            if !show_health(&pipeline).await {
                std::process::exit(1);
            }
        }
        Commands::Clear { yes } => {
            clear_knowledge_base(&pipeline, yes).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn stats_command() {
        let cli = Cli::try_parse_from(["mail-rag", "stats"]).expect("should parse");
        assert!(matches!(cli.command, Commands::Stats));
        assert_eq!(cli.config_dir, None);
    }

    #[test]
    fn global_config_dir() {
        let cli = Cli::try_parse_from(["mail-rag", "health", "--config-dir", "/tmp/rag"])
            .expect("should parse");
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/rag")));
    }

    #[test]
    fn ingest_command_with_metadata() {
        let cli = Cli::try_parse_from([
            "mail-rag",
            "ingest",
            "returns.md",
            "--title",
            "Returns",
            "--source",
            "wiki",
        ])
        .expect("should parse");

        if let Commands::Ingest {
            file,
            title,
            source,
        } = cli.command
        {
            assert_eq!(file, PathBuf::from("returns.md"));
            assert_eq!(title.as_deref(), Some("Returns"));
            assert_eq!(source.as_deref(), Some("wiki"));
        } else {
            panic!("expected ingest command");
        }
    }

    #[test]
    fn search_defaults_top_k() {
        let cli =
            Cli::try_parse_from(["mail-rag", "search", "refund delay"]).expect("should parse");

        if let Commands::Search { query, top_k } = cli.command {
            assert_eq!(query, "refund delay");
            assert_eq!(top_k, 5);
        } else {
            panic!("expected search command");
        }
    }

    #[test]
    fn answer_requires_a_body() {
        let err = Cli::try_parse_from(["mail-rag", "answer", "--from", "a@b.c", "--subject", "Hi"])
            .err()
            .expect("should fail without a body");
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn answer_body_and_body_file_conflict() {
        let cli = Cli::try_parse_from([
            "mail-rag",
            "answer",
            "--from",
            "a@b.c",
            "--subject",
            "Hi",
            "--body",
            "text",
            "--body-file",
            "mail.txt",
        ]);
        assert!(cli.is_err());
    }

    #[tokio::test]
    async fn answer_reads_body_from_file() {
        let temp_dir = tempfile::TempDir::new().expect("should create temp dir");
        let path = temp_dir.path().join("mail.txt");
        std::fs::write(&path, "Where is my parcel?").expect("should write file");

        let cli = Cli::try_parse_from([
            "mail-rag",
            "answer",
            "--from",
            "client@example.com",
            "--subject",
            "Delivery",
            "--body-file",
            path.to_str().expect("utf-8 path"),
            "--json",
        ])
        .expect("should parse");

        let Commands::Answer(args) = cli.command else {
            panic!("expected answer command");
        };
        assert!(args.json);

        let request = args.into_request().await.expect("should build request");
        assert_eq!(request.body, "Where is my parcel?");
        assert_eq!(request.subject, "Delivery");
    }

    #[test]
    fn clear_short_yes_flag() {
        let cli = Cli::try_parse_from(["mail-rag", "clear", "-y"]).expect("should parse");
        assert!(matches!(cli.command, Commands::Clear { yes: true }));
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["mail-rag", "config", "--show"]).expect("should parse");
        assert!(matches!(cli.command, Commands::Config { show: true }));
    }

    #[test]
    fn invalid_command() {
        let err = Cli::try_parse_from(["mail-rag", "invalid"])
            .err()
            .expect("should reject unknown command");
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn help_message() {
        let err = Cli::try_parse_from(["mail-rag", "--help"])
            .err()
            .expect("should print help");
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }
}
