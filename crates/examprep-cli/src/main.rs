//! examprep CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "examprep",
    version,
    about = "Exam-prep answer scoring and progress analytics"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score an answer without recording it
    Score {
        /// Question bank TOML file
        #[arg(long)]
        bank: PathBuf,

        /// Question id within the bank
        #[arg(long)]
        question: String,

        /// Answer as typed (e.g. "2", "1,3", "9.81")
        #[arg(long, allow_hyphen_values = true)]
        answer: String,
    },

    /// Score an answer and record the attempt
    Submit {
        /// Question bank TOML file
        #[arg(long)]
        bank: PathBuf,

        /// Question id within the bank
        #[arg(long)]
        question: String,

        /// Answer as typed (e.g. "2", "1,3", "9.81")
        #[arg(long, allow_hyphen_values = true)]
        answer: String,

        /// Seconds spent on the question
        #[arg(long)]
        time_spent: Option<u64>,

        /// User id (defaults to the configured user)
        #[arg(long)]
        user: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show progress analytics for a user
    Progress {
        /// User id (defaults to the configured user)
        #[arg(long)]
        user: Option<String>,

        /// Only this exam type
        #[arg(long)]
        exam: Option<String>,

        /// Only this subject
        #[arg(long)]
        subject: Option<String>,

        /// Only this chapter
        #[arg(long)]
        chapter: Option<String>,

        /// Which attempts count: all, first, latest
        #[arg(long)]
        policy: Option<String>,

        /// Output format: text, json, html, markdown, all
        #[arg(long, default_value = "text")]
        format: String,

        /// Output directory for json/html files
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Compare two progress reports
    Compare {
        /// Baseline report JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current report JSON
        #[arg(long)]
        current: PathBuf,

        /// Regression threshold as a fraction of accuracy
        #[arg(long, default_value = "0.05")]
        threshold: f64,

        /// Exit code 1 if regressions found
        #[arg(long)]
        fail_on_regression: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Validate question bank TOML files
    Validate {
        /// Path to question bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Create starter config and example question bank
    Init,
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "examprep=info".parse::<tracing_subscriber::filter::Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Score {
            bank,
            question,
            answer,
        } => commands::score::execute(bank, question, answer),
        Commands::Submit {
            bank,
            question,
            answer,
            time_spent,
            user,
            config,
        } => {
            commands::submit::execute(bank, question, answer, time_spent, user, config).await
        }
        Commands::Progress {
            user,
            exam,
            subject,
            chapter,
            policy,
            format,
            output,
            config,
        } => {
            let filter = examprep_core::model::RecordFilter {
                exam_type: exam,
                subject,
                chapter,
            };
            commands::progress::execute(user, filter, policy, format, output, config).await
        }
        Commands::Compare {
            baseline,
            current,
            threshold,
            fail_on_regression,
            format,
        } => commands::compare::execute(baseline, current, threshold, fail_on_regression, format),
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
