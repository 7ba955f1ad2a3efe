//! Chatbot evaluation CLI
//!
//! Replays the evaluation question set through the municipal chatbot and
//! grades the answers with an LLM judge.
//!
//! Exit codes: 0 on success, 1 on configuration or input errors, 2 when a
//! run finished but its failure rate exceeded `eval.failure_threshold`.

use anyhow::{Context, Result, anyhow};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;
use tyn_chatbot_eval::{
    config::Config,
    error::EvalError,
    eval::{
        ChatAgent, GradeRecord, JudgePrompt, LlmJudge, QuestionIndex, ResponseGrader,
        ResponseRecord, ResponseRunner, SummaryStats, exit_code_for, load_questions, load_records,
        results::{
            grades_filename_for, latest_results_file, resolve_responses_path, responses_filename,
            run_timestamp,
        },
    },
    llm::LlmClient,
    logging::{self, LogOptions},
};

const EXIT_CONFIG_ERROR: u8 = 1;

/// Evaluate the Horšovský Týn municipal chatbot
#[derive(Parser)]
#[command(name = "chatbot-eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Do not write logs/chatbot-eval.log
    #[arg(long, global = true)]
    no_log_file: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the agent every evaluation question and save its responses
    RunEval {
        /// JSON file with evaluation questions
        #[arg(short, long)]
        questions: Option<PathBuf>,

        /// Output file for responses
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Grade saved responses with an LLM judge against ground truth
    GradeEval {
        /// JSON file with agent responses
        responses_file: PathBuf,

        /// JSON file with questions and ground truth
        #[arg(short, long)]
        questions: Option<PathBuf>,

        /// Output file for grades
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print summary statistics of a grades file
    Summary {
        /// Grades file (defaults to the newest one in the results directory)
        grades_file: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Test LLM connection
    Test,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_options = LogOptions {
        verbose: cli.verbose,
        log_file: if cli.no_log_file {
            None
        } else {
            LogOptions::default().log_file
        },
    };
    let _log_guard = logging::init(&log_options);

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::RunEval { questions, output } => cmd_run_eval(config_path, questions, output).await,
        Commands::GradeEval {
            responses_file,
            questions,
            output,
        } => cmd_grade_eval(config_path, responses_file, questions, output).await,
        Commands::Summary { grades_file, json } => cmd_summary(config_path, grades_file, json),
        Commands::Test => cmd_test(config_path).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            let setup_failure = e
                .downcast_ref::<EvalError>()
                .is_none_or(EvalError::is_config_error);
            if !setup_failure {
                eprintln!("The LLM service failed; run `chatbot-eval test` to check the connection.");
            }
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = Config::load(path).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn exit_for(failure_rate: f64, threshold: f64) -> ExitCode {
    let code = exit_code_for(failure_rate, threshold);
    if code != 0 {
        eprintln!(
            "Failure rate {:.1}% exceeds threshold {:.1}%",
            failure_rate * 100.0,
            threshold * 100.0
        );
    }
    ExitCode::from(code)
}

async fn cmd_run_eval(
    config_path: Option<&Path>,
    questions: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;

    let questions_path = questions.unwrap_or_else(|| config.eval.questions_file.clone());
    let output = output.unwrap_or_else(|| {
        config
            .eval
            .responses_dir()
            .join(responses_filename(&run_timestamp(Local::now())))
    });

    println!("Loading evaluation questions from {}", questions_path.display());
    let questions = load_questions(&questions_path).context("Failed to load questions")?;

    println!(
        "Initializing agent with CSV files: {:?}",
        config.agent.csv_files
    );
    let agent = ChatAgent::from_config(&config).context("Failed to create chat agent")?;
    let runner = ResponseRunner::new(Arc::new(agent));

    let report = runner
        .run_and_save(&questions, &output)
        .await
        .context("Failed to save responses")?;

    report.summary.print_summary();
    println!("Results saved to: {}", output.display());

    Ok(exit_for(
        report.summary.failure_rate(),
        config.eval.failure_threshold,
    ))
}

async fn cmd_grade_eval(
    config_path: Option<&Path>,
    responses_file: PathBuf,
    questions: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;

    let responses_path = resolve_responses_path(&responses_file, &config.eval.results_dir)?;
    let questions_path = questions.unwrap_or_else(|| config.eval.questions_file.clone());
    let output = output.unwrap_or_else(|| {
        config
            .eval
            .grades_dir()
            .join(grades_filename_for(&responses_path))
    });

    println!(
        "Loading questions with ground truth from {}",
        questions_path.display()
    );
    let index = QuestionIndex::load(&questions_path).context("Failed to load questions")?;
    println!("Loaded {} questions with ground truth", index.len());

    println!("Loading responses from {}", responses_path.display());
    let responses: Vec<ResponseRecord> =
        load_records(&responses_path).context("Failed to load responses")?;

    let grader = ResponseGrader::new(
        Arc::new(LlmJudge::from_config(&config)),
        JudgePrompt::from_config(&config)?,
    );
    println!("Using judge model: {}", config.judge_model());

    let records = grader
        .grade_and_save(&responses, &index, &output)
        .await
        .context("Failed to save grades")?;

    let stats = SummaryStats::from_records(&records);
    stats.print_summary();
    println!("\nResults saved to: {}", output.display());

    Ok(exit_for(stats.failure_rate(), config.eval.failure_threshold))
}

fn cmd_summary(config_path: Option<&Path>, grades_file: Option<PathBuf>, json: bool) -> Result<ExitCode> {
    let config = Config::load(config_path).context("Failed to load configuration")?;

    let path = match grades_file {
        Some(path) => path,
        None => {
            let dir = config.eval.grades_dir();
            latest_results_file(&dir)?
                .ok_or_else(|| anyhow!("No grade files found in '{}'", dir.display()))?
        }
    };

    let records: Vec<GradeRecord> = load_records(&path).context("Failed to load grades")?;
    let stats = SummaryStats::from_records(&records);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Grades file: {}", path.display());
        stats.print_summary();
    }

    Ok(ExitCode::SUCCESS)
}

async fn cmd_test(config_path: Option<&Path>) -> Result<ExitCode> {
    println!("Testing LLM connection...\n");

    let config = Config::load(config_path).context("Failed to load configuration")?;

    println!("Configuration:");
    println!("  API Base:     {}", config.llm.api_base);
    println!("  Agent model:  {}", config.llm.model);
    println!("  Judge model:  {}", config.judge_model());
    println!(
        "  API Key:      {}...",
        config.llm.api_key.chars().take(8).collect::<String>()
    );
    println!();

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Ok(ExitCode::from(EXIT_CONFIG_ERROR));
    }

    let client = LlmClient::new(config.llm);

    println!("Sending test request...");
    match client.test_connection().await {
        Ok(()) => {
            println!("Connection successful!");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("Connection failed: {}", e);
            Ok(ExitCode::from(EXIT_CONFIG_ERROR))
        }
    }
}
