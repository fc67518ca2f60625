use api_shared::{PlanDocument, SessionRes};
use careplan_core::{
    Answer, AnswerShape, Collaborators, CoreConfig, FileSessionStore, SessionId,
    SessionOrchestrator, SessionStore, SubmitOutcome,
};
use clap::{Parser, Subcommand};
use std::error::Error;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "careplan")]
#[command(about = "Care plan session CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive session for a care goal, answering questions on stdin
    Run {
        /// Free-text care goal, e.g. "manage newly diagnosed breast cancer"
        #[arg(long)]
        goal: String,
    },
    /// Print a stored session as JSON
    Show {
        /// Session id (32 lowercase hex characters)
        session_id: String,
    },
}

fn config_from_env() -> Result<CoreConfig, Box<dyn Error>> {
    Ok(CoreConfig::from_lookup(|key| std::env::var(key).ok())?)
}

/// Ask one question at a time until the session completes or fails.
///
/// Each answer is submitted as soon as it is read, so the next prompt always reflects the
/// orchestrator's current view of what is missing.
async fn run_dialogue<R, W>(
    orchestrator: &SessionOrchestrator,
    goal: &str,
    input: R,
    out: &mut W,
) -> Result<SubmitOutcome, Box<dyn Error>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let start = orchestrator.start_session(goal).await?;
    writeln!(out, "Session {}", start.session_id)?;

    let mut lines = input.lines();
    let mut questions = start.questions;
    loop {
        let Some(question) = questions.first() else {
            return Err("session asked no questions".into());
        };
        writeln!(out, "{}", question.prompt)?;
        match &question.shape {
            AnswerShape::SingleChoice { options } => {
                writeln!(out, "  options: {}", options.join(" / "))?
            }
            AnswerShape::NumericRange { min, max: Some(max) } => {
                writeln!(out, "  range: {min} to {max}")?
            }
            AnswerShape::NumericRange { min, max: None } => writeln!(out, "  minimum: {min}")?,
            AnswerShape::FreeText => {}
        }
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            return Err("input closed before the session finished".into());
        };
        let outcome = orchestrator
            .submit_answer(&start.session_id, Answer::new(question.field, line))
            .await?;
        match outcome {
            SubmitOutcome::NeedsMoreData { questions: next } => questions = next,
            done => return Ok(done),
        }
    }
}

fn print_outcome(outcome: &SubmitOutcome) -> Result<(), Box<dyn Error>> {
    match outcome {
        SubmitOutcome::Completed { plan } => {
            println!("{}", serde_json::to_string_pretty(&PlanDocument::from(plan))?);
        }
        SubmitOutcome::Failed { failure } => {
            eprintln!("Session failed: {}", failure.cause);
            eprintln!("{}", failure.disclaimer);
        }
        SubmitOutcome::NeedsMoreData { .. } => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { goal }) => {
            let cfg = config_from_env()?;
            let orchestrator = SessionOrchestrator::new(&cfg, Collaborators::from_config(&cfg)?);
            let stdin = BufReader::new(tokio::io::stdin());
            let outcome = run_dialogue(&orchestrator, &goal, stdin, &mut std::io::stdout()).await?;
            print_outcome(&outcome)?;
        }
        Some(Commands::Show { session_id }) => {
            let cfg = config_from_env()?;
            let id = SessionId::parse(&session_id)?;
            let store = FileSessionStore::new(cfg.sessions_dir());
            match store.read(&id).await? {
                Some(session) => println!(
                    "{}",
                    serde_json::to_string_pretty(&SessionRes::from(&session))?
                ),
                None => eprintln!("Session not found: {}", id),
            }
        }
        None => {
            println!("Use 'careplan --help' for commands");
        }
    }

    Ok(())
}
