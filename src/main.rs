// flagwise - learns which flags work for you and recommends them
//
// This is the main entry point. Parses CLI args and dispatches to handlers.

use flagwise_lib::{
    context::{Complexity, ProjectContext},
    Advisor, Result,
};
use std::env;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let command = &args[1];

    let result = match command.as_str() {
        "recommend" => handle_recommend(&args[2..]).await,
        "outcome" => handle_outcome(&args[2..]).await,
        "rate" => handle_rate(&args[2..]).await,
        "learn" => handle_learn(&args[2..]).await,
        "report" => handle_report(&args[2..]).await,
        "stats" => handle_stats().await,
        "cleanup" => handle_cleanup().await,
        "export" => handle_export().await,
        "version" | "-v" | "--version" => {
            println!("flagwise v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "-h" | "--help" => {
            print_usage();
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            Ok(())
        }
    };

    if let Err(e) = &result {
        eprintln!("{}", e.user_message());
    }
    result
}

async fn handle_recommend(args: &[String]) -> Result<()> {
    let mut input_parts = Vec::new();
    let mut context = ProjectContext::default();
    let mut project_dir: Option<PathBuf> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--project-type" => {
                i += 1;
                if i < args.len() {
                    context.project_type = Some(args[i].clone());
                }
            }
            "--complexity" => {
                i += 1;
                if i < args.len() {
                    context.complexity = match args[i].as_str() {
                        "simple" => Some(Complexity::Simple),
                        "moderate" => Some(Complexity::Moderate),
                        "complex" => Some(Complexity::Complex),
                        other => {
                            eprintln!("Unknown complexity '{}', ignoring", other);
                            None
                        }
                    };
                }
            }
            "--file-count" => {
                i += 1;
                if i < args.len() {
                    context.file_count = args[i].parse().ok();
                }
            }
            "--language" => {
                i += 1;
                if i < args.len() {
                    context.languages.push(args[i].clone());
                }
            }
            "--framework" => {
                i += 1;
                if i < args.len() {
                    context.frameworks.push(args[i].clone());
                }
            }
            "--project" => {
                i += 1;
                if i < args.len() {
                    project_dir = Some(PathBuf::from(&args[i]));
                }
            }
            arg => input_parts.push(arg.to_string()),
        }
        i += 1;
    }

    if input_parts.is_empty() {
        eprintln!("Error: No command text provided");
        return Ok(());
    }

    let input = input_parts.join(" ");
    let advisor = open_advisor(project_dir).await?;
    let response = advisor.recommend(&input, &context).await;
    let rec = &response.recommendation;

    println!("\nRecommended flags:");
    println!("  {}", rec.flags_line());
    println!("\nConfidence: {}%", rec.confidence);

    if !rec.personas.is_empty() {
        println!("Personas:   {}", rec.personas.join(", "));
    }
    if !rec.mcp_servers.is_empty() {
        println!("Servers:    {}", rec.mcp_servers.join(", "));
    }

    println!("\nReasoning:");
    for line in &rec.reasoning {
        println!("  - {}", line);
    }

    if let Some(id) = response.interaction_id {
        println!("\nInteraction #{}", id);
        println!("Report how it went:");
        println!("  flagwise outcome {} --success --time-ms 1500", id);
        println!("  flagwise rate {} 5", id);
    }

    Ok(())
}

async fn handle_outcome(args: &[String]) -> Result<()> {
    let Some(id) = args.first().and_then(|s| s.parse::<i64>().ok()) else {
        eprintln!("Usage: flagwise outcome <interaction-id> [--success|--failure] [--time-ms N]");
        return Ok(());
    };

    let mut success = true;
    let mut time_ms: i64 = 0;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--success" => success = true,
            "--failure" => success = false,
            "--time-ms" => {
                i += 1;
                if i < args.len() {
                    time_ms = args[i].parse().unwrap_or(0);
                }
            }
            arg => eprintln!("Ignoring unknown argument: {}", arg),
        }
        i += 1;
    }

    let advisor = open_advisor(None).await?;
    advisor.outcome(id, success, time_ms).await;

    println!(
        "Recorded {} for interaction #{}",
        if success { "success" } else { "failure" },
        id
    );
    Ok(())
}

async fn handle_rate(args: &[String]) -> Result<()> {
    let (Some(id), Some(rating)) = (
        args.first().and_then(|s| s.parse::<i64>().ok()),
        args.get(1).and_then(|s| s.parse::<i64>().ok()),
    ) else {
        eprintln!("Usage: flagwise rate <interaction-id> <1-5> [--correct <flags...>]");
        return Ok(());
    };

    if !(1..=5).contains(&rating) {
        eprintln!("Rating must be between 1 and 5");
        return Ok(());
    }

    // flags after --correct are the user's corrected flag set
    let correction: Option<Vec<String>> = args
        .iter()
        .position(|a| a == "--correct")
        .map(|pos| args[pos + 1..].to_vec())
        .filter(|flags| !flags.is_empty());

    let advisor = open_advisor(None).await?;
    advisor.rate(id, rating, correction).await;

    println!("Recorded rating {} for interaction #{}", rating, id);
    Ok(())
}

async fn handle_learn(args: &[String]) -> Result<()> {
    let days = args
        .first()
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(7);

    let advisor = open_advisor(None).await?;
    let processed = advisor.learn(days).await?;

    if processed.is_empty() {
        println!("No unprocessed feedback in the last {} days.", days);
    } else {
        println!(
            "Processed {} feedback record(s) from the last {} days:",
            processed.len(),
            days
        );
        for p in &processed {
            println!(
                "  #{} {} ({}): weight {:.2}, delta {:+.3}",
                p.interaction_id, p.pattern_id, p.kind, p.learning_weight, p.confidence_delta
            );
            if !p.correction.is_empty() {
                println!("      corrected to: {}", p.correction.join(" "));
            }
        }
    }

    Ok(())
}

async fn handle_report(args: &[String]) -> Result<()> {
    let days = args
        .first()
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(30);

    let advisor = open_advisor(None).await?;
    let report = advisor.report(days).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn handle_stats() -> Result<()> {
    let advisor = open_advisor(None).await?;

    println!("\nflagwise Statistics");
    println!("{}", "=".repeat(60));

    match advisor.store().database() {
        Some(db) => {
            let stats = db.stats().await?;
            println!("  Interactions: {}", stats.total_interactions);
            println!("  Feedback:     {}", stats.total_feedback);
            println!("  Patterns:     {}", stats.total_patterns);
            println!("  Preferences:  {}", stats.total_preferences);
        }
        None => println!("  Learning store unavailable, static patterns only."),
    }

    let metrics = advisor.cached().cache().metrics();
    println!("\nCache (this session):");
    println!("  Requests: {}", metrics.requests);
    println!("  Hits:     {}", metrics.hits);

    println!("{}", "=".repeat(60));
    Ok(())
}

async fn handle_cleanup() -> Result<()> {
    let advisor = open_advisor(None).await?;
    let (interactions, feedback) = advisor.cleanup().await?;

    println!(
        "Removed {} interaction(s) and {} feedback record(s) older than 90 days.",
        interactions, feedback
    );
    Ok(())
}

async fn handle_export() -> Result<()> {
    let advisor = open_advisor(None).await?;
    let export = advisor.export().await?;

    println!("{}", serde_json::to_string_pretty(&export)?);
    Ok(())
}

async fn open_advisor(project_dir: Option<PathBuf>) -> Result<Advisor> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let db_path = home.join(".flagwise").join("learning.db");
    let project = match project_dir {
        Some(dir) => dir,
        None => env::current_dir()?,
    };
    Ok(Advisor::open(&db_path, &project).await)
}

fn print_usage() {
    println!(
        r#"flagwise v{} - adaptive flag recommendations that learn from you

USAGE:
    flagwise <COMMAND> [OPTIONS]

COMMANDS:
    recommend <text> [context options]   Recommend flags for a command
    outcome <id> [--success|--failure] [--time-ms N]
                                         Report how a recommendation went
    rate <id> <1-5> [--correct <flags>]  Rate a recommendation
    learn [days]                         Batch-process feedback (default: 7)
    report [days]                        Trend report as JSON (default: 30)
    stats                                Show store statistics
    cleanup                              Purge records older than 90 days
    export                               Export anonymized learning data
    version                              Show version
    help                                 Show this help

CONTEXT OPTIONS (for recommend):
    --project-type <type>    e.g. python_backend
    --complexity <level>     simple | moderate | complex
    --file-count <n>         number of files in the project
    --language <lang>        may be repeated
    --framework <fw>         may be repeated
    --project <dir>          project directory (default: cwd)

EXAMPLES:
    flagwise recommend "analyze find security vulnerabilities" --complexity complex
    flagwise outcome 42 --success --time-ms 1500
    flagwise rate 42 5
    flagwise learn 7
"#,
        env!("CARGO_PKG_VERSION")
    );
}
