use anyhow::{Context, Result};
use game_sales_nlq::{AnswerEngine, AssistantConfig};
use std::io::BufRead;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: game-sales-nlq [--csv PATH] [--oracle] [QUESTION...]";

struct Args {
    csv: Option<PathBuf>,
    oracle: bool,
    question: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        csv: None,
        oracle: false,
        question: None,
    };
    let mut words = Vec::new();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--csv" => args.csv = Some(PathBuf::from(iter.next().context(USAGE)?)),
            "--oracle" => args.oracle = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            _ => words.push(arg),
        }
    }
    if !words.is_empty() {
        args.question = Some(words.join(" "));
    }
    Ok(args)
}

async fn answer(engine: &AnswerEngine, question: &str) -> Result<()> {
    let response = engine.ask(question).await;
    let json = serde_json::to_string_pretty(&response).context("Failed to encode response")?;
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;
    let mut config = AssistantConfig::from_env();
    if let Some(csv) = args.csv {
        config.dataset.csv_path = csv;
    }
    if args.oracle {
        config.oracle.enabled = true;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let engine = AnswerEngine::from_config(config).context("Failed to start the answer engine")?;
    if engine.has_oracle() {
        engine.check_oracle().await;
    }

    if let Some(question) = args.question {
        return answer(&engine, &question).await;
    }

    // Interactive mode: one question per line
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        answer(&engine, question).await?;
    }
    Ok(())
}
