//! Topic Graph CLI
//!
//! Runs one path or connectivity query against a topics JSON file and prints
//! the result as JSON on stdout.
//!
//! ## Usage
//!
//! ```bash
//! topic_graph topics.json path <A> <B> [max_depth]
//! topic_graph topics.json distance <A> <B>
//! topic_graph topics.json within <ID> <N>
//! topic_graph topics.json connectivity
//! topic_graph topics.json ancestors <ID>
//! topic_graph topics.json descendants <ID>
//! ```
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Log level filter (default: warn)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! Logs go to stderr so stdout stays machine-readable.

use std::process::ExitCode;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use topic_graph_kernel::{
    EngineConfig, EngineError, JsonFileTopicStore, TopicGraphEngine, TopicId,
};

const USAGE: &str = "usage: topic_graph <topics.json> \
    <path A B [max_depth] | distance A B | within ID N | connectivity | ancestors ID | descendants ID>";

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// A parsed command line.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Path { start: TopicId, end: TopicId, max_depth: Option<usize> },
    Distance { a: TopicId, b: TopicId },
    Within { center: TopicId, max_distance: usize },
    Connectivity,
    Ancestors { id: TopicId },
    Descendants { id: TopicId },
}

fn parse_id(arg: Option<&String>, name: &str) -> Result<TopicId, EngineError> {
    let raw = arg.ok_or_else(|| EngineError::InvalidArgument(format!("{name} is required")))?;
    TopicId::from_str(raw)
        .map_err(|e| EngineError::InvalidArgument(format!("{name} '{raw}' is not a topic id: {e}")))
}

fn parse_count(arg: Option<&String>, name: &str) -> Result<usize, EngineError> {
    let raw = arg.ok_or_else(|| EngineError::InvalidArgument(format!("{name} is required")))?;
    raw.parse()
        .map_err(|_| EngineError::InvalidArgument(format!("{name} '{raw}' is not a non-negative integer")))
}

fn parse_command(args: &[String]) -> Result<Command, EngineError> {
    let (name, rest) = args
        .split_first()
        .ok_or_else(|| EngineError::InvalidArgument("command is required".to_string()))?;

    let command = match name.as_str() {
        "path" => Command::Path {
            start: parse_id(rest.first(), "start")?,
            end: parse_id(rest.get(1), "end")?,
            max_depth: match rest.get(2) {
                Some(_) => Some(parse_count(rest.get(2), "max_depth")?),
                None => None,
            },
        },
        "distance" => Command::Distance {
            a: parse_id(rest.first(), "a")?,
            b: parse_id(rest.get(1), "b")?,
        },
        "within" => Command::Within {
            center: parse_id(rest.first(), "center")?,
            max_distance: parse_count(rest.get(1), "max_distance")?,
        },
        "connectivity" => Command::Connectivity,
        "ancestors" => Command::Ancestors { id: parse_id(rest.first(), "id")? },
        "descendants" => Command::Descendants { id: parse_id(rest.first(), "id")? },
        other => {
            return Err(EngineError::InvalidArgument(format!("unknown command '{other}'")));
        }
    };
    Ok(command)
}

async fn run(
    engine: &TopicGraphEngine<JsonFileTopicStore>,
    command: Command,
) -> Result<Value, EngineError> {
    let output = match command {
        Command::Path { start, end, max_depth } => {
            let path = engine.shortest_path_within(start, end, max_depth).await?;
            json!({ "start": start, "end": end, "maxDepth": max_depth, "path": path })
        }
        Command::Distance { a, b } => {
            let distance = engine.distance_or_negative(a, b).await?;
            json!({ "a": a, "b": b, "distance": distance, "connected": distance >= 0 })
        }
        Command::Within { center, max_distance } => {
            let topics = engine.topics_by_distance(center, max_distance).await?;
            json!({ "center": center, "maxDistance": max_distance, "topics": topics })
        }
        Command::Connectivity => serde_json::to_value(engine.analyze_connectivity().await?)
            .map_err(|e| EngineError::InvalidArgument(e.to_string()))?,
        Command::Ancestors { id } => json!({ "id": id, "ancestors": engine.ancestors(id).await? }),
        Command::Descendants { id } => {
            json!({ "id": id, "descendants": engine.descendants(id).await? })
        }
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((file, rest)) = args.split_first() else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    let command = match parse_command(rest) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    let store = match JsonFileTopicStore::load(file) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(error = %e, "Failed to load topics");
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    info!(file = %file, topics = store.num_topics(), "Topics loaded");

    let engine = TopicGraphEngine::with_config(store, EngineConfig::from_env());

    match run(&engine, command).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            match e {
                EngineError::InvalidArgument(_) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    const A: &str = "00000000-0000-0000-0000-000000000001";
    const B: &str = "00000000-0000-0000-0000-000000000002";

    #[test]
    fn test_parse_path_with_depth() {
        let command = parse_command(&args(&["path", A, B, "3"])).unwrap();
        assert_eq!(
            command,
            Command::Path {
                start: TopicId::new(Uuid::from_u128(1)),
                end: TopicId::new(Uuid::from_u128(2)),
                max_depth: Some(3),
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            parse_command(&args(&["path", A, "not-a-uuid"])),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_command(&args(&["within", A, "-1"])),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_command(&args(&["teleport"])),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(parse_command(&[]).is_err());
    }

    #[test]
    fn test_parse_connectivity() {
        assert_eq!(parse_command(&args(&["connectivity"])).unwrap(), Command::Connectivity);
    }
}
