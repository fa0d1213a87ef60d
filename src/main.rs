use anyhow::{bail, Result};
use padron::{Config, LogicalField, QueryError, Service};
use serde::Serialize;
use serde_json::json;
use std::{env, process::ExitCode};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

const USAGE: &str =
    "usage: padron <dni ID | planilla ID | nombres QUERY... | stats [FIELD...] | health>";

enum Command {
    Document(String),
    Payroll(String),
    Names(String),
    Stats(Vec<LogicalField>),
    Health,
}

impl Command {
    fn parse(args: &[String]) -> Result<Self> {
        let (verb, rest) = match args.split_first() {
            Some((verb, rest)) => (verb.as_str(), rest),
            None => bail!(USAGE),
        };
        let arg = rest.join(" ");
        let cmd = match verb {
            "dni" | "documento" if !arg.is_empty() => Command::Document(arg),
            "planilla" if !arg.is_empty() => Command::Payroll(arg),
            "nombres" if !arg.is_empty() => Command::Names(arg),
            "stats" => Command::Stats(parse_fields(rest)?),
            "health" => Command::Health,
            _ => bail!(USAGE),
        };
        Ok(cmd)
    }
}

fn parse_fields(names: &[String]) -> Result<Vec<LogicalField>> {
    names
        .iter()
        .map(|name| match LogicalField::from_str(name) {
            Some(field) => Ok(field),
            None => {
                let known: Vec<&str> = LogicalField::ALL.iter().map(|f| f.as_str()).collect();
                bail!("unknown field {:?}; expected one of {}", name, known.join(", "))
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // ─── 1) init logging ─────────────────────────────────────────────
    // stdout carries the JSON answer, so logs go to stderr
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,padron=info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) parse command + config ───────────────────────────────────
    let args: Vec<String> = env::args().skip(1).collect();
    let command = Command::parse(&args)?;
    let config = Config::load()?;
    info!(source = %config.source_url, data = %config.data_path.display(), "startup");

    // ─── 3) load, on the blocking pool ──────────────────────────────
    let service = Service::new(config);
    let outcome = service.startup_load().await;
    info!(loaded = outcome.loaded, records = outcome.record_count, "load finished");

    // ─── 4) answer the query ─────────────────────────────────────────
    let answer = match &command {
        Command::Document(id) => service.lookup_by_document(id).map(|r| json!(r)),
        Command::Payroll(id) => service.lookup_by_payroll(id).map(|r| json!(r)),
        Command::Names(q) => service.search_by_name(q).map(|r| json!(r)),
        Command::Stats(fields) if fields.is_empty() => service.stats().map(|s| json!(s)),
        Command::Stats(fields) => service.stats_for(fields).map(|s| json!(s)),
        Command::Health => Ok(json!(service.health())),
    };

    match answer {
        Ok(value) => {
            print_json(&value)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(kind = e.kind(), "{}", e);
            print_json(&json!({ "error": e.kind(), "detail": e.to_string() }))?;
            Ok(exit_code(&e))
        }
    }
}

fn exit_code(e: &QueryError) -> ExitCode {
    match e {
        QueryError::NotFound { .. } => ExitCode::from(2),
        QueryError::NotReady => ExitCode::from(3),
        QueryError::FieldUnsupported { .. } => ExitCode::from(4),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn stats_takes_field_names() {
        match Command::parse(&args(&["stats", "sex", "Department"])).unwrap() {
            Command::Stats(fields) => {
                assert_eq!(fields, vec![LogicalField::Sex, LogicalField::Department])
            }
            _ => panic!("expected stats"),
        }
        assert!(matches!(
            Command::parse(&args(&["stats"])).unwrap(),
            Command::Stats(fields) if fields.is_empty()
        ));

        let err = Command::parse(&args(&["stats", "age"])).err().unwrap();
        assert!(err.to_string().contains("given_names"));
    }

    #[test]
    fn lookups_need_an_argument() {
        assert!(Command::parse(&args(&["dni"])).is_err());
        assert!(Command::parse(&args(&[])).is_err());
        assert!(matches!(
            Command::parse(&args(&["nombres", "lopez", "ana"])).unwrap(),
            Command::Names(q) if q == "lopez ana"
        ));
        assert!(matches!(Command::parse(&args(&["health"])).unwrap(), Command::Health));
    }
}
