use anyhow::Result;
use padron::{
    parse::{self, ParseOptions},
    schema, Config,
};
use serde::Serialize;
use std::{collections::BTreeMap, env, path::PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Serialize)]
struct Report<'a> {
    file: String,
    rows: usize,
    columns: &'a [String],
    mapping: BTreeMap<&'static str, &'a str>,
    unmapped: Vec<&'static str>,
}

fn print_usage_and_exit(program: &str) -> ! {
    eprintln!("Usage: {} <csv-file>", program);
    std::process::exit(1);
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args();
    let prog = args.next().unwrap_or_else(|| "inspect_columns".into());
    let path = match args.next() {
        Some(p) => PathBuf::from(p),
        None => print_usage_and_exit(&prog),
    };

    // row caps follow the same config the service uses
    let config = Config::load()?;
    let table = parse::parse(&path, &ParseOptions::from(&config))?;
    let mapping = schema::resolve(&table.columns);

    let report = Report {
        file: path.display().to_string(),
        rows: table.len(),
        columns: &table.columns,
        mapping: mapping
            .iter()
            .map(|(field, col)| (field.as_str(), col.name.as_str()))
            .collect(),
        unmapped: schema::LogicalField::ALL
            .into_iter()
            .filter(|f| !mapping.contains(*f))
            .map(|f| f.as_str())
            .collect(),
    };
    print!("{}", serde_yaml::to_string(&report)?);
    Ok(())
}
