use std::path::PathBuf;
use std::process;

use log::{error, info};

use matflow_rust::mat_adapters::DocKind;
use matflow_rust::mat_classify::canonical_source;
use matflow_rust::mat_domain::Software;
use matflow_rust::mat_persistence::{file_orchestrator, read_records_file, JsonRecordStore, StoreConfig};
use matflow_rust::{AppConfig, AppError, MaterialsPipeline};

const USAGE: &str = "Uso:
  mat-cli classify --records <file.json>
  mat-cli build [--records <file.json>] [--store <dir>] [--doc materials|thermo|magnetism|all] [--chunk <N>] [--force]
  mat-cli gen-rules --software vasp|qchem
  mat-cli canonical <label> [--software vasp|qchem]";

const EXIT_USAGE: i32 = 2;
const EXIT_REJECTED: i32 = 4;
const EXIT_RUNTIME: i32 = 5;

#[derive(Debug, Default)]
struct Args {
    records: Option<PathBuf>,
    store: Option<PathBuf>,
    docs: Option<String>,
    chunk: Option<String>,
    force: bool,
    software: Option<String>,
    positional: Vec<String>,
}

fn usage_error(msg: &str) -> ! {
    eprintln!("[mat-cli] {msg}");
    eprintln!("{USAGE}");
    process::exit(EXIT_USAGE);
}

fn parse_args(raw: &[String]) -> Args {
    let mut args = Args::default();
    let mut i = 0;
    while i < raw.len() {
        let flag = raw[i].as_str();
        let mut value = || {
            i += 1;
            raw.get(i).cloned().unwrap_or_else(|| usage_error(&format!("falta valor para {flag}")))
        };
        match flag {
            "--records" => args.records = Some(PathBuf::from(value())),
            "--store" => args.store = Some(PathBuf::from(value())),
            "--doc" => args.docs = Some(value()),
            "--chunk" => args.chunk = Some(value()),
            "--software" => args.software = Some(value()),
            "--force" => args.force = true,
            other if other.starts_with("--") => usage_error(&format!("opción desconocida: {other}")),
            other => args.positional.push(other.to_string()),
        }
        i += 1;
    }
    args
}

fn parse_software(raw: Option<&str>) -> Result<Software, AppError> {
    Ok(raw.unwrap_or("vasp").parse::<Software>()?)
}

fn parse_docs(raw: Option<&str>) -> Result<Vec<DocKind>, AppError> {
    match raw.map(str::trim) {
        None | Some("all") => Ok(DocKind::ALL.to_vec()),
        Some(list) => list.split(',')
                          .map(|d| d.parse::<DocKind>().map_err(AppError::from))
                          .collect(),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value)?;
    println!("{text}");
    Ok(())
}

fn classify(args: &Args) -> Result<(), AppError> {
    let path = args.records.as_ref().unwrap_or_else(|| usage_error("classify requiere --records"));
    let config = AppConfig::from_env()?;
    let pipeline = MaterialsPipeline::from_config(&config)?;
    let records = read_records_file(path)?;
    print_json(&pipeline.classify(&records))
}

fn build(args: &Args) -> Result<(), AppError> {
    let mut config = AppConfig::from_env()?;
    if let Some(dir) = &args.store {
        config.store = StoreConfig::new(dir);
    }
    if let Some(raw) = &args.chunk {
        match raw.parse::<usize>() {
            Ok(n) if n > 0 => config.build.chunk_size = Some(n),
            _ => usage_error(&format!("--chunk inválido: {raw}")),
        }
    }
    if args.force {
        config.build.force_full_rebuild = true;
    }
    let kinds = parse_docs(args.docs.as_deref())?;
    let pipeline = MaterialsPipeline::from_config(&config)?;

    let records = JsonRecordStore::open(&config.store.dir);
    if let Some(path) = &args.records {
        let batch = read_records_file(path)?;
        records.ingest(batch)?;
    }
    let mut orch = file_orchestrator(&config.store)?.config(config.build.clone()).build();
    let run = pipeline.build(&mut orch, &records, &kinds)?;
    if run.failed() > 0 {
        // los grupos fallidos se reintentan en el próximo pase
        info!("{} groups failed; they stay dirty for the next build", run.failed());
    }
    print_json(&run)
}

fn gen_rules(args: &Args) -> Result<(), AppError> {
    if args.software.is_none() {
        usage_error("gen-rules requiere --software");
    }
    let software = parse_software(args.software.as_deref())?;
    print!("{}", canonical_source(software).to_yaml()?);
    Ok(())
}

fn canonical(args: &Args) -> Result<(), AppError> {
    let label = args.positional
                    .first()
                    .unwrap_or_else(|| usage_error("canonical requiere una etiqueta"));
    let software = parse_software(args.software.as_deref())?;
    let config = AppConfig::from_env()?;
    let pipeline = MaterialsPipeline::from_config(&config)?;
    let canonical = pipeline.classifier()
                            .table(software)
                            .and_then(|t| t.canonical_run_type(label));
    match canonical {
        Some(rt) => {
            println!("{rt}");
            Ok(())
        }
        None => {
            eprintln!("[mat-cli canonical] etiqueta desconocida para {software}: {label}");
            process::exit(EXIT_REJECTED);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).target(env_logger::Target::Stderr)
                                                                                       .init();
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = raw.split_first() else {
        usage_error("falta el subcomando");
    };
    let args = parse_args(rest);
    let result = match command.as_str() {
        "classify" => classify(&args),
        "build" => build(&args),
        "gen-rules" => gen_rules(&args),
        "canonical" => canonical(&args),
        "-h" | "--help" | "help" => {
            println!("{USAGE}");
            Ok(())
        }
        other => usage_error(&format!("subcomando desconocido: {other}")),
    };
    if let Err(e) = result {
        error!("[mat-cli {command}] {e}");
        let code = if e.is_rejected_input() { EXIT_REJECTED } else { EXIT_RUNTIME };
        process::exit(code);
    }
}
