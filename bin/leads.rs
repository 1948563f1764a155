use clap::{Arg, ArgAction, ArgMatches, Command};
use lead_ingest::template::write_template;
use lead_ingest::{
    logging, upload_from_path, DirectoryClient, DirectoryConfig, DuplicateChecker, FieldKey,
    ImportOptions, ImportSession, ImportSummary, NoRemoteCheck, ValidationSummary,
};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::time::Duration;

fn path_arg() -> Arg {
    Arg::new("path")
        .long("path")
        .value_parser(clap::value_parser!(PathBuf))
        .required(true)
}

fn map_arg() -> Arg {
    Arg::new("map")
        .long("map")
        .help("Override a column mapping: COLUMN=field, or COLUMN= to unmap")
        .action(ArgAction::Append)
}

fn endpoint_arg(required: bool) -> Arg {
    Arg::new("endpoint")
        .long("endpoint")
        .env("LEAD_DIRECTORY_URL")
        .required(required)
}

fn token_arg() -> Arg {
    Arg::new("token").long("token").env("LEAD_DIRECTORY_TOKEN")
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .help("Print the report as JSON")
        .action(ArgAction::SetTrue)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let matches = Command::new("leads")
        .about("Inspect, validate and import lead CSV files")
        .subcommand_required(true)
        .subcommand(
            Command::new("template")
                .about("Write the starter CSV")
                .arg(Arg::new("out").long("out").value_parser(clap::value_parser!(PathBuf))),
        )
        .subcommand(
            Command::new("check")
                .about("Parse and validate without creating anything")
                .arg(path_arg())
                .arg(map_arg())
                .arg(endpoint_arg(false))
                .arg(token_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("import")
                .about("Validate and create every valid row")
                .arg(path_arg())
                .arg(map_arg())
                .arg(endpoint_arg(true))
                .arg(token_arg())
                .arg(
                    Arg::new("delay_ms")
                        .long("delay-ms")
                        .help("Pause between creation calls")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("100"),
                )
                .arg(Arg::new("source").long("source").help("Default lead source"))
                .arg(json_arg()),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("template", sub)) => template(sub).await,
        Some(("check", sub)) => check(sub).await,
        Some(("import", sub)) => import(sub).await,
        _ => unreachable!("subcommand_required"),
    }
}

async fn template(matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.get_one::<PathBuf>("out") {
        Some(path) => {
            let file = tokio::fs::File::create(path).await?;
            write_template(file).await?;
        }
        None => write_template(tokio::io::stdout()).await?,
    }
    Ok(())
}

async fn open_session(matches: &ArgMatches) -> anyhow::Result<ImportSession> {
    let path = matches
        .get_one::<PathBuf>("path")
        .ok_or_else(|| anyhow::anyhow!("--path is required"))?;
    let (doc, meta) = upload_from_path(path).await?;
    if !meta.has_csv_name() {
        anyhow::bail!("{} is not a .csv file", path.display());
    }

    let mut session = ImportSession::from_document(doc)?;
    for entry in matches.get_many::<String>("map").into_iter().flatten() {
        let (column, field) = entry
            .rsplit_once('=')
            .ok_or_else(|| anyhow::anyhow!("--map expects COLUMN=field, got '{entry}'"))?;
        let field = match field.trim() {
            "" => None,
            key => Some(key.parse::<FieldKey>()?),
        };
        session.set_mapping(column, field)?;
    }

    eprintln!(
        "encoding={} delimiter={} columns={} rows={}",
        session.encoding(),
        session.delimiter(),
        session.header().len(),
        session.rows().len()
    );
    for (column, field) in session.mapping().entries() {
        let target = field.map(|f| f.as_str()).unwrap_or("-");
        eprintln!("  {column} -> {target}");
    }
    Ok(session)
}

fn directory(matches: &ArgMatches) -> anyhow::Result<Option<DirectoryClient>> {
    let Some(endpoint) = matches.get_one::<String>("endpoint") else {
        return Ok(None);
    };
    let mut config = DirectoryConfig::new(endpoint.as_str());
    if let Some(token) = matches.get_one::<String>("token") {
        config = config.with_token(token.as_str());
    }
    Ok(Some(DirectoryClient::new(config)?))
}

async fn check(matches: &ArgMatches) -> anyhow::Result<()> {
    let mut session = open_session(matches).await?;
    let client = directory(matches)?;
    let checker: &dyn DuplicateChecker = match &client {
        Some(client) => client,
        None => &NoRemoteCheck,
    };

    let summary = session.validate(checker).await;
    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        print_validation(summary);
    }
    Ok(())
}

async fn import(matches: &ArgMatches) -> anyhow::Result<()> {
    let mut session = open_session(matches).await?;
    let client = directory(matches)?
        .ok_or_else(|| anyhow::anyhow!("--endpoint is required for import"))?;

    let delay = *matches.get_one::<u64>("delay_ms").unwrap_or(&100);
    let mut options = ImportOptions::default().with_row_delay(Duration::from_millis(delay));
    if let Some(source) = matches.get_one::<String>("source") {
        options = options.with_default_source(source.as_str());
    }

    let summary = session
        .import(&client, &client, options, |p| {
            eprint!("\r{}/{}", p.processed, p.total);
            ControlFlow::Continue(())
        })
        .await;
    eprintln!();

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_import(&summary);
    }
    Ok(())
}

fn print_validation(summary: &ValidationSummary) {
    println!(
        "total={} valid={} invalid={} duplicates={}",
        summary.total, summary.valid_count, summary.invalid_count, summary.duplicate_count
    );
    for warning in &summary.warnings {
        println!("warning: {warning}");
    }
    for e in &summary.errors {
        println!("line {}: {}: {} ({:?})", e.row, e.field, e.message, e.value);
    }
}

fn print_import(summary: &ImportSummary) {
    println!(
        "total={} valid={} invalid={} duplicates={} imported={} failed={}{}",
        summary.total,
        summary.valid,
        summary.invalid,
        summary.duplicates,
        summary.imported,
        summary.failed,
        if summary.cancelled { " (cancelled)" } else { "" }
    );
    for warning in &summary.warnings {
        println!("warning: {warning}");
    }
    for e in &summary.errors {
        println!("line {}: {}: {} ({:?})", e.row, e.field, e.message, e.value);
    }
}
