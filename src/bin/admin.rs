use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use breach_radar::domain::format_record_count;
use breach_radar::infra::{
    BreachCatalog, BreachFixture, FieldColumnMap, PgBreachCatalog, PgBreachLoader,
};

fn print_help() {
    eprintln!(
        "\
breach-radar-admin

USAGE:
  breach-radar-admin <command> [options]

COMMANDS:
  migrate                         Run database migrations
  load-fixture                    Load a JSON breach fixture into PostgreSQL
  validate-fixture                Check a JSON breach fixture without loading it
  list-breaches                   Print the breach catalog

COMMON OPTIONS:
  --database-url <postgres_url>    (defaults to env DATABASE_URL)

load-fixture OPTIONS:
  --path <file>                   (required) Fixture file
  --skip-migrate                  Do not run migrations first

validate-fixture OPTIONS:
  --path <file>                   (required) Fixture file
"
    );
}

fn require_database_url(database_url: Option<String>) -> anyhow::Result<String> {
    database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required (or pass --database-url)"))
}

fn require_path(path: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    path.ok_or_else(|| anyhow::anyhow!("--path is required"))
}

fn next_value(args: &mut VecDeque<String>, flag: &str) -> anyhow::Result<String> {
    args.pop_front()
        .ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))
}

async fn connect(database_url: &str) -> anyhow::Result<sqlx::PgPool> {
    Ok(PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args: VecDeque<String> = std::env::args().skip(1).collect();
    let Some(command) = args.pop_front() else {
        print_help();
        return Ok(());
    };

    if matches!(command.as_str(), "-h" | "--help" | "help") {
        print_help();
        return Ok(());
    }

    let mut database_url: Option<String> = None;
    let mut path: Option<PathBuf> = None;
    let mut skip_migrate = false;
    while let Some(arg) = args.pop_front() {
        match arg.as_str() {
            "--database-url" => database_url = Some(next_value(&mut args, "--database-url")?),
            "--path" => path = Some(PathBuf::from(next_value(&mut args, "--path")?)),
            "--skip-migrate" => skip_migrate = true,
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            other => anyhow::bail!("unexpected argument: {other}"),
        }
    }

    match command.as_str() {
        "migrate" => {
            let pool = connect(&require_database_url(database_url)?).await?;
            breach_radar::migrations::run_postgres(&pool).await?;
            println!("ok: migrations applied");
            Ok(())
        }
        "validate-fixture" => {
            let path = require_path(path)?;
            let fixture = BreachFixture::from_file(&path)?;
            fixture.validate(chrono::Utc::now().date_naive())?;
            println!(
                "ok: {} breaches, {} records in {}",
                fixture.breaches.len(),
                fixture.record_count(),
                path.display()
            );
            Ok(())
        }
        "load-fixture" => {
            let path = require_path(path)?;
            let fixture = BreachFixture::from_file(&path)?;

            let pool = connect(&require_database_url(database_url)?).await?;
            if !skip_migrate {
                breach_radar::migrations::run_postgres(&pool).await?;
            }

            let loader = PgBreachLoader::new(pool, Arc::new(FieldColumnMap::standard()));
            let summary = loader.load(&fixture).await?;
            println!(
                "ok: loaded {} breaches, {} records from {}",
                summary.breaches,
                summary.records,
                path.display()
            );
            Ok(())
        }
        "list-breaches" => {
            let pool = connect(&require_database_url(database_url)?).await?;
            let catalog = PgBreachCatalog::new(pool);
            let breaches = catalog.list_breaches().await?;

            for breach in &breaches {
                let fields: Vec<&str> = breach.fields.iter().map(|f| f.as_str()).collect();
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    breach.name,
                    breach.date,
                    format_record_count(breach.affected_records),
                    breach.display_name,
                    fields.join(",")
                );
            }
            println!("ok: {} breaches", breaches.len());
            Ok(())
        }
        other => {
            eprintln!("unknown command: {other}\n");
            print_help();
            anyhow::bail!("unknown command: {other}");
        }
    }
}
