use clap::Parser;
use parquet_pg_ingest::runner::{
    DEFAULT_BATCH_SIZE, IngestArgs, STAGING_FILE_NAME, plan_ingest, run_ingest,
};
use std::path::PathBuf;

/// Ingest a Parquet file served over HTTP into a PostgreSQL table
#[derive(Parser, Clone)]
#[command(version, about)]
struct Args {
    /// Username for postgres
    #[arg(long)]
    user: String,

    /// Password for postgres
    #[arg(long)]
    password: String,

    /// Host for postgres
    #[arg(long)]
    host: String,

    /// Port for postgres
    #[arg(long)]
    port: u16,

    /// Database name for postgres
    #[arg(long)]
    db: String,

    /// Name of the table where the results are written
    #[arg(long, alias = "table_name")]
    table_name: String,

    /// URL of the Parquet file
    #[arg(long)]
    url: String,

    /// Maximum number of rows per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Local path the download is written to
    #[arg(long, default_value = STAGING_FILE_NAME)]
    staging_file: PathBuf,

    /// Download and inspect the file, show the plan, but do not load data
    #[arg(long)]
    dry_run: bool,

    /// Quiet mode - minimal output, only show summary
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing based on quiet mode
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    let filter = if args.quiet {
        EnvFilter::new("parquet_pg_ingest=warn,sqlx=off")
    } else {
        EnvFilter::new("parquet_pg_ingest=info,sqlx=off")
    };
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let ingest_args = IngestArgs {
        user: args.user,
        password: args.password,
        host: args.host,
        port: args.port,
        database: args.db,
        url: args.url,
        table_name: args.table_name,
        batch_size: args.batch_size,
        staging_path: args.staging_file,
        quiet: args.quiet,
    };

    if !args.quiet {
        println!("Parquet to PostgreSQL Ingest");
        println!("============================");
        println!("Source: {}", ingest_args.url);
        println!("Target: {}", ingest_args.display_url()?);
        println!("Table: {}", ingest_args.table_name);
        println!("Batch size: {}", ingest_args.batch_size);
        println!();
    }

    if args.dry_run {
        let plan = plan_ingest(&ingest_args).await?;

        println!("DRY RUN MODE - No data will be loaded");
        println!();
        println!("Downloaded: {} bytes", plan.bytes_downloaded);
        println!("Rows: {}", plan.total_rows);
        println!("Row groups: {}", plan.row_groups);
        println!("Planned batches: {}", plan.planned_batches);
        println!();
        println!("{}", plan.create_table_sql);
        println!();
        println!("To execute, run without --dry-run");
        return Ok(());
    }

    let result = run_ingest(ingest_args).await?;

    println!();
    println!("Ingest Summary");
    println!("==============");
    println!("Run ID: {}", result.run_id);
    println!("Bytes downloaded: {}", result.bytes_downloaded);
    println!("Batches loaded: {}", result.batches_loaded);
    println!("Rows loaded: {}", result.rows_loaded);
    println!("Rows in table: {}", result.table_rows);
    println!("Duration: {:.2}s", result.duration.as_secs_f64());
    println!(
        "Throughput: {:.2} rows/sec",
        result.rows_loaded as f64 / result.duration.as_secs_f64()
    );

    if let (Some(p50), Some(p90), Some(p99)) = result.stats.get_percentiles() {
        println!("Batch latency: p50={p50}ms p90={p90}ms p99={p99}ms");
    }

    Ok(())
}
