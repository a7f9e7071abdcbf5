use clap::{Parser, Subcommand};
use gallery_query::query::{self, QueryCache};
use gallery_query::{config, manifest, output};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gallery-query")]
#[command(about = "Filter and sort photo galleries from an image pool")]
#[command(long_about = "\
Filter and sort photo galleries from an image pool

A gallery is either every image in the pool or a filter expression over it.
Either way the images are ordered by the [sort] section of config.toml,
optionally overridden per gallery.

Filter expressions:

  exif.make == 'Canon' and exif.iso >= 800
  dateTaken >= '2024-01-01' and not (exif.make == 'SONY')
  contains(lower(exif.lensModel), 'macro') or exif.focalLength >= 90
  exif.raw.Rating >= 4 | sort exif.raw.Rating desc | limit 12
  all | sort dateTaken desc | limit 10

Properties: filename, sourcePath, width, height, fileSize, dateTaken,
  exif.{make, model, lensModel, fNumber, exposureTime, focalLength, iso,
  gpsLatitude, gpsLongitude}, exif.raw.<Tag>
Functions:  year, month, day, contains, starts_with, ends_with, lower, upper

Run 'gallery-query gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Image pool manifest (JSON) written by the processing stage
    #[arg(long, default_value = "manifest.json", global = true)]
    manifest: PathBuf,

    /// Directory containing config.toml
    #[arg(long, default_value = "content", global = true)]
    config: PathBuf,

    /// Log debug output to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one filter against the pool and print the ordered gallery
    Query {
        /// Filter expression (empty selects every image)
        filter: String,
        /// Sort override: field or field:direction
        #[arg(long, default_value = "")]
        sort: String,
        /// Print the matching records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse a filter and check its property paths without running it
    Check {
        /// Filter expression
        filter: String,
    },
    /// Build every [[galleries]] entry in config.toml
    Build,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Query { filter, sort, json } => {
            let site_config = config::load_config(&cli.config)?;
            init_thread_pool(&site_config.processing);
            let pool = manifest::load_pool(&cli.manifest)?;
            let spec = match query::resolve_sort(&sort, &site_config.sort) {
                Ok(spec) => spec,
                Err(e) => fail(&e),
            };
            match query::query(&pool, &filter, &sort, &site_config.sort) {
                Ok(images) if json => println!("{}", output::format_query_json(&images)?),
                Ok(images) => output::print_query_output(&filter, &spec, &images, pool.len()),
                Err(e) => fail(&e),
            }
        }
        Command::Check { filter } => match query::compile(&filter) {
            Ok(compiled) => output::print_check_output(&compiled),
            Err(e) => fail(&e),
        },
        Command::Build => {
            let site_config = config::load_config(&cli.config)?;
            init_thread_pool(&site_config.processing);
            let pool = manifest::load_pool(&cli.manifest)?;
            let cache = QueryCache::new();
            let outcomes =
                query::build_galleries(&pool, &site_config.galleries, &site_config.sort, &cache);
            output::print_gallery_outcomes(&outcomes);
            if !outcomes.iter().all(|o| o.is_ok()) {
                std::process::exit(1);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Print a query diagnostic verbatim and exit non-zero.
fn fail(err: &query::QueryError) -> ! {
    output::print_error(err);
    std::process::exit(1);
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
