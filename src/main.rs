use recrawl::cli::{Cli, Commands};
use recrawl::{logging, report, Frontier, FrontierConfig, now_ms};

fn main() {
    let cli = Cli::parse_args();
    match run(cli) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(3);
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Seed {
            data_dir,
            urls,
            valence,
        } => {
            let _guards = logging::init_logging_in_data_dir(&data_dir)?;
            let config = FrontierConfig {
                host_valence: valence,
                ..FrontierConfig::default()
            };
            let frontier = Frontier::open(&data_dir, config)?;
            let loaded = frontier.load_seeds(urls)?;
            let stats = frontier.stats();
            println!(
                "Loaded {loaded} seeds; frontier holds {} URIs over {} hosts",
                stats.queued_uris, stats.hosts
            );
        }

        Commands::Report { data_dir, one_line } => {
            let frontier = Frontier::open(&data_dir, FrontierConfig::default())?;
            let rows = frontier.queue_snapshots();
            if one_line {
                println!("{}", report::one_line_report(&rows, now_ms()));
            } else {
                print!("{}", report::frontier_report(&frontier.stats(), &rows, now_ms()));
            }
        }

        Commands::Stats { data_dir, json } => {
            let frontier = Frontier::open(&data_dir, FrontierConfig::default())?;
            let stats = frontier.stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{stats}");
            }
        }
    }
    Ok(())
}
