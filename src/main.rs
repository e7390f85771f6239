use anyhow::{Context, Result};
use clap::{App, Arg, ArgMatches, SubCommand};
use runestone::build::build_site;
use runestone::collection::NamedCollections;
use runestone::config::Config;
use runestone::filters::readable_date;
use runestone::loader::Loader;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("runestone=info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let project_arg = Arg::with_name("project")
        .long("project")
        .short("p")
        .takes_value(true)
        .value_name("DIR")
        .help("Directory to search (along with its parents) for runestone.yaml");

    let matches = App::new("runestone")
        .about("A static site generator for a technical blog")
        .subcommand(
            SubCommand::with_name("build")
                .about("Builds the site")
                .arg(project_arg.clone())
                .arg(
                    Arg::with_name("output")
                        .long("output")
                        .short("o")
                        .takes_value(true)
                        .value_name("DIR")
                        .help("Overrides the output directory"),
                ),
        )
        .subcommand(
            SubCommand::with_name("collections")
                .about("Prints the tag list and the series list")
                .arg(project_arg),
        )
        .get_matches();

    match matches.subcommand() {
        ("build", Some(matches)) => {
            let config = load_config(matches)?;
            build_site(&config).context("Building site")?;
            Ok(())
        }
        ("collections", Some(matches)) => print_collections(&load_config(matches)?),
        _ => {
            println!("{}", matches.usage());
            Ok(())
        }
    }
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let project = match matches.value_of("project") {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir().context("Getting working directory")?,
    };
    let output = matches.value_of("output").map(Path::new);
    Config::from_directory(&project, output)
}

fn print_collections(config: &Config) -> Result<()> {
    let collection = Loader::new(config).load().context("Loading content")?;
    let named = NamedCollections::new(&collection, config.recent_posts);

    println!("Tags:");
    for tag in &named.tag_list {
        println!("  {} ({})", tag, named.by_tag[tag].len());
    }

    println!("Series:");
    for group in &named.series_list {
        println!("  {}", group.name);
        for item in &group.items {
            println!(
                "    {} {}",
                readable_date(&item.date),
                item.title().unwrap_or(item.url.as_str())
            );
        }
    }
    Ok(())
}
