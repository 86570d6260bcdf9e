use anyhow::Context;
use clap::{App, Arg, SubCommand};
use npread::orient::Bwa;
use npread::pipeline::{self, PipelineConfig};
use npread::{EventStore, NanoporeRead, ReadStore};
#[macro_use]
extern crate log;

fn verbose() -> Arg<'static, 'static> {
    Arg::with_name("verbose")
        .short("v")
        .multiple(true)
        .help("Debug mode")
}

fn subcommand_convert() -> App<'static, 'static> {
    SubCommand::with_name("convert")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Make npRead, 2D read, and model files from basecalled reads.")
        .arg(verbose())
        .arg(
            Arg::with_name("reads")
                .long("reads")
                .short("r")
                .value_name("DIR")
                .takes_value(true)
                .required(true)
                .help("Directory of basecalled reads. JSON dumps."),
        )
        .arg(
            Arg::with_name("output")
                .long("output")
                .short("o")
                .value_name("DIR")
                .takes_value(true)
                .required(true)
                .help("Output directory."),
        )
        .arg(
            Arg::with_name("reference")
                .long("reference")
                .value_name("FASTA")
                .takes_value(true)
                .help("Reference to orient each read against. FASTA format."),
        )
        .arg(
            Arg::with_name("bwa")
                .long("bwa")
                .takes_value(true)
                .default_value("bwa")
                .help("bwa binary."),
        )
        .arg(
            Arg::with_name("max_reads")
                .long("max_reads")
                .takes_value(true)
                .default_value("1000")
                .help("Maximum number of reads. A random subset is taken if exceeded."),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .takes_value(true)
                .default_value("32389")
                .help("Seed"),
        )
        .arg(
            Arg::with_name("threads")
                .long("threads")
                .short("t")
                .takes_value(true)
                .default_value("1")
                .help("Number of threads"),
        )
}

fn subcommand_model() -> App<'static, 'static> {
    SubCommand::with_name("model")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Export the emission models of a read.")
        .arg(verbose())
        .arg(
            Arg::with_name("read")
                .long("read")
                .short("r")
                .value_name("JSON")
                .takes_value(true)
                .required(true)
                .help("Basecalled read."),
        )
        .arg(
            Arg::with_name("output")
                .long("output")
                .short("o")
                .value_name("DIR")
                .takes_value(true)
                .default_value(".")
                .help("Output directory."),
        )
}

fn subcommand_map() -> App<'static, 'static> {
    SubCommand::with_name("map")
        .version("0.1")
        .author("Bansho Masutani")
        .about("List the 2D event map of a read. TSV to stdout.")
        .arg(verbose())
        .arg(
            Arg::with_name("read")
                .long("read")
                .short("r")
                .value_name("JSON")
                .takes_value(true)
                .required(true)
                .help("Basecalled read."),
        )
}

fn parse<T: std::str::FromStr>(matches: &clap::ArgMatches, name: &str) -> anyhow::Result<T> {
    let value = matches.value_of(name).unwrap_or_default();
    value
        .parse()
        .ok()
        .with_context(|| format!("--{} should be a number, found {}", name, value))
}

fn convert(matches: &clap::ArgMatches) -> anyhow::Result<()> {
    let reads = matches.value_of("reads").unwrap_or_default();
    let output = matches.value_of("output").unwrap_or_default();
    let threads: usize = parse(matches, "threads")?;
    let max_reads: usize = parse(matches, "max_reads")?;
    let seed: u64 = parse(matches, "seed")?;
    std::fs::create_dir_all(output).with_context(|| format!("creating {}", output))?;
    let mut config = PipelineConfig::new(output, threads, max_reads, seed);
    if let Some(reference) = matches.value_of("reference") {
        config = config.with_reference(reference);
    }
    let jobs = pipeline::collect_jobs(reads, &config).with_context(|| format!("listing {}", reads))?;
    info!("{} reads to convert", jobs.len());
    let orienter = match config.reference.as_ref() {
        Some(reference) => {
            let bwa = matches.value_of("bwa").unwrap_or("bwa");
            Some(Bwa::build_index(bwa, reference, &config.destination).context("bwa index")?)
        }
        None => None,
    };
    let failures = pipeline::run_jobs(&jobs, orienter.as_ref(), config.threads)?;
    for (read, why) in failures.iter() {
        warn!("{}\t{}", read.display(), why);
    }
    Ok(())
}

fn open(matches: &clap::ArgMatches) -> anyhow::Result<ReadStore> {
    let read = matches.value_of("read").unwrap_or_default();
    let store = ReadStore::open(read).with_context(|| format!("reading {}", read))?;
    debug!("{} nodes in {}", store.len(), read);
    Ok(store)
}

fn model(matches: &clap::ArgMatches) -> anyhow::Result<()> {
    let store = open(matches)?;
    let output = matches.value_of("output").unwrap_or(".");
    for path in npread::export_models(&store, output) {
        println!("{}", path.display());
    }
    Ok(())
}

fn map(matches: &clap::ArgMatches) -> anyhow::Result<()> {
    let store = open(matches)?;
    if !store.contains(npread::store::TWO_D_ALIGNMENT) {
        anyhow::bail!("the read has no 2D alignment");
    }
    let read = NanoporeRead::load(&store);
    let stdout = std::io::stdout();
    let mut wtr = std::io::BufWriter::new(stdout.lock());
    read.list_event_map(&mut wtr)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let matches = App::new("npread")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Basecalled reads -> npRead, 2D read, and emission models for signal-level alignment.")
        .setting(clap::AppSettings::ArgRequiredElseHelp)
        .subcommand(subcommand_convert())
        .subcommand(subcommand_model())
        .subcommand(subcommand_map())
        .get_matches();
    if let Some(sub_m) = matches.subcommand().1 {
        let level = match sub_m.occurrences_of("verbose") {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    }
    debug!("Start");
    match matches.subcommand() {
        ("convert", Some(sub_m)) => convert(sub_m),
        ("model", Some(sub_m)) => model(sub_m),
        ("map", Some(sub_m)) => map(sub_m),
        _ => unreachable!(),
    }
}
