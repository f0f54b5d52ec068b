use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use gorzdrav::prelude::*;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gzcli")]
#[command(version, about = "Gorzdrav CLI - browse the appointment directory and convert booking links", long_about = None)]
struct Cli {
    /// TOML config file (defaults to the per-user config location)
    #[arg(long, global = true, env = "GORZDRAV_CONFIG")]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or build booking links
    #[command(subcommand)]
    Link(LinkCommand),
    /// Classify an upstream error code
    Classify(ClassifyArgs),
    /// Show or write the configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// List districts
    #[cfg(feature = "client")]
    Districts,
    /// List institutions
    #[cfg(feature = "client")]
    Lpus(LpusArgs),
    /// List specialties of an institution
    #[cfg(feature = "client")]
    Specialties(LpuArgs),
    /// List doctors of a specialty
    #[cfg(feature = "client")]
    Doctors(DoctorsArgs),
    /// Show a doctor's timetable
    #[cfg(feature = "client")]
    Timetable(DoctorArgs),
    /// List free appointment slots of a doctor
    #[cfg(feature = "client")]
    Appointments(DoctorArgs),
    /// Look up the doctor a booking link points at
    #[cfg(feature = "client")]
    Resolve(UrlArgs),
}

#[derive(Subcommand)]
enum LinkCommand {
    /// Exit with status 0 if the URL is a booking link, 1 otherwise
    Check(UrlArgs),
    /// Decode a booking link into identifiers
    Parse(UrlArgs),
    /// Build the canonical booking link
    Generate(GenerateArgs),
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,
    /// Write the default configuration file
    Init {
        /// Target path (defaults to the per-user config location)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
struct UrlArgs {
    url: String,
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(long)]
    district: Option<String>,
    #[arg(long)]
    lpu: Option<i64>,
    #[arg(long)]
    specialty: Option<String>,
    /// Doctor (schedule) id
    #[arg(long)]
    doctor: Option<String>,
}

#[derive(Args)]
struct ClassifyArgs {
    #[arg(allow_negative_numbers = true)]
    code: i64,
    #[arg(short, long)]
    message: Option<String>,
}

#[cfg(feature = "client")]
#[derive(Args)]
struct LpusArgs {
    #[arg(long)]
    district: Option<String>,
}

#[cfg(feature = "client")]
#[derive(Args)]
struct LpuArgs {
    #[arg(long)]
    lpu: i64,
}

#[cfg(feature = "client")]
#[derive(Args)]
struct DoctorsArgs {
    #[arg(long)]
    lpu: i64,
    #[arg(long)]
    specialty: String,
}

#[cfg(feature = "client")]
#[derive(Args)]
struct DoctorArgs {
    #[arg(long)]
    lpu: i64,
    #[arg(long)]
    doctor: String,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        match e.downcast_ref::<GorzdravError>() {
            Some(err) => eprintln!("Error: {}", err.user_message()),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "gorzdrav=warn",
        1 => "gorzdrav=debug",
        _ => "gorzdrav=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<GorzdravConfig> {
    match path {
        Some(path) => GorzdravConfig::layered(Some(path))
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(GorzdravConfig::load()),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Link(command) => cmd_link(command),
        Commands::Classify(args) => print_json(&classify(args.code, args.message.as_deref())),
        Commands::Config(command) => cmd_config(command, &config),
        #[cfg(feature = "client")]
        command => cmd_directory(command, config),
    }
}

fn cmd_link(command: LinkCommand) -> anyhow::Result<()> {
    match command {
        LinkCommand::Check(args) => {
            if is_booking_link(&args.url) {
                println!("booking link");
                Ok(())
            } else {
                println!("not a booking link");
                std::process::exit(1);
            }
        }
        LinkCommand::Parse(args) => match parse(&args.url) {
            Ok(ids) => print_json(&ids),
            Err(GorzdravError::LinkNotRecognized { .. }) => {
                println!("URL does not contain valid gorzdrav appointment parameters");
                std::process::exit(1);
            }
            Err(e) => Err(e.into()),
        },
        LinkCommand::Generate(args) => {
            let ids = Identifiers {
                district_id: args.district,
                lpu_id: args.lpu,
                specialty_id: args.specialty,
                doctor_id: args.doctor,
            };
            println!("{}", generate(&ids)?);
            Ok(())
        }
    }
}

fn cmd_config(command: ConfigCommand, config: &GorzdravConfig) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Show => {
            print!("{}", toml::to_string_pretty(config)?);
            Ok(())
        }
        ConfigCommand::Init { output, force } => {
            let Some(path) = output.or_else(GorzdravConfig::default_config_path) else {
                bail!("No config location available; pass --output");
            };
            if path.exists() && !force {
                bail!("{} already exists; pass --force to overwrite", path.display());
            }
            GorzdravConfig::default().save(&path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}

#[cfg(feature = "client")]
fn cmd_directory(command: Commands, config: GorzdravConfig) -> anyhow::Result<()> {
    let client = DirectoryClient::with_config(config)?;
    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    rt.block_on(lookup(command, client))
}

#[cfg(feature = "client")]
async fn lookup(command: Commands, client: DirectoryClient) -> anyhow::Result<()> {
    match command {
        Commands::Districts => print_json(&client.districts().await?),
        Commands::Lpus(args) => print_json(&client.lpus(args.district.as_deref()).await?),
        Commands::Specialties(args) => print_json(&client.specialties(args.lpu).await?),
        Commands::Doctors(args) => print_json(&client.doctors(args.lpu, &args.specialty).await?),
        Commands::Timetable(args) => print_json(&client.timetable(args.lpu, &args.doctor).await?),
        Commands::Appointments(args) => print_json(&client.appointments(args.lpu, &args.doctor).await?),
        Commands::Resolve(args) => match client.doctor_by_link(&args.url).await? {
            Some(doctor) => print_json(&doctor),
            None => bail!("Doctor not found for {}", args.url),
        },
        Commands::Link(_) | Commands::Classify(_) | Commands::Config(_) => {
            bail!("not a directory lookup command")
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
