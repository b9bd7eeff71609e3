//! dracctl - inspect and configure a Dell iDRAC over WS-Management.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use drac_client::config::{
    DEFAULT_PATH, DEFAULT_PORT, DEFAULT_PROTOCOL, DEFAULT_TIMEOUT_SECS, ENV_HOST, ENV_INSECURE,
    ENV_PASSWORD, ENV_PATH, ENV_PORT, ENV_PROTOCOL, ENV_TIMEOUT_SECS, ENV_USERNAME,
};
use drac_client::{
    AttributeChange, AttributeValue, DracClient, EndpointConfig, RemoteService, ScheduledJob,
};

/// dracctl - Dell iDRAC management over WS-Management.
#[derive(Parser)]
#[command(name = "dracctl")]
#[command(about = "Inspect and configure a Dell iDRAC")]
struct Cli {
    /// DRAC host name or address.
    #[arg(long, env = ENV_HOST)]
    host: String,

    /// DRAC user.
    #[arg(short, long, env = ENV_USERNAME)]
    username: String,

    /// DRAC password.
    #[arg(short, long, env = ENV_PASSWORD, hide_env_values = true)]
    password: String,

    /// WS-Management port.
    #[arg(long, env = ENV_PORT, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// WS-Management path.
    #[arg(long, env = ENV_PATH, default_value = DEFAULT_PATH)]
    path: String,

    /// `http` or `https`.
    #[arg(long, env = ENV_PROTOCOL, default_value = DEFAULT_PROTOCOL)]
    protocol: String,

    /// Request timeout in seconds.
    #[arg(long, env = ENV_TIMEOUT_SECS, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Accept self-signed DRAC certificates.
    #[arg(long, env = ENV_INSECURE, default_value = "false")]
    insecure: bool,

    /// Print results as JSON.
    #[arg(long, global = true, default_value = "false")]
    json: bool,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List processors.
    Cpus,

    /// List memory modules.
    Memory,

    /// List network interfaces.
    Nics,

    /// Show system identity and health.
    System,

    /// Show the Lifecycle Controller version.
    LcVersion,

    /// Show the Lifecycle Controller remote services status.
    LcStatus,

    /// Show which remote services are enabled.
    Services,

    /// Enable or disable remote services, e.g. `ssh=on,telnet=off`.
    SetServices {
        #[arg(value_delimiter = ',', required = true)]
        settings: Vec<String>,
    },

    /// List iDRAC user accounts.
    Users,

    /// Change a user's password.
    SetPassword {
        /// Account name; defaults to the built-in administrator.
        #[arg(long)]
        user: Option<String>,

        #[arg(long)]
        password: String,
    },

    /// Switch the chassis identification LED.
    Led {
        #[arg(value_enum)]
        state: LedState,
    },

    /// List configuration attributes.
    Attributes {
        /// BIOS attributes instead of iDRAC card attributes.
        #[arg(long, default_value = "false")]
        bios: bool,
    },

    /// Change configuration attributes, e.g. `SSH.1#Port=2222`.
    SetAttributes {
        /// BIOS attributes instead of iDRAC card attributes.
        #[arg(long, default_value = "false")]
        bios: bool,

        #[arg(required = true)]
        changes: Vec<String>,
    },

    /// Show one job.
    Job {
        /// Job id, e.g. `JID_471269252011`.
        id: String,
    },

    /// List jobs that have not finished.
    Jobs {
        /// Include finished jobs.
        #[arg(long, default_value = "false")]
        all: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LedState {
    On,
    Off,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_toggle(setting: &str) -> Result<(RemoteService, bool)> {
    let (name, state) = setting
        .split_once('=')
        .with_context(|| format!("expected <service>=on|off, got '{setting}'"))?;
    let service: RemoteService = name.parse()?;
    let enabled = match state.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "enabled" => true,
        "off" | "false" | "disabled" => false,
        other => bail!("invalid state '{other}' for {service}"),
    };
    Ok((service, enabled))
}

fn parse_change(change: &str) -> Result<AttributeChange> {
    let (name, value) = change
        .split_once('=')
        .with_context(|| format!("expected <attribute>=<value>, got '{change}'"))?;
    Ok(AttributeChange::new(name.trim(), AttributeValue::from(value)))
}

fn print_job(json: bool, job: &ScheduledJob) -> Result<()> {
    if json {
        return print_json(job);
    }
    println!("Scheduled {} on {} ({})", job.job_id, job.target, job.staged.join(", "));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = EndpointConfig::new(&cli.host, &cli.username, &cli.password)
        .with_port(cli.port)
        .with_path(&cli.path)
        .with_protocol(&cli.protocol)
        .with_timeout_secs(cli.timeout)
        .with_insecure(cli.insecure);
    let client = DracClient::new(&config).context("Failed to create DRAC client")?;
    info!(endpoint = %config.url(), "Connecting to DRAC");

    let json = cli.json;
    match cli.command {
        Commands::Cpus => {
            let cpus = client.cpus().list_cpus().await?;
            if json {
                return print_json(&cpus);
            }
            println!("{:<24} {:>6}", "ID", "CORES");
            for cpu in cpus {
                println!("{:<24} {:>6}", cpu.id, cpu.cores);
            }
        }

        Commands::Memory => {
            let modules = client.memory().list_memory().await?;
            if json {
                return print_json(&modules);
            }
            println!("{:<24} {:>10}", "ID", "SIZE (MB)");
            for module in modules {
                println!("{:<24} {:>10}", module.id, module.size);
            }
        }

        Commands::Nics => {
            let nics = client.nics().list_network_interfaces().await?;
            if json {
                return print_json(&nics);
            }
            println!("{:<28} {:<18}", "ID", "MAC");
            for nic in nics {
                println!("{:<28} {:<18}", nic.id, nic.mac);
            }
        }

        Commands::System => {
            let system = client.system().get_system_info().await?;
            if json {
                return print_json(&system);
            }
            println!("Model:        {} (generation {})", system.model, system.generation);
            println!("Service tag:  {}", system.service_tag);
            println!("Express code: {}", system.express_service_tag);
            println!("Hostname:     {}", system.hostname.as_deref().unwrap_or("-"));
            println!("BIOS:         {}", system.bios_version);
            println!("LC version:   {}", system.ilm_version);
            println!("Status:       {}", system.status);
        }

        Commands::LcVersion => {
            let version = client.lifecycle().get_version().await?;
            if json {
                return print_json(&version);
            }
            println!("{version}");
        }

        Commands::LcStatus => {
            let status = client.lifecycle().get_status().await?;
            if json {
                return print_json(&status);
            }
            println!("{status}");
        }

        Commands::Services => {
            let services = client.lifecycle().list_remote_services().await?;
            if json {
                return print_json(&services);
            }
            for service in services {
                let state = if service.enabled { "enabled" } else { "disabled" };
                println!("{:<8} {state}", service.name);
            }
        }

        Commands::SetServices { settings } => {
            let settings = settings
                .iter()
                .map(|s| parse_toggle(s))
                .collect::<Result<Vec<_>>>()?;
            let job = client.lifecycle().set_remote_services(&settings).await?;
            print_job(json, &job)?;
        }

        Commands::Users => {
            let users = client.lifecycle().list_users().await?;
            if json {
                return print_json(&users);
            }
            println!("{:>4} {:<20} {}", "ID", "NAME", "TARGET");
            for user in users {
                println!("{:>4} {:<20} {}", user.user_id, user.name, user.target);
            }
        }

        Commands::SetPassword { user, password } => {
            let lifecycle = client.lifecycle();
            let job = match user {
                Some(user) => lifecycle.set_user_password(&user, &password).await?,
                None => lifecycle.set_admin_password(&password).await?,
            };
            print_job(json, &job)?;
        }

        Commands::Led { state } => {
            let system = client.system();
            match state {
                LedState::On => system.enable_system_led().await?,
                LedState::Off => system.disable_system_led().await?,
            }
        }

        Commands::Attributes { bios } => {
            let manager = if bios {
                client.bios_attributes()
            } else {
                client.idrac_attributes()
            };
            let attributes = manager.list_attributes().await?;
            if json {
                return print_json(&attributes);
            }
            for attribute in attributes.iter() {
                let current = attribute
                    .current_value()
                    .map_or_else(|| "-".to_string(), |v| v.to_string());
                let pending = attribute
                    .pending_value()
                    .map(|v| format!(" (pending: {v})"))
                    .unwrap_or_default();
                let lock = if attribute.read_only { " [ro]" } else { "" };
                println!("{} = {current}{pending}{lock}", attribute.key());
            }
        }

        Commands::SetAttributes { bios, changes } => {
            let changes = changes
                .iter()
                .map(|c| parse_change(c))
                .collect::<Result<Vec<_>>>()?;
            let manager = if bios {
                client.bios_attributes()
            } else {
                client.idrac_attributes()
            };
            match manager.set_attributes(&changes).await? {
                Some(job) => print_job(json, &job)?,
                None => println!("Nothing to change"),
            }
        }

        Commands::Job { id } => {
            let Some(job) = client.jobs().get_job(&id).await? else {
                bail!("job {id} not found");
            };
            if json {
                return print_json(&job);
            }
            println!("ID:       {}", job.id);
            println!("Name:     {}", job.name.as_deref().unwrap_or("-"));
            println!("Status:   {}", job.status);
            println!("Progress: {}%", job.percent_complete.unwrap_or(0));
            println!("Message:  {}", job.message.as_deref().unwrap_or("-"));
        }

        Commands::Jobs { all } => {
            let jobs = client.jobs().list_jobs(!all).await?;
            if json {
                return print_json(&jobs);
            }
            println!("{:<20} {:<24} {:>5}", "ID", "STATUS", "%");
            for job in jobs {
                println!(
                    "{:<20} {:<24} {:>5}",
                    job.id,
                    job.status,
                    job.percent_complete.unwrap_or(0)
                );
            }
        }
    }

    Ok(())
}
