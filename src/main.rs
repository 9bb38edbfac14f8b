use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use fixit::capture::ReportArg;
use fixit::config::{self, Config};
use fixit::notify::{render, NotificationTheme};
use fixit::{FixClient, Fixit};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fixit", version, about = "Ask an AI fix-it endpoint about runtime errors")]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file
    Init,
    /// Report an error message and show the suggested fix
    Report {
        message: String,
        /// Stack trace captured with the error
        #[arg(long)]
        stack: Option<String>,
        /// Emit the error through `tracing` instead of reporting it directly
        #[arg(long)]
        via_tracing: bool,
    },
    /// Trigger one of the built-in sample errors
    Demo {
        #[arg(value_enum)]
        kind: DemoError,
    },
    /// Send an HTTP request and ask for a fix if it fails
    Request {
        url: String,
        #[arg(long, default_value = "GET")]
        method: String,
    },
    /// Check whether the fix-it backend is reachable
    Health,
    /// Show errors stored by the error-log backend
    Logs,
    /// Show error statistics from the error-log backend
    Stats,
}

#[derive(Clone, Copy, ValueEnum)]
enum DemoError {
    Template,
    Reference,
}

impl DemoError {
    fn args(self) -> Vec<ReportArg> {
        match self {
            Self::Template => vec![ReportArg::error(
                "Error",
                "NG0303: Can't bind to 'undefinedDirective' since it isn't a known property of 'div'",
                Some("at TestComponent.template (test.component.html:15:3)".to_string()),
            )],
            Self::Reference => vec![ReportArg::error(
                "ReferenceError",
                "ReferenceError: userData is not defined",
                Some("at TestComponent.ngOnInit (test.component.ts:18:5)".to_string()),
            )],
        }
    }
}

fn init_tracing(fixit: &Fixit) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(fixit.capture_layer())
        .init();
}

fn print_notifications(fixit: &Fixit) {
    let theme = NotificationTheme::default();
    let active = fixit.notifications.active();
    if active.is_empty() {
        println!("{}", "No fix suggested for this error.".yellow());
        return;
    }
    for notification in active {
        println!("{}\n", render(&notification, &theme));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => config::get_config_path()?,
    };

    if let Command::Init = cli.command {
        if config_path.exists() {
            println!("Config file already exists at {:?}", config_path);
        } else {
            Config::create_default(&config_path)?;
            println!("Created default config file at {:?}", config_path);
        }
        return Ok(());
    }

    let config = Config::load_or_default(&config_path)?;
    let fixit = Fixit::from_config(&config)?;
    init_tracing(&fixit);

    match cli.command {
        // Handled before the config was loaded.
        Command::Init => {}
        Command::Report {
            message,
            stack,
            via_tracing,
        } => {
            if via_tracing {
                match stack {
                    Some(stack) => tracing::error!(target: "app", stack = %stack, "{}", message),
                    None => tracing::error!(target: "app", "{}", message),
                }
            } else {
                let arg = match stack {
                    Some(stack) => ReportArg::error("Error", message, Some(stack)),
                    None => ReportArg::text(message),
                };
                fixit.channel.report(vec![arg]);
            }
            fixit.settle().await;
            print_notifications(&fixit);
        }
        Command::Demo { kind } => {
            fixit.channel.report(kind.args());
            fixit.settle().await;
            print_notifications(&fixit);

            let history = fixit.interceptor.pipeline().history();
            println!(
                "Errors: {}  AI fixes: {}  Success rate: {}%",
                history.total_errors(),
                history.ai_fixes(),
                history.success_rate()
            );
        }
        Command::Request { url, method } => {
            let method: reqwest::Method = method.to_uppercase().parse()?;
            let request = fixit.http().request(method, &url).build()?;
            match fixit.execute(request).await? {
                Some(response) => {
                    println!("{} {}", response.status().as_str().green().bold(), url);
                    println!("{}", response.text().await?);
                }
                None => {
                    fixit.settle().await;
                    print_notifications(&fixit);
                }
            }
        }
        Command::Health => {
            if fixit.fix_client.health().await {
                println!("{}", "Backend connected".green().bold());
            } else {
                println!("{}", "Backend not connected".red().bold());
            }
        }
        Command::Logs => {
            let logs = fixit.error_log.recent_errors().await?;
            println!("{}", serde_json::to_string_pretty(&logs)?);
        }
        Command::Stats => {
            let stats = fixit.error_log.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
