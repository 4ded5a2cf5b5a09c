use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use provisioner::client::{BasicClient, DEFAULT_HOST, ProvisioningOptions, RequestQueue};
use provisioner::tabular;
use provisioner::types::AccountRequest;
use provisioner::{ProvisionErrorKind, ProvisioningSession, ProvisioningWorkflow};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about = "Provision directory accounts over the provisioning REST API")]
struct Args {
    /// Base URL of the provisioning server
    #[arg(long, env = "PROVISIONER_HOST", default_value = DEFAULT_HOST)]
    host: Url,

    /// User-Agent header sent with every call
    #[arg(long)]
    user_agent: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the server configuration
    Config,
    /// Show the usernames the server would suggest, then release them
    Suggest {
        #[command(flatten)]
        person: Person,
    },
    /// Create one account
    Create {
        #[command(flatten)]
        person: Person,
        /// Initial password
        #[arg(short, long)]
        password: String,
        /// Which suggestion to take, counting from 1
        #[arg(long, default_value_t = 1)]
        pick: usize,
    },
    /// Create accounts for every row of a CSV file (`-` reads stdin)
    Bulk {
        /// CSV file whose header starts with `firstname,lastname`
        file: PathBuf,
        /// Password for rows that don't have one
        #[arg(short, long, env = "PROVISIONER_DEFAULT_PASSWORD")]
        password: String,
    },
}

#[derive(clap::Args, Debug)]
struct Person {
    /// First name
    #[arg(short, long)]
    first_name: String,
    /// Last name
    #[arg(short, long)]
    last_name: String,
    /// Extra input for the server's username patterns
    #[arg(short, long)]
    custom_field: Option<String>,
}

impl Person {
    fn into_request(self, password: String) -> AccountRequest {
        AccountRequest::builder()
            .first_name(self.first_name)
            .last_name(self.last_name)
            .maybe_custom_field(self.custom_field)
            .password(password)
            .build()
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_env_filter(EnvFilter::from_env("PROVISIONER_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let options = ProvisioningOptions::builder()
        .host(args.host)
        .maybe_user_agent(args.user_agent)
        .build();

    match args.command {
        Command::Config => {
            let session =
                ProvisioningSession::connect(BasicClient::from_options(reqwest::Client::new(), &options)?)
                    .await?;
            let config = session.config();
            println!("domain:               {}", config.domain);
            println!("suggestions per call: {}", config.number_of_suggestions);
            println!("reservation window:   {}s", config.suggested_usernames_timeout);
        }
        Command::Suggest { person } => {
            let queue = RequestQueue::from_options(reqwest::Client::new(), &options)?;
            let session = ProvisioningSession::connect(queue).await?;
            // suggest validates names only
            let request = person.into_request(String::new());
            let set = session.suggest(&request).await?;
            for (i, username) in set.usernames().iter().enumerate() {
                println!("{}. {}@{}", i + 1, username, session.domain());
            }
            session.release().await?;
        }
        Command::Create {
            person,
            password,
            pick,
        } => {
            let queue = RequestQueue::from_options(reqwest::Client::new(), &options)?;
            let session = ProvisioningSession::connect(queue).await?;
            let request = person.into_request(password);
            request.validate()?;

            let set = session.suggest(&request).await?;
            let Some(username) = pick.checked_sub(1).and_then(|i| set.usernames().get(i)) else {
                session.release().await?;
                miette::bail!(
                    "--pick {pick} is out of range, the server suggested {} username(s)",
                    set.len()
                );
            };
            let selected = session.select(username, &set).await?;
            let account = session.create(&selected, &request).await?;
            println!("created {}", account.email());
        }
        Command::Bulk { file, password } => {
            let requests = if file.as_os_str() == "-" {
                let mut input = Vec::new();
                std::io::stdin().read_to_end(&mut input).into_diagnostic()?;
                tabular::read_requests(input.as_slice(), &password)?
            } else {
                tabular::from_path(&file, &password)?
            };

            let client = BasicClient::from_options(reqwest::Client::new(), &options)?;
            let workflow = ProvisioningWorkflow::connect(client).await?;
            let results = workflow.provision_batch(&requests).await;

            let mut failed = 0usize;
            for (row, (request, result)) in requests.iter().zip(&results).enumerate() {
                let who = format!("{} {}", request.first_name, request.last_name);
                match result {
                    Ok(account) => println!("row {}: {who} -> {}", row + 1, account.email()),
                    Err(e) if e.kind() == ProvisionErrorKind::Skipped => {
                        println!("row {}: {e}", row + 1)
                    }
                    Err(e) => {
                        failed += 1;
                        println!("row {}: {who} failed: {e}", row + 1);
                    }
                }
            }
            if failed > 0 {
                miette::bail!("{failed} of {} row(s) failed", results.len());
            }
        }
    }

    Ok(())
}
