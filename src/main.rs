use clap::{Parser, Subcommand};
use pipedrive_client::config::Config;
use pipedrive_client::models::{CustomFieldSource, LeadColor, LeadLabel};
use pipedrive_client::PipedriveClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// pipedrive - Minimal lead provisioning against the Pipedrive API
#[derive(Parser, Debug)]
#[command(name = "pipedrive", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage minimal leads (one lead per email address)
    MinimalLead {
        #[command(subcommand)]
        action: MinimalLeadAction,
    },

    /// Lead labels
    Labels {
        #[command(subcommand)]
        action: LabelAction,
    },

    /// Custom field definitions
    Fields {
        #[command(subcommand)]
        action: FieldAction,
    },
}

#[derive(Subcommand, Debug)]
enum MinimalLeadAction {
    /// Create (or refresh) the person and lead for an email
    Create {
        email: String,

        /// Person name, defaults to "<email>"
        #[arg(long)]
        name: Option<String>,

        /// Label to tag the lead with
        #[arg(long)]
        label: Option<String>,

        /// Color used if the label has to be created
        #[arg(long, default_value = "gray")]
        color: LeadColor,
    },

    /// Print the lead for an email
    Find { email: String },

    /// Tag the lead for an email with a label
    AddLabel {
        email: String,
        label: String,

        /// Color used if the label has to be created
        #[arg(long, default_value = "gray")]
        color: LeadColor,

        /// Do nothing if the lead does not exist
        #[arg(short, long)]
        quiet: bool,
    },
}

#[derive(Subcommand, Debug)]
enum LabelAction {
    /// List all lead labels
    List,
}

#[derive(Subcommand, Debug)]
enum FieldAction {
    /// List custom fields of persons or deals
    List { source: CustomFieldSource },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipedrive_client=info,pipedrive=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let client = PipedriveClient::new(&config)?;

    match cli.command {
        Command::MinimalLead { action } => match action {
            MinimalLeadAction::Create {
                email,
                name,
                label,
                color,
            } => {
                let label = label.map(|name| LeadLabel::new(name, color));
                let lead = client
                    .create_minimal_lead(&email, name.as_deref(), label.as_ref())
                    .await?;
                println!("{}", serde_json::to_string_pretty(&lead)?);
            }
            MinimalLeadAction::Find { email } => {
                let lead = client.find_minimal_lead(&email).await?;
                println!("{}", serde_json::to_string_pretty(&lead)?);
            }
            MinimalLeadAction::AddLabel {
                email,
                label,
                color,
                quiet,
            } => {
                let label = LeadLabel::new(label, color);
                match client.add_label_to_minimal_lead(&email, &label, quiet).await? {
                    Some(lead) => println!("{}", serde_json::to_string_pretty(&lead)?),
                    None => tracing::info!("No lead for {}, nothing to do", email),
                }
            }
        },
        Command::Labels {
            action: LabelAction::List,
        } => {
            for label in client.get_lead_labels().await? {
                let id = label.id.map(|id| id.to_string()).unwrap_or_default();
                println!("{}\t{}\t{}", id, label.color, label.name);
            }
        }
        Command::Fields {
            action: FieldAction::List { source },
        } => {
            for field in client.get_custom_fields(source).await? {
                println!("{}\t{}\t{}", field.key, field.field_type, field.name);
            }
        }
    }

    Ok(())
}
