//! psdm-qs CLI
//!
//! Command-line interface for the questionnaire:
//! - Exporting a run to an Excel spreadsheet (`excel`)
//! - Saving a run as a JSON document (`json`)
//! - Updating configured columns of an online sheet in place (`sheet`)
//! - Inspecting labels, enumerations, change logs and personnel
//! - Writing a single proposal attribute (`set-attr`)

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use psdm_qs_core::{ClientConfig, ConnectionOptions, QuestionnaireClient};
use std::io::IsTerminal;
use std::path::PathBuf;

mod document;
mod google_auth;
mod inspect;
mod sheets;
#[cfg(test)]
mod test_server;
mod xlsx;

#[derive(Parser)]
#[command(name = "psdm-qs")]
#[command(
    author,
    version,
    about = "Export questionnaire proposal data to spreadsheets, JSON documents and online sheets"
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Questionnaire base URL (defaults to the ws-kerb or ws-auth endpoint).
    #[arg(long, global = true)]
    questionnaire_url: Option<String>,

    /// Use HTTP basic auth instead of a Kerberos Negotiate token.
    #[arg(long, global = true)]
    no_kerberos: bool,

    /// Basic-auth user (default: QS_USER, then the login name).
    #[arg(long, global = true)]
    user: Option<String>,

    /// Basic-auth password (default: QS_PASSWORD; prompted for on a terminal).
    #[arg(long, global = true)]
    password: Option<String>,

    /// Kerberos SPNEGO token for the questionnaire host (default: QS_NEGOTIATE_TOKEN).
    #[arg(long, global = true)]
    negotiate_token: Option<String>,
}

impl ConnectionArgs {
    fn options(&self) -> ConnectionOptions {
        ConnectionOptions {
            url: self.questionnaire_url.clone(),
            use_kerberos: !self.no_kerberos,
            user: self.user.clone(),
            password: self.password.clone(),
            negotiate_token: self.negotiate_token.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write one row per proposal of a run, one column per labelled attribute, to an .xlsx file.
    Excel {
        /// Run period as used in questionnaire URLs (e.g. run16)
        run: String,
        /// Output spreadsheet path
        excel_file_path: PathBuf,
    },

    /// Save every attribute of every proposal in a run to a JSON document.
    Json {
        /// Run period (e.g. run16)
        run: String,
        /// Output JSON path
        json_file_path: PathBuf,
        /// Use the questionnaire reporting labels as attribute names.
        #[arg(long)]
        use_labels: bool,
    },

    /// Update the configured columns of an online sheet, leaving other columns alone.
    ///
    /// Needs CREDENTIALS_JSON (path to a service-account key file), or
    /// GOOGLE_SHEETS_ACCESS_TOKEN (a ready OAuth2 bearer token, which wins).
    Sheet {
        /// Run period (e.g. run16)
        run: String,
        /// JSON file with an array of {"attr": ..., "label": ...} objects
        attributes_file: PathBuf,
        /// Spreadsheet id (the long id in the sheet URL)
        #[arg(long)]
        spreadsheet_id: String,
        /// Sheet (tab) name inside the spreadsheet
        #[arg(long, default_value = "Sheet1")]
        sheet: String,
    },

    /// Print the attribute-id → reporting-label mapping of a run.
    Labels { run: String },

    /// Print the names of the combobox fields of a run.
    Enums { run: String },

    /// Print the change log (who changed what, when) for every proposal in a run.
    Changes { run: String },

    /// Print personnel for every proposal in a run, with days to start/end.
    Personnel { run: String },

    /// Print the experiment name → proposal id map.
    ExperimentIds,

    /// Look up proposal id and run period for an experiment name.
    Lookup { experiment_name: String },

    /// Write one attribute value of a proposal.
    SetAttr {
        run: String,
        proposal_id: String,
        attribute_id: String,
        value: String,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Asks for the basic-auth password when none was given and `interactive`.
fn fill_password(
    options: &mut ConnectionOptions,
    env: impl Fn(&str) -> Option<String>,
    interactive: bool,
    prompt: impl FnOnce() -> std::io::Result<String>,
) -> Result<()> {
    if interactive && options.needs_password(env) {
        let password = prompt().context("failed to read password")?;
        options.password = Some(password);
    }
    Ok(())
}

fn connect(args: &ConnectionArgs) -> Result<QuestionnaireClient> {
    let mut options = args.options();
    fill_password(
        &mut options,
        |key| std::env::var(key).ok(),
        std::io::stdin().is_terminal(),
        || rpassword::prompt_password("Password: "),
    )?;
    let config = ClientConfig::from_options(&options)?;
    QuestionnaireClient::new(config).context("failed to set up questionnaire client")
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let client = connect(&cli.connection)?;

    match cli.command {
        Commands::Excel {
            run,
            excel_file_path,
        } => xlsx::cmd_excel(&client, &run, &excel_file_path),
        Commands::Json {
            run,
            json_file_path,
            use_labels,
        } => document::cmd_json(&client, &run, use_labels, &json_file_path),
        Commands::Sheet {
            run,
            attributes_file,
            spreadsheet_id,
            sheet,
        } => sheets::cmd_sheet(&client, &run, &attributes_file, &spreadsheet_id, &sheet),
        Commands::Labels { run } => inspect::cmd_labels(&client, &run),
        Commands::Enums { run } => inspect::print_json(&client.enumerations(&run)?),
        Commands::Changes { run } => inspect::print_json(&client.proposals_status(&run)?),
        Commands::Personnel { run } => inspect::print_json(&client.proposals_personnel(&run)?),
        Commands::ExperimentIds => inspect::print_json(&client.experiment_to_proposal_ids()?),
        Commands::Lookup { experiment_name } => {
            inspect::print_json(&client.lookup_by_experiment_name(&experiment_name)?)
        }
        Commands::SetAttr {
            run,
            proposal_id,
            attribute_id,
            value,
        } => inspect::cmd_set_attr(&client, &run, &proposal_id, &attribute_id, &value),
    }
}
