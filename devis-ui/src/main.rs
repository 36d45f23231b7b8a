use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use devis_core::calculations::premium::percent_to_fraction;
use devis_core::{DocumentType, FieldUpdate, ProposalDraft, ProposalId};
use tracing::debug;

use devis_ui::app::Services;
use devis_ui::config::{AppConfig, ConfigOverrides};
use devis_ui::form::ProposalFormController;
use devis_ui::listing::DeleteOutcome;
use devis_ui::logging;
use devis_ui::notice::Notice;
use devis_ui::utils::{format_euros, opt_euros_display};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Construction-insurance proposals (TRC / DO).
///
/// Reads `devis.toml` from the working directory unless `--config` is given.
/// Command-line options override the file.
#[derive(Debug, Parser)]
#[command(name = "devis", version)]
struct Cli {
    /// Configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store backend ("http" or "memory").
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Root of the proposal API, e.g. `http://localhost:8000/api/`.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory generated documents are written to.
    #[arg(long, global = true)]
    download_dir: Option<PathBuf>,

    /// Log filter ("info", "debug", or any RUST_LOG directive).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Args)]
struct DraftArgs {
    /// TOML file with the proposal fields.
    #[arg(long)]
    draft: Option<PathBuf>,

    /// Single field, e.g. `--set client_name=Acme`. Applied after `--draft`.
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    sets: Vec<String>,

    /// Rates are given in percent (1.5 for 1.5 %) rather than as fractions.
    #[arg(long)]
    percent: bool,

    /// Generate this document once saved.
    #[arg(long, value_name = "pdf|word", value_parser = parse_doc_type)]
    download: Option<DocumentType>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List proposals.
    List {
        /// Filter, e.g. `--filter client_name=acme` or `--filter prime_price_min=500`.
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,

        /// Sort column; repeat the same key to flip the direction.
        #[arg(long = "sort", value_name = "KEY")]
        sorts: Vec<String>,

        /// Keep server order instead of newest opportunity first.
        #[arg(long)]
        unsorted: bool,
    },
    /// Show one proposal.
    Show { id: ProposalId },
    /// Show the change history of a proposal.
    History { id: ProposalId },
    /// Create a proposal through the three form stages.
    New(DraftArgs),
    /// Edit an existing proposal.
    Edit {
        id: ProposalId,
        #[command(flatten)]
        args: DraftArgs,
    },
    /// Delete a proposal.
    Delete {
        id: ProposalId,
        /// Do not ask for confirmation.
        #[arg(long)]
        yes: bool,
    },
    /// Generate the commercial proposal document.
    Download {
        id: ProposalId,
        #[arg(long = "type", default_value = "pdf", value_parser = parse_doc_type)]
        doc_type: DocumentType,
    },
    /// Look up a site address.
    Address {
        #[arg(required = true)]
        text: Vec<String>,
        /// Print only the suggestion at this position (from 1).
        #[arg(long)]
        pick: Option<usize>,
    },
}

fn parse_doc_type(s: &str) -> Result<DocumentType, String> {
    DocumentType::parse(s).ok_or_else(|| format!("unknown document type '{s}' (pdf or word)"))
}

// ─── helpers ─────────────────────────────────────────────────────────────────

fn print_notices(notices: Vec<Notice>) {
    for notice in notices {
        println!("{notice}");
    }
}

fn split_pair(raw: &str) -> anyhow::Result<(&str, &str)> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .with_context(|| format!("expected KEY=VALUE, got '{raw}'"))
}

fn to_fraction(
    update: FieldUpdate,
    percent: bool,
) -> FieldUpdate {
    if !percent {
        return update;
    }
    match update {
        FieldUpdate::TrcRate(rate) => FieldUpdate::TrcRate(rate.map(percent_to_fraction)),
        FieldUpdate::DoRate(rate) => FieldUpdate::DoRate(rate.map(percent_to_fraction)),
        other => other,
    }
}

/// Every field of `draft` as an update, in form order.
fn draft_updates(draft: ProposalDraft) -> Vec<FieldUpdate> {
    vec![
        FieldUpdate::OpportunityNumber(draft.opportunity_number),
        FieldUpdate::ClientName(draft.client_name),
        FieldUpdate::GuaranteeType(draft.guarantee_type),
        FieldUpdate::OuvrageDestination(draft.ouvrage_destination),
        FieldUpdate::WorkType(draft.work_type),
        FieldUpdate::OuvrageCost(draft.ouvrage_cost),
        FieldUpdate::AddressChantier(draft.address_chantier),
        FieldUpdate::OuvrageDescription(draft.ouvrage_description),
        FieldUpdate::ExistingPresence(draft.existing_presence),
        FieldUpdate::IsVipClient(draft.is_vip_client),
        FieldUpdate::RcmoDesired(draft.rcmo_desired),
        FieldUpdate::TrcRate(draft.trc_rate),
        FieldUpdate::DoRate(draft.do_rate),
    ]
}

fn collect_updates(args: &DraftArgs) -> anyhow::Result<Vec<FieldUpdate>> {
    let mut updates = Vec::new();
    if let Some(path) = &args.draft {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read draft '{}'", path.display()))?;
        let draft: ProposalDraft = toml::from_str(&content)
            .with_context(|| format!("invalid draft '{}'", path.display()))?;
        updates.extend(draft_updates(draft));
    }
    for raw in &args.sets {
        let (field, value) = split_pair(raw)?;
        updates.push(FieldUpdate::parse_named(field, value)?);
    }
    Ok(updates
        .into_iter()
        .map(|u| to_fraction(u, args.percent))
        .collect())
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [o/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "o" | "oui" | "y" | "yes"))
}

// ─── commands ────────────────────────────────────────────────────────────────

async fn run_wizard(
    form: &mut ProposalFormController,
    args: &DraftArgs,
) -> anyhow::Result<()> {
    for update in collect_updates(args)? {
        form.update(update);
    }
    form.dismiss_suggestions();

    while !form.stage().is_final() {
        let stage = form.stage();
        let result = form.advance();
        print_notices(form.take_notices());
        if !result.stage_ok() {
            bail!("stage {stage} is incomplete");
        }
    }
    println!("── {} ──", form.stage());
    println!("{}", form.draft());

    let saved = form.submit().await;
    print_notices(form.take_notices());
    let summary = saved?;
    println!(
        "#{}  {}  {}",
        summary.id, summary.opportunity_number, summary.client_name
    );

    if let Some(doc_type) = args.download {
        let saved = form.download_document(doc_type).await;
        print_notices(form.take_notices());
        println!("{}", saved?.display());
    }
    Ok(())
}

async fn list(
    services: &Services,
    filters: &[String],
    sorts: &[String],
    unsorted: bool,
) -> anyhow::Result<()> {
    let mut listing = services.listing();
    let fetched = listing.refresh().await;
    print_notices(listing.take_notices());
    fetched?;

    if unsorted {
        listing.reset_view();
    }
    for raw in filters {
        let (key, value) = split_pair(raw)?;
        listing.set_filter(key, value);
    }
    for key in sorts {
        listing.request_sort(key);
    }

    let rows = listing.view();
    println!(
        "{:>5}  {:<16} {:<28} {:<8} {:>16} {:>14}",
        "id", "opportunité", "client", "garantie", "coût", "prime totale"
    );
    for row in &rows {
        println!(
            "{:>5}  {:<16} {:<28} {:<8} {:>16} {:>14}",
            row.id,
            row.opportunity_number,
            row.client_name,
            row.guarantee_type.as_str(),
            opt_euros_display(&row.ouvrage_cost),
            opt_euros_display(&row.prime_seule_tarif_duo),
        );
    }
    println!("{} / {} devis", rows.len(), listing.records().len());
    Ok(())
}

async fn show(
    services: &Services,
    id: ProposalId,
) -> anyhow::Result<()> {
    let mut form = services.form();
    let loaded = form.load(id).await;
    print_notices(form.take_notices());
    loaded?;

    println!("{}", form.draft());
    let premiums = form.premiums();
    debug!(id, ?premiums, "premiums recomputed");
    println!("Prime totale (arrondie): {}", format_euros(premiums.prime_seule_duo));
    Ok(())
}

async fn history(
    services: &Services,
    id: ProposalId,
) -> anyhow::Result<()> {
    let mut listing = services.listing();
    listing.show_history(id).await;
    print_notices(listing.take_notices());
    for line in listing.history_lines() {
        println!("{line}");
    }
    Ok(())
}

async fn delete(
    services: &Services,
    id: ProposalId,
    yes: bool,
) -> anyhow::Result<()> {
    let mut listing = services.listing();
    let token = listing.request_delete(id);
    print_notices(listing.take_notices());

    let confirmed = yes || confirm(&format!("Supprimer le devis #{id} ?"))?;
    if !confirmed {
        listing.cancel_delete(token);
    }
    let outcome = listing.confirm_delete(token).await;
    print_notices(listing.take_notices());
    match outcome {
        DeleteOutcome::Deleted => Ok(()),
        DeleteOutcome::Cancelled => {
            println!("Suppression annulée.");
            Ok(())
        }
        DeleteOutcome::Failed => bail!("proposal #{id} was not deleted"),
    }
}

async fn download(
    services: &Services,
    id: ProposalId,
    doc_type: DocumentType,
) -> anyhow::Result<()> {
    let mut listing = services.listing();
    let saved = listing.download_document(id, doc_type).await;
    print_notices(listing.take_notices());
    println!("{}", saved?.display());
    Ok(())
}

async fn address(
    services: &Services,
    text: &str,
    pick: Option<usize>,
) -> anyhow::Result<()> {
    let mut form = services.form();
    form.input_address(text);
    form.settle_address_search().await;
    print_notices(form.take_notices());

    match pick {
        Some(position) => {
            let chosen = form
                .choose_suggestion(position.saturating_sub(1))
                .with_context(|| format!("no suggestion at position {position}"))?;
            println!("{}", chosen.label);
        }
        None => {
            for (i, suggestion) in form.suggestions().iter().enumerate() {
                println!(
                    "{:>2}. {}  ({:.6}, {:.6})",
                    i + 1,
                    suggestion.label,
                    suggestion.latitude,
                    suggestion.longitude
                );
            }
        }
    }
    Ok(())
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::discover(cli.config.as_deref())?.with_overrides(ConfigOverrides {
        backend: cli.backend,
        api_url: cli.api_url,
        download_dir: cli.download_dir,
        log_level: cli.log_level,
    });
    logging::init(&config.logging)?;

    let services = Services::from_config(&config).await?;

    match cli.command {
        Command::List {
            filters,
            sorts,
            unsorted,
        } => list(&services, &filters, &sorts, unsorted).await,
        Command::Show { id } => show(&services, id).await,
        Command::History { id } => history(&services, id).await,
        Command::New(args) => {
            let mut form = services.form();
            form.start_new();
            run_wizard(&mut form, &args).await
        }
        Command::Edit { id, args } => {
            let mut form = services.form();
            let loaded = form.load(id).await;
            print_notices(form.take_notices());
            loaded?;
            run_wizard(&mut form, &args).await
        }
        Command::Delete { id, yes } => delete(&services, id, yes).await,
        Command::Download { id, doc_type } => download(&services, id, doc_type).await,
        Command::Address { text, pick } => address(&services, &text.join(" "), pick).await,
    }
}
