//! CLI Tooling
//!
//! Command-line access to diffing, mismatch reports and content-type resolution over a
//! local deposit directory. The existing archival group, when there is one, is read
//! from a JSON file.

use crate::combined::{MismatchReport, Whereabouts};
use crate::config::{ArchivistConfig, ConfigLoader};
use crate::content_type::{display_content_type, resolve_content_type};
use crate::deposit::{Deposit, DepositLedger};
use crate::error::ImportError;
use crate::import::{
    DepositAudit, ImportIntent, ImportJob, ImportJobGenerator, ImportJobResult, ImportTarget,
};
use crate::logging::LoggingConfig;
use crate::mets::{JsonMetsSource, MetsSource, NoMets};
use crate::preserved::InMemoryArchivalGroups;
use crate::queue::{ImportJobQueue, ImportJobRunner};
use crate::working::LocalDepositStore;
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Archivist CLI - deposit reconciliation and import jobs
#[derive(Parser)]
#[command(name = "archivist")]
#[command(about = "Reconcile deposits against METS and compute import jobs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Logging config with command-line overrides applied
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.file = Some(file.clone());
        }
        config
    }
}

/// Where the inputs of a diff come from
#[derive(clap::Args, Debug, Clone)]
pub struct DepositArgs {
    /// Deposit directory
    #[arg(long)]
    pub deposit: PathBuf,

    /// Parsed METS document as JSON (omit for a deposit without METS)
    #[arg(long)]
    pub mets: Option<PathBuf>,

    /// Enumerate the deposit even if it has an index
    #[arg(long)]
    pub no_index: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the import job for a deposit
    Diff {
        #[command(flatten)]
        deposit: DepositArgs,

        /// Archival group URI
        #[arg(long)]
        archival_group: String,

        /// Existing archival group as JSON (omit for a new object)
        #[arg(long)]
        existing: Option<PathBuf>,

        /// Name for the archival group
        #[arg(long)]
        name: Option<String>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Compute an import job and apply it to an in-memory copy of the archival group
    Import {
        #[command(flatten)]
        deposit: DepositArgs,

        /// Archival group URI
        #[arg(long)]
        archival_group: String,

        /// Existing archival group as JSON (omit for a new object)
        #[arg(long)]
        existing: Option<PathBuf>,

        /// Write the resulting archival group here as JSON
        #[arg(long)]
        out: Option<PathBuf>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List field-level disagreements between the deposit and METS
    Mismatches {
        #[command(flatten)]
        deposit: DepositArgs,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Resolve a set of content-type hints
    ContentType {
        /// Candidate content types
        #[arg(required = true)]
        types: Vec<String>,
    },
    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Print the default configuration file path
    Path,
}

/// CLI context holding the loaded configuration
pub struct CliContext {
    config: ArchivistConfig,
}

impl CliContext {
    pub fn new(config_path: Option<&Path>) -> Result<Self, ImportError> {
        Ok(Self {
            config: ConfigLoader::load(config_path)?,
        })
    }

    pub fn with_config(config: ArchivistConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ArchivistConfig {
        &self.config
    }

    /// Execute a CLI command, returning what to print.
    pub async fn execute(&self, command: &Commands) -> Result<String, ImportError> {
        let cancel = CancellationToken::new();
        match command {
            Commands::Diff {
                deposit,
                archival_group,
                existing,
                name,
                format,
            } => {
                let archive = load_existing(existing.as_deref())?;
                let mut target = ImportTarget::new(archival_group.as_str());
                if let Some(name) = name {
                    target = target.with_name(name.as_str());
                }
                let job = self.generate(deposit, &archive, target, &cancel).await?;
                match format.as_str() {
                    "json" => Ok(serde_json::to_string_pretty(&job)?),
                    _ => Ok(format_job_text(&job)),
                }
            }
            Commands::Import {
                deposit,
                archival_group,
                existing,
                out,
                format,
            } => {
                let archive = Arc::new(load_existing(existing.as_deref())?);
                let target = ImportTarget::new(archival_group.as_str());
                let job = self.generate(deposit, &archive, target, &cancel).await?;

                let deposits = Arc::new(DepositLedger::new());
                let record = Deposit::new(
                    job.deposit_id.clone().unwrap_or_else(|| deposit.deposit.display().to_string()),
                    job.source.clone().unwrap_or_default(),
                );
                let version_tag = record.version_tag.clone();
                deposits.insert(record);

                let queue = ImportJobQueue::with_deposits(&self.config.queue, Arc::clone(&deposits));
                queue.submit(job.clone(), &version_tag).await?;
                queue.close();
                let runner = ImportJobRunner::new(Arc::clone(&archive));
                queue.run(&runner, &cancel).await?;
                let result = queue.result(&job.id).ok_or_else(|| {
                    ImportError::Invariant(format!("no result recorded for job {}", job.id))
                })?;

                if let Some(out) = out {
                    let group = archive
                        .get(&job.archival_group)
                        .ok_or_else(|| ImportError::NotFound(job.archival_group.clone()))?;
                    let bytes = serde_json::to_vec_pretty(&group)?;
                    std::fs::write(out, bytes).map_err(crate::error::StorageError::from)?;
                    info!(path = %out.display(), "Wrote archival group");
                }
                match format.as_str() {
                    "json" => Ok(serde_json::to_string_pretty(&result)?),
                    _ => Ok(format_result_text(&result)),
                }
            }
            Commands::Mismatches { deposit, format } => {
                let store = self.open_store(deposit)?;
                let mets = mets_source(deposit);
                let archive = InMemoryArchivalGroups::default();
                let generator = ImportJobGenerator::new(
                    &store,
                    mets.as_ref(),
                    &archive,
                    self.config.deposit.clone(),
                    self.import_settings(deposit),
                );
                let audit = generator.audit(&cancel).await?;
                match format.as_str() {
                    "json" => Ok(serde_json::to_string_pretty(&audit)?),
                    _ => Ok(format_audit_text(&audit)),
                }
            }
            Commands::ContentType { types } => {
                let resolved = resolve_content_type(types.iter().map(String::as_str));
                Ok(display_content_type(resolved.as_deref()).to_string())
            }
            Commands::Config { command } => match command {
                ConfigCommands::Show => self.config.to_toml(),
                ConfigCommands::Path => Ok(ConfigLoader::default_config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(no config directory on this platform)".to_string())),
            },
        }
    }

    fn open_store(&self, deposit: &DepositArgs) -> Result<LocalDepositStore, ImportError> {
        Ok(LocalDepositStore::new(&deposit.deposit)?)
    }

    fn import_settings(&self, deposit: &DepositArgs) -> crate::import::ImportSettings {
        let mut settings = self.config.import.clone();
        if deposit.no_index {
            settings.read_index = false;
        }
        settings
    }

    async fn generate(
        &self,
        deposit: &DepositArgs,
        archive: &InMemoryArchivalGroups,
        target: ImportTarget,
        cancel: &CancellationToken,
    ) -> Result<ImportJob, ImportError> {
        let store = self.open_store(deposit)?;
        let mets = mets_source(deposit);
        let generator = ImportJobGenerator::new(
            &store,
            mets.as_ref(),
            archive,
            self.config.deposit.clone(),
            self.import_settings(deposit),
        );
        let target = target.with_deposit(
            deposit.deposit.display().to_string(),
            store.root().display().to_string(),
        );
        generator.generate(&target, ImportIntent::Any, cancel).await
    }
}

fn mets_source(deposit: &DepositArgs) -> Box<dyn MetsSource> {
    match &deposit.mets {
        Some(path) => Box::new(JsonMetsSource::new(path)),
        None => Box::new(NoMets),
    }
}

fn load_existing(path: Option<&Path>) -> Result<InMemoryArchivalGroups, ImportError> {
    match path {
        Some(path) => {
            let bytes = std::fs::read(path).map_err(crate::error::StorageError::from)?;
            Ok(InMemoryArchivalGroups::from_json(&bytes)?)
        }
        None => Ok(InMemoryArchivalGroups::default()),
    }
}

/// Section heading with bold/underline
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// Human-readable import job
pub fn format_job_text(job: &ImportJob) -> String {
    let mut out = String::new();
    let kind = if job.is_update { "update" } else { "new object" };
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(&format!("Import Job ({})", kind))
    ));
    out.push_str(&format!("  Archival group: {}\n", job.archival_group));
    if let Some(version) = &job.source_version {
        out.push_str(&format!("  Source version: {}\n", version));
    }
    out.push_str(&format!("  Job id: {}\n\n", job.id));

    if job.is_empty() {
        out.push_str("  No changes.\n");
        return out;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Operation", "Id", "Name"]);
    let containers = [
        ("add container", &job.containers_to_add),
        ("rename container", &job.containers_to_rename),
        ("delete container", &job.containers_to_delete),
    ];
    for (op, list) in containers {
        for c in list.iter() {
            table.add_row(vec![op.to_string(), c.id.clone(), c.name.clone()]);
        }
    }
    let binaries = [
        ("add binary", &job.binaries_to_add),
        ("patch binary", &job.binaries_to_patch),
        ("rename binary", &job.binaries_to_rename),
        ("delete binary", &job.binaries_to_delete),
    ];
    for (op, list) in binaries {
        for b in list.iter() {
            table.add_row(vec![op.to_string(), b.id.clone(), b.name.clone()]);
        }
    }
    out.push_str(&format!("{}\n", table));
    out
}

/// Human-readable job result
pub fn format_result_text(result: &ImportJobResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Import Result")));
    out.push_str(&format!("  Archival group: {}\n", result.archival_group));
    out.push_str(&format!("  Status: {:?}\n", result.status));
    if let Some(version) = &result.new_version {
        out.push_str(&format!("  New version: {}\n", version));
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Outcome", "Count"]);
    for (label, count) in [
        ("containers added", result.containers_added.len()),
        ("containers renamed", result.containers_renamed.len()),
        ("containers deleted", result.containers_deleted.len()),
        ("binaries added", result.binaries_added.len()),
        ("binaries patched", result.binaries_patched.len()),
        ("binaries renamed", result.binaries_renamed.len()),
        ("binaries deleted", result.binaries_deleted.len()),
    ] {
        table.add_row(vec![label.to_string(), count.to_string()]);
    }
    out.push_str(&format!("\n{}\n", table));

    if !result.errors.is_empty() {
        out.push_str(&format!("\n{}\n", format_section_heading("Errors")));
        for e in &result.errors {
            out.push_str(&format!("  {}: {}\n", e.id.red(), e.message));
        }
    }
    out
}

/// Human-readable mismatch reports
pub fn format_mismatches_text(reports: &[MismatchReport]) -> String {
    if reports.is_empty() {
        return "No mismatches between deposit and METS.".to_string();
    }
    let mut out = format!("{}\n\n", format_section_heading("Mismatches"));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Path", "Metadata", "Field", "Deposit", "METS"]);
    for report in reports {
        for m in &report.mismatches {
            table.add_row(vec![
                report.path.clone(),
                m.metadata_type.to_string(),
                m.field.clone(),
                m.value_in_deposit.clone().unwrap_or_else(|| "-".to_string()),
                m.value_in_mets.clone().unwrap_or_else(|| "-".to_string()),
            ]);
        }
    }
    out.push_str(&format!("{}\n", table));
    out
}

fn whereabouts_label(whereabouts: Whereabouts) -> &'static str {
    match whereabouts {
        Whereabouts::Both => "deposit and METS",
        Whereabouts::Deposit => "deposit only",
        Whereabouts::Mets => "METS only",
        Whereabouts::Neither => "neither",
        Whereabouts::Extra => "outside METS scope",
    }
}

/// Human-readable deposit audit: mismatches, then paths not in both sources
pub fn format_audit_text(audit: &DepositAudit) -> String {
    let mut out = format_mismatches_text(&audit.mismatches);
    let unmatched: Vec<(&str, Whereabouts)> = audit.unmatched().collect();
    if unmatched.is_empty() {
        return out;
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&format!("\n{}\n\n", format_section_heading("Unmatched Paths")));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Path", "Found In"]);
    for (path, whereabouts) in unmatched {
        table.add_row(vec![path.to_string(), whereabouts_label(whereabouts).to_string()]);
    }
    out.push_str(&format!("{}\n", table));
    out
}
