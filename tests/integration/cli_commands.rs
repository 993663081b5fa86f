use crate::support::{write_file, AG};
use archivist::config::ArchivistConfig;
use archivist::import::{ImportJob, ImportJobResult, ImportJobStatus};
use archivist::mets::MetsFileWrapper;
use archivist::tooling::cli::{CliContext, Commands, DepositArgs};
use archivist::working::{WorkingDirectory, WorkingFile};
use std::path::PathBuf;
use tempfile::TempDir;

fn deposit_args(deposit: &TempDir, mets: Option<PathBuf>) -> DepositArgs {
    DepositArgs {
        deposit: deposit.path().to_path_buf(),
        mets,
        no_index: true,
    }
}

fn sample_deposit() -> TempDir {
    let deposit = TempDir::new().unwrap();
    write_file(deposit.path(), "mets.xml", "<mets/>");
    write_file(deposit.path(), "objects/a.txt", "alpha");
    write_file(deposit.path(), "objects/b.txt", "beta");
    deposit
}

#[tokio::test]
async fn diff_command_emits_job_json() {
    let deposit = sample_deposit();
    let context = CliContext::with_config(ArchivistConfig::default());
    let out = context
        .execute(&Commands::Diff {
            deposit: deposit_args(&deposit, None),
            archival_group: AG.to_string(),
            existing: None,
            name: Some("Letters".to_string()),
            format: "json".to_string(),
        })
        .await
        .unwrap();

    let job: ImportJob = serde_json::from_str(&out).unwrap();
    assert_eq!(job.archival_group, AG);
    assert_eq!(job.archival_group_name.as_deref(), Some("Letters"));
    assert!(!job.is_update);
    assert_eq!(job.binaries_to_add.len(), 3);

    let raw: serde_json::Value = serde_json::from_str(&out).unwrap();
    for key in [
        "containersToAdd",
        "containersToDelete",
        "containersToRename",
        "binariesToAdd",
        "binariesToDelete",
        "binariesToPatch",
        "binariesToRename",
    ] {
        assert!(raw.get(key).is_some(), "missing {}", key);
    }
}

#[tokio::test]
async fn import_output_feeds_the_next_diff() {
    let deposit = sample_deposit();
    let work = TempDir::new().unwrap();
    let group_file = work.path().join("group.json");
    let context = CliContext::with_config(ArchivistConfig::default());

    let out = context
        .execute(&Commands::Import {
            deposit: deposit_args(&deposit, None),
            archival_group: AG.to_string(),
            existing: None,
            out: Some(group_file.clone()),
            format: "json".to_string(),
        })
        .await
        .unwrap();
    let result: ImportJobResult = serde_json::from_str(&out).unwrap();
    assert_eq!(result.status, ImportJobStatus::Completed);
    assert_eq!(result.new_version.as_deref(), Some("v1"));
    assert!(group_file.exists());

    let out = context
        .execute(&Commands::Diff {
            deposit: deposit_args(&deposit, None),
            archival_group: AG.to_string(),
            existing: Some(group_file),
            name: None,
            format: "text".to_string(),
        })
        .await
        .unwrap();
    assert!(out.contains("No changes."));
}

#[tokio::test]
async fn mismatches_command_reads_mets_json() {
    let deposit = sample_deposit();
    let work = TempDir::new().unwrap();
    let mut structure = WorkingDirectory::root();
    structure.insert_file(WorkingFile::new("objects/a.txt").with_digest("0000"));
    let mets = MetsFileWrapper {
        name: Some("Letters".to_string()),
        self_file: None,
        physical_structure: Some(structure),
    };
    let mets_file = work.path().join("mets.json");
    std::fs::write(&mets_file, serde_json::to_vec(&mets).unwrap()).unwrap();

    let context = CliContext::with_config(ArchivistConfig::default());
    let out = context
        .execute(&Commands::Mismatches {
            deposit: deposit_args(&deposit, Some(mets_file.clone())),
            format: "text".to_string(),
        })
        .await
        .unwrap();
    assert!(out.starts_with("No mismatches between deposit and METS."));
    assert!(out.contains("Unmatched Paths"));
    assert!(out.contains("objects/b.txt"));
    assert!(out.contains("deposit only"));
    assert!(!out.contains("objects/a.txt"));

    let json = context
        .execute(&Commands::Mismatches {
            deposit: deposit_args(&deposit, Some(mets_file.clone())),
            format: "json".to_string(),
        })
        .await
        .unwrap();
    let audit: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(audit["whereabouts"]["objects/a.txt"], "both");
    assert_eq!(audit["whereabouts"]["objects/b.txt"], "deposit");
    assert_eq!(audit["mismatches"].as_array().unwrap().len(), 0);

    let err = context
        .execute(&Commands::Diff {
            deposit: deposit_args(&deposit, Some(mets_file)),
            archival_group: AG.to_string(),
            existing: None,
            name: None,
            format: "text".to_string(),
        })
        .await
        .unwrap_err();
    assert!(err.is_validation());
}
