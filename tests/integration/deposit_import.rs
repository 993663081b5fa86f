use crate::support::{write_file, AG};
use archivist::deposit::DepositLayout;
use archivist::error::ImportError;
use archivist::import::{
    ImportIntent, ImportJob, ImportJobGenerator, ImportJobStatus, ImportSettings, ImportTarget,
};
use archivist::mets::NoMets;
use archivist::preserved::InMemoryArchivalGroups;
use archivist::queue::{ImportJobQueue, ImportJobRunner, QueueSettings};
use archivist::working::LocalDepositStore;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn settings() -> ImportSettings {
    ImportSettings {
        read_index: false,
        ..ImportSettings::default()
    }
}

async fn generate(
    deposit: &TempDir,
    archive: &InMemoryArchivalGroups,
    intent: ImportIntent,
) -> Result<ImportJob, ImportError> {
    let store = LocalDepositStore::new(deposit.path()).unwrap();
    let generator =
        ImportJobGenerator::new(&store, &NoMets, archive, DepositLayout::default(), settings());
    let target = ImportTarget::new(AG).with_deposit("d1", store.root().display().to_string());
    generator
        .generate(&target, intent, &CancellationToken::new())
        .await
}

async fn apply(archive: &Arc<InMemoryArchivalGroups>, job: ImportJob) -> ImportJobStatus {
    let queue = ImportJobQueue::new(&QueueSettings::default());
    let id = job.id.clone();
    queue.enqueue(job).await.unwrap();
    queue.close();
    let runner = ImportJobRunner::new(Arc::clone(archive));
    assert_eq!(queue.run(&runner, &CancellationToken::new()).await.unwrap(), 1);
    queue.result(&id).unwrap().status
}

fn sample_deposit() -> TempDir {
    let deposit = TempDir::new().unwrap();
    write_file(deposit.path(), "mets.xml", "<mets/>");
    write_file(deposit.path(), "objects/a.txt", "alpha");
    write_file(deposit.path(), "objects/pages/p1.txt", "page one");
    write_file(deposit.path(), "metadata/siegfried.csv", "tool output");
    deposit
}

#[tokio::test]
async fn import_then_rediff_is_empty() {
    let deposit = sample_deposit();
    let archive = Arc::new(InMemoryArchivalGroups::default());

    let job = generate(&deposit, &archive, ImportIntent::Create).await.unwrap();
    assert!(!job.is_update);
    assert_eq!(job.containers_to_add.len(), 2);
    assert_eq!(job.binaries_to_add.len(), 3);
    assert!(job
        .binaries_to_add
        .iter()
        .all(|b| b.digest.as_deref().map(|d| d.len()) == Some(64)));

    assert_eq!(apply(&archive, job).await, ImportJobStatus::Completed);

    let group = archive.get(AG).unwrap();
    assert_eq!(group.version.as_ref().map(|v| v.name.as_str()), Some("v1"));

    let again = generate(&deposit, &archive, ImportIntent::Update).await.unwrap();
    assert!(again.is_update);
    assert_eq!(again.source_version.as_deref(), Some("v1"));
    assert!(again.is_empty(), "unexpected changes: {:?}", again.summary());
}

#[tokio::test]
async fn modified_deposit_produces_update() {
    let deposit = sample_deposit();
    let archive = Arc::new(InMemoryArchivalGroups::default());
    let job = generate(&deposit, &archive, ImportIntent::Any).await.unwrap();
    assert_eq!(apply(&archive, job).await, ImportJobStatus::Completed);

    write_file(deposit.path(), "objects/a.txt", "alpha, revised");
    write_file(deposit.path(), "objects/b.txt", "beta");
    std::fs::remove_dir_all(deposit.path().join("objects/pages")).unwrap();

    let job = generate(&deposit, &archive, ImportIntent::Any).await.unwrap();
    let summary = job.summary();
    assert_eq!(summary.binaries_to_patch, 1);
    assert_eq!(summary.binaries_to_add, 1);
    assert_eq!(summary.binaries_to_delete, 1);
    assert_eq!(summary.containers_to_delete, 1);
    assert_eq!(summary.containers_to_add, 0);

    assert_eq!(apply(&archive, job).await, ImportJobStatus::Completed);
    let group = archive.get(AG).unwrap();
    assert_eq!(group.version.as_ref().map(|v| v.name.as_str()), Some("v2"));
    let again = generate(&deposit, &archive, ImportIntent::Update).await.unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
async fn intent_is_checked_against_the_repository() {
    let deposit = sample_deposit();
    let archive = Arc::new(InMemoryArchivalGroups::default());

    let err = generate(&deposit, &archive, ImportIntent::Update).await.unwrap_err();
    assert!(err.is_not_found());

    let job = generate(&deposit, &archive, ImportIntent::Create).await.unwrap();
    apply(&archive, job).await;

    let err = generate(&deposit, &archive, ImportIntent::Create).await.unwrap_err();
    assert!(matches!(err, ImportError::PathUnavailable(_)));
}

#[tokio::test]
async fn stale_job_completes_with_errors() {
    let deposit = sample_deposit();
    let archive = Arc::new(InMemoryArchivalGroups::default());
    let job = generate(&deposit, &archive, ImportIntent::Any).await.unwrap();
    apply(&archive, job).await;

    write_file(deposit.path(), "objects/c.txt", "gamma");
    let first = generate(&deposit, &archive, ImportIntent::Update).await.unwrap();
    let second = generate(&deposit, &archive, ImportIntent::Update).await.unwrap();

    assert_eq!(apply(&archive, first).await, ImportJobStatus::Completed);
    // Computed against v1, but the group is now at v2
    assert_eq!(
        apply(&archive, second).await,
        ImportJobStatus::CompletedWithErrors
    );
}

#[tokio::test]
async fn cancelled_generation_returns_cancelled() {
    let deposit = sample_deposit();
    let archive = InMemoryArchivalGroups::default();
    let store = LocalDepositStore::new(deposit.path()).unwrap();
    let generator =
        ImportJobGenerator::new(&store, &NoMets, &archive, DepositLayout::default(), settings());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = generator
        .generate(&ImportTarget::new(AG), ImportIntent::Any, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::Cancelled));
}
