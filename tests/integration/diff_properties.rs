use crate::support::{archival_group, deposit_tree, diff, ids, AG};
use archivist::error::ImportError;
use archivist::import::ImportJob;
use archivist::mets::MetsFileWrapper;
use archivist::working::{WorkingDirectory, WorkingFile};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

fn lists(job: &ImportJob) -> String {
    let mut copy = job.clone();
    copy.id = String::new();
    copy.created = chrono::DateTime::<chrono::Utc>::default();
    serde_json::to_string(&copy).unwrap()
}

#[test]
fn new_object_adds_every_container_and_binary() {
    let deposit = deposit_tree(&[
        ("objects/a.tif", "aa"),
        ("objects/pages/p1.jpg", "p1"),
        ("objects/pages/p2.jpg", "p2"),
    ]);
    let job = diff(&deposit, None, None).unwrap();

    assert!(!job.is_update);
    assert_eq!(
        ids(&job.containers_to_add, |c| c.id.as_str()),
        vec![format!("{}/objects", AG), format!("{}/objects/pages", AG)]
    );
    assert_eq!(job.binaries_to_add.len(), 4);
    assert!(job.containers_to_delete.is_empty());
    assert!(job.containers_to_rename.is_empty());
    assert!(job.binaries_to_delete.is_empty());
    assert!(job.binaries_to_patch.is_empty());
    assert!(job.binaries_to_rename.is_empty());
}

#[test]
fn rename_without_patch() {
    let deposit = deposit_tree(&[("objects/a.tif", "aa"), ("objects/b.tif", "bb")]);
    let existing = archival_group(&[
        ("objects/a.tif", "aa", "a.tif"),
        ("objects/b.tif", "bb", "old title.tif"),
    ]);
    let job = diff(&deposit, None, Some(&existing)).unwrap();

    assert!(job.is_update);
    assert_eq!(
        ids(&job.binaries_to_rename, |b| b.id.as_str()),
        vec![format!("{}/objects/b.tif", AG)]
    );
    assert_eq!(job.binaries_to_rename[0].name, "b.tif");
    assert!(job.binaries_to_add.is_empty());
    assert!(job.binaries_to_delete.is_empty());
    assert!(job.binaries_to_patch.is_empty());
    assert!(job.containers_to_add.is_empty());
    assert!(job.containers_to_delete.is_empty());
}

#[test]
fn changed_content_and_name_is_one_patch() {
    let deposit = deposit_tree(&[("objects/a.tif", "a2")]);
    let existing = archival_group(&[("objects/a.tif", "a1", "first.tif")]);
    let job = diff(&deposit, None, Some(&existing)).unwrap();

    assert_eq!(job.binaries_to_patch.len(), 1);
    assert_eq!(job.binaries_to_patch[0].name, "a.tif");
    assert_eq!(job.binaries_to_patch[0].digest.as_deref(), Some("a2"));
    assert!(job.binaries_to_rename.is_empty());
}

#[test]
fn archive_only_content_is_deleted_children_first() {
    let deposit = deposit_tree(&[("objects/a.tif", "aa")]);
    let existing = archival_group(&[
        ("objects/a.tif", "aa", "a.tif"),
        ("objects/old/deep/x.tif", "xx", "x.tif"),
    ]);
    let job = diff(&deposit, None, Some(&existing)).unwrap();

    assert_eq!(
        ids(&job.binaries_to_delete, |b| b.id.as_str()),
        vec![format!("{}/objects/old/deep/x.tif", AG)]
    );
    assert_eq!(
        ids(&job.containers_to_delete, |c| c.id.as_str()),
        vec![
            format!("{}/objects/old/deep", AG),
            format!("{}/objects/old", AG)
        ]
    );
}

#[test]
fn missing_digest_produces_no_job() {
    let mut deposit = deposit_tree(&[("objects/a.tif", "aa")]);
    deposit.insert_file(WorkingFile::new("objects/unhashed.tif"));
    let err = diff(&deposit, None, None).unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("objects/unhashed.tif"));
}

#[test]
fn mets_digest_fills_in_for_the_deposit() {
    let mut deposit = deposit_tree(&[]);
    deposit.insert_file(WorkingFile::new("objects/unhashed.tif"));
    let mut structure = WorkingDirectory::root();
    structure.insert_file(WorkingFile::new("objects/unhashed.tif").with_digest("from-mets"));
    let mets = MetsFileWrapper {
        name: Some("Ledger".to_string()),
        self_file: None,
        physical_structure: Some(structure),
    };
    let job = diff(&deposit, Some(&mets), None).unwrap();
    let added = job
        .binaries_to_add
        .iter()
        .find(|b| b.id.ends_with("unhashed.tif"))
        .unwrap();
    assert_eq!(added.digest.as_deref(), Some("from-mets"));
}

#[test]
fn digest_conflict_names_both_values() {
    let deposit = deposit_tree(&[("objects/a.tif", "aa")]);
    let mut structure = WorkingDirectory::root();
    structure.insert_file(WorkingFile::new("objects/a.tif").with_digest("ff"));
    let mets = MetsFileWrapper {
        name: None,
        self_file: None,
        physical_structure: Some(structure),
    };
    match diff(&deposit, Some(&mets), None).unwrap_err() {
        ImportError::DigestConflict {
            path,
            deposit_digest,
            mets_digest,
        } => {
            assert_eq!(path, "objects/a.tif");
            assert_eq!(deposit_digest, "aa");
            assert_eq!(mets_digest, "ff");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn invalid_slug_fails_before_diffing() {
    let deposit = deposit_tree(&[("objects/Scan 01.TIF", "aa")]);
    let existing = archival_group(&[]);
    let err = diff(&deposit, None, Some(&existing)).unwrap_err();
    match err {
        ImportError::InvalidSlug { slug, .. } => assert_eq!(slug, "Scan 01.TIF"),
        other => panic!("unexpected error: {:?}", other),
    }
}

/// METS names the `objects` directory "Scans" and describes `objects/b.tif`, which
/// the deposit no longer holds.
fn scans_mets() -> MetsFileWrapper {
    let mut structure = WorkingDirectory::root();
    structure.directory_entry("objects").name = "Scans".to_string();
    structure.insert_file(WorkingFile::new("objects/b.tif").with_digest("bb"));
    structure.sort();
    MetsFileWrapper {
        name: None,
        self_file: None,
        physical_structure: Some(structure),
    }
}

#[test]
fn mets_label_renames_existing_container() {
    let deposit = deposit_tree(&[("objects/a.tif", "aa")]);
    let existing = archival_group(&[
        ("objects/a.tif", "aa", "a.tif"),
        ("objects/b.tif", "bb", "b.tif"),
    ]);
    let job = diff(&deposit, Some(&scans_mets()), Some(&existing)).unwrap();

    assert_eq!(job.containers_to_rename.len(), 1);
    assert_eq!(job.containers_to_rename[0].id, format!("{}/objects", AG));
    assert_eq!(job.containers_to_rename[0].name, "Scans");
    assert!(job.containers_to_add.is_empty());
    assert!(job.containers_to_delete.is_empty());
}

#[test]
fn archived_binary_confirmed_by_mets_is_kept() {
    let deposit = deposit_tree(&[("objects/a.tif", "aa")]);
    let existing = archival_group(&[
        ("objects/a.tif", "aa", "a.tif"),
        ("objects/b.tif", "bb", "b.tif"),
    ]);
    let job = diff(&deposit, Some(&scans_mets()), Some(&existing)).unwrap();

    let kept = format!("{}/objects/b.tif", AG);
    assert!(job.binaries_to_delete.is_empty());
    assert!(!ids(&job.binaries_to_add, |b| b.id.as_str()).contains(&kept));
    assert!(!ids(&job.binaries_to_patch, |b| b.id.as_str()).contains(&kept));

    let without_mets = diff(&deposit, None, Some(&existing)).unwrap();
    assert_eq!(ids(&without_mets.binaries_to_delete, |b| b.id.as_str()), vec![kept]);
}

fn path_strategy() -> impl Strategy<Value = String> {
    (prop::sample::select(vec!["", "a/", "b/", "a/c/"]), "[a-e]{1,3}")
        .prop_map(|(dir, file)| format!("objects/{}{}.bin", dir, file))
}

fn files_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map(path_strategy(), "[0-2]", 0..12)
}

proptest! {
    #[test]
    fn diff_is_idempotent(source in files_strategy(), archived in files_strategy()) {
        let files: Vec<(&str, &str)> = source.iter().map(|(p, d)| (p.as_str(), d.as_str())).collect();
        let deposit = deposit_tree(&files);
        let binaries: Vec<(&str, &str, &str)> = archived
            .iter()
            .map(|(p, d)| (p.as_str(), d.as_str(), p.rsplit('/').next().unwrap_or_default()))
            .collect();
        let existing = archival_group(&binaries);

        let first = diff(&deposit, None, Some(&existing)).unwrap();
        let second = diff(&deposit, None, Some(&existing)).unwrap();
        prop_assert_eq!(lists(&first), lists(&second));
    }

    #[test]
    fn every_binary_lands_in_exactly_one_bucket(
        source in files_strategy(),
        archived in files_strategy(),
    ) {
        let files: Vec<(&str, &str)> = source.iter().map(|(p, d)| (p.as_str(), d.as_str())).collect();
        let deposit = deposit_tree(&files);
        let binaries: Vec<(&str, &str, &str)> = archived
            .iter()
            .map(|(p, d)| (p.as_str(), d.as_str(), p.rsplit('/').next().unwrap_or_default()))
            .collect();
        let existing = archival_group(&binaries);
        let job = diff(&deposit, None, Some(&existing)).unwrap();

        let mut universe: BTreeSet<String> = BTreeSet::new();
        universe.insert(format!("{}/mets.xml", AG));
        universe.extend(source.keys().map(|p| format!("{}/{}", AG, p)));
        universe.extend(archived.keys().map(|p| format!("{}/{}", AG, p)));

        let added: BTreeSet<String> = ids(&job.binaries_to_add, |b| b.id.as_str()).into_iter().collect();
        let deleted: BTreeSet<String> = ids(&job.binaries_to_delete, |b| b.id.as_str()).into_iter().collect();
        let patched: BTreeSet<String> = ids(&job.binaries_to_patch, |b| b.id.as_str()).into_iter().collect();
        let unchanged: BTreeSet<String> = source
            .iter()
            .filter(|(p, d)| archived.get(*p) == Some(*d))
            .map(|(p, _)| format!("{}/{}", AG, p))
            .chain(std::iter::once(format!("{}/mets.xml", AG)))
            .collect();

        for id in &universe {
            let hits = [&added, &deleted, &patched, &unchanged]
                .iter()
                .filter(|bucket| bucket.contains(id))
                .count();
            prop_assert_eq!(hits, 1, "{} is in {} buckets", id, hits);
        }
        prop_assert!(job.binaries_to_rename.is_empty());
    }
}
