use archivist::combined::{CombinedDirectory, Whereabouts};
use archivist::content_type::{display_content_type, resolve_content_type};
use archivist::deposit::DepositLayout;
use archivist::metadata::{
    FileFormatMetadata, Metadata, MetadataKind, TechnicalTag, TechnicalTagMetadata,
    VirusScanMetadata,
};
use archivist::mets::MetsFileWrapper;
use archivist::working::{WorkingDirectory, WorkingFile};

fn tags(source: &str, pairs: &[(&str, &str)]) -> Metadata {
    Metadata::TechnicalTags(TechnicalTagMetadata {
        source: source.to_string(),
        timestamp: None,
        tags: pairs.iter().map(|(n, v)| TechnicalTag::new(*n, *v)).collect(),
    })
}

fn mets_with(files: Vec<WorkingFile>) -> MetsFileWrapper {
    let mut structure = WorkingDirectory::root();
    for file in files {
        structure.insert_file(file);
    }
    structure.sort();
    MetsFileWrapper {
        name: None,
        self_file: None,
        physical_structure: Some(structure),
    }
}

#[test]
fn repeated_tag_names_pair_by_name() {
    let mut deposit = WorkingDirectory::root();
    deposit.insert_file(WorkingFile::new("objects/photo.jpg").with_digest("aa").with_metadata(tags(
        "exif",
        &[("V", "13:43"), ("V", "13:45"), ("D", "1267")],
    )));
    let mets = mets_with(vec![WorkingFile::new("objects/photo.jpg").with_metadata(tags(
        "exif",
        &[("V", "13:44"), ("V", "13:46"), ("D", "126")],
    ))]);

    let layout = DepositLayout::default();
    let combined = CombinedDirectory::build(&deposit, Some(&mets), &layout);
    let reports = combined.mismatch_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].path, "objects/photo.jpg");
    assert_eq!(reports[0].mismatches.len(), 3);
    assert!(reports[0]
        .mismatches
        .iter()
        .all(|m| m.metadata_type == MetadataKind::TechnicalTags));
}

#[test]
fn same_tags_in_any_order_agree() {
    let mut deposit = WorkingDirectory::root();
    deposit.insert_file(WorkingFile::new("objects/photo.jpg").with_metadata(tags(
        "exif",
        &[("Make", "Canon"), ("V", "1"), ("V", "2")],
    )));
    let mets = mets_with(vec![WorkingFile::new("objects/photo.jpg").with_metadata(tags(
        "exif",
        &[("v", "2"), ("MAKE", "canon"), ("V", "1")],
    ))]);

    let layout = DepositLayout::default();
    let combined = CombinedDirectory::build(&deposit, Some(&mets), &layout);
    assert!(combined.mismatch_reports().is_empty());
}

#[test]
fn virus_scan_on_one_side_is_reported() {
    let mut deposit = WorkingDirectory::root();
    deposit.insert_file(
        WorkingFile::new("objects/doc.pdf").with_metadata(Metadata::VirusScan(VirusScanMetadata {
            source: "clamav".to_string(),
            timestamp: None,
            has_virus: false,
            virus_found: None,
            virus_definition: Some("27000".to_string()),
        })),
    );
    let mets = mets_with(vec![WorkingFile::new("objects/doc.pdf")]);

    let layout = DepositLayout::default();
    let combined = CombinedDirectory::build(&deposit, Some(&mets), &layout);
    let reports = combined.mismatch_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].mismatches[0].metadata_type, MetadataKind::VirusScan);
    assert!(reports[0].mismatches[0].value_in_mets.is_none());
}

#[test]
fn format_fields_compare_only_when_both_sides_have_them() {
    let format = |name: &str, digest: &str| {
        Metadata::FileFormat(FileFormatMetadata {
            source: "siegfried".to_string(),
            timestamp: None,
            content_type: Some("image/tiff".to_string()),
            format_name: Some(name.to_string()),
            pronom_key: Some("fmt/353".to_string()),
            digest: Some(digest.to_string()),
            size: None,
        })
    };
    let mut deposit = WorkingDirectory::root();
    deposit.insert_file(WorkingFile::new("objects/a.tif").with_metadata(format("Tagged Image File Format", "aa")));
    deposit.insert_file(WorkingFile::new("objects/b.tif").with_metadata(format("TIFF", "bb")));
    let mets = mets_with(vec![
        WorkingFile::new("objects/a.tif").with_metadata(format("TIFF", "aa")),
        WorkingFile::new("objects/b.tif"),
    ]);

    let layout = DepositLayout::default();
    let combined = CombinedDirectory::build(&deposit, Some(&mets), &layout);
    let reports = combined.mismatch_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].path, "objects/a.tif");
    assert_eq!(reports[0].mismatches.len(), 1);
    assert_eq!(reports[0].mismatches[0].field, "FormatName");
}

#[test]
fn paths_outside_content_root_stay_visible() {
    let mut deposit = WorkingDirectory::root();
    deposit.insert_file(WorkingFile::new("objects/a.tif").with_digest("aa"));
    deposit.insert_file(WorkingFile::new("stray.txt").with_digest("ss"));
    let mets = mets_with(vec![WorkingFile::new("objects/a.tif").with_digest("aa")]);

    let layout = DepositLayout::default();
    let combined = CombinedDirectory::build(&deposit, Some(&mets), &layout);
    let stray = combined.find_file("stray.txt").unwrap();
    assert_eq!(stray.whereabouts(), Whereabouts::Extra);
    assert_eq!(
        combined.find_file("objects/a.tif").unwrap().whereabouts(),
        Whereabouts::Both
    );
}

#[test]
fn content_type_examples() {
    let cases: [(&[&str], &str); 5] = [
        (&["application/octet-stream"], "application/octet-stream"),
        (&["application/octet-stream", "image/jpeg"], "image/jpeg"),
        (&["application/msword", "application/rtf"], "application/rtf"),
        (&["application/pdf", "text/xml"], "application/xml"),
        (&["image/jpeg", "video/mp4"], "undetermined"),
    ];
    for (hints, expected) in cases {
        let resolved = resolve_content_type(hints.iter().copied());
        assert_eq!(display_content_type(resolved.as_deref()), expected, "{:?}", hints);
    }
}
