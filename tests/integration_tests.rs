//! Integration tests for the complete export pipeline
//!
//! These tests verify end-to-end functionality across modules:
//! - Backend → label mapping → run table
//! - Backend → relabelled run document → JSON file
//! - Attributes file → run table → header-matched column updates
//!
//! Run with: cargo test --test integration_tests

use psdm_qs_core::{
    build_run_document, build_run_table, fetch_label_mapping, plan_column_updates, AttrValue,
    AttributeColumn, AttributeFragment, ColumnSpec, FormFieldDefinition, InMemoryBackend,
};
use serde_json::{json, Value};
use tempfile::tempdir;

fn attrs(value: Value) -> AttributeFragment {
    serde_json::from_value(value).expect("valid fragment")
}

fn definition(attribute_id: &str, label: Option<&str>, quantity: Option<i64>) -> FormFieldDefinition {
    FormFieldDefinition {
        attribute_id: attribute_id.to_string(),
        reporting_label: label.map(str::to_string),
        quantity: quantity.map(AttrValue::from),
    }
}

fn run16() -> InMemoryBackend {
    InMemoryBackend::new()
        .with_proposal(
            "run16",
            "LR03",
            "XPP",
            attrs(json!({
                "hutch": [
                    {"id": "hutch-be-top-d1-1", "val": "1"},
                    {"id": "hutch-be-top-orientation", "val": "vertical"},
                    {"id": "hutch-be-mid-d2-10", "val": "1"},
                    {"id": "hutch-be-mid-d2-2", "val": "3"}
                ],
                "xray": [
                    {"id": "xray-mode", "val": "SASE"},
                    {"id": "xraytech-tech-1", "val": "SAXS"},
                    {"id": "xraytech-tech-2", "val": "WAXS"}
                ]
            })),
            json!({
                "info": {
                    "proposalTitle": "Ultrafast water",
                    "startDate": "2024-02-01",
                    "spokesPerson": {"firstName": "Ada", "lastName": "Lovelace"}
                },
                "contacts": {"point_of_contact": "grace@example.org"}
            }),
        )
        .with_proposal(
            "run16",
            "LR01",
            "MFX",
            attrs(json!({"xray": [{"id": "xray-mode", "val": "Self-seeded"}]})),
            json!({"info": {"proposalTitle": "Crystals"}}),
        )
        .with_tab(
            "run16",
            "X-Ray",
            vec![
                definition("xray-mode", Some("X-Ray Mode"), None),
                definition("xraytech-tech-1", None, Some(5)),
                definition("xraytech-tech-2", None, Some(5)),
                definition("xray-notes", None, None),
            ],
        )
        .with_tab(
            "run16",
            "Hutch",
            vec![definition("Be-MID", Some("Mid Stack"), None)],
        )
}

// ============================================================================
// Spreadsheet export
// ============================================================================

#[test]
fn test_table_uses_labels_as_header_and_sorted_rows() {
    let backend = run16();
    let mapping = fetch_label_mapping(&backend, "run16").expect("mapping");
    let columns = ColumnSpec::from_mapping(&mapping);
    let table = build_run_table(&backend, "run16", &columns).expect("table");

    assert_eq!(
        table.header,
        vec!["Proposal", "X-Ray Mode", "xraytech-tech", "xraytech-tech", "Mid Stack"]
    );
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.rows[0][0], AttrValue::from("LR01"));
    assert_eq!(table.rows[0][1], AttrValue::from("Self-seeded"));
    assert_eq!(table.rows[0][4], AttrValue::empty());

    let lr03 = &table.rows[1];
    assert_eq!(lr03[2], AttrValue::from("SAXS"));
    assert_eq!(lr03[3], AttrValue::from("WAXS"));
    assert_eq!(lr03[4], AttrValue::from("2D2x3  2D10x1"));
}

// ============================================================================
// Document export
// ============================================================================

#[test]
fn test_document_with_labels_written_to_disk() {
    let backend = run16();
    let mapping = fetch_label_mapping(&backend, "run16").expect("mapping");
    let document = build_run_document(&backend, "run16", Some(&mapping)).expect("document");

    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("run16.json");
    std::fs::write(&path, serde_json::to_string_pretty(&document).unwrap()).unwrap();
    let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

    let ids: Vec<&String> = written.as_object().unwrap().keys().collect();
    assert_eq!(ids, vec!["LR03", "LR01"]);

    let lr03 = &written["LR03"];
    assert_eq!(lr03["X-Ray Mode"], json!("SASE"));
    assert_eq!(lr03["Mid Stack"], json!("2D2x3  2D10x1"));
    assert_eq!(lr03["Be-TOP"], json!("1D1x1VERT"));
    // Two attributes share a group label; the later one wins.
    assert_eq!(lr03["xraytech-tech"], json!("WAXS"));
    assert_eq!(
        lr03["Be-All Beryllium Lens Stack Recipes"],
        json!("Be-TOP:1D1x1VERT\nBe-MID:2D2x3  2D10x1")
    );
    assert_eq!(lr03["StartDate"], json!("2024-02-01"));
    assert_eq!(lr03["urawi_poc"], json!("grace@example.org"));
    assert_eq!(lr03["Spokesperson First"], json!("Ada"));
    assert_eq!(lr03["Instrument"], json!("XPP"));
    assert!(lr03.get("EndDate").is_none());
}

#[test]
fn test_document_without_labels_keeps_attribute_ids() {
    let document = build_run_document(&run16(), "run16", None).expect("document");
    let lr01 = &document["LR01"];
    assert_eq!(lr01.get("xray-mode"), Some(&AttrValue::from("Self-seeded")));
    assert_eq!(lr01.get("title"), Some(&AttrValue::from("Crystals")));
    assert!(!lr01.contains_key("X-Ray Mode"));
}

// ============================================================================
// Online-sheet column planning
// ============================================================================

#[test]
fn test_attribute_list_drives_header_matched_updates() {
    let attributes: Vec<AttributeColumn> = serde_json::from_value(json!([
        {"attr": "xray-mode", "label": "Mode"},
        {"attr": "Instrument", "label": "Instrument"}
    ]))
    .unwrap();
    let columns = ColumnSpec::from_attribute_list(&attributes);
    let table = build_run_table(&run16(), "run16", &columns).expect("table");

    let existing = vec![
        "Proposal".to_string(),
        "Comments".to_string(),
        "INSTRUMENT".to_string(),
    ];
    let updates = plan_column_updates("Run 16", &existing, &columns, &table.rows);

    let ranges: Vec<&str> = updates.iter().map(|u| u.range.as_str()).collect();
    assert_eq!(ranges, vec!["'Run 16'!A1:A3", "'Run 16'!D1:D3", "'Run 16'!C1:C3"]);
    assert_eq!(
        updates[1].values,
        vec![
            AttrValue::from("Mode"),
            AttrValue::from("Self-seeded"),
            AttrValue::from("SASE")
        ]
    );
    assert_eq!(updates[2].values[0], AttrValue::from("INSTRUMENT"));
    assert!(updates.iter().all(|u| !u.clear_range.contains("B:B")));
}
