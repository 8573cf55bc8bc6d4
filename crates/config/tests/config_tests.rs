// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use qlink_config::LinkManifest;
use std::io::Write;

#[test]
fn test_minimal_manifest_uses_defaults() {
    let yaml = r#"
name: "bare-link"
"#;
    let manifest = LinkManifest::from_yaml(yaml).unwrap();
    assert_eq!(manifest.schema_version, "1.0");
    assert_eq!(manifest.link.pkt_size, 16);
    assert_eq!(manifest.link.symbol_width, 4);
    assert!(manifest.peripherals.is_empty());
}

#[test]
fn test_peripheral_slots_parse() {
    let yaml = r#"
name: "board-link"
link:
  pkt_size: 16
  symbol_width: 4
  num_periphs: 8
peripherals:
  - id: 0
    type: "latch"
  - id: 3
    type: "beacon"
    receive: false
    send: true
    config:
      message: "Hello World!"
      period: 1000
  - id: 5
    type: "echo"
    send: true
"#;
    let manifest = LinkManifest::from_yaml(yaml).unwrap();
    assert_eq!(manifest.link.num_periphs, 8);
    assert_eq!(manifest.link.sync_stages, 2);
    assert_eq!(manifest.peripherals.len(), 3);

    let latch = &manifest.peripherals[0];
    assert_eq!(latch.r#type, "latch");
    assert!(latch.receive);
    assert!(!latch.send);

    let beacon = &manifest.peripherals[1];
    assert!(!beacon.receive);
    assert!(beacon.send);
    assert_eq!(beacon.config_str("message"), Some("Hello World!"));
    assert_eq!(beacon.config_u64("period"), Some(1000));

    let echo = &manifest.peripherals[2];
    assert!(echo.receive && echo.send);
}

#[test]
fn test_reserved_id_rejected() {
    let yaml = r#"
name: "bad-link"
peripherals:
  - id: 15
    type: "latch"
"#;
    let err = LinkManifest::from_yaml(yaml).unwrap_err();
    assert!(format!("{:#}", err).contains("reserved"));
}

#[test]
fn test_id_outside_table_rejected() {
    let yaml = r#"
name: "bad-link"
link:
  num_periphs: 4
peripherals:
  - id: 4
    type: "latch"
"#;
    let err = LinkManifest::from_yaml(yaml).unwrap_err();
    assert!(format!("{:#}", err).contains("outside the slot table"));
}

#[test]
fn test_duplicate_ids_are_accepted() {
    let yaml = r#"
name: "dup-link"
peripherals:
  - id: 2
    type: "latch"
  - id: 2
    type: "echo"
    send: true
"#;
    let manifest = LinkManifest::from_yaml(yaml).unwrap();
    assert_eq!(manifest.peripherals.len(), 2);
}

#[test]
fn test_unsupported_schema_version() {
    let yaml = r#"
schema_version: "2.0"
name: "future-link"
"#;
    let err = LinkManifest::from_yaml(yaml).unwrap_err();
    assert!(format!("{:#}", err).contains("schema_version"));
}

#[test]
fn test_from_file_reports_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "name: \"file-link\"\nlink:\n  symbol_width: 2").unwrap();

    let manifest = LinkManifest::from_file(file.path()).unwrap();
    assert_eq!(manifest.name, "file-link");
    assert_eq!(manifest.link.symbol_width, 2);
    assert_eq!(manifest.link.symbols_per_packet(), 64);

    let missing = LinkManifest::from_file("/definitely/not/here.yaml").unwrap_err();
    assert!(format!("{:#}", missing).contains("Failed to read link manifest"));
}
