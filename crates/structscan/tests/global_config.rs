//! The process-wide unmapped-column setting.
//!
//! Kept in its own test binary so flipping the global cannot race with
//! scanners in other test files.

use structscan::{ignore_nonexistent_fields, record, Config, MemoryRows, Rows, StructScanner};

record! {
    #[derive(Debug, Default)]
    struct Item {
        name: String => "name",
    }
}

fn rows() -> MemoryRows {
    let mut rows = MemoryRows::new(["i.name", "i.unknown"]).row(vec!["widget".into(), 1i64.into()]);
    rows.next().unwrap();
    rows
}

#[test]
fn test_global_toggle_applies_at_resolution() {
    ignore_nonexistent_fields(true);
    assert_eq!(Config::global(), Config::ignoring_unmapped());

    let mut item = Item::default();
    StructScanner::<Item>::new("i")
        .scan(&mut rows(), &mut item)
        .unwrap();
    assert_eq!(item.name, "widget");

    let explicit = std::panic::catch_unwind(|| {
        let mut item = Item::default();
        let _ = StructScanner::<Item>::with_config("i", Config::strict()).scan(&mut rows(), &mut item);
    });
    assert!(explicit.is_err(), "explicit strict config must win");

    ignore_nonexistent_fields(false);
    assert_eq!(Config::global(), Config::strict());

    let strict = std::panic::catch_unwind(|| {
        let mut item = Item::default();
        let _ = StructScanner::<Item>::new("i").scan(&mut rows(), &mut item);
    });
    assert!(strict.is_err());
}
