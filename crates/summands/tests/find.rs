use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use summands::{
    CombinationFinder, Error, FinderConfig, SearchParameters, SinkLimits, WriteMode,
    find_combinations,
};
use tempfile::tempdir;

fn is_xlsx(path: &Path) -> bool {
    fs::read(path)
        .map(|bytes| bytes.starts_with(b"PK"))
        .unwrap_or(false)
}

/// Reads one XML part of a persisted workbook.
fn part(path: &Path, name: &str) -> String {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut xml = String::new();
    archive
        .by_name(name)
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    xml
}

fn sheet_names(path: &Path) -> Vec<String> {
    part(path, "xl/workbook.xml")
        .split("<sheet name=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .map(String::from)
        .collect()
}

fn cell(col: char, row: usize, value: u64) -> String {
    format!(r#"<c r="{col}{row}"><v>{value}</v></c>"#)
}

#[test]
fn writes_workbook_named_after_resolved_bound() {
    let dir = tempdir().unwrap();
    let mut progress = Vec::new();

    let total = find_combinations(5, 2, 0, dir.path(), |n| progress.push(n)).unwrap();

    assert_eq!(total, 2);
    // Two results never fill a default batch.
    assert!(progress.is_empty());
    assert!(is_xlsx(&dir.path().join("5-2-5").join("5-2-5-0.xlsx")));
    assert!(!dir.path().join("5-2-5").join("5-2-5-1.xlsx").exists());
}

#[test]
fn single_summand_is_the_target() {
    let dir = tempdir().unwrap();
    assert_eq!(find_combinations(10, 1, 0, dir.path(), |_| {}).unwrap(), 1);
    assert!(is_xlsx(&dir.path().join("10-1-10").join("10-1-10-0.xlsx")));
}

#[test]
fn empty_search_still_writes_a_workbook() {
    let dir = tempdir().unwrap();
    assert_eq!(find_combinations(4, 3, 0, dir.path(), |_| {}).unwrap(), 0);
    assert!(is_xlsx(&dir.path().join("4-3-4").join("4-3-4-0.xlsx")));
}

#[test]
fn invalid_parameters_touch_nothing() {
    let dir = tempdir().unwrap();

    for (target, length, ub) in [(0, 2, 0), (5, 0, 0), (5, 2, 6)] {
        let err = find_combinations(target, length, ub, dir.path(), |_| {}).unwrap_err();
        assert!(matches!(err, Error::InvalidParameters { .. }), "{err}");
    }
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn rotates_across_workbooks() {
    let dir = tempdir().unwrap();
    let limits = SinkLimits::new(2, 2).unwrap();
    // 11 with two summands has five combinations: two full files of four
    // rows would need eight, so this ends with a partial second file.
    let config = FinderConfig::new(3, limits, WriteMode::Pipelined).unwrap();

    let summary = CombinationFinder::new(config)
        .run(SearchParameters::new(11, 2, 0).unwrap(), dir.path(), |_| {})
        .unwrap();

    assert_eq!(summary.total, 5);
    let expected: Vec<_> = (0..2)
        .map(|n| dir.path().join("11-2-11").join(format!("11-2-11-{n}.xlsx")))
        .collect();
    assert_eq!(summary.files, expected);
    assert!(summary.files.iter().all(|p| is_xlsx(p)));
}

#[test]
fn workbooks_hold_every_row_in_order() {
    let dir = tempdir().unwrap();
    let limits = SinkLimits::new(2, 2).unwrap();

    for mode in [WriteMode::Inline, WriteMode::Pipelined] {
        let out = dir.path().join(format!("{mode:?}"));
        let config = FinderConfig::new(3, limits, mode).unwrap();
        let summary = CombinationFinder::new(config)
            .run(SearchParameters::new(11, 2, 0).unwrap(), &out, |_| {})
            .unwrap();
        assert_eq!(summary.files.len(), 2, "{mode:?}");

        // [1, 10] [2, 9] | [3, 8] [4, 7] in the first file, [5, 6] in the second.
        let first = &summary.files[0];
        assert_eq!(sheet_names(first), ["Sheet 1", "Sheet 2"], "{mode:?}");
        let sheet1 = part(first, "xl/worksheets/sheet1.xml");
        assert_eq!(sheet1.matches("<row ").count(), 2, "{mode:?}");
        assert!(sheet1.contains(&cell('A', 1, 1)), "{mode:?}");
        assert!(sheet1.contains(&cell('B', 1, 10)), "{mode:?}");
        assert!(sheet1.contains(&cell('B', 2, 9)), "{mode:?}");
        let sheet2 = part(first, "xl/worksheets/sheet2.xml");
        assert_eq!(sheet2.matches("<row ").count(), 2, "{mode:?}");
        assert!(sheet2.contains(&cell('A', 1, 3)), "{mode:?}");
        assert!(sheet2.contains(&cell('B', 2, 7)), "{mode:?}");

        let second = &summary.files[1];
        assert_eq!(sheet_names(second), ["Sheet 1"], "{mode:?}");
        let sheet1 = part(second, "xl/worksheets/sheet1.xml");
        assert_eq!(sheet1.matches("<row ").count(), 1, "{mode:?}");
        assert!(sheet1.contains(&cell('A', 1, 5)), "{mode:?}");
        assert!(sheet1.contains(&cell('B', 1, 6)), "{mode:?}");
    }
}

#[test]
fn value_beyond_exact_cell_range_is_a_storage_error() {
    let dir = tempdir().unwrap();
    let target = (1 << 53) + 1;

    let err = find_combinations(target, 1, 0, dir.path(), |_| {}).unwrap_err();
    assert!(matches!(err, Error::Storage { .. }), "{err}");
}

#[test]
fn unwritable_output_is_a_storage_error() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"not a directory").unwrap();

    let err = find_combinations(5, 2, 0, &blocker, |_| {}).unwrap_err();
    assert!(matches!(err, Error::Storage { .. }), "{err}");
}
