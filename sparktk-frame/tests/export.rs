use std::fs;
use std::path::Path;

use csv::ReaderBuilder;
use sparktk_frame::export::sink::{SUCCESS_MARKER, TEMPORARY_DIR};
use sparktk_frame::{
    row, Collection, CsvExportOptions, CsvRowFormatter, DataType, Frame, FrameError, LocalTextSink, Row,
    Schema, Value,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn schema() -> Schema {
    Schema::new(vec![
        ("id", DataType::Int32),
        ("name", DataType::Str),
        ("scores", DataType::List),
    ])
    .unwrap()
}

fn records() -> Vec<Row> {
    vec![
        row![1, "ann", vec![1.5, 2.0]],
        row![2, "bob, jr.", vec![3.0]],
        row![3, Value::Null, Value::Null],
    ]
}

// Every line of every shard, in shard order.
fn read_shards(dir: &Path) -> Vec<String> {
    let mut shards: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.file_name().unwrap().to_str().unwrap().starts_with("part-"))
        .collect();
    shards.sort();
    shards
        .iter()
        .flat_map(|p| {
            fs::read_to_string(p)
                .unwrap()
                .lines()
                .map(str::to_owned)
                .collect::<Vec<_>>()
        })
        .collect()
}

fn parse_line(line: &str, delimiter: char) -> Vec<String> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .from_reader(line.as_bytes());
    let record = reader.records().next().unwrap().unwrap();
    record.iter().map(str::to_owned).collect()
}

#[test]
fn test_three_records_end_to_end() {
    init_logging();
    let root = tempfile::tempdir().unwrap();
    let out = root.path().join("people");
    let frame = Frame::create(records(), schema()).unwrap().split(2);

    let summary = frame.export_to_csv(&out, ',').unwrap();
    assert_eq!(summary.lines, 3);
    assert_eq!(summary.shards, 2);
    assert!(out.join(SUCCESS_MARKER).exists());
    assert!(!out.join(TEMPORARY_DIR).exists());

    let formatter = CsvRowFormatter::default();
    let mut expected: Vec<_> = records().iter().map(|r| formatter.format(r)).collect();
    let mut written = read_shards(&out);
    expected.sort();
    written.sort();
    assert_eq!(written, expected);
    assert!(written.contains(&"2,\"bob, jr.\",3.0".to_string()));
    assert!(written.contains(&"3,,".to_string()));
}

#[test]
fn test_lines_parse_back_to_fields() {
    let rows = vec![
        row!["a,b", "c"],
        row!["a\"b", "plain"],
        row!["one\ntwo", "x\r"],
        row!["tab\there", "pipe|here"],
        row![Value::Null, vec![1, 2, 3]],
        row![";", 4.25],
    ];
    for delimiter in [',', ';', '\t', '|'] {
        let formatter = CsvRowFormatter::new(delimiter);
        for r in rows.iter() {
            let line = formatter.format(r);
            assert_eq!(parse_line(&line, delimiter), formatter.fields(r), "line {:?}", line);
        }
    }
}

// Legacy behaviour: list fields keep their comma join under any delimiter.
#[test]
fn test_nested_lists_keep_comma_in_shards() {
    let root = tempfile::tempdir().unwrap();
    let out = root.path().join("lists");
    let frame = Frame::create(vec![row![7, "x", vec![1, 2, 3]]], schema()).unwrap();

    frame.export_to_csv(&out, ';').unwrap();
    assert_eq!(read_shards(&out), vec!["7;x;\"1,2,3\""]);
}

#[test]
fn test_export_then_import() {
    init_logging();
    let root = tempfile::tempdir().unwrap();
    let out = root.path().join("round-trip");
    let frame = Frame::create(records(), schema()).unwrap().split(3);

    frame.export_to_csv(&out, '|').unwrap();
    let back = Frame::import_csv(&out, schema(), '|', false).unwrap();
    assert_eq!(back.n_partitions(), 3);
    assert_eq!(back.collect().unwrap(), frame.collect().unwrap());
}

#[test]
fn test_existing_path_fails_and_is_untouched() {
    let root = tempfile::tempdir().unwrap();
    let out = root.path().join("twice");
    let frame = Frame::create(records(), schema()).unwrap();

    frame.export_to_csv(&out, ',').unwrap();
    let before = read_shards(&out);
    match frame.export_to_csv(&out, ',') {
        Err(FrameError::PathExists(p)) => assert_eq!(p, out),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(read_shards(&out), before);
}

#[test]
fn test_unwritable_path_fails() {
    let root = tempfile::tempdir().unwrap();
    let blocker = root.path().join("file");
    fs::write(&blocker, "not a directory").unwrap();
    let frame = Frame::create(records(), schema()).unwrap();

    let err = frame.export_to_csv(blocker.join("out"), ',').unwrap_err();
    assert!(matches!(err, FrameError::Io { .. }));
}

#[test]
fn test_failed_partition_leaves_no_output() {
    init_logging();
    let root = tempfile::tempdir().unwrap();
    let out = root.path().join("broken");
    let rows = Collection::from_vec(records())
        .split(3)
        .try_emit(|part, r: &Row, emitter| {
            if part == 1 {
                return Err(FrameError::SchemaMismatch {
                    row: 0,
                    reason: "unreadable partition".into(),
                });
            }
            emitter(r.clone());
            Ok(())
        });
    let frame = Frame::from_collection(schema(), rows);

    let err = frame.export_to_csv(&out, ',').unwrap_err();
    assert!(matches!(err, FrameError::SchemaMismatch { row: 0, .. }));
    assert!(!out.exists());
}

#[test]
fn test_options_from_json_drive_export() {
    let root = tempfile::tempdir().unwrap();
    let out = root.path().join("json");
    let json = format!(r#"{{"fileName": {:?}, "separator": "\t"}}"#, out.to_str().unwrap());
    let options = CsvExportOptions::from_json(&json).unwrap();
    let frame = Frame::create(vec![row![1, "a b", vec![0.5]]], schema()).unwrap();

    let summary = frame
        .export_to_csv_with(&options, &mut LocalTextSink::new())
        .unwrap();
    assert_eq!(summary.path, out);
    assert_eq!(read_shards(&out), vec!["1\ta b\t0.5"]);
}
