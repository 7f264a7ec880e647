use std::io::{BufRead, Cursor, Write};

use tempfile::NamedTempFile;
use trace::{ProcessStatus, Scheduler, SimConfig, TraceError, report};

fn boxed(text: &str) -> Box<dyn BufRead> {
    Box::new(Cursor::new(text.to_string()))
}

#[test]
fn test_round_robin_interleaves_by_quantum() {
    let config = SimConfig {
        quantum: 2,
        ..SimConfig::default()
    };
    let mut scheduler = Scheduler::new(&config).unwrap();
    assert_eq!(scheduler.add_trace(boxed("put 1000 1\nput 1001 2\nput 1002 3\n"), "a").unwrap(), 1);
    assert_eq!(scheduler.add_trace(boxed("# only\n"), "b").unwrap(), 2);

    let mut out: Vec<u8> = Vec::new();
    let summaries = scheduler.run(&mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "1:1:put 1000 1\n2:1:put 1001 2\n1:2:# only\n3:1:put 1002 3\n"
    );

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].id, 1);
    assert_eq!(summaries[0].trace, "a");
    assert_eq!(summaries[0].lines_executed, 3);
    assert_eq!(summaries[0].allocated_pages, 1);
    assert_eq!(summaries[0].quota, 0x40);
    assert_eq!(summaries[0].status, ProcessStatus::Completed);
    assert_eq!(summaries[1].lines_executed, 1);
    assert_eq!(summaries[1].allocated_pages, 0);
}

#[test]
fn test_quota_halt_does_not_stop_other_processes() {
    let config = SimConfig {
        quantum: 1,
        default_quota: 0,
        ..SimConfig::default()
    };
    let mut scheduler = Scheduler::new(&config).unwrap();
    scheduler.add_trace(boxed("put 0 1\nput 0 2\n"), "starved").unwrap();
    scheduler.add_trace(boxed("quota 1\nput 0 1\ndump 0 1\n"), "ok").unwrap();

    let mut out: Vec<u8> = Vec::new();
    let summaries = scheduler.run(&mut out).unwrap();
    let out = String::from_utf8(out).unwrap();
    assert!(out.starts_with("1:1:put 0 1\nERROR: memory quota 0 exceeded\n1:2:quota 1\n"));
    assert!(out.ends_with("3:2:dump 0 1\n0\n 01\n"));
    assert_eq!(summaries[0].status, ProcessStatus::QuotaExceeded);
    assert_eq!(summaries[0].lines_executed, 0);
    assert_eq!(summaries[1].status, ProcessStatus::Completed);
    assert_eq!(scheduler.machine().allocator().allocated(), 4);
}

#[test]
fn test_open_traces_from_files() {
    let mut first = NamedTempFile::new().unwrap();
    writeln!(first, "fill 0 10 7").unwrap();
    let mut second = NamedTempFile::new().unwrap();
    writeln!(second, "compare 0 0").unwrap();

    let mut scheduler = Scheduler::new(&SimConfig::default()).unwrap();
    scheduler.open_trace(first.path()).unwrap();
    scheduler.open_trace(second.path()).unwrap();
    let mut out: Vec<u8> = Vec::new();
    let summaries = scheduler.run(&mut out).unwrap();

    // Address spaces are separate: process 2 reads its own unmapped page
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Exception type PageFaultException occurred at input line 1"));
    assert_eq!(summaries[1].trace, second.path().display().to_string());
}

#[test]
fn test_missing_trace_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut scheduler = Scheduler::new(&SimConfig::default()).unwrap();
    let err = scheduler.open_trace(&dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, TraceError::Open { .. }));
}

#[test]
fn test_config_from_toml() {
    let config = SimConfig::from_toml_str("frames = 64\ndefault_quota = 0x10\n").unwrap();
    assert_eq!(config.frames, 64);
    assert_eq!(config.quantum, 10);
    assert_eq!(config.default_quota, 0x10);
    assert!(SimConfig::from_toml_str("frame = 64\n").is_err());
}

#[test]
fn test_config_load_and_validate() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "quantum = 0").unwrap();
    let config = SimConfig::load(file.path()).unwrap();
    assert!(matches!(config.validate(), Err(TraceError::InvalidConfig(_))));
    assert!(Scheduler::new(&config).is_err());

    let dir = tempfile::tempdir().unwrap();
    let err = SimConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, TraceError::Config { .. }));
}

#[test]
fn test_summary_json() {
    let mut scheduler = Scheduler::new(&SimConfig::default()).unwrap();
    scheduler.add_trace(boxed("quota 0\nput 0 1\n"), "t").unwrap();
    let summaries = scheduler.run(&mut Vec::<u8>::new()).unwrap();

    let mut json = Vec::new();
    report::write_json(&mut json, &summaries).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
    assert_eq!(value[0]["id"], 1);
    assert_eq!(value[0]["status"], "quota_exceeded");
    assert_eq!(value[0]["quota"], 0);
}
