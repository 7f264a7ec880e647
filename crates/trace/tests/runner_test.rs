use std::io::{BufRead, Cursor};

use kernel::{KernelError, Machine};
use trace::{ProcessStatus, TraceError, TraceProcess};

fn run_trace(text: &str, frames: u32, quota: u32) -> (TraceProcess, String, usize) {
    let mut machine = Machine::with_frames(frames);
    let input: Box<dyn BufRead> = Box::new(Cursor::new(text.to_string()));
    let mut process = TraceProcess::from_reader(input, "inline", 1, &mut machine, quota).unwrap();
    let mut out: Vec<u8> = Vec::new();
    let ran = process.execute(&mut machine, &mut out, 100).unwrap();
    (process, String::from_utf8(out).unwrap(), ran)
}

#[test]
fn test_echo_and_dump_format() {
    let trace = "# sample\nfill 2000 1500 ab\ndump 2000 12\n";
    let (process, out, ran) = run_trace(trace, 16, 4);
    let expected = "\
1:1:# sample
2:1:fill 2000 1500 ab
3:1:dump 2000 12
2000
 ab ab ab ab ab ab ab ab ab ab ab ab ab ab ab ab
 ab ab
";
    assert_eq!(out, expected);
    assert_eq!(ran, 3);
    assert_eq!(process.status(), Some(ProcessStatus::Completed));
    assert_eq!(process.process().allocated_pages(), 2);
}

#[test]
fn test_compare_and_permission_fault_output() {
    let trace = "\
put 2000 ab ab
compare 2000 ab 00
writable 2000 1000 0
put 2000 1
";
    let (_, out, _) = run_trace(trace, 16, 4);
    let expected = "\
1:1:put 2000 ab ab
2:1:compare 2000 ab 00
compare error at address 2001, expected 0, actual is ab
3:1:writable 2000 1000 0
4:1:put 2000 1
Exception type WritePermissionFaultException occurred at input line 4 at virtual address 0x00002000: write permission fault at virtual address 0x00002000
";
    assert_eq!(out, expected);
}

#[test]
fn test_wide_fill_value_keeps_low_byte() {
    let (_, out, ran) = run_trace("fill 1000 4 1ab\ndump 1000 4\ncompare 1000 ab 1ab\n", 16, 4);
    let expected = "\
1:1:fill 1000 4 1ab
2:1:dump 1000 4
1000
 ab ab ab ab
3:1:compare 1000 ab 1ab
compare error at address 1001, expected 1ab, actual is ab
";
    assert_eq!(out, expected);
    assert_eq!(ran, 3);
}

#[test]
fn test_compare_fault_prints_only_exception() {
    let trace = "\
fill 1000 1000 ee
compare 1ffe ee 00 ee
";
    let (_, out, _) = run_trace(trace, 16, 4);
    let expected = "\
1:1:fill 1000 1000 ee
2:1:compare 1ffe ee 00 ee
Exception type PageFaultException occurred at input line 2 at virtual address 0x00002000: page fault at virtual address 0x00002000
";
    assert_eq!(out, expected);
}

#[test]
fn test_copy_over_quota_reports_read_fault_first() {
    let trace = "\
quota 1
fill 1000 1000 42
copy 8000 1800 1000
dump 1000 1
";
    let (process, out, ran) = run_trace(trace, 16, 4);
    let expected = "\
1:1:quota 1
2:1:fill 1000 1000 42
3:1:copy 8000 1800 1000
Exception type PageFaultException on read occurred at input line 3 at virtual address 0x00002000: page fault at virtual address 0x00002000
ERROR: memory quota 1 exceeded
";
    assert_eq!(out, expected);
    assert_eq!(ran, 2);
    assert_eq!(process.status(), Some(ProcessStatus::QuotaExceeded));
}

#[test]
fn test_read_faults_in_copy_and_dump() {
    let trace = "\
fill 2000 1000 1
copy 9000 7000 4
dump 2ff0 11
";
    let (process, out, _) = run_trace(trace, 16, 4);
    let expected = "\
1:1:fill 2000 1000 1
2:1:copy 9000 7000 4
Exception type PageFaultException on read occurred at input line 2 at virtual address 0x00007000: page fault at virtual address 0x00007000
3:1:dump 2ff0 11
2ff0
 01 01 01 01 01 01 01 01 01 01 01 01 01 01 01 01

Exception type PageFaultException occurred at input line 3 at virtual address 0x00003000: page fault at virtual address 0x00003000
";
    assert_eq!(out, expected);
    // Nothing was read, so nothing was mapped for the destination
    assert_eq!(process.process().allocated_pages(), 1);
}

#[test]
fn test_quota_halts_the_process() {
    let trace = "\
quota 1
put 1000 1
put 5000 2
put 1000 3
";
    let (process, out, ran) = run_trace(trace, 16, 0x40);
    assert!(out.ends_with("3:1:put 5000 2\nERROR: memory quota 1 exceeded\n"));
    assert!(!out.contains("4:1:"));
    assert_eq!(ran, 2);
    assert_eq!(process.status(), Some(ProcessStatus::QuotaExceeded));

    let summary = process.summary();
    assert_eq!(summary.lines_executed, 2);
    assert_eq!(summary.allocated_pages, 1);
    assert_eq!(summary.quota, 1);
}

#[test]
fn test_execute_in_slices() {
    let mut machine = Machine::with_frames(16);
    let input: Box<dyn BufRead> = Box::new(Cursor::new("put 0 1\nput 1 2\nput 2 3\n"));
    let mut process = TraceProcess::from_reader(input, "inline", 3, &mut machine, 4).unwrap();
    let mut out: Vec<u8> = Vec::new();
    assert_eq!(process.execute(&mut machine, &mut out, 2).unwrap(), 2);
    assert_eq!(process.status(), None);
    assert_eq!(process.execute(&mut machine, &mut out, 2).unwrap(), 1);
    assert_eq!(process.status(), Some(ProcessStatus::Completed));
    assert_eq!(process.execute(&mut machine, &mut out, 2).unwrap(), 0);
    assert_eq!(process.summary().lines_executed, 3);
    assert!(String::from_utf8(out).unwrap().starts_with("1:3:put 0 1\n"));
}

#[test]
fn test_invalid_command_is_fatal_after_echo() {
    let mut machine = Machine::with_frames(16);
    let input: Box<dyn BufRead> = Box::new(Cursor::new("quota 1\nfrobnicate\n"));
    let mut process = TraceProcess::from_reader(input, "inline", 1, &mut machine, 4).unwrap();
    let mut out: Vec<u8> = Vec::new();
    let err = process.execute(&mut machine, &mut out, 10).unwrap_err();
    assert!(matches!(err, TraceError::UnknownCommand { line: 2, .. }));
    assert!(String::from_utf8(out).unwrap().ends_with("2:1:frobnicate\n"));
}

#[test]
fn test_out_of_frames_is_fatal() {
    // The root table takes the only frame
    let mut machine = Machine::with_frames(1);
    let input: Box<dyn BufRead> = Box::new(Cursor::new("put 0 1\n"));
    let mut process = TraceProcess::from_reader(input, "inline", 1, &mut machine, 4).unwrap();
    let err = process.execute(&mut machine, &mut Vec::<u8>::new(), 10).unwrap_err();
    match err {
        TraceError::Kernel { id, source } => {
            assert_eq!(id, 1);
            assert!(matches!(source, KernelError::OutOfFrames { .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
