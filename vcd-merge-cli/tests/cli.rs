// Runs the vcd-merge binary against temporary inputs.
use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn vcd_merge(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vcd-merge"))
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_merge_writes_vcd_and_report() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.log");
    let b = dir.path().join("b.log");
    let out = dir.path().join("out.vcd");
    let report = dir.path().join("report.json");
    fs::write(&a, "#10 X 1 1\n").unwrap();
    fs::write(&b, "#15 Y 1 1\n").unwrap();

    let output = vcd_merge(&[
        "merge",
        "--no-date",
        "-q",
        "-o",
        out.to_str().unwrap(),
        "--report",
        report.to_str().unwrap(),
        &format!("T,0,ns,A.,{}", a.display()),
        &format!("T,0,ns,B.,{}", b.display()),
    ]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let vcd = fs::read_to_string(&out).unwrap();
    assert!(vcd.starts_with("$version"));
    assert!(vcd.ends_with("#10\nb1 !\n#15\nb1 \"\n"));
    assert!(fs::read_to_string(&report).unwrap().contains("\"num_events\": 2"));
}

#[test]
fn test_conflict_names_both_sources() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.log");
    let b = dir.path().join("b.log");
    let out = dir.path().join("out.vcd");
    fs::write(&a, "#1 M.X 1 1\n").unwrap();
    fs::write(&b, "#2 M.X 0 1\n").unwrap();

    let output = vcd_merge(&[
        "merge",
        "-o",
        out.to_str().unwrap(),
        &format!("T,0,ns,,{}", a.display()),
        &format!("T,0,ns,,{}", b.display()),
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("M.X"));
    assert!(stderr.contains(&a.display().to_string()));
    assert!(stderr.contains(&b.display().to_string()));
    assert!(!out.exists());
}

#[test]
fn test_merge_requires_two_sources() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out.vcd");

    let output = vcd_merge(&["merge", "-o", out.to_str().unwrap(), "T,0,ns,,missing.log"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("at least 2"));
    assert!(!out.exists());
}

#[test]
fn test_convert_with_line_counter() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("trace.log");
    fs::write(&log, "#4 Sys.Mode 3 2\n\n#9 Sys.Mode 1 2\n").unwrap();

    let output = vcd_merge(&[
        "convert",
        "--no-date",
        "-c",
        "Sys.Line",
        log.to_str().unwrap(),
        "us",
    ]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let vcd = fs::read_to_string(dir.path().join("trace.vcd")).unwrap();
    assert!(vcd.contains("$timescale 1 us $end"));
    assert!(vcd.contains("$var wire 32 ! Line $end"));
    assert!(vcd.contains("$var wire 2 \" Mode $end"));
    assert!(vcd.contains("#9\nb00000000000000000000000000000011 !\nb01 \"\n"));
}
