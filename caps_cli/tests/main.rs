use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::NamedTempFile;
use predicates::prelude::*;

#[test]
fn rejects_zero_cores() {
    Command::cargo_bin("caps")
        .unwrap()
        .args(["--L/R", "0.5", "--T", "1.0", "--cores", "0", "--quiet"])
        .assert()
        .failure();
}

#[test]
fn rejects_non_positive_precision() {
    Command::cargo_bin("caps")
        .unwrap()
        .args([
            "--L/R", "0.5", "--T", "1.0", "--precision", "0.0", "--quiet",
        ])
        .assert()
        .failure();
}

#[test]
fn rejects_malformed_range() {
    Command::cargo_bin("caps")
        .unwrap()
        .args(["--L/R", "0.5", "--T", "1,2,0", "--quiet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn smoke_run_produces_csv_line() {
    let output = Command::cargo_bin("caps")
        .unwrap()
        .args([
            "--L/R", "0.9", "--T", "5.0", "--lmax", "5", "--precision", "1e-4", "--quiet",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let line = stdout.trim_end();
    let fields: Vec<&str> = line.split(", ").collect();
    assert_eq!(fields.len(), 6, "unexpected CSV shape: {line:?}");
    for field in [fields[0], fields[1], fields[2], fields[5]] {
        field
            .parse::<f64>()
            .unwrap_or_else(|e| panic!("field '{field}' is not a number: {e}"));
    }
    assert_eq!(fields[3], "5", "lmax column should echo --lmax");
    fields[4]
        .parse::<i32>()
        .unwrap_or_else(|e| panic!("nmax field '{}' is not an integer: {e}", fields[4]));
}

#[test]
fn accepts_material_file_for_the_plate() {
    let material = NamedTempFile::new("gold.dat").unwrap();
    material
        .write_str(
            "# omegap_low = 9.0\n\
             # gamma_low = 0.035\n\
             # omegap_high = 9.0\n\
             # gamma_high = 0.035\n\
             0.01 1.0e6\n\
             1.0 100.0\n\
             10.0 2.0\n",
        )
        .unwrap();

    Command::cargo_bin("caps")
        .unwrap()
        .args([
            "--L/R",
            "0.9",
            "--T",
            "5.0",
            "--lmax",
            "5",
            "--precision",
            "1e-4",
            "--material",
            material.path().to_str().unwrap(),
            "--quiet",
        ])
        .assert()
        .success();
}

#[test]
fn rejects_missing_material_file() {
    Command::cargo_bin("caps")
        .unwrap()
        .args([
            "--L/R",
            "0.5",
            "--T",
            "1.0",
            "--material",
            "/nonexistent/path/to/material.dat",
            "--quiet",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("material"));
}
