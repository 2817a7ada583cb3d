use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

#[test]
fn test_quote_single_amount() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("taskpay"));
    cmd.args(["quote", "--amount", "5000"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "task,subtotal,service_fee,vat,processing_fee,commission,total,tasker_payout",
        ))
        .stdout(predicate::str::contains(
            "-,5000.00,500.00,37.50,183.06,0.00,5720.56,5000.00",
        ));

    Ok(())
}

#[test]
fn test_quote_file_skips_bad_rows() -> Result<(), Box<dyn std::error::Error>> {
    let mut csv = tempfile::NamedTempFile::new()?;
    writeln!(csv, "task, amount")?;
    writeln!(csv, "cleaning, 1000")?;
    writeln!(csv, "broken, lots")?;
    writeln!(csv, "free, 0")?;
    writeln!(csv, "moving, 5000")?;

    let mut cmd = Command::new(cargo_bin!("taskpay"));
    cmd.arg("quote").arg(csv.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "cleaning,1000.00,100.00,7.50,16.61,0.00,1124.11,1000.00",
        ))
        .stdout(predicate::str::contains("moving,5000.00"))
        .stdout(predicate::str::contains("broken").not())
        .stdout(predicate::str::contains("free").not())
        .stderr(predicate::str::contains("Skipping row"));

    Ok(())
}

#[test]
fn test_quote_uses_fee_settings_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = tempfile::NamedTempFile::new()?;
    writeln!(config, "[fees]")?;
    writeln!(config, "commission_rate = \"0.05\"")?;
    writeln!(config, "pass_processing_to_payer = false")?;

    let mut cmd = Command::new(cargo_bin!("taskpay"));
    cmd.arg("--config")
        .arg(config.path())
        .args(["quote", "--amount", "2000"]);

    cmd.assert().success().stdout(predicate::str::contains(
        "-,2000.00,200.00,15.00,33.23,100.00,2215.00,1900.00",
    ));

    Ok(())
}

#[test]
fn test_quote_rejects_oversized_amount() {
    let mut cmd = Command::new(cargo_bin!("taskpay"));
    cmd.args(["quote", "--amount", "79228162514264337593543950335"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("must not exceed"));
}

#[test]
fn test_quote_requires_input() {
    let mut cmd = Command::new(cargo_bin!("taskpay"));
    cmd.arg("quote");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--amount"));
}

#[test]
fn test_invalid_settings_file_fails() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = tempfile::NamedTempFile::new()?;
    writeln!(config, "[fees]")?;
    writeln!(config, "vat_rate = \"1.5\"")?;

    let mut cmd = Command::new(cargo_bin!("taskpay"));
    cmd.arg("--config")
        .arg(config.path())
        .args(["quote", "--amount", "10"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("vat_rate"));

    Ok(())
}

#[test]
fn test_serve_requires_secret_key() {
    let mut cmd = Command::new(cargo_bin!("taskpay"));
    cmd.env_remove("TASKPAY_SECRET_KEY").arg("serve");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("TASKPAY_SECRET_KEY"));
}

#[test]
fn test_wallets_export_header() {
    let mut cmd = Command::new(cargo_bin!("taskpay"));
    cmd.arg("wallets");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "owner,currency,available,held,total,frozen",
        ));
}
