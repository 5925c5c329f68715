// Minimal end-to-end TUI run under a pseudo terminal.
//
// - Requires a TTY; uses expectrl which allocates a pseudo terminal.
// - Marked Unix-only and ignored by default to avoid CI/platform issues.
// - Run manually via: `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn walkthrough_starts_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let bin = assert_cmd::cargo::cargo_bin("puffcoach");
    let cmd = format!(
        "{} --config {} --log-file {}",
        bin.display(),
        dir.path().join("config.json").display(),
        dir.path().join("puffcoach.log").display()
    );

    let mut p = spawn(cmd)?;
    std::thread::sleep(Duration::from_millis(200));

    // Pick up the inhaler, shake it, then put it down again
    p.send("i")?;
    std::thread::sleep(Duration::from_millis(100));
    p.send("s")?;
    std::thread::sleep(Duration::from_millis(1000));
    p.send("x")?;
    std::thread::sleep(Duration::from_millis(100));

    p.send("\x1b")?; // ESC
    p.expect(Eof)?;

    let log = std::fs::read_to_string(dir.path().join("puffcoach.log"))?;
    assert!(log.contains("shake recognized"));
    Ok(())
}
