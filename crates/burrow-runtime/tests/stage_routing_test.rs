//! Routing from a loaded configuration to the staged entry point.
//!
//! Valid stage arguments are never run here: the stage mounts and pivots
//! for real.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::ffi::OsString;

use burrow_common::config::BurrowConfig;
use burrow_common::constants::INIT_STAGE_MARKER;
use burrow_common::error::BurrowError;
use burrow_runtime::bootstrap::BootstrapConfig;
use burrow_runtime::reexec;

#[test]
fn configured_bootstrap_routes_to_init_stage() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("burrow.json");
    let rootfs = dir.path().join("rootfs");
    std::fs::write(
        &config_path,
        format!(
            r#"{{"rootfs_dir": "{}", "limits": {{"memory_bytes": "524288000", "cpu_shares": "512"}}}}"#,
            rootfs.display()
        ),
    )
    .expect("write config");

    let loaded = BurrowConfig::load(&config_path).expect("load");
    let bootstrap = BootstrapConfig::from_config(&loaded).expect("bootstrap");

    let mut argv = vec![OsString::from(INIT_STAGE_MARKER)];
    argv.extend(bootstrap.to_stage_args());
    let invocation = reexec::lookup(argv.clone()).expect("stage matched");
    assert_eq!(invocation.marker(), INIT_STAGE_MARKER);

    let rebuilt = BootstrapConfig::from_stage_args(&argv[1..]).expect("rebuild");
    assert_eq!(rebuilt, bootstrap);
    assert_eq!(rebuilt.root.as_path(), rootfs);
}

#[test]
fn staged_entry_rejects_invalid_limits_before_touching_root() {
    let dir = tempfile::tempdir().expect("tempdir");
    let rootfs = dir.path().join("rootfs");
    let argv = vec![
        OsString::from(INIT_STAGE_MARKER),
        rootfs.clone().into_os_string(),
        OsString::from("0"),
        OsString::from("512"),
    ];

    let err = reexec::lookup(argv)
        .expect("stage matched")
        .run()
        .expect_err("invalid memory limit");
    assert!(matches!(err, BurrowError::Config { .. }));
    assert!(!rootfs.exists());
}

#[test]
fn cli_invocations_are_not_stages() {
    let argv = ["burrow", "run", "--rootfs", "/tmp/x"].map(OsString::from);
    assert!(reexec::lookup(argv).is_none());
}
