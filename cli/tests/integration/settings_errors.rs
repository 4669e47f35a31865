//! Settings discovery failures surface as a single `Error:` line and exit 1.

#![allow(clippy::expect_used)]

use predicates::prelude::*;

use crate::cli_tests::dotd;

#[test]
fn test_missing_settings_file_lists_searched_locations() {
    let home = tempfile::tempdir().expect("tempdir");
    let cwd = tempfile::tempdir().expect("tempdir");
    dotd()
        .current_dir(cwd.path())
        .env("HOME", home.path())
        .env("USERPROFILE", home.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: Didn't find the config file"))
        .stderr(predicate::str::contains("do-torrent-downloader.yml"));
}

#[test]
fn test_explicit_config_with_wrong_extension_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("settings.toml");
    std::fs::write(&path, "size = 1").expect("write");
    dotd()
        .arg("--config")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("expected .yml or .yaml"));
}

#[test]
fn test_env_config_pointing_nowhere_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("absent.yml");
    dotd()
        .env("DOTD_CONFIG", &missing)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("absent.yml"));
}

#[test]
fn test_incomplete_settings_fail_validation_before_any_network_call() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("do-torrent-downloader.yml");
    std::fs::write(
        &path,
        "size: ''\nimage_slug: docker-20-04\ndroplet_name: box\nregion: ams3\nssh_key: k\n\
         ssh_private_key_path: /k\ndownload_dir: /tmp/dl\ndigital_ocean_pat: x\n\
         qbittorrent_version: 4.6.0\nqbittorrent_password: pw\n\
         qbit:\n  incoming_dir: /a\n  completed_dir: /b\n",
    )
    .expect("write");
    dotd()
        .current_dir(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Missing required setting 'size'"));
}
