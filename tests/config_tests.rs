// Config loading and validation tests

use nfsfleet::collector::MAX_CONCURRENCY;
use nfsfleet::config::{AppConfig, MAX_RETRIES};
use nfsfleet::table_sink::OutputFormat;
use std::io::Write;
use std::time::Duration;

const VALID_CONFIG: &str = r#"
[remote]
program = "ssh"
options = ["-o", "BatchMode=yes", "-o", "StrictHostKeyChecking=no"]
connect_timeout_secs = 5
command = "/usr/sbin/nfsiostat"
args = ["1", "1"]

[collection]
concurrency = 32
node_timeout_secs = 20
deadline_secs = 120
retries = 2
device = "/data"

[output]
path = "out/nfs.csv"
format = "csv"
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.remote.program, "ssh");
    assert_eq!(config.remote.options.len(), 4);
    assert_eq!(config.remote.connect_timeout_secs, 5);
    assert_eq!(config.remote.args, ["1", "1"]);
    assert_eq!(config.collection.concurrency, 32);
    assert_eq!(config.collection.deadline_secs, Some(120));
    assert_eq!(config.collection.device.as_deref(), Some("/data"));
    assert_eq!(config.output.path, "out/nfs.csv");
    assert_eq!(config.output.format, OutputFormat::Csv);
}

#[test]
fn test_empty_config_uses_defaults() {
    let config = AppConfig::load_from_str("").expect("defaults");
    assert_eq!(config.remote.program, "ssh");
    assert_eq!(config.remote.options, ["-o", "BatchMode=yes"]);
    assert_eq!(config.remote.command, "/usr/sbin/nfsiostat");
    assert_eq!(config.collection.concurrency, 16);
    assert_eq!(config.collection.node_timeout_secs, 30);
    assert_eq!(config.collection.deadline_secs, None);
    assert_eq!(config.collection.retries, 0);
    assert_eq!(config.output.path, "nfs.csv");
    assert_eq!(config.output.format, OutputFormat::Csv);
}

#[test]
fn test_partial_section_keeps_other_defaults() {
    let config = AppConfig::load_from_str("[collection]\nretries = 3\n").unwrap();
    assert_eq!(config.collection.retries, 3);
    assert_eq!(config.collection.concurrency, 16);
    assert_eq!(config.remote.connect_timeout_secs, 3);
}

#[test]
fn test_config_validation_rejects_empty_program() {
    let bad = VALID_CONFIG.replace("program = \"ssh\"", "program = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("remote.program"));
}

#[test]
fn test_config_validation_rejects_empty_command() {
    let bad = VALID_CONFIG.replace("command = \"/usr/sbin/nfsiostat\"", "command = \" \"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("remote.command"));
}

#[test]
fn test_config_validation_rejects_connect_timeout_zero() {
    let bad = VALID_CONFIG.replace("connect_timeout_secs = 5", "connect_timeout_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("remote.connect_timeout_secs"));
}

#[test]
fn test_config_validation_rejects_concurrency_zero() {
    let bad = VALID_CONFIG.replace("concurrency = 32", "concurrency = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("collection.concurrency"));
}

#[test]
fn test_config_validation_rejects_concurrency_above_max() {
    let bad = VALID_CONFIG.replace(
        "concurrency = 32",
        &format!("concurrency = {}", MAX_CONCURRENCY + 1),
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("collection.concurrency"));

    let max = VALID_CONFIG.replace("concurrency = 32", &format!("concurrency = {MAX_CONCURRENCY}"));
    assert!(AppConfig::load_from_str(&max).is_ok());
}

#[test]
fn test_config_validation_rejects_node_timeout_zero() {
    let bad = VALID_CONFIG.replace("node_timeout_secs = 20", "node_timeout_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("collection.node_timeout_secs"));
}

#[test]
fn test_config_validation_rejects_deadline_zero() {
    let bad = VALID_CONFIG.replace("deadline_secs = 120", "deadline_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("collection.deadline_secs"));
}

#[test]
fn test_config_validation_rejects_too_many_retries() {
    let bad = VALID_CONFIG.replace("retries = 2", &format!("retries = {}", MAX_RETRIES + 1));
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("collection.retries"));
}

#[test]
fn test_config_validation_rejects_empty_output_path() {
    let bad = VALID_CONFIG.replace("path = \"out/nfs.csv\"", "path = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("output.path"));
}

#[test]
fn test_config_rejects_unknown_format() {
    let bad = VALID_CONFIG.replace("format = \"csv\"", "format = \"xml\"");
    assert!(AppConfig::load_from_str(&bad).is_err());
}

#[test]
fn test_config_accepts_table_format() {
    let config =
        AppConfig::load_from_str(&VALID_CONFIG.replace("format = \"csv\"", "format = \"table\""))
            .unwrap();
    assert_eq!(config.output.format, OutputFormat::Table);
}

#[test]
fn test_config_rejects_unknown_field() {
    let bad = format!("{VALID_CONFIG}\n[server]\nport = 8080\n");
    assert!(AppConfig::load_from_str(&bad).is_err());
    let bad = VALID_CONFIG.replace("retries = 2", "retries = 2\nretry = 1");
    assert!(AppConfig::load_from_str(&bad).is_err());
}

#[test]
fn test_config_rejects_invalid_toml() {
    assert!(AppConfig::load_from_str("[remote\nprogram = ").is_err());
}

#[test]
fn test_config_load_from_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(VALID_CONFIG.as_bytes()).unwrap();
    let config = AppConfig::load(Some(file.path())).expect("load from path");
    assert_eq!(config.collection.concurrency, 32);
}

#[test]
fn test_config_load_missing_explicit_path_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = AppConfig::load(Some(&missing)).unwrap_err();
    assert!(err.to_string().contains("nope.toml"));
}

#[test]
fn test_config_load_from_env() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(VALID_CONFIG.as_bytes()).unwrap();
    unsafe { std::env::set_var("NFSFLEET_CONFIG", file.path()) };
    let result = AppConfig::load(None);
    unsafe { std::env::remove_var("NFSFLEET_CONFIG") };
    let config = result.expect("load from NFSFLEET_CONFIG");
    assert_eq!(config.collection.retries, 2);
    assert_eq!(config.output.path, "out/nfs.csv");
}

#[test]
fn test_collector_config_mapping() {
    let config = AppConfig::load_from_str(VALID_CONFIG).unwrap();
    let collector = config.collector_config();
    assert_eq!(collector.command.program, "/usr/sbin/nfsiostat");
    assert_eq!(collector.command.args, ["1", "1"]);
    assert_eq!(collector.node_timeout, Duration::from_secs(20));
    assert_eq!(collector.deadline, Some(Duration::from_secs(120)));
    assert_eq!(collector.concurrency, 32);
    assert_eq!(collector.retries, 2);
    assert_eq!(collector.device_filter.as_deref(), Some("/data"));
}
