//! CLI tests driving the `autodiscover` binary over recorded captures

use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const CAPTURE: &str = r#"# pid 42 nginx, pid 50 docker-proxy
{"pid":42,"comm":"nginx-1.21","protocol":"tcp","src_addr":"127.0.0.1","src_port":8080,"dst_addr":"0.0.0.0","dst_port":0,"old_state":"CLOSE","new_state":"LISTEN"}
{"pid":42,"comm":"nginx-1.21","protocol":"tcp","src_addr":"127.0.0.1","src_port":8080,"dst_addr":"10.0.0.9","dst_port":51000,"old_state":"SYN_RECV","new_state":"ESTABLISHED"}
{"pid":50,"comm":"docker-proxy","protocol":"tcp","src_addr":"0.0.0.0","src_port":80,"dst_addr":"0.0.0.0","dst_port":0,"old_state":"CLOSE","new_state":"LISTEN"}
{"pid":42,"comm":"nginx-1.21","protocol":"tcp","src_addr":"127.0.0.1","src_port":8080,"dst_addr":"0.0.0.0","dst_port":0,"old_state":"LISTEN","new_state":"CLOSE"}
"#;

const CATALOG: &str = r#"
modules:
  nginx:
    metricsets: [stubstatus]
    default_metricsets: [stubstatus]
  redis:
    metricsets: [info, keyspace]
    default_metricsets: [info]
"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("capture.jsonl"), CAPTURE)?;
        std::fs::write(dir.path().join("modules.yml"), CATALOG)?;
        Ok(Self { dir })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path(name);
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}

fn autodiscover(args: &[&str]) -> Result<Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_autodiscover"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()?)
}

fn json_lines(output: &Output) -> Result<Vec<Value>> {
    String::from_utf8(output.stdout.clone())?
        .lines()
        .map(|line| serde_json::from_str(line).map_err(anyhow::Error::from))
        .collect()
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_discover_prints_config_changes() -> Result<()> {
    let fixture = Fixture::new()?;
    let capture = fixture.path("capture.jsonl");
    let catalog = fixture.path("modules.yml");

    let output = autodiscover(&[
        "discover",
        "--replay",
        arg(&capture),
        "--catalog",
        arg(&catalog),
    ])?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let changes = json_lines(&output)?;
    assert_eq!(changes.len(), 2);

    assert_eq!(changes[0]["action"], "start");
    assert_eq!(changes[0]["id"], "42:8080");
    let config = &changes[0]["configs"][0];
    assert_eq!(config["module"], "nginx");
    assert_eq!(config["metricsets"], serde_json::json!(["stubstatus"]));
    assert_eq!(config["hosts"], serde_json::json!(["127.0.0.1:8080"]));
    assert_eq!(config["fields"]["process"]["pid"], 42);
    assert_eq!(config["enabled"], true);
    assert_eq!(config["fields_under_root"], true);

    assert_eq!(changes[1]["action"], "stop");
    assert_eq!(changes[1]["id"], "42:8080");
    Ok(())
}

#[test]
fn test_discover_with_config_file() -> Result<()> {
    let fixture = Fixture::new()?;
    let config = fixture.write(
        "autodiscover.yml",
        r#"
builder:
  ignore_commands: [nginx-1.21]
"#,
    )?;
    let capture = fixture.path("capture.jsonl");
    let catalog = fixture.path("modules.yml");

    let output = autodiscover(&[
        "--config",
        arg(&config),
        "discover",
        "--replay",
        arg(&capture),
        "--catalog",
        arg(&catalog),
    ])?;
    assert!(output.status.success());

    // nginx is ignored and docker-proxy is no longer on the ignore list
    let changes = json_lines(&output)?;
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["configs"][0]["module"], "docker-proxy");
    assert_eq!(changes[0]["configs"][0]["hosts"], serde_json::json!(["0.0.0.0:80"]));
    Ok(())
}

#[test]
fn test_classify_prints_discovery_events() -> Result<()> {
    let fixture = Fixture::new()?;
    let capture = fixture.path("capture.jsonl");

    let output = autodiscover(&["classify", "--replay", arg(&capture)])?;
    assert!(output.status.success());

    let events = json_lines(&output)?;
    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["start"], true);
    assert_eq!(events[1]["comm"], "docker-proxy");
    assert_eq!(events[2]["stop"], true);
    assert_eq!(events[0]["provider"], events[2]["provider"]);
    Ok(())
}

#[test]
fn test_collect_prints_every_transition() -> Result<()> {
    let fixture = Fixture::new()?;
    let capture = fixture.path("capture.jsonl");

    let output = autodiscover(&["collect", "--replay", arg(&capture)])?;
    assert!(output.status.success());

    let events = json_lines(&output)?;
    assert_eq!(events.len(), 4);
    assert_eq!(events[1]["fields"]["old_state"], "SYN_RECV");
    assert_eq!(events[1]["fields"]["destination_port"], 51000);
    assert_eq!(events[1]["metricset"], "socket.collector");
    Ok(())
}

#[test]
fn test_modules_table() -> Result<()> {
    let fixture = Fixture::new()?;
    let catalog = fixture.path("modules.yml");

    let output = autodiscover(&["modules", "--catalog", arg(&catalog)])?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("nginx"));
    assert!(stdout.contains("keyspace"));
    Ok(())
}

#[test]
fn test_missing_capture_fails() -> Result<()> {
    let fixture = Fixture::new()?;
    let catalog = fixture.path("modules.yml");
    let missing = fixture.path("missing.jsonl");

    let output = autodiscover(&[
        "discover",
        "--replay",
        arg(&missing),
        "--catalog",
        arg(&catalog),
    ])?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to start socket provider"));
    Ok(())
}

#[test]
fn test_template_without_config_entries_fails() -> Result<()> {
    let fixture = Fixture::new()?;
    let config = fixture.write(
        "autodiscover.yml",
        r#"
templates:
  - condition:
      contains:
        comm: nginx
    config: []
"#,
    )?;
    let capture = fixture.path("capture.jsonl");
    let catalog = fixture.path("modules.yml");

    let output = autodiscover(&[
        "--config",
        arg(&config),
        "discover",
        "--replay",
        arg(&capture),
        "--catalog",
        arg(&catalog),
    ])?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid config templates"));
    Ok(())
}
