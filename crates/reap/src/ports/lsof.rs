#![cfg_attr(target_os = "linux", allow(dead_code))]

use std::process::Command;

use anyhow::{Context, Result, bail};

use super::docker;
use super::enrich::ProcessEnricher;
use super::{PortInfo, Scanner, dedupe};

/// Scanner backed by `lsof`, used where procfs is unavailable.
pub struct LsofScanner;

impl Scanner for LsofScanner {
    fn scan(&self) -> Result<Vec<PortInfo>> {
        let output = Command::new("lsof")
            .args(["-iTCP", "-sTCP:LISTEN", "-P", "-n"])
            .output()
            .context("running lsof")?;
        // lsof exits 1 with no output when nothing matches
        if !output.status.success() && output.stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                bail!("lsof failed: {}", stderr.trim());
            }
        }

        let mut ports = parse_lsof_output(&String::from_utf8_lossy(&output.stdout));
        if !ports.is_empty() {
            ProcessEnricher::new().enrich(&mut ports);
            docker::enrich(&mut ports);
        }
        Ok(ports)
    }
}

/// Parses tabular `lsof -iTCP -sTCP:LISTEN -P -n` output. The first line is a
/// header; unparseable rows are dropped.
pub fn parse_lsof_output(output: &str) -> Vec<PortInfo> {
    let entries = output
        .trim()
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 9 {
                log::trace!("skipping short lsof row: {line}");
                return None;
            }
            let pid = fields[1].parse::<u32>().ok()?;
            let (address, port) = parse_name_field(fields[8]);
            let port = port.parse::<u16>().ok()?;
            Some(PortInfo {
                port,
                pid,
                process: fields[0].to_string(),
                user: fields[2].to_string(),
                protocol: fields[7].to_lowercase(),
                address: address.to_string(),
                ..PortInfo::default()
            })
        })
        .collect();

    dedupe(entries)
}

/// Splits `addr:port` from the NAME column, handling `[::1]:8080`,
/// `127.0.0.1:8080` and `*:8080`.
pub fn parse_name_field(name: &str) -> (&str, &str) {
    let name = match name.find('(') {
        Some(idx) => &name[..idx],
        None => name,
    };

    if name.starts_with('[') {
        if let Some(close) = name.rfind(']') {
            let port = name.get(close + 2..).unwrap_or("");
            return (&name[..=close], port);
        }
    }

    match name.rfind(':') {
        Some(idx) => (&name[..idx], &name[idx + 1..]),
        None => (name, ""),
    }
}
