use std::collections::HashMap;
use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;

use super::PortInfo;

static HOST_PORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r":(\d+)->").expect("host port pattern is valid")
});

/// Sets `container` on every record whose port is published by a running
/// container. Does nothing when docker is missing or not running.
pub fn enrich(ports: &mut [PortInfo]) {
    let output = match Command::new("docker")
        .args(["ps", "--format", "{{.Names}}\t{{.Ports}}"])
        .output()
    {
        Ok(output) if output.status.success() => output,
        Ok(_) => return,
        Err(err) => {
            log::trace!("docker unavailable: {err}");
            return;
        }
    };

    let map = parse_docker_ps(&String::from_utf8_lossy(&output.stdout));
    for entry in ports.iter_mut() {
        if let Some(name) = map.get(&entry.port) {
            entry.container = name.clone();
        }
    }
}

/// Parses `docker ps --format "{{.Names}}\t{{.Ports}}"` into host port → name.
/// Port mappings look like `0.0.0.0:3000->3000/tcp, :::3000->3000/tcp`.
pub fn parse_docker_ps(output: &str) -> HashMap<u16, String> {
    let mut map = HashMap::new();
    for line in output.trim().lines() {
        let Some((name, mappings)) = line.split_once('\t') else {
            continue;
        };
        for mapping in mappings.split(", ") {
            if let Some(port) = extract_host_port(mapping) {
                map.insert(port, name.to_string());
            }
        }
    }
    map
}

pub fn extract_host_port(mapping: &str) -> Option<u16> {
    HOST_PORT
        .captures(mapping)
        .and_then(|caps| caps[1].parse::<u16>().ok())
        .filter(|port| *port > 0)
}
