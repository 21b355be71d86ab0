use std::collections::HashMap;
use std::fs;
use std::net::{Ipv4Addr, Ipv6Addr};

use anyhow::{Context, Result};

use super::docker;
use super::enrich::ProcessEnricher;
use super::{PortInfo, Scanner, dedupe};

const TCP_LISTEN: &str = "0A";

/// Reads listening TCP sockets from `/proc/net/tcp{,6}` and attributes them to
/// processes through the socket inodes in `/proc/<pid>/fd`.
pub struct ProcfsScanner;

impl Scanner for ProcfsScanner {
    fn scan(&self) -> Result<Vec<PortInfo>> {
        let mut sockets = Vec::new();
        let v4 = fs::read_to_string("/proc/net/tcp").context("reading /proc/net/tcp")?;
        sockets.extend(parse_proc_net_tcp(&v4));
        // tcp6 is absent when ipv6 is disabled
        if let Ok(v6) = fs::read_to_string("/proc/net/tcp6") {
            sockets.extend(parse_proc_net_tcp(&v6));
        }

        let owners = socket_owners();
        let mut ports: Vec<PortInfo> = sockets
            .into_iter()
            .filter_map(|socket| {
                let pid = *owners.get(&socket.inode)?;
                Some(PortInfo {
                    port: socket.port,
                    pid,
                    protocol: "tcp".to_string(),
                    address: socket.address,
                    ..PortInfo::default()
                })
            })
            .collect();
        ports = dedupe(ports);

        if !ports.is_empty() {
            ProcessEnricher::new().enrich(&mut ports);
            docker::enrich(&mut ports);
        }
        Ok(ports)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListeningSocket {
    pub address: String,
    pub port: u16,
    pub inode: u64,
}

/// Parses the table format shared by `/proc/net/tcp` and `/proc/net/tcp6`,
/// keeping only sockets in LISTEN state.
pub fn parse_proc_net_tcp(content: &str) -> Vec<ListeningSocket> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 || fields[3] != TCP_LISTEN {
                return None;
            }
            let (addr_hex, port_hex) = fields[1].split_once(':')?;
            let port = u16::from_str_radix(port_hex, 16).ok()?;
            let address = decode_address(addr_hex)?;
            let inode = fields[9].parse::<u64>().ok()?;
            if inode == 0 {
                return None;
            }
            Some(ListeningSocket {
                address,
                port,
                inode,
            })
        })
        .collect()
}

/// Kernel addresses are printed as native-endian 32-bit words.
fn decode_address(hex: &str) -> Option<String> {
    match hex.len() {
        8 => {
            let word = u32::from_str_radix(hex, 16).ok()?;
            let addr = Ipv4Addr::from(word.to_le_bytes());
            if addr.is_unspecified() {
                Some("*".to_string())
            } else {
                Some(addr.to_string())
            }
        }
        32 => {
            let mut octets = [0u8; 16];
            for (chunk, idx) in (0..32).step_by(8).zip(0..4) {
                let word = u32::from_str_radix(&hex[chunk..chunk + 8], 16).ok()?;
                octets[idx * 4..idx * 4 + 4].copy_from_slice(&word.to_le_bytes());
            }
            let addr = Ipv6Addr::from(octets);
            match addr.to_ipv4_mapped() {
                Some(v4) => Some(v4.to_string()),
                None => Some(format!("[{}]", addr)),
            }
        }
        _ => None,
    }
}

/// Maps socket inode to owning pid. Processes whose fd table we cannot read
/// are skipped.
fn socket_owners() -> HashMap<u64, u32> {
    let mut owners = HashMap::new();
    let Ok(entries) = fs::read_dir("/proc") else {
        return owners;
    };

    for entry in entries.flatten() {
        let Some(pid) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<u32>().ok())
        else {
            continue;
        };
        let Ok(fds) = fs::read_dir(entry.path().join("fd")) else {
            continue;
        };
        for fd in fds.flatten() {
            let Ok(target) = fs::read_link(fd.path()) else {
                continue;
            };
            if let Some(inode) = target.to_str().and_then(parse_socket_link) {
                owners.entry(inode).or_insert(pid);
            }
        }
    }

    owners
}

fn parse_socket_link(link: &str) -> Option<u64> {
    link.strip_prefix("socket:[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TCP: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 0100007F:0BB8 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 41231 1 0000000000000000 100 0 0 10 0
   1: 00000000:1538 00000000:0000 0A 00000000:00000000 00:00000000 00000000   999        0 41876 1 0000000000000000 100 0 0 10 0
   2: 0100007F:0BB8 0100007F:D2F0 01 00000000:00000000 00:00000000 00000000  1000        0 51231 1 0000000000000000 20 4 30 10 -1
";

    const TCP6: &str = "  sl  local_address                         remote_address                        st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 00000000000000000000000001000000:18EB 00000000000000000000000000000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 77001 1 0000000000000000 100 0 0 10 0
   1: 00000000000000000000000000000000:0050 00000000000000000000000000000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 77002 1 0000000000000000 100 0 0 10 0
";

    #[test]
    fn parses_ipv4_listeners_only() {
        let sockets = parse_proc_net_tcp(TCP);
        assert_eq!(
            sockets,
            vec![
                ListeningSocket {
                    address: "127.0.0.1".to_string(),
                    port: 3000,
                    inode: 41231,
                },
                ListeningSocket {
                    address: "*".to_string(),
                    port: 5432,
                    inode: 41876,
                },
            ]
        );
    }

    #[test]
    fn parses_ipv6_listeners() {
        let sockets = parse_proc_net_tcp(TCP6);
        assert_eq!(sockets.len(), 2);
        assert_eq!(sockets[0].address, "[::1]");
        assert_eq!(sockets[0].port, 6379);
        assert_eq!(sockets[1].address, "[::]");
        assert_eq!(sockets[1].port, 80);
    }

    #[test]
    fn skips_malformed_rows() {
        let content = "header\n   0: garbage 0A\n   1: 0100007F:ZZZZ 00000000:0000 0A 0 0 0 0 0 1\n";
        assert!(parse_proc_net_tcp(content).is_empty());
    }

    #[test]
    fn socket_link_parsing() {
        assert_eq!(parse_socket_link("socket:[41231]"), Some(41231));
        assert_eq!(parse_socket_link("pipe:[41231]"), None);
        assert_eq!(parse_socket_link("/dev/null"), None);
    }
}
