use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use crate::config::Config;
use crate::ports::{PortInfo, Scanner};
use crate::signals::{self, Signal};
use crate::table::PortTable;

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub port: Option<u16>,
    pub name: Option<String>,
    pub json: bool,
    pub tree: bool,
}

#[derive(Debug, Clone, Default)]
pub struct KillOptions {
    pub ports: Vec<String>,
    pub force: bool,
    pub yes: bool,
}

/// One scan, printed as JSON or as an aligned table.
pub fn list(scanner: &dyn Scanner, config: &Config, options: &ListOptions) -> Result<()> {
    let records = scanner.scan().context("scan failed")?;
    let filtered = filter_records(records, options.port, options.name.as_deref());

    let mut out = io::stdout().lock();
    if options.json {
        serde_json::to_writer_pretty(&mut out, &filtered)?;
        writeln!(out)?;
    } else {
        let mut table = PortTable::new(config);
        table.set_tree_mode(options.tree);
        table.set_rows(&filtered);
        write!(out, "{}", table.render_listing())?;
    }
    Ok(())
}

/// Exact port match and case-insensitive process name substring.
pub fn filter_records(records: Vec<PortInfo>, port: Option<u16>, name: Option<&str>) -> Vec<PortInfo> {
    let name = name.map(str::to_lowercase);
    records
        .into_iter()
        .filter(|record| port.is_none_or(|port| record.port == port))
        .filter(|record| {
            name.as_deref()
                .is_none_or(|name| record.process.to_lowercase().contains(name))
        })
        .collect()
}

pub fn kill(scanner: &dyn Scanner, options: &KillOptions) -> Result<()> {
    let records = scanner.scan().context("scan failed")?;
    let mut input = io::stdin().lock();
    let mut out = io::stdout().lock();
    let mut err = io::stderr().lock();
    kill_ports(
        &records,
        options,
        &mut input,
        &mut out,
        &mut err,
        signals::terminate,
    )
}

fn kill_ports<R, W, E, F>(
    records: &[PortInfo],
    options: &KillOptions,
    input: &mut R,
    out: &mut W,
    err: &mut E,
    terminate: F,
) -> Result<()>
where
    R: BufRead,
    W: Write,
    E: Write,
    F: Fn(u32, bool) -> Result<(), String>,
{
    let signal = Signal::for_force(options.force);

    for arg in &options.ports {
        let Some(port) = arg.parse::<u16>().ok().filter(|port| *port != 0) else {
            writeln!(err, "invalid port: {arg}")?;
            continue;
        };
        let targets: Vec<&PortInfo> = records.iter().filter(|r| r.port == port).collect();
        if targets.is_empty() {
            writeln!(err, "no process found on port {port}")?;
            continue;
        }

        for target in targets {
            if !options.yes && !confirm(target, input, out)? {
                writeln!(out, "skipped")?;
                continue;
            }
            match terminate(target.pid, options.force) {
                Ok(()) => writeln!(
                    out,
                    "sent {} to {} (PID {})",
                    signal.name(),
                    target.process,
                    target.pid
                )?,
                Err(reason) => writeln!(err, "failed to kill PID {}: {}", target.pid, reason)?,
            }
        }
    }
    Ok(())
}

fn confirm<R: BufRead, W: Write>(target: &PortInfo, input: &mut R, out: &mut W) -> Result<bool> {
    write!(
        out,
        "kill {} (PID {}) on port {}? [y/N] ",
        target.process, target.pid, target.port
    )?;
    out.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y"))
}
