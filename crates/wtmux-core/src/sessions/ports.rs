//! Listening-port discovery for session process trees.
//!
//! The process tree comes from sysinfo; listening sockets come from `lsof`,
//! which is available on every platform wtmux targets.

use std::collections::BTreeSet;
use std::process::Command;
use std::sync::{LazyLock, Mutex};

use sysinfo::{ProcessesToUpdate, System};
use tracing::debug;

use super::errors::PortError;

static SYSTEM: LazyLock<Mutex<System>> = LazyLock::new(|| Mutex::new(System::new()));

/// Finds TCP ports in LISTEN state owned by a process or its descendants.
pub trait PortScanner: Send + Sync {
    fn listening_ports(&self, root_pid: u32) -> Result<BTreeSet<u16>, PortError>;
}

#[derive(Debug, Clone, Default)]
pub struct SystemPortScanner;

impl SystemPortScanner {
    pub fn new() -> Self {
        Self
    }

    fn process_tree(&self, root_pid: u32) -> Result<Vec<u32>, PortError> {
        let mut system = SYSTEM.lock().map_err(|e| PortError::ScanFailed {
            message: format!("process table lock poisoned: {}", e),
        })?;
        system.refresh_processes(ProcessesToUpdate::All, true);
        let parents: Vec<(u32, Option<u32>)> = system
            .processes()
            .iter()
            .map(|(pid, process)| (pid.as_u32(), process.parent().map(|p| p.as_u32())))
            .collect();
        Ok(descendants(root_pid, &parents))
    }
}

impl PortScanner for SystemPortScanner {
    fn listening_ports(&self, root_pid: u32) -> Result<BTreeSet<u16>, PortError> {
        let pids = self.process_tree(root_pid)?;
        let pid_list = pids
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let output = Command::new("lsof")
            .args(["-nP", "-a", "-iTCP", "-sTCP:LISTEN", "-Fn", "-p", &pid_list])
            .output()
            .map_err(|e| PortError::ToolUnavailable {
                message: format!("lsof: {}", e),
            })?;

        // lsof exits 1 when nothing matched or a pid vanished mid-scan;
        // whatever it printed is still valid.
        if !output.status.success() {
            debug!(
                event = "core.ports.lsof_nonzero_exit",
                root_pid = root_pid,
                status = ?output.status.code(),
            );
        }

        let ports = parse_lsof_listen(&String::from_utf8_lossy(&output.stdout));
        debug!(
            event = "core.ports.scan_completed",
            root_pid = root_pid,
            process_count = pids.len(),
            port_count = ports.len(),
        );
        Ok(ports)
    }
}

/// `root` plus every transitive child in the `(pid, parent)` table.
pub fn descendants(root: u32, parents: &[(u32, Option<u32>)]) -> Vec<u32> {
    let mut tree = vec![root];
    let mut cursor = 0;
    while cursor < tree.len() {
        let current = tree[cursor];
        for (pid, parent) in parents {
            if *parent == Some(current) && !tree.contains(pid) {
                tree.push(*pid);
            }
        }
        cursor += 1;
    }
    tree
}

/// Ports from `lsof -Fn` output: name lines look like `n*:3000`,
/// `n127.0.0.1:5173` or `n[::1]:8080`.
pub fn parse_lsof_listen(output: &str) -> BTreeSet<u16> {
    output
        .lines()
        .filter_map(|line| line.strip_prefix('n'))
        .filter_map(|name| name.rsplit_once(':'))
        .filter_map(|(_, port)| port.parse::<u16>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lsof_listen_handles_address_forms() {
        let output = "p4242\nf23\nn*:3000\nf24\nn127.0.0.1:5173\nf25\nn[::1]:8080\np4243\nf7\nn*:3000\n";
        let ports = parse_lsof_listen(output);
        assert_eq!(ports.into_iter().collect::<Vec<_>>(), vec![3000, 5173, 8080]);
    }

    #[test]
    fn test_parse_lsof_listen_ignores_noise() {
        assert!(parse_lsof_listen("").is_empty());
        assert!(parse_lsof_listen("p1\nf3\nn*:*\nnlocalhost:http\n").is_empty());
    }

    #[test]
    fn test_descendants_walks_whole_tree() {
        let table = vec![
            (1, None),
            (10, Some(1)),
            (11, Some(10)),
            (12, Some(11)),
            (13, Some(10)),
            (20, Some(1)),
        ];
        let mut tree = descendants(10, &table);
        tree.sort();
        assert_eq!(tree, vec![10, 11, 12, 13]);
    }

    #[test]
    fn test_descendants_of_leaf_is_itself() {
        assert_eq!(descendants(99, &[(99, Some(1))]), vec![99]);
    }
}
