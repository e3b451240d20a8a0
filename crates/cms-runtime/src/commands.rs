//! JSON-lines command source.
//!
//! Each non-blank line is one lifecycle command in the bridge's wire form.
//! Malformed lines are logged and skipped.

use std::io::BufRead;

use bundle_framework::{BridgeError, CommandSender, LifecycleCommand};
use tracing::{debug, info, warn};

/// Outcome of draining a command source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStats {
    pub forwarded: usize,
    pub rejected: usize,
}

/// Forward every command read from `reader` to the bridge. Runs on a plain
/// thread; returns at end of input, on a read error or once the bridge has
/// closed.
pub fn forward_lines<R: BufRead>(reader: R, sender: &CommandSender) -> LineStats {
    let mut stats = LineStats::default();

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Command source read failed, stopping");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match LifecycleCommand::from_json(line) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, line, "Rejected command line");
                stats.rejected += 1;
                continue;
            }
        };

        debug!(?command, "Forwarding command");
        if let Err(BridgeError::Closed) = sender.blocking_send(command) {
            info!("Command bridge closed, command source stopping");
            break;
        }
        stats.forwarded += 1;
    }

    stats
}
