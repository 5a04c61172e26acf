use tracing::{debug, warn};

use crate::host::CommandSink;

/// Result of forwarding one batch of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub skipped_empty: usize,
    pub failed: Vec<String>,
}

/// Forwards accepted oracle lines to the host, verbatim and in order.
///
/// No validation happens here; whatever the query loop returned, including
/// a response forwarded on retry exhaustion, is sent as is. Only empty lines
/// are dropped; whitespace is content. A line the host refuses is logged and
/// the rest still go out.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandDispatcher;

impl CommandDispatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn dispatch<S, L>(&self, lines: &[L], sink: &mut S) -> DispatchReport
    where
        S: CommandSink + ?Sized,
        L: AsRef<str>,
    {
        let mut report = DispatchReport::default();
        for line in lines {
            let line = line.as_ref();
            if line.is_empty() {
                report.skipped_empty += 1;
                continue;
            }
            match sink.submit(line) {
                Ok(()) => {
                    debug!(command = line, "sent command");
                    report.sent += 1;
                }
                Err(e) => {
                    warn!(command = line, error = %e, "host refused command");
                    report.failed.push(line.to_string());
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    #[test]
    fn test_lines_forwarded_verbatim_in_order() {
        let mut host = MemoryHost::default();
        let lines = vec!["HDG DL456 240", "", "HDG DL123  060 ", ""];
        let report = CommandDispatcher::new().dispatch(&lines, &mut host);
        assert_eq!(host.commands, vec!["HDG DL456 240", "HDG DL123  060 "]);
        assert_eq!(report.sent, 2);
        assert_eq!(report.skipped_empty, 2);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_whitespace_only_line_is_sent_unchanged() {
        let mut host = MemoryHost::default();
        let lines = vec!["HDG A 090", "   ", "HDG B 270"];
        let report = CommandDispatcher::new().dispatch(&lines, &mut host);
        assert_eq!(host.commands, vec!["HDG A 090", "   ", "HDG B 270"]);
        assert_eq!(report.sent, 3);
        assert_eq!(report.skipped_empty, 0);
    }

    #[test]
    fn test_refused_line_does_not_stop_batch() {
        let mut host = MemoryHost {
            rejected_verbs: vec!["TURN".to_string()],
            ..MemoryHost::default()
        };
        let lines = vec!["TURN AB1 090".to_string(), "HDG AB2 270".to_string()];
        let report = CommandDispatcher::new().dispatch(&lines, &mut host);
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, vec!["TURN AB1 090"]);
        assert_eq!(host.commands, vec!["HDG AB2 270"]);
    }
}
