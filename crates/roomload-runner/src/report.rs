//! Plain-text tables printed at the end of a run or suite.

use roomload_stats::{format_bitrate, format_loss_pair, format_loss_percent};

use crate::orchestrator::{ParticipantOutcome, RunOutcome};
use crate::suite::CaseResult;

/// Column-aligned text table. Every cell but the last in a row is padded to
/// the widest cell of its column plus one space.
#[derive(Debug, Default)]
struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    fn with_header(header: &[&str]) -> Self {
        Self {
            rows: vec![header.iter().map(|cell| cell.to_string()).collect()],
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn render(&self) -> String {
        let mut widths: Vec<usize> = Vec::new();
        for row in &self.rows {
            let aligned = row.len().saturating_sub(1);
            for (idx, cell) in row.iter().take(aligned).enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(idx) {
                    Some(width) => *width = (*width).max(len),
                    None => widths.push(len),
                }
            }
        }

        let mut out = String::new();
        for row in &self.rows {
            let mut line = String::new();
            let last = row.len().saturating_sub(1);
            for (idx, cell) in row.iter().enumerate() {
                if idx == last {
                    line.push_str(cell);
                } else {
                    let width = widths[idx] + 1;
                    line.push_str(&format!("{cell:<width$}"));
                }
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

/// Per-participant track tables followed by the summary table.
pub fn render_run_report(outcome: &RunOutcome) -> String {
    let mut participants: Vec<&ParticipantOutcome> = outcome.participants.iter().collect();
    participants.sort_by(|a, b| a.name.cmp(&b.name));

    let mut out = String::new();
    for participant in participants.iter().filter(|p| !p.snapshot.tracks.is_empty()) {
        out.push('\n');
        out.push_str(&render_participant(outcome, participant));
    }
    if participants.is_empty() {
        return out;
    }

    let mut table = Table::with_header(&[
        "Summary",
        "| Tester",
        "| Tracks",
        "| Bitrate",
        "| Total Dropped",
        "| Error",
    ]);
    for participant in &participants {
        let s = &participant.summary;
        table.push(vec![
            String::new(),
            format!("| {}", participant.name),
            format!("| {}/{}", s.tracks, s.expected),
            format!("| {}", format_bitrate(s.bytes, s.elapsed)),
            format!("| {}", format_loss_pair(s.packets, s.dropped)),
            format!("| {}", s.err_string),
        ]);
    }

    let total = outcome.suite_summary();
    let average = total.bytes / participants.len() as u64;
    table.push(vec![
        String::new(),
        "| Total".to_string(),
        format!("| {}/{}", total.tracks, total.expected),
        format!(
            "| {} ({} avg)",
            format_bitrate(total.bytes, total.elapsed),
            format_bitrate(average, total.elapsed)
        ),
        format!("| {}", format_loss_pair(total.packets, total.dropped)),
        format!("| {}", total.err_count),
    ]);

    out.push('\n');
    out.push_str(&table.render());
    out
}

fn render_participant(outcome: &RunOutcome, participant: &ParticipantOutcome) -> String {
    let mut tracks: Vec<_> = participant
        .snapshot
        .tracks
        .iter()
        .map(|track| (outcome.label_for(&track.track_id), track))
        .collect();
    tracks.sort_by(|(label_a, a), (label_b, b)| {
        (label_a.is_none(), label_a, &a.track_id).cmp(&(label_b.is_none(), label_b, &b.track_id))
    });

    let mut table = Table::with_header(&[
        participant.name.as_str(),
        "| Track",
        "| Kind",
        "| Pkts",
        "| Bitrate",
        "| Dropped",
    ]);
    for (label, track) in tracks {
        let name = match label {
            Some(label) => format!("| {label} {}", track.track_id),
            None => format!("| {}", track.track_id),
        };
        table.push(vec![
            String::new(),
            name,
            format!("| {}", track.kind),
            format!("| {}", track.packets),
            format!("| {}", format_bitrate(track.bytes, track.elapsed)),
            format!("| {}", format_loss_pair(track.packets, track.dropped)),
        ]);
    }
    table.render()
}

/// One row per completed suite case.
pub fn render_suite_table(results: &[CaseResult]) -> String {
    let mut table = Table::with_header(&[
        "Pubs",
        "| Subs",
        "| Tracks",
        "| Audio",
        "| Video",
        "| Packet loss",
        "| Errors",
    ]);
    for result in results {
        table.push(vec![
            result.case.publishers.to_string(),
            format!("| {}", result.case.subscribers),
            format!("| {}", result.tracks),
            "| Yes".to_string(),
            format!("| {}", if result.case.video { "Yes" } else { "No" }),
            format!("| {}", format_loss_percent(result.packets, result.dropped)),
            format!("| {}", result.errors),
        ]);
    }
    format!("\n{}", table.render())
}
