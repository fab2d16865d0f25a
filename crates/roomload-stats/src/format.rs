use std::time::Duration;

/// Fraction of packets lost: `dropped / (dropped + packets)`, zero when no
/// packets were seen at all.
pub fn loss_ratio(packets: u64, dropped: u64) -> f64 {
    let total = packets + dropped;
    if total == 0 {
        0.0
    } else {
        dropped as f64 / total as f64
    }
}

/// Renders `bytes` over `elapsed` as `bps`, `Kbps` or `Mbps`.
pub fn format_bitrate(bytes: u64, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return "0 bps".to_string();
    }
    let bps = bytes as f64 * 8.0 / secs;
    if bps < 1_000.0 {
        format!("{} bps", bps as u64)
    } else if bps < 1_000_000.0 {
        format!("{:.1} Kbps", bps / 1_000.0)
    } else {
        format!("{:.1} Mbps", bps / 1_000_000.0)
    }
}

/// Renders loss as `<dropped>/<dropped + packets>`.
pub fn format_loss_pair(packets: u64, dropped: u64) -> String {
    format!("{}/{}", dropped, dropped + packets)
}

/// Renders loss as a percentage with three decimals.
pub fn format_loss_percent(packets: u64, dropped: u64) -> String {
    format!("{:.3}%", 100.0 * loss_ratio(packets, dropped))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{format_bitrate, format_loss_pair, format_loss_percent, loss_ratio};

    #[test]
    fn loss_ratio_is_zero_without_packets() {
        assert_eq!(loss_ratio(0, 0), 0.0);
        assert_eq!(loss_ratio(100, 0), 0.0);
        assert_eq!(loss_ratio(0, 7), 1.0);
        assert!((loss_ratio(95, 5) - 0.05).abs() < f64::EPSILON);
    }

    #[test]
    fn loss_ratio_matches_definition_across_inputs() {
        for packets in [0_u64, 1, 9, 250, 10_000] {
            for dropped in [0_u64, 1, 3, 999] {
                let ratio = loss_ratio(packets, dropped);
                if packets + dropped == 0 {
                    assert_eq!(ratio, 0.0);
                } else {
                    let expected = dropped as f64 / (dropped + packets) as f64;
                    assert!((ratio - expected).abs() < 1e-12);
                    assert!((0.0..=1.0).contains(&ratio));
                }
            }
        }
    }

    #[test]
    fn bitrate_picks_unit_by_magnitude() {
        let second = Duration::from_secs(1);
        assert_eq!(format_bitrate(100, second), "800 bps");
        assert_eq!(format_bitrate(4_000, second), "32.0 Kbps");
        assert_eq!(format_bitrate(250_000, second), "2.0 Mbps");
        assert_eq!(format_bitrate(1_000_000, Duration::from_secs(4)), "2.0 Mbps");
    }

    #[test]
    fn zero_elapsed_renders_zero_bitrate() {
        assert_eq!(format_bitrate(12_345, Duration::ZERO), "0 bps");
        assert_eq!(format_bitrate(0, Duration::ZERO), "0 bps");
    }

    #[test]
    fn loss_pair_shows_dropped_over_total() {
        assert_eq!(format_loss_pair(95, 5), "5/100");
        assert_eq!(format_loss_pair(0, 0), "0/0");
    }

    #[test]
    fn loss_percent_has_three_decimals() {
        assert_eq!(format_loss_percent(95, 5), "5.000%");
        assert_eq!(format_loss_percent(0, 0), "0.000%");
        assert_eq!(format_loss_percent(2_999, 1), "0.033%");
    }
}
