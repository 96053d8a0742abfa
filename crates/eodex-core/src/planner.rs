use crate::{TradingDate, VendorBar};

/// Filter an incoming vendor series down to bars not yet stored.
///
/// With no stored history the full sequence is eligible; otherwise only bars
/// dated strictly after `latest_stored` pass, so a bar dated exactly on the
/// latest stored date is treated as already present. The sequence is assumed
/// date-ordered and is filtered, never re-sorted; gaps pass through
/// unchanged.
pub fn eligible_bars(
    latest_stored: Option<TradingDate>,
    incoming: Vec<VendorBar>,
) -> Vec<VendorBar> {
    match latest_stored {
        None => incoming,
        Some(latest) => incoming
            .into_iter()
            .filter(|bar| bar.date > latest)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str) -> VendorBar {
        VendorBar {
            date: TradingDate::parse(date).expect("date"),
            unadjusted_open: 10.0,
            unadjusted_high: 11.0,
            unadjusted_low: 9.0,
            unadjusted_close: 10.5,
            unadjusted_volume: 1_000,
            dividend: 0.0,
            split_adjustment_factor: 1.0,
            adjusted_open: 10.0,
            adjusted_high: 11.0,
            adjusted_low: 9.0,
            adjusted_close: 10.5,
            adjusted_volume: 1_000.0,
        }
    }

    fn dates(bars: &[VendorBar]) -> Vec<String> {
        bars.iter().map(|bar| bar.date.format_iso()).collect()
    }

    #[test]
    fn full_sequence_is_eligible_without_history() {
        let incoming = vec![bar("2020-03-09"), bar("2020-03-10")];
        let eligible = eligible_bars(None, incoming.clone());
        assert_eq!(eligible, incoming);
    }

    #[test]
    fn filter_is_strictly_after_latest_stored() {
        let latest = TradingDate::parse("2020-03-10").expect("date");
        let incoming = vec![bar("2020-03-09"), bar("2020-03-10"), bar("2020-03-11")];

        let eligible = eligible_bars(Some(latest), incoming);
        assert_eq!(dates(&eligible), vec!["2020-03-11"]);
    }

    #[test]
    fn repeated_planning_is_idempotent() {
        let latest = Some(TradingDate::parse("2020-03-10").expect("date"));
        let incoming = vec![bar("2020-03-10"), bar("2020-03-11"), bar("2020-03-12")];

        let first = eligible_bars(latest, incoming.clone());
        let second = eligible_bars(latest, incoming);
        assert_eq!(first, second);
    }

    #[test]
    fn gaps_pass_through_unchanged() {
        let latest = Some(TradingDate::parse("2020-03-01").expect("date"));
        let incoming = vec![bar("2020-03-02"), bar("2020-03-20")];

        let eligible = eligible_bars(latest, incoming);
        assert_eq!(dates(&eligible), vec!["2020-03-02", "2020-03-20"]);
    }
}
