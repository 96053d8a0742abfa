use thiserror::Error;

use crate::{CorporateAction, EodBar, SecurityId, TradingDate, VendorBar};

/// Numeric fault while deriving a corporate action from a bar.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DerivationFault {
    #[error("cannot derive dividend ratio for {date}: unadjusted close is zero")]
    ZeroClose { date: TradingDate },
}

/// Everything a single vendor bar contributes to storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub bar: EodBar,
    pub actions: Vec<CorporateAction>,
    /// Set when a dividend was present but its ratio could not be computed;
    /// the dividend action is skipped and the bar is persisted regardless.
    pub fault: Option<DerivationFault>,
}

/// Derive the stored bar and any corporate actions from one vendor record.
///
/// The bar is always persisted from the unadjusted fields. The dividend and
/// split checks are independent, so a bar can carry both on the same
/// ex-date. The feed encodes "no dividend" as `0.0` and "no split" as a
/// factor of exactly `1.0`.
pub fn derive_bar(security_id: SecurityId, bar: &VendorBar) -> Derivation {
    let eod_bar = EodBar {
        security_id,
        date: bar.date,
        open: bar.unadjusted_open,
        high: bar.unadjusted_high,
        low: bar.unadjusted_low,
        close: bar.unadjusted_close,
        volume: bar.unadjusted_volume,
    };

    let mut actions = Vec::new();
    let mut fault = None;

    if bar.dividend != 0.0 {
        if bar.unadjusted_close == 0.0 {
            fault = Some(DerivationFault::ZeroClose { date: bar.date });
        } else {
            // Vendor methodology: adjustment ratio = (close + dividend) / close.
            let adjustment_ratio = (bar.unadjusted_close + bar.dividend) / bar.unadjusted_close;
            actions.push(CorporateAction::CashDividend {
                security_id,
                ex_date: bar.date,
                adjustment_ratio,
            });
        }
    }

    if bar.split_adjustment_factor != 1.0 {
        actions.push(CorporateAction::Split {
            security_id,
            ex_date: bar.date,
            ratio: bar.split_adjustment_factor,
        });
    }

    Derivation {
        bar: eod_bar,
        actions,
        fault,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vendor_bar(close: f64, dividend: f64, split: f64) -> VendorBar {
        VendorBar {
            date: TradingDate::parse("2020-03-10").expect("date"),
            unadjusted_open: 99.0,
            unadjusted_high: 101.0,
            unadjusted_low: 98.0,
            unadjusted_close: close,
            unadjusted_volume: 5_000,
            dividend,
            split_adjustment_factor: split,
            adjusted_open: 49.5,
            adjusted_high: 50.5,
            adjusted_low: 49.0,
            adjusted_close: close / 2.0,
            adjusted_volume: 10_000.0,
        }
    }

    #[test]
    fn bar_is_persisted_from_unadjusted_fields() {
        let derivation = derive_bar(SecurityId::new(7), &vendor_bar(100.0, 0.0, 1.0));

        assert_eq!(derivation.bar.open, 99.0);
        assert_eq!(derivation.bar.high, 101.0);
        assert_eq!(derivation.bar.low, 98.0);
        assert_eq!(derivation.bar.close, 100.0);
        assert_eq!(derivation.bar.volume, 5_000);
        assert!(derivation.actions.is_empty());
        assert!(derivation.fault.is_none());
    }

    #[test]
    fn dividend_derives_price_adjustment_ratio() {
        let derivation = derive_bar(SecurityId::new(7), &vendor_bar(100.0, 2.0, 1.0));

        assert_eq!(derivation.actions.len(), 1);
        match &derivation.actions[0] {
            CorporateAction::CashDividend {
                adjustment_ratio, ..
            } => assert_eq!(*adjustment_ratio, 1.02),
            other => panic!("expected cash dividend, got {other:?}"),
        }
    }

    #[test]
    fn zero_dividend_derives_nothing() {
        let derivation = derive_bar(SecurityId::new(7), &vendor_bar(100.0, 0.0, 1.0));
        assert!(derivation.actions.is_empty());
    }

    #[test]
    fn split_factor_derives_share_ratio() {
        let derivation = derive_bar(SecurityId::new(7), &vendor_bar(100.0, 0.0, 2.0));

        assert_eq!(derivation.actions.len(), 1);
        match &derivation.actions[0] {
            CorporateAction::Split { ratio, .. } => assert_eq!(*ratio, 2.0),
            other => panic!("expected split, got {other:?}"),
        }
    }

    #[test]
    fn unit_split_factor_derives_nothing() {
        let derivation = derive_bar(SecurityId::new(7), &vendor_bar(100.0, 0.0, 1.0));
        assert!(derivation.actions.is_empty());
    }

    #[test]
    fn dividend_and_split_fire_independently() {
        let derivation = derive_bar(SecurityId::new(7), &vendor_bar(100.0, 2.0, 2.0));

        assert_eq!(derivation.actions.len(), 2);
        assert!(derivation
            .actions
            .iter()
            .any(|action| matches!(action, CorporateAction::CashDividend { .. })));
        assert!(derivation
            .actions
            .iter()
            .any(|action| matches!(action, CorporateAction::Split { .. })));
    }

    #[test]
    fn zero_close_skips_the_dividend_but_keeps_bar_and_split() {
        let derivation = derive_bar(SecurityId::new(7), &vendor_bar(0.0, 2.0, 2.0));

        assert!(matches!(
            derivation.fault,
            Some(DerivationFault::ZeroClose { .. })
        ));
        assert_eq!(derivation.actions.len(), 1);
        assert!(matches!(
            derivation.actions[0],
            CorporateAction::Split { .. }
        ));
        assert_eq!(derivation.bar.close, 0.0);
    }
}
