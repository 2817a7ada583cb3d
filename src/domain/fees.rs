use super::money::{Amount, MAX_AMOUNT, round_money};
use crate::error::PaymentError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Rates and provider charges applied when pricing a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    /// Charged to the payer on top of the task price.
    pub service_fee_rate: Decimal,
    /// Applied to the service fee.
    pub vat_rate: Decimal,
    /// Deducted from the tasker payout.
    pub commission_rate: Decimal,
    pub processing_rate: Decimal,
    pub processing_flat: Decimal,
    pub processing_flat_threshold: Decimal,
    pub processing_cap: Decimal,
    /// When false the platform absorbs the processing fee.
    pub pass_processing_to_payer: bool,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            service_fee_rate: dec!(0.10),
            vat_rate: dec!(0.075),
            commission_rate: Decimal::ZERO,
            processing_rate: dec!(0.015),
            processing_flat: dec!(100),
            processing_flat_threshold: dec!(2500),
            processing_cap: dec!(2000),
            pass_processing_to_payer: true,
        }
    }
}

/// The priced components of a single checkout.
///
/// `total` is what the payer is charged; `tasker_payout` is what lands in the
/// payee's wallet once the charge settles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub subtotal: Decimal,
    pub service_fee: Decimal,
    pub vat: Decimal,
    pub processing_fee: Decimal,
    pub commission: Decimal,
    pub total: Decimal,
    pub tasker_payout: Decimal,
    pub platform_revenue: Decimal,
}

impl FeeSchedule {
    pub fn validate(&self) -> Result<(), PaymentError> {
        let rates = [
            ("service_fee_rate", self.service_fee_rate),
            ("vat_rate", self.vat_rate),
            ("commission_rate", self.commission_rate),
            ("processing_rate", self.processing_rate),
        ];
        for (name, rate) in rates {
            if rate < Decimal::ZERO || rate >= Decimal::ONE {
                return Err(PaymentError::ConfigError(format!(
                    "{name} must be in [0, 1), got {rate}"
                )));
            }
        }
        let amounts = [
            ("processing_flat", self.processing_flat),
            ("processing_flat_threshold", self.processing_flat_threshold),
            ("processing_cap", self.processing_cap),
        ];
        for (name, value) in amounts {
            if value < Decimal::ZERO || value > MAX_AMOUNT {
                return Err(PaymentError::ConfigError(format!(
                    "{name} must be between 0 and {MAX_AMOUNT}, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Provider charge for a given chargeable amount.
    pub fn processing_fee(&self, chargeable: Decimal) -> Decimal {
        let mut fee = chargeable * self.processing_rate;
        if chargeable >= self.processing_flat_threshold {
            fee += self.processing_flat;
        }
        round_money(fee.min(self.processing_cap))
    }

    pub fn breakdown(&self, subtotal: Amount) -> FeeBreakdown {
        let subtotal = subtotal.value();
        let service_fee = round_money(subtotal * self.service_fee_rate);
        let vat = round_money(service_fee * self.vat_rate);
        let commission = round_money(subtotal * self.commission_rate);
        let processing_fee = self.processing_fee(subtotal + service_fee + vat);

        let mut total = subtotal + service_fee + vat;
        let mut platform_revenue = service_fee + commission;
        if self.pass_processing_to_payer {
            total += processing_fee;
        } else {
            platform_revenue -= processing_fee;
        }

        FeeBreakdown {
            subtotal,
            service_fee,
            vat,
            processing_fee,
            commission,
            total,
            tasker_payout: subtotal - commission,
            platform_revenue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::to_minor_units;

    fn amount(value: Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    fn assert_balanced(b: &FeeBreakdown) {
        assert_eq!(
            b.total,
            b.tasker_payout + b.platform_revenue + b.vat + b.processing_fee
        );
    }

    #[test]
    fn test_default_breakdown() {
        let b = FeeSchedule::default().breakdown(amount(dec!(5000)));
        assert_eq!(b.service_fee, dec!(500));
        assert_eq!(b.vat, dec!(37.5));
        // 1.5% of 5537.50 plus the flat fee
        assert_eq!(b.processing_fee, dec!(183.06));
        assert_eq!(b.total, dec!(5720.56));
        assert_eq!(b.tasker_payout, dec!(5000));
        assert_eq!(b.platform_revenue, dec!(500));
        assert_balanced(&b);
    }

    #[test]
    fn test_flat_fee_waived_below_threshold() {
        let b = FeeSchedule::default().breakdown(amount(dec!(1000)));
        assert_eq!(b.service_fee, dec!(100));
        assert_eq!(b.vat, dec!(7.5));
        assert_eq!(b.processing_fee, dec!(16.61));
        assert_balanced(&b);
    }

    #[test]
    fn test_processing_fee_capped() {
        let b = FeeSchedule::default().breakdown(amount(dec!(1000000)));
        assert_eq!(b.processing_fee, dec!(2000));
        assert_balanced(&b);
    }

    #[test]
    fn test_absorbed_processing_and_commission() {
        let schedule = FeeSchedule {
            commission_rate: dec!(0.05),
            pass_processing_to_payer: false,
            ..FeeSchedule::default()
        };
        let b = schedule.breakdown(amount(dec!(2000)));
        assert_eq!(b.commission, dec!(100));
        assert_eq!(b.tasker_payout, dec!(1900));
        assert_eq!(b.total, dec!(2215));
        assert_eq!(b.processing_fee, dec!(33.23));
        assert_eq!(b.platform_revenue, dec!(266.77));
        assert_balanced(&b);
    }

    #[test]
    fn test_rounding_keeps_breakdown_balanced() {
        let b = FeeSchedule::default().breakdown(amount(dec!(0.07)));
        assert_eq!(b.service_fee, dec!(0.01));
        assert_eq!(b.vat, dec!(0));
        assert_balanced(&b);
    }

    #[test]
    fn test_largest_amount_prices_without_overflow() {
        let b = FeeSchedule::default().breakdown(amount(MAX_AMOUNT));
        assert_eq!(b.processing_fee, dec!(2000));
        assert_balanced(&b);
        assert!(to_minor_units(b.total).is_ok());

        let steep = FeeSchedule {
            service_fee_rate: dec!(0.99),
            vat_rate: dec!(0.99),
            processing_cap: MAX_AMOUNT,
            processing_flat: MAX_AMOUNT,
            ..FeeSchedule::default()
        };
        assert!(steep.validate().is_ok());
        let b = steep.breakdown(amount(MAX_AMOUNT));
        assert_balanced(&b);
        assert!(to_minor_units(b.total).is_ok());
    }

    #[test]
    fn test_schedule_validation() {
        assert!(FeeSchedule::default().validate().is_ok());
        let bad = FeeSchedule {
            vat_rate: dec!(1.5),
            ..FeeSchedule::default()
        };
        assert!(matches!(bad.validate(), Err(PaymentError::ConfigError(_))));
        let negative = FeeSchedule {
            processing_cap: dec!(-1),
            ..FeeSchedule::default()
        };
        assert!(negative.validate().is_err());
    }
}
