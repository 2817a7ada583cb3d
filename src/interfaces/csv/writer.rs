use crate::domain::fees::FeeBreakdown;
use crate::domain::wallet::Wallet;
use crate::error::Result;
use rust_decimal::Decimal;
use std::io::Write;

fn money(value: Decimal) -> String {
    format!("{value:.2}")
}

/// Writes fee breakdowns, one row per task.
pub struct QuoteWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> QuoteWriter<W> {
    pub fn new(sink: W) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(sink);
        writer.write_record([
            "task",
            "subtotal",
            "service_fee",
            "vat",
            "processing_fee",
            "commission",
            "total",
            "tasker_payout",
        ])?;
        Ok(Self { writer })
    }

    pub fn write(&mut self, task: &str, breakdown: &FeeBreakdown) -> Result<()> {
        self.writer.write_record([
            task.to_string(),
            money(breakdown.subtotal),
            money(breakdown.service_fee),
            money(breakdown.vat),
            money(breakdown.processing_fee),
            money(breakdown.commission),
            money(breakdown.total),
            money(breakdown.tasker_payout),
        ])?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes wallet balances as `owner,currency,available,held,total,frozen`.
pub struct WalletWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> WalletWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_wallets(&mut self, wallets: impl IntoIterator<Item = Wallet>) -> Result<()> {
        self.writer
            .write_record(["owner", "currency", "available", "held", "total", "frozen"])?;
        for wallet in wallets {
            self.writer.write_record([
                wallet.owner.clone(),
                wallet.currency.to_string(),
                money(wallet.available.0),
                money(wallet.held.0),
                money(wallet.total.0),
                wallet.is_frozen().to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
