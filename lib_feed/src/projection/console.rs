//! # Console Projection
//!
//! Renders the feed as colored text cards on a terminal (or any writer).
//! Pending records are printed in yellow, confirmed ones in green, and a
//! status event gets its own "Already mined!" line.

use std::io::{self, Write};

use colored::*;

use crate::core::record::{Record, RecordKey, RecordStatus};
use crate::core::sink::ProjectionSink;
use crate::projection::links::{
    format_fee_rate, format_local_time, image_url, mempool_tx_link, ordinals_inscription_link, shorten,
};

/// `ProjectionSink` that writes one card per record.
pub struct ConsoleSink<W: Write = io::Stdout> {
    out: W,
    base_url: String,
}

impl ConsoleSink<io::Stdout> {
    /// Writes to stdout; image links are built against `base_url`.
    pub fn stdout(base_url: impl Into<String>) -> Self {
        Self::new(io::stdout(), base_url)
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W, base_url: impl Into<String>) -> Self {
        Self {
            out,
            base_url: base_url.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn card(&self, record: &Record) -> String {
        let tx = record.tx_id().map(|id| shorten(id, 4)).unwrap_or_else(|| "-".to_string());
        let fee = record.fee_rate().map(format_fee_rate).unwrap_or_default();
        let content_type = record.content_type().unwrap_or("?");
        let length = record.content_length().map(|l| l.to_string()).unwrap_or_else(|| "?".to_string());

        let headline = format!("TX {}  {}  {}  {} ({} B)", tx, format_local_time(record.observed_at()), fee, content_type, length);
        let headline = match record.status() {
            RecordStatus::Pending => headline.bright_yellow(),
            RecordStatus::Confirmed => headline.bright_green(),
        };

        let mut card = format!("{}\n    {}", headline, image_url(&self.base_url, record.image_path()).truecolor(128, 128, 128));
        if let Some(id) = record.tx_id() {
            card.push_str(&format!("\n    {}", mempool_tx_link(id).truecolor(128, 128, 128)));
            card.push_str(&format!("\n    {}", ordinals_inscription_link(id).truecolor(128, 128, 128)));
        }
        card
    }

    fn emit(&mut self, text: String) {
        if let Err(e) = writeln!(self.out, "{}", text) {
            log::warn!("Console sink write failed: {}", e);
        }
    }
}

impl<W: Write> ProjectionSink for ConsoleSink<W> {
    fn on_initial_render(&mut self, records: &[Record], aggregate_size: u64) {
        let header = format!("Mempool inscriptions: {} (showing {})", aggregate_size, records.len());
        self.emit(header.bold().to_string());
        for record in records {
            let card = self.card(record);
            self.emit(card);
        }
    }

    fn on_records_added(&mut self, records: &[Record]) {
        for record in records {
            let card = self.card(record);
            self.emit(format!("{} {}", "NEW".bright_cyan(), card));
        }
    }

    fn on_status_changed(&mut self, key: &RecordKey) {
        let line = format!("Already mined! {}", key);
        self.emit(line.bright_white().on_red().to_string());
    }
}
