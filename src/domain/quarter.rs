//! Calendar-quarter split of a price series.

use crate::domain::price::{PriceObservation, PriceSeries};
use chrono::Datelike;

#[derive(Debug, Clone, PartialEq)]
pub struct Quarter<'a> {
    pub year: i32,
    /// 1..=4
    pub quarter: u32,
    pub observations: &'a [PriceObservation],
}

impl Quarter<'_> {
    /// `Q{n}-{year}`, e.g. `Q3-2023`.
    pub fn label(&self) -> String {
        format!("Q{}-{}", self.quarter, self.year)
    }
}

fn quarter_of(obs: &PriceObservation) -> (i32, u32) {
    (obs.date.year(), (obs.date.month() - 1) / 3 + 1)
}

/// Chronological quarters; quarters without observations are omitted.
pub fn split_into_quarters(prices: &PriceSeries) -> Vec<Quarter<'_>> {
    prices
        .observations()
        .chunk_by(|a, b| quarter_of(a) == quarter_of(b))
        .map(|chunk| {
            let (year, quarter) = quarter_of(&chunk[0]);
            Quarter {
                year,
                quarter,
                observations: chunk,
            }
        })
        .collect()
}
