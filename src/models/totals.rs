use super::Row;
use serde::Serialize;

/// 汇总金额 (小计、折扣、增值税、合计)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Totals {
    pub subtotal: f64,
    pub discount_percent: f64,
    pub discount_flat: f64,
    pub discounted: f64,
    pub vat_rate: f64,
    pub vat_amount: f64,
    pub total: f64,
}

impl Totals {
    /// 先按百分比折扣, 再减固定折扣, 最后对折后金额计税
    pub fn compute(rows: &[Row], discount_percent: f64, discount_flat: f64, vat_rate: f64) -> Self {
        let subtotal: f64 = rows.iter().map(|r| r.sub_total).sum();
        let discounted = subtotal - subtotal * (discount_percent / 100.0) - discount_flat;
        let vat_amount = discounted * vat_rate;
        Self {
            subtotal,
            discount_percent,
            discount_flat,
            discounted,
            vat_rate,
            vat_amount,
            total: discounted + vat_amount,
        }
    }
}
