use serde::{Deserialize, Serialize};

/// 报价明细行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub sub_total: f64,
}

impl Row {
    /// 构造明细行, 负数或非有限值按 0 处理
    pub fn new(description: impl Into<String>, quantity: f64, unit_price: f64) -> Self {
        let quantity = non_negative(quantity);
        let unit_price = non_negative(unit_price);
        Self {
            description: description.into(),
            quantity,
            unit_price,
            sub_total: quantity * unit_price,
        }
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_total_is_quantity_times_price() {
        let row = Row::new("Widget", 3.0, 19.99);
        assert!((row.sub_total - 3.0 * 19.99).abs() < 1e-9);
    }

    #[test]
    fn negative_and_nan_inputs_become_zero() {
        let row = Row::new("Broken", -2.0, f64::NAN);
        assert_eq!(row.quantity, 0.0);
        assert_eq!(row.unit_price, 0.0);
        assert_eq!(row.sub_total, 0.0);
    }
}
