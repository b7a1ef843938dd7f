use serde::Deserialize;

/// `/generate` 表单中的文本字段, 均为原始字符串, 解析在生成阶段完成
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateForm {
    pub name: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
    pub discount_percent: Option<String>,
    pub discount_flat: Option<String>,
    pub vat_rate: Option<String>,
    pub footer: Option<String>,
}

impl GenerateForm {
    /// 按表单字段名赋值, 未知字段返回 false
    pub fn set(&mut self, field: &str, value: String) -> bool {
        let slot = match field {
            "name" => &mut self.name,
            "date" => &mut self.date,
            "orderId" => &mut self.order_id,
            "discount_percent" => &mut self.discount_percent,
            "discount_flat" => &mut self.discount_flat,
            "vat_rate" => &mut self.vat_rate,
            "footer" => &mut self.footer,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// 去掉首尾空白后为空的值视为未填写
    pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}
