use serde::Serialize;

/// 页脚签名区: 销售代表与客户决策人
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FooterFields {
    pub sales_person_name: String,
    pub sales_person_title: String,
    pub sales_person_company: String,
    pub decision_maker_name: String,
    pub decision_maker_title: String,
    pub decision_maker_company: String,
}

impl FooterFields {
    /// 单占位符 `{footer}` 使用的多行文本
    pub fn to_block(&self) -> String {
        let conforme = if self.decision_maker_name.is_empty() {
            ""
        } else {
            "Conforme:"
        };
        [
            self.sales_person_name.as_str(),
            self.sales_person_title.as_str(),
            self.sales_person_company.as_str(),
            "",
            conforme,
            self.decision_maker_name.as_str(),
            self.decision_maker_title.as_str(),
            self.decision_maker_company.as_str(),
        ]
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
    }
}

/// 部分模板额外需要的字段
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtraFields {
    pub opportunity_header: String,
    pub slp_code: String,
    pub created_at: String,
    pub terms_condition: String,
}
