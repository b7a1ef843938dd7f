//! 占位符映射
//!
//! 不同作者的模板对同一字段使用不同写法 (`{name}` / `{NAME}` /
//! `{SALES PERSON NAME}` / `{sales_person_name}`), 这里用一张别名表
//! 把每个逻辑字段展开到所有写法, 所有别名取值相同。

use crate::models::{ExtraFields, FooterFields, Row, Totals};
use crate::template::PlaceholderBag;

/// 逻辑字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Date,
    OrderId,
    Subtotal,
    DiscountPercent,
    DiscountFlat,
    VatRate,
    Vat,
    Total,
    Footer,
    SalesPersonName,
    SalesPersonTitle,
    SalesPersonCompany,
    DecisionMakerName,
    DecisionMakerTitle,
    DecisionMakerCompany,
    OpportunityHeader,
    SlpCode,
    CreatedAt,
    TermsCondition,
}

/// 字段 -> 模板中可能出现的全部键
pub const ALIASES: &[(Field, &[&str])] = &[
    (Field::Name, &["name", "Name", "NAME"]),
    (Field::Date, &["date", "Date", "DATE"]),
    (Field::OrderId, &["orderId", "order_id", "ORDER ID", "Order ID"]),
    (Field::Subtotal, &["sub_total", "subtotal", "SUB TOTAL", "Sub Total"]),
    (Field::DiscountPercent, &["discount_percent", "DISCOUNT PERCENT"]),
    (Field::DiscountFlat, &["discount_flat", "DISCOUNT FLAT"]),
    (Field::VatRate, &["vat_rate", "VAT RATE"]),
    (Field::Vat, &["VAT", "vat", "vat_amount"]),
    (Field::Total, &["total", "Total", "TOTAL"]),
    (Field::Footer, &["footer"]),
    (
        Field::SalesPersonName,
        &["SALES PERSON NAME", "Sales Person Name", "sales_person_name", "salesPersonName"],
    ),
    (
        Field::SalesPersonTitle,
        &["SALES PERSON TITLE", "Sales Person Title", "sales_person_title", "salesPersonTitle"],
    ),
    (
        Field::SalesPersonCompany,
        &[
            "SALES PERSON COMPANY",
            "Sales Person Company",
            "sales_person_company",
            "salesPersonCompany",
        ],
    ),
    (
        Field::DecisionMakerName,
        &["DECISION MAKER NAME", "Decision Maker Name", "decision_maker_name", "decisionMakerName"],
    ),
    (
        Field::DecisionMakerTitle,
        &[
            "DECISION MAKER TITLE",
            "Decision Maker Title",
            "decision_maker_title",
            "decision_maker_position",
            "decisionMakerTitle",
        ],
    ),
    (
        Field::DecisionMakerCompany,
        &[
            "DECISION MAKER COMPANY",
            "Decision Maker Company",
            "decision_maker_company",
            "client_company_name",
            "decisionMakerCompany",
        ],
    ),
    (Field::OpportunityHeader, &["opportunity_header", "OPPORTUNITY HEADER"]),
    (Field::SlpCode, &["slp_code", "SLP CODE"]),
    (Field::CreatedAt, &["created_at", "CREATED AT"]),
    (Field::TermsCondition, &["terms_condition", "TERMS CONDITION"]),
];

/// 表格循环 `{#table}` 的键
pub const TABLE_KEY: &str = "table";

/// 明细行内的别名
const ROW_DESCRIPTION: &[&str] = &["Description", "description", "item_description"];
const ROW_QUANTITY: &[&str] = &["qty", "quantity"];

pub fn aliases(field: Field) -> &'static [&'static str] {
    ALIASES
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, keys)| *keys)
        .unwrap_or(&[])
}

/// 请求级别的已解析标量字段
#[derive(Debug, Clone)]
pub struct Header {
    pub name: String,
    pub date: String,
    pub order_id: String,
    pub footer: Option<String>,
}

pub fn money(value: f64) -> String {
    // 避免输出 "-0.00"
    let value = if value.abs() < 0.005 { 0.0 } else { value };
    format!("{:.2}", value)
}

pub struct PlaceholderMapper<'a> {
    pub header: &'a Header,
    pub rows: &'a [Row],
    pub totals: &'a Totals,
    pub footer: &'a FooterFields,
    pub extras: &'a ExtraFields,
}

impl PlaceholderMapper<'_> {
    fn value(&self, field: Field) -> String {
        match field {
            Field::Name => self.header.name.clone(),
            Field::Date => self.header.date.clone(),
            Field::OrderId => self.header.order_id.clone(),
            Field::Subtotal => money(self.totals.subtotal),
            Field::DiscountPercent => self.totals.discount_percent.to_string(),
            Field::DiscountFlat => money(self.totals.discount_flat),
            Field::VatRate => self.totals.vat_rate.to_string(),
            Field::Vat => money(self.totals.vat_amount),
            Field::Total => money(self.totals.total),
            Field::Footer => self
                .header
                .footer
                .clone()
                .unwrap_or_else(|| self.footer.to_block()),
            Field::SalesPersonName => self.footer.sales_person_name.clone(),
            Field::SalesPersonTitle => self.footer.sales_person_title.clone(),
            Field::SalesPersonCompany => self.footer.sales_person_company.clone(),
            Field::DecisionMakerName => self.footer.decision_maker_name.clone(),
            Field::DecisionMakerTitle => self.footer.decision_maker_title.clone(),
            Field::DecisionMakerCompany => self.footer.decision_maker_company.clone(),
            Field::OpportunityHeader => self.extras.opportunity_header.clone(),
            Field::SlpCode => self.extras.slp_code.clone(),
            Field::CreatedAt => self.extras.created_at.clone(),
            Field::TermsCondition => self.extras.terms_condition.clone(),
        }
    }

    fn row_bag(index: usize, row: &Row) -> PlaceholderBag {
        let mut bag = PlaceholderBag::new();
        bag.insert("index", (index + 1) as f64);
        for key in ROW_DESCRIPTION {
            bag.insert(*key, row.description.as_str());
        }
        for key in ROW_QUANTITY {
            bag.insert(*key, row.quantity);
        }
        bag.insert("unit_price", money(row.unit_price));
        bag.insert("sub_total", money(row.sub_total));
        bag
    }

    /// 展开为渲染器使用的扁平数据
    pub fn build(&self) -> PlaceholderBag {
        let mut bag = PlaceholderBag::new();
        for (field, keys) in ALIASES {
            let value = self.value(*field);
            for key in *keys {
                bag.insert(*key, value.as_str());
            }
        }
        let table: Vec<PlaceholderBag> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| Self::row_bag(i, row))
            .collect();
        bag.insert(TABLE_KEY, table);
        bag
    }
}
