//! 演示数据生成
//!
//! 报价行、签名区等字段全部由 `DataProvider` 生成。启用 `faker` 特性时
//! 使用 fake 库, 否则使用内置的随机生成器, 两者输出形状一致。

use crate::models::{ExtraFields, FooterFields, Row};
use chrono::{Duration, Local, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

/// 演示数据来源
pub trait DataProvider: Send + Sync {
    /// 用于日志
    fn name(&self) -> &'static str;
    fn product_name(&self) -> String;
    /// [0, 100) 之间, 保留两位小数
    fn price(&self) -> f64;
    fn person_name(&self) -> String;
    fn job_title(&self) -> String;
    fn company_name(&self) -> String;
    /// 最近一周内的日期
    fn recent_date(&self) -> NaiveDate;
    /// 闭区间 [min, max]
    fn random_int(&self, min: i64, max: i64) -> i64;
    fn sentence(&self) -> String;
}

/// 内置生成器, 不依赖任何数据字典
pub struct FallbackProvider {
    rng: Mutex<StdRng>,
}

impl FallbackProvider {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// 固定种子, 输出可复现
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }

    fn numbered(&self, prefix: &str) -> String {
        format!("{} {}", prefix, self.random_int(0, 9999))
    }
}

impl Default for FallbackProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DataProvider for FallbackProvider {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn product_name(&self) -> String {
        self.numbered("Product")
    }

    fn price(&self) -> f64 {
        cents(self.with_rng(|rng| rng.random_range(0.0..100.0)))
    }

    fn person_name(&self) -> String {
        self.numbered("Name")
    }

    fn job_title(&self) -> String {
        "Job Title".to_string()
    }

    fn company_name(&self) -> String {
        self.numbered("Company")
    }

    fn recent_date(&self) -> NaiveDate {
        let days_ago = self.random_int(0, 6);
        Local::now().date_naive() - Duration::days(days_ago)
    }

    fn random_int(&self, min: i64, max: i64) -> i64 {
        if min >= max {
            return min;
        }
        self.with_rng(|rng| rng.random_range(min..=max))
    }

    fn sentence(&self) -> String {
        "Lorem ipsum dolor sit amet.".to_string()
    }
}

#[cfg(feature = "faker")]
mod faker {
    use super::{cents, DataProvider};
    use chrono::{Duration, Local, NaiveDate};
    use fake::faker::company::en::{BuzzwordMiddle, BuzzwordTail, CompanyName};
    use fake::faker::job::en::Title;
    use fake::faker::lorem::en::Sentence;
    use fake::faker::name::en::Name;
    use fake::Fake;

    /// 基于 fake 库的生成器
    pub struct FakerProvider;

    impl DataProvider for FakerProvider {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn product_name(&self) -> String {
            let middle: String = BuzzwordMiddle().fake();
            let tail: String = BuzzwordTail().fake();
            title_case(&format!("{} {}", middle, tail))
        }

        fn price(&self) -> f64 {
            cents((0.0..100.0).fake::<f64>())
        }

        fn person_name(&self) -> String {
            Name().fake()
        }

        fn job_title(&self) -> String {
            Title().fake()
        }

        fn company_name(&self) -> String {
            CompanyName().fake()
        }

        fn recent_date(&self) -> NaiveDate {
            Local::now().date_naive() - Duration::days((0..7i64).fake::<i64>())
        }

        fn random_int(&self, min: i64, max: i64) -> i64 {
            if min >= max {
                return min;
            }
            (min..max + 1).fake()
        }

        fn sentence(&self) -> String {
            Sentence(4..9).fake()
        }
    }

    fn title_case(text: &str) -> String {
        text.split_whitespace()
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }
}

#[cfg(feature = "faker")]
pub use faker::FakerProvider;

/// 启动时选择数据来源
///
/// 配置了种子时总是使用内置生成器, 便于复现
pub fn select_provider(seed: Option<u64>) -> Arc<dyn DataProvider> {
    match seed {
        Some(seed) => Arc::new(FallbackProvider::seeded(seed)),
        None => default_provider(),
    }
}

#[cfg(feature = "faker")]
fn default_provider() -> Arc<dyn DataProvider> {
    Arc::new(FakerProvider)
}

#[cfg(not(feature = "faker"))]
fn default_provider() -> Arc<dyn DataProvider> {
    Arc::new(FallbackProvider::new())
}

/// 生成 `count` 条报价行
pub fn synthesize_rows(provider: &dyn DataProvider, count: usize) -> Vec<Row> {
    (0..count)
        .map(|_| {
            let description = provider.product_name();
            let quantity = provider.random_int(1, 10) as f64;
            Row::new(description, quantity, provider.price())
        })
        .collect()
}

pub fn synthesize_footer(provider: &dyn DataProvider) -> FooterFields {
    FooterFields {
        sales_person_name: provider.person_name(),
        sales_person_title: provider.job_title(),
        sales_person_company: provider.company_name(),
        decision_maker_name: provider.person_name(),
        decision_maker_title: provider.job_title(),
        decision_maker_company: provider.company_name(),
    }
}

pub fn synthesize_extras(provider: &dyn DataProvider) -> ExtraFields {
    ExtraFields {
        opportunity_header: provider.company_name(),
        slp_code: format!("SLP-{}", provider.random_int(10000, 99999)),
        created_at: format_date(provider.recent_date()),
        terms_condition: provider.sentence(),
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}

/// 截断到分
fn cents(value: f64) -> f64 {
    (value * 100.0).floor() / 100.0
}

/// 宽松数字解析 (同 JS `parseFloat`)
///
/// 空值或空白返回 `default`; 取最长的合法数字前缀, 没有前缀时返回 0。
pub fn parse_number(input: Option<&str>, default: f64) -> f64 {
    let Some(text) = input.map(str::trim).filter(|t| !t.is_empty()) else {
        return default;
    };
    let end = numeric_prefix_len(text);
    text[..end]
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// 金额类输入, 负数按 0 处理
pub fn parse_amount(input: Option<&str>, default: f64) -> f64 {
    parse_number(input, default).max(0.0)
}

fn numeric_prefix_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut has_digits = i > digits_start;
    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if has_digits || j > frac_start {
            has_digits = true;
            i = j;
        }
    }
    if !has_digits {
        return 0;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    i
}
