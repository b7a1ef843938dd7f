use crate::config::RenderConfig;
use crate::error::AppError;
use crate::models::{GenerateForm, Totals};
use crate::service::placeholders::{Header, PlaceholderMapper};
use crate::service::synth::{self, DataProvider};
use crate::template::{self, PlaceholderBag};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// 文档生成服务: 生成数据 -> 映射占位符 -> 编译模板 -> 渲染
pub struct DocumentService {
    provider: Arc<dyn DataProvider>,
    row_count: usize,
    default_vat_rate: f64,
    timeout: Duration,
    max_uncompressed: u64,
}

impl DocumentService {
    pub fn new(provider: Arc<dyn DataProvider>, config: &RenderConfig) -> Self {
        Self {
            provider,
            row_count: config.row_count,
            default_vat_rate: config.default_vat_rate,
            timeout: config.timeout(),
            max_uncompressed: config.max_uncompressed_bytes,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// 按表单构造占位符数据
    ///
    /// 明细行总是重新生成, 表单中的表格数据不使用。
    pub fn build_bag(&self, form: &GenerateForm) -> PlaceholderBag {
        let provider = self.provider.as_ref();
        let rows = synth::synthesize_rows(provider, self.row_count);

        let totals = Totals::compute(
            &rows,
            synth::parse_amount(form.discount_percent.as_deref(), 0.0),
            synth::parse_amount(form.discount_flat.as_deref(), 0.0),
            synth::parse_amount(form.vat_rate.as_deref(), self.default_vat_rate),
        );

        let header = Header {
            name: GenerateForm::non_blank(&form.name)
                .map(str::to_string)
                .unwrap_or_else(|| provider.person_name()),
            date: GenerateForm::non_blank(&form.date)
                .map(str::to_string)
                .unwrap_or_else(|| synth::format_date(provider.recent_date())),
            order_id: GenerateForm::non_blank(&form.order_id)
                .map(str::to_string)
                .unwrap_or_else(|| format!("ORD-{}", provider.random_int(1000, 99999))),
            footer: form.footer.clone().filter(|text| !text.trim().is_empty()),
        };
        let footer = synth::synthesize_footer(provider);
        let extras = synth::synthesize_extras(provider);

        let bag = PlaceholderMapper {
            header: &header,
            rows: &rows,
            totals: &totals,
            footer: &footer,
            extras: &extras,
        }
        .build();
        debug!("Placeholder data: {} keys, {} rows", bag.keys().count(), rows.len());
        bag
    }

    /// 生成文档; 编译与渲染在阻塞线程池中执行并受超时限制
    pub async fn generate(
        &self,
        template: Vec<u8>,
        form: &GenerateForm,
    ) -> Result<Vec<u8>, AppError> {
        let bag = self.build_bag(form);
        let max_uncompressed = self.max_uncompressed;

        let task = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, AppError> {
            let compiled = template::compile_with_limit(&template, max_uncompressed)?;
            Ok(compiled.render(&bag)?)
        });

        let bytes = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join)) => return Err(AppError::Internal(format!("render task failed: {}", join))),
            Err(_) => return Err(AppError::Timeout(self.timeout)),
        };

        info!("Generated document: {} bytes, {} rows", bytes.len(), self.row_count);
        Ok(bytes)
    }
}
