//! DOCX 模板引擎
//!
//! - `compile`: 读取 ZIP 包, 扫描正文/页眉/页脚中的 `{tag}`, 一次性收集全部问题
//! - `CompiledTemplate::render`: 按占位符数据展开循环并替换, 重新打包为 DOCX
//!
//! 支持的标签: `{name}`、`{#list}...{/list}`、`{^name}...{/name}`。

mod error;
mod lexer;
mod part;
mod value;
mod xml;

pub use error::{IssueKind, RenderError, TemplateCompileError, TemplateIssue};
pub use value::{PlaceholderBag, Value};

use part::Part;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// WordprocessingML 文档的 MIME 类型
pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const DOCX_EXTENSION: &str = "docx";

const MAIN_DOCUMENT: &str = "word/document.xml";
const UTF8_BOM: &str = "\u{feff}";

#[derive(Debug, Clone)]
enum Body {
    Directory,
    Raw(Vec<u8>),
    Template { part: Part, bom: bool },
}

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    body: Body,
}

/// 已编译的模板, 可多次渲染
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    entries: Vec<Entry>,
}

/// 需要替换占位符的部件
fn is_templated_part(name: &str) -> bool {
    if name == MAIN_DOCUMENT || name == "word/footnotes.xml" || name == "word/endnotes.xml" {
        return true;
    }
    name.strip_prefix("word/")
        .filter(|rest| !rest.contains('/'))
        .is_some_and(|rest| {
            (rest.starts_with("header") || rest.starts_with("footer")) && rest.ends_with(".xml")
        })
}

/// 包内全部部件解压后的默认总上限
pub const DEFAULT_MAX_UNCOMPRESSED: u64 = 64 * 1024 * 1024;

pub fn compile(bytes: &[u8]) -> Result<CompiledTemplate, TemplateCompileError> {
    compile_with_limit(bytes, DEFAULT_MAX_UNCOMPRESSED)
}

/// 同 `compile`, 解压总量不超过 `max_uncompressed` 字节
///
/// 条目头中声明的大小不可信, 只按实际读出的字节计数。
pub fn compile_with_limit(
    bytes: &[u8],
    max_uncompressed: u64,
) -> Result<CompiledTemplate, TemplateCompileError> {
    let package_issue = |message: String| {
        TemplateCompileError::single(TemplateIssue::new(IssueKind::InvalidPackage, "", message))
    };

    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| package_issue(format!("template is not a valid DOCX package: {}", e)))?;

    let mut entries = Vec::with_capacity(archive.len());
    let mut issues = Vec::new();
    let mut remaining = max_uncompressed;
    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|e| package_issue(format!("cannot read entry #{}: {}", index, e)))?;
        let name = file.name().to_string();
        if file.is_dir() {
            entries.push(Entry {
                name,
                body: Body::Directory,
            });
            continue;
        }

        let mut data = Vec::new();
        let read = (&mut file)
            .take(remaining.saturating_add(1))
            .read_to_end(&mut data)
            .map_err(|e| package_issue(format!("cannot read `{}`: {}", name, e)))?
            as u64;
        if read > remaining {
            return Err(package_issue(format!(
                "package expands beyond {} bytes when unpacking `{}`",
                max_uncompressed, name
            )));
        }
        remaining -= read;

        let body = if is_templated_part(&name) {
            match String::from_utf8(data) {
                Ok(source) => {
                    let bom = source.starts_with(UTF8_BOM);
                    match Part::compile(&name, source.trim_start_matches(UTF8_BOM)) {
                        Ok(part) => Body::Template { part, bom },
                        Err(part_issues) => {
                            issues.extend(part_issues);
                            Body::Raw(source.into_bytes())
                        }
                    }
                }
                Err(e) => {
                    issues.push(TemplateIssue::new(
                        IssueKind::MalformedXml,
                        name.as_str(),
                        format!("part is not valid UTF-8: {}", e.utf8_error()),
                    ));
                    Body::Raw(e.into_bytes())
                }
            }
        } else {
            Body::Raw(data)
        };
        entries.push(Entry { name, body });
    }

    if !entries.iter().any(|entry| entry.name == MAIN_DOCUMENT) {
        issues.push(TemplateIssue::new(
            IssueKind::MissingDocument,
            MAIN_DOCUMENT,
            "package has no main document part",
        ));
    }

    if issues.is_empty() {
        Ok(CompiledTemplate { entries })
    } else {
        Err(TemplateCompileError { issues })
    }
}

fn deflated() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

impl CompiledTemplate {
    pub fn render(&self, bag: &PlaceholderBag) -> Result<Vec<u8>, RenderError> {
        let mut issues = Vec::new();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            match &entry.body {
                Body::Directory => writer.add_directory(entry.name.as_str(), deflated())?,
                Body::Raw(data) => {
                    writer.start_file(entry.name.as_str(), deflated())?;
                    writer.write_all(data)?;
                }
                Body::Template { part, bom } => {
                    let xml = part.render(bag, &mut issues);
                    writer.start_file(entry.name.as_str(), deflated())?;
                    if *bom {
                        writer.write_all(UTF8_BOM.as_bytes())?;
                    }
                    writer.write_all(xml.as_bytes())?;
                }
            }
        }

        if !issues.is_empty() {
            return Err(RenderError::Data(issues));
        }
        Ok(writer.finish()?.into_inner())
    }

    /// 模板部件名称 (按包内顺序)
    pub fn templated_parts(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|entry| match entry.body {
            Body::Template { .. } => Some(entry.name.as_str()),
            _ => None,
        })
    }
}
