use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// 模板问题类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    InvalidPackage,
    MissingDocument,
    MalformedXml,
    UnclosedTag,
    UnopenedTag,
    EmptyTag,
    UnclosedLoop,
    UnopenedLoop,
    MismatchedLoop,
    LoopPositionInvalid,
    LoopOverlap,
    /// 渲染阶段: 列表值用作普通占位符
    ListAsText,
}

/// 编译或渲染中发现的单个问题
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateIssue {
    pub id: IssueKind,
    pub part: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub message: String,
}

impl TemplateIssue {
    pub fn new(id: IssueKind, part: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            part: part.into(),
            tag: None,
            message: message.into(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

impl fmt::Display for TemplateIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.part, self.message)
    }
}

/// 模板编译失败, 携带全部问题
#[derive(Debug, Error)]
#[error("template compile error ({} issue(s))", .issues.len())]
pub struct TemplateCompileError {
    pub issues: Vec<TemplateIssue>,
}

impl TemplateCompileError {
    pub fn single(issue: TemplateIssue) -> Self {
        Self {
            issues: vec![issue],
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("placeholder data does not fit the template ({} issue(s))", .0.len())]
    Data(Vec<TemplateIssue>),

    #[error("failed to write document package: {0}")]
    Package(#[from] zip::result::ZipError),

    #[error("I/O error while writing document: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    pub fn issues(&self) -> &[TemplateIssue] {
        match self {
            RenderError::Data(issues) => issues,
            _ => &[],
        }
    }
}
