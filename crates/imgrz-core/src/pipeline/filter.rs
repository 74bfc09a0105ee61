//! Admission filtering by name and by size.
//!
//! A [`Filter`] holds at most one name rule and one size rule. Rules are
//! checked name first, then size: the name check is free while the size
//! check may have to open or fetch the source. An unset rule always passes.

use regex::Regex;

use crate::config::FilterConfig;
use crate::error::{ConfigError, PipelineError, PipelineResult};

use super::source::WorkItem;

/// Decides admission from an item's name.
///
/// Returns the rejection reason on failure.
pub trait NameRule: Send + Sync {
    fn check(&self, name: &str) -> Result<(), String>;
}

/// Decides admission from an item's size in bytes.
pub trait SizeRule: Send + Sync {
    fn check(&self, size: u64) -> Result<(), String>;
}

impl<F> NameRule for F
where
    F: Fn(&str) -> Result<(), String> + Send + Sync,
{
    fn check(&self, name: &str) -> Result<(), String> {
        self(name)
    }
}

impl<F> SizeRule for F
where
    F: Fn(u64) -> Result<(), String> + Send + Sync,
{
    fn check(&self, size: u64) -> Result<(), String> {
        self(size)
    }
}

/// Regex rule over the file name of an item.
///
/// A name matching any exclude pattern is rejected. When include patterns
/// are present, a name must also match one of them.
#[derive(Debug, Clone, Default)]
pub struct PatternRule {
    exclude: Vec<Regex>,
    include: Vec<Regex>,
}

impl PatternRule {
    pub fn new(exclude: &[String], include: &[String]) -> Result<Self, ConfigError> {
        let compile = |patterns: &[String]| -> Result<Vec<Regex>, ConfigError> {
            patterns
                .iter()
                .map(|p| {
                    Regex::new(p).map_err(|e| {
                        ConfigError::ValidationError(format!("invalid name pattern `{p}`: {e}"))
                    })
                })
                .collect()
        };
        Ok(Self {
            exclude: compile(exclude)?,
            include: compile(include)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.exclude.is_empty() && self.include.is_empty()
    }
}

impl NameRule for PatternRule {
    fn check(&self, name: &str) -> Result<(), String> {
        let file_name = base_name(name);
        if let Some(re) = self.exclude.iter().find(|re| re.is_match(file_name)) {
            return Err(format!("name matches excluded pattern `{}`", re.as_str()));
        }
        if !self.include.is_empty() && !self.include.iter().any(|re| re.is_match(file_name)) {
            return Err("name matches no included pattern".to_string());
        }
        Ok(())
    }
}

/// Inclusive byte-size bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteRange {
    pub min: Option<u64>,
    pub max: Option<u64>,
}

impl SizeRule for ByteRange {
    fn check(&self, size: u64) -> Result<(), String> {
        if let Some(min) = self.min {
            if size < min {
                return Err(format!("size {size} bytes is below minimum {min}"));
            }
        }
        if let Some(max) = self.max {
            if size > max {
                return Err(format!("size {size} bytes exceeds maximum {max}"));
            }
        }
        Ok(())
    }
}

/// Name and size admission rules for a batch.
#[derive(Default)]
pub struct Filter {
    name: Option<Box<dyn NameRule>>,
    size: Option<Box<dyn SizeRule>>,
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter")
            .field("name_rule", &self.name.is_some())
            .field("size_rule", &self.size.is_some())
            .finish()
    }
}

impl Filter {
    /// An unconfigured filter that admits everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the filter described by the `[filter]` config section.
    pub fn from_config(config: &FilterConfig) -> Result<Self, ConfigError> {
        let mut filter = Self::new();
        let pattern = PatternRule::new(&config.exclude_names, &config.include_names)?;
        if !pattern.is_empty() {
            filter = filter.with_name_rule(pattern);
        }
        if config.min_size.is_some() || config.max_size.is_some() {
            filter = filter.with_size_rule(ByteRange {
                min: config.min_size,
                max: config.max_size,
            });
        }
        Ok(filter)
    }

    pub fn with_name_rule(mut self, rule: impl NameRule + 'static) -> Self {
        self.name = Some(Box::new(rule));
        self
    }

    pub fn with_size_rule(mut self, rule: impl SizeRule + 'static) -> Self {
        self.size = Some(Box::new(rule));
        self
    }

    /// Whether any rule is attached.
    pub fn is_configured(&self) -> bool {
        self.name.is_some() || self.size.is_some()
    }

    /// Run the name rule, if any.
    pub fn check_name(&self, item: &dyn WorkItem) -> PipelineResult<()> {
        match &self.name {
            Some(rule) => rule
                .check(item.name())
                .map_err(|reason| PipelineError::rejected(item.name(), reason)),
            None => Ok(()),
        }
    }

    /// Run the size rule, if any. Looks up the item's size only when needed.
    pub async fn check_size(&self, item: &dyn WorkItem) -> PipelineResult<()> {
        let Some(rule) = &self.size else {
            return Ok(());
        };
        let size = item.byte_size().await.map_err(|e| {
            PipelineError::rejected(item.name(), format!("size unavailable: {e}"))
        })?;
        rule.check(size)
            .map_err(|reason| PipelineError::rejected(item.name(), reason))
    }

    /// Admit or reject an item. The first failing rule's reason is returned.
    pub async fn admit(&self, item: &dyn WorkItem) -> PipelineResult<()> {
        self.check_name(item)?;
        self.check_size(item).await
    }
}

/// File-name portion of a path or URL, without query string or fragment.
pub fn base_name(name: &str) -> &str {
    let trimmed = name.split(['?', '#']).next().unwrap_or(name);
    let trimmed = trimmed.trim_end_matches(['/', '\\']);
    trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
}

/// Parse a human byte size such as `512`, `10k`, `2.5m` or `1g` (1024-based).
pub fn parse_byte_size(input: &str) -> Result<u64, String> {
    let s = input.trim().to_ascii_lowercase();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let multiplier: u64 = match unit.trim() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1024,
        "m" | "mb" | "mib" => 1024 * 1024,
        "g" | "gb" | "gib" => 1024 * 1024 * 1024,
        other => return Err(format!("unknown size unit `{other}` in `{input}`")),
    };
    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid size `{input}`"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("invalid size `{input}`"));
    }
    Ok((value * multiplier as f64).round() as u64)
}
