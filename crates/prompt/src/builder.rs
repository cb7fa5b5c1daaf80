//! Prompt composer: renders task templates around a budgeted context section.

use crate::loader::TemplateSet;
use crate::task::TaskKind;
use crate::types::{ComposedPrompt, ContextEntry};
use handlebars::Handlebars;
use sales_core::format::format_currency;
use sales_core::{AppError, AppResult};
use std::collections::BTreeMap;

/// Rendered in place of the context section when nothing was retrieved.
pub const NO_CONTEXT_NOTICE: &str =
    "No relevant context was found in the sales data for this request.";

/// Appended to the system instructions for low-confidence requests.
pub const LOW_CONFIDENCE_CAUTION: &str = "The retrieved sales data is sparse or only weakly related \
to this request. Say clearly which parts of your answer are not backed by the data, and do not \
invent figures.";

const ENTRY_SEPARATOR: &str = "\n\n---\n\n";

/// Whether a ranked context set is too weak to ground an answer.
///
/// Empty context, or a best score below `threshold`.
pub fn is_low_confidence(context: &[ContextEntry], threshold: f32) -> bool {
    match context.first() {
        None => true,
        Some(_) => top_score(context) < threshold,
    }
}

fn top_score(context: &[ContextEntry]) -> f32 {
    context
        .iter()
        .map(|e| e.score)
        .fold(f32::NEG_INFINITY, f32::max)
}

/// Builds prompts for every [`TaskKind`].
///
/// Composition is a pure function of the task, query and context: the same
/// input always renders the same prompt.
pub struct PromptComposer {
    registry: Handlebars<'static>,
    max_context_chars: usize,
    confidence_threshold: f32,
}

impl PromptComposer {
    /// Composer with the built-in templates.
    pub fn new(max_context_chars: usize, confidence_threshold: f32) -> AppResult<Self> {
        Self::with_templates(TemplateSet::builtin(), max_context_chars, confidence_threshold)
    }

    /// Composer with a custom template set. Templates are compiled up front
    /// so a broken override fails here rather than mid-request.
    pub fn with_templates(
        templates: TemplateSet,
        max_context_chars: usize,
        confidence_threshold: f32,
    ) -> AppResult<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);

        for task in TaskKind::ALL {
            let template = templates.get(task);
            registry
                .register_template_string(&system_name(task), &template.system)
                .map_err(|e| {
                    AppError::Prompt(format!("Invalid system template for {}: {}", task, e))
                })?;
            registry
                .register_template_string(&user_name(task), &template.user)
                .map_err(|e| {
                    AppError::Prompt(format!("Invalid user template for {}: {}", task, e))
                })?;
        }

        Ok(Self {
            registry,
            max_context_chars,
            confidence_threshold,
        })
    }

    pub fn max_context_chars(&self) -> usize {
        self.max_context_chars
    }

    /// Compose the prompt for `task`.
    ///
    /// `context` must be in rank order (best first). When the rendered
    /// context would exceed the budget, the lowest-ranked entries are dropped
    /// first; the query and system instructions are never cut.
    pub fn compose(
        &self,
        task: TaskKind,
        query: &str,
        context: &[ContextEntry],
    ) -> AppResult<ComposedPrompt> {
        let (context_block, included) = self.render_context(context);
        let included_ids: Vec<String> = included.iter().map(|e| e.id.clone()).collect();
        let dropped_ids: Vec<String> = context[included.len()..]
            .iter()
            .map(|e| e.id.clone())
            .collect();

        if !dropped_ids.is_empty() {
            tracing::debug!(
                "Context budget of {} chars reached; dropped {} lowest-ranked entries",
                self.max_context_chars,
                dropped_ids.len()
            );
        }

        let low_confidence = is_low_confidence(included, self.confidence_threshold);

        let mut vars = BTreeMap::new();
        vars.insert("task", task.as_str().to_string());
        vars.insert("query", query.trim().to_string());
        vars.insert("context", context_block.clone());

        let mut system = self.render(&system_name(task), &vars)?;
        if low_confidence {
            system.push_str("\n\n");
            system.push_str(LOW_CONFIDENCE_CAUTION);
        }
        let user = self.render(&user_name(task), &vars)?;

        Ok(ComposedPrompt {
            task,
            system,
            user,
            included_ids,
            dropped_ids,
            context_chars: context_block.chars().count(),
            low_confidence,
        })
    }

    /// Render the longest rank-order prefix of `context` that fits the budget.
    fn render_context<'a>(&self, context: &'a [ContextEntry]) -> (String, &'a [ContextEntry]) {
        let mut block = String::new();
        let mut used = 0;
        let mut taken = 0;

        for entry in context {
            let rendered = format_entry(entry);
            let extra = if taken == 0 { 0 } else { ENTRY_SEPARATOR.len() };
            let len = rendered.chars().count() + extra;
            if used + len > self.max_context_chars {
                break;
            }
            if taken > 0 {
                block.push_str(ENTRY_SEPARATOR);
            }
            block.push_str(&rendered);
            used += len;
            taken += 1;
        }

        if taken == 0 {
            let notice: String = NO_CONTEXT_NOTICE
                .chars()
                .take(self.max_context_chars)
                .collect();
            return (notice, &context[..0]);
        }

        (block, &context[..taken])
    }

    fn render(&self, name: &str, vars: &BTreeMap<&str, String>) -> AppResult<String> {
        self.registry
            .render(name, vars)
            .map_err(|e| AppError::Prompt(format!("Failed to render template {}: {}", name, e)))
    }
}

fn system_name(task: TaskKind) -> String {
    format!("{}.system", task.as_str())
}

fn user_name(task: TaskKind) -> String {
    format!("{}.user", task.as_str())
}

/// Format one entry with its type-specific facts.
pub fn format_entry(entry: &ContextEntry) -> String {
    let mut out = format!(
        "Relevance: {:.3}\nType: {}\nKey: {}\nDescription:\n{}\n",
        entry.score, entry.kind, entry.key, entry.text
    );

    let text = |field: &str| {
        entry
            .metadata
            .get(field)
            .and_then(|v| v.as_str())
            .unwrap_or("N/A")
            .to_string()
    };
    let number = |field: &str| {
        entry
            .metadata
            .get(field)
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    };

    match entry.kind.as_str() {
        "customer" => {
            out.push_str(&format!("- Territory: {}\n", text("territory")));
            out.push_str(&format!(
                "- Total Sales: {}\n",
                format_currency(number("total_sales"))
            ));
            out.push_str(&format!("- Status: {}\n", text("customer_status")));
        }
        "product" => {
            out.push_str(&format!("- Product Line: {}\n", text("product_line")));
            out.push_str(&format!(
                "- Performance Score: {:.3}\n",
                number("performance_score")
            ));
            out.push_str(&format!("- Deal Size: {}\n", text("typical_deal_size")));
        }
        "territory" => {
            out.push_str(&format!(
                "- Market Share: {:.2}%\n",
                number("market_share")
            ));
            out.push_str(&format!(
                "- Total Sales: {}\n",
                format_currency(number("total_sales"))
            ));
            out.push_str(&format!(
                "- Unique Customers: {}\n",
                number("unique_customers") as u64
            ));
        }
        _ => {}
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: &str, kind: &str, score: f32, text: &str) -> ContextEntry {
        let key = id.split_once(':').map(|(_, k)| k).unwrap_or(id).to_string();
        let mut metadata = BTreeMap::new();
        metadata.insert("territory".to_string(), json!("EMEA"));
        metadata.insert("total_sales".to_string(), json!(125000.5));
        metadata.insert("customer_status".to_string(), json!("Active"));
        ContextEntry {
            id: id.to_string(),
            kind: kind.to_string(),
            key,
            score,
            text: text.to_string(),
            metadata,
        }
    }

    fn ranked() -> Vec<ContextEntry> {
        vec![
            entry("customer:Acme", "customer", 0.92, "Acme buys classic cars in EMEA."),
            entry("customer:Bolt Inc", "customer", 0.61, "Bolt Inc buys motorcycles in NA."),
            entry("customer:Cinco SA", "customer", 0.40, "Cinco SA buys trains in APAC."),
        ]
    }

    #[test]
    fn test_compose_is_deterministic() {
        let composer = PromptComposer::new(4_000, 0.3).unwrap();
        let a = composer
            .compose(TaskKind::GeneralQuery, "top customer in EMEA", &ranked())
            .unwrap();
        let b = composer
            .compose(TaskKind::GeneralQuery, "top customer in EMEA", &ranked())
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_compose_includes_query_and_context() {
        let composer = PromptComposer::new(4_000, 0.3).unwrap();
        let prompt = composer
            .compose(TaskKind::GeneralQuery, "top customer in EMEA", &ranked())
            .unwrap();

        assert!(prompt.user.contains("top customer in EMEA"));
        assert!(prompt.user.contains("Key: Acme"));
        assert!(prompt.user.contains("- Total Sales: $125,000.50"));
        assert_eq!(prompt.included_ids.len(), 3);
        assert!(prompt.dropped_ids.is_empty());
        assert!(!prompt.low_confidence);
    }

    #[test]
    fn test_budget_drops_lowest_ranked_first() {
        let context = ranked();
        let first_two = format_entry(&context[0]).chars().count()
            + ENTRY_SEPARATOR.len()
            + format_entry(&context[1]).chars().count();

        let composer = PromptComposer::new(first_two, 0.3).unwrap();
        let prompt = composer
            .compose(TaskKind::CustomerAnalysis, "Analyze Acme", &context)
            .unwrap();

        assert_eq!(prompt.included_ids, vec!["customer:Acme", "customer:Bolt Inc"]);
        assert_eq!(prompt.dropped_ids, vec!["customer:Cinco SA"]);
        assert!(prompt.context_chars <= first_two);
    }

    #[test]
    fn test_tiny_budget_never_cuts_query_or_system() {
        let composer = PromptComposer::new(10, 0.3).unwrap();
        let query = "Which product line should we push to Acme next quarter?";
        let prompt = composer
            .compose(TaskKind::PitchGeneration, query, &ranked())
            .unwrap();

        assert!(prompt.included_ids.is_empty());
        assert_eq!(prompt.dropped_ids.len(), 3);
        assert!(prompt.context_chars <= 10);
        assert!(prompt.user.contains(query));
        assert!(prompt
            .system
            .starts_with(&TaskKind::PitchGeneration.builtin_template().system));
    }

    #[test]
    fn test_empty_context_renders_notice_and_caution() {
        let composer = PromptComposer::new(4_000, 0.3).unwrap();
        let prompt = composer
            .compose(TaskKind::TerritoryAnalysis, "Analyze territory Mars", &[])
            .unwrap();

        assert!(prompt.user.contains(NO_CONTEXT_NOTICE));
        assert!(prompt.system.contains(LOW_CONFIDENCE_CAUTION));
        assert!(prompt.low_confidence);
    }

    #[test]
    fn test_weak_scores_are_low_confidence() {
        let context = vec![entry("customer:Acme", "customer", 0.12, "Acme")];
        assert!(is_low_confidence(&context, 0.3));
        assert!(!is_low_confidence(&ranked(), 0.3));
        assert!(is_low_confidence(&[], 0.0));
    }

    #[test]
    fn test_templates_differ_per_task() {
        let composer = PromptComposer::new(4_000, 0.3).unwrap();
        let a = composer
            .compose(TaskKind::ProductRecommendation, "q", &ranked())
            .unwrap();
        let b = composer
            .compose(TaskKind::TerritoryAnalysis, "q", &ranked())
            .unwrap();
        assert_ne!(a.system, b.system);
    }

    #[test]
    fn test_format_entry_per_type() {
        let mut product = entry("product:Classic Cars_S10_1949", "product", 0.8, "Classic car");
        product
            .metadata
            .insert("product_line".to_string(), json!("Classic Cars"));
        product
            .metadata
            .insert("performance_score".to_string(), json!(0.8123));
        product
            .metadata
            .insert("typical_deal_size".to_string(), json!("Medium"));

        let rendered = format_entry(&product);
        assert!(rendered.contains("- Product Line: Classic Cars"));
        assert!(rendered.contains("- Performance Score: 0.812"));
        assert!(rendered.contains("- Deal Size: Medium"));
        assert!(!rendered.contains("- Status:"));
    }
}
