//! The closed set of agent tasks and their built-in instruction templates.

use crate::types::PromptTemplate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of request the agent serves. Each has its own template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    GeneralQuery,
    CustomerAnalysis,
    ProductRecommendation,
    TerritoryAnalysis,
    PitchGeneration,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::GeneralQuery,
        TaskKind::CustomerAnalysis,
        TaskKind::ProductRecommendation,
        TaskKind::TerritoryAnalysis,
        TaskKind::PitchGeneration,
    ];

    /// Stable identifier, also the override file stem.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::GeneralQuery => "general_query",
            TaskKind::CustomerAnalysis => "customer_analysis",
            TaskKind::ProductRecommendation => "product_recommendation",
            TaskKind::TerritoryAnalysis => "territory_analysis",
            TaskKind::PitchGeneration => "pitch_generation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s.trim().to_lowercase())
    }

    /// Template shipped with the binary.
    pub fn builtin_template(&self) -> PromptTemplate {
        let (system, user) = match self {
            TaskKind::GeneralQuery => (GENERAL_SYSTEM, GENERAL_USER),
            TaskKind::CustomerAnalysis => (CUSTOMER_SYSTEM, CUSTOMER_USER),
            TaskKind::ProductRecommendation => (PRODUCT_SYSTEM, PRODUCT_USER),
            TaskKind::TerritoryAnalysis => (TERRITORY_SYSTEM, TERRITORY_USER),
            TaskKind::PitchGeneration => (PITCH_SYSTEM, PITCH_USER),
        };
        PromptTemplate {
            system: system.to_string(),
            user: user.to_string(),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const GENERAL_SYSTEM: &str = "You are an expert sales agent with access to the company's sales data.
Your job is to:
1. Analyze the user's question and provide valuable insights
2. Make recommendations grounded in the data provided
3. Identify sales opportunities
4. Suggest tailored strategies
Keep a professional but friendly tone. Be specific with figures and examples from the data.
If the data is not sufficient, say which additional data you would need.";

const GENERAL_USER: &str = "Question: {{query}}

Relevant sales data:
{{context}}

Please give a complete and useful answer based on this information.";

const CUSTOMER_SYSTEM: &str = "You are an expert sales analyst. Analyze the customer profile and provide:
1. Customer summary
2. Purchase history
3. Growth potential
4. Recommended products
5. Suggested sales strategy
6. Risks and opportunities";

const CUSTOMER_USER: &str = "{{query}}

Customer data:
{{context}}

Provide a complete analysis with actionable recommendations.";

const PRODUCT_SYSTEM: &str = "You are a product expert who makes data-driven recommendations. Provide:
1. Top 3 recommended products
2. The reason for each recommendation
3. Ideal customer segments
4. Pricing strategies
5. Performance metrics";

const PRODUCT_USER: &str = "{{query}}

Available products:
{{context}}

Give specific recommendations justified by the data.";

const TERRITORY_SYSTEM: &str = "You are a sales territory analyst. Provide:
1. Territory performance
2. Comparison with other territories
3. Growth opportunities
4. Best performing products
5. Expansion strategies
6. Market risks";

const TERRITORY_USER: &str = "{{query}}

Territory data:
{{context}}

Provide strategic insights and actionable recommendations.";

const PITCH_SYSTEM: &str = "You are an expert salesperson who writes personalized, persuasive pitches.
Write a pitch that:
1. Speaks directly to the customer
2. Highlights relevant benefits
3. Uses concrete figures
4. Includes calls to action
5. Addresses likely objections
Stay professional but convincing.";

const PITCH_USER: &str = "{{query}}

Customer and market data:
{{context}}

Write a personalized and persuasive sales pitch.";
