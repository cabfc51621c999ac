//! Prompt templates for the research nodes
//!
//! Each stage has a system prompt and a user template rendered with
//! MiniJinja. Output formats requested here are the ones the node parsers
//! accept, so the two must change together.

use crate::error::PromptError;
use minijinja::Environment;
use serde::Serialize;
use std::sync::LazyLock;

static ENV: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env
});

/// A named template source
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub name: &'static str,
    source: &'static str,
}

impl PromptTemplate {
    const fn new(name: &'static str, source: &'static str) -> Self {
        Self { name, source }
    }

    /// Render with any serializable context
    pub fn render<S: Serialize>(&self, ctx: S) -> Result<String, PromptError> {
        ENV.render_str(self.source, ctx).map_err(|e| PromptError {
            name: self.name,
            detail: e.to_string(),
        })
    }
}

pub const PLANNER_SYSTEM: PromptTemplate = PromptTemplate::new(
    "planner.system",
    r#"You are a senior financial analyst and research planner.
Your task is to create a research plan for analyzing a listed company.

Break the analysis into specific, actionable data-gathering tasks. Consider:
1. Current stock performance and price history
2. Valuation metrics and company fundamentals
3. Recent earnings and financial statements
4. Recent news and market sentiment
5. Regulatory filings

Return ONLY a JSON array of tasks with this structure:
[
  {"task_type": "stock_data", "description": "Get current stock price and historical performance", "priority": 1},
  {"task_type": "earnings", "description": "Analyze latest quarterly earnings", "priority": 2}
]

task_type must be one of: stock_data, fundamentals, earnings, news, sec_filing, industry_analysis.
priority 1 is the most important."#,
);

pub const PLANNER_USER: PromptTemplate = PromptTemplate::new(
    "planner.user",
    r"Create a research plan to analyze {{ company }} ({{ market }}) and reach a buy/hold/sell recommendation. Keep it practical and focused on essential information.",
);

pub const ANALYST_SYSTEM: PromptTemplate = PromptTemplate::new(
    "analyst.system",
    r"You are a senior financial analyst with expertise in equity research and valuation.

Analyze the provided data and structure your analysis with these markdown sections:

## Executive Summary
## Financial Health
## Valuation
## Growth Prospects
## Risk Factors
## Data Limitations

Start with a two or three sentence overview before the first section.

Rules:
- Use the currency given in the request ({{ currency }}) for every amount
- The current date is {{ current_date }}; do not present older dates as current
- Be specific with numbers from the provided data and never invent figures
- State plainly which data was unavailable and how that limits the analysis",
);

pub const ANALYST_USER: PromptTemplate = PromptTemplate::new(
    "analyst.user",
    r"Analyze the following data for {{ company }}.

CURRENT DATE: {{ current_date }}
MARKET: {{ market }}
CURRENCY: {{ currency }}
DATA COVERAGE: {{ coverage }}

AVAILABLE DATA:
{% for source in sources %}
- [{{ source.key }}] {{ source.summary }}
{% else %}
- none
{% endfor %}

UNAVAILABLE DATA:
{% for source in missing %}
- [{{ source.key }}] {{ source.reason }}
{% else %}
- none
{% endfor %}
{% if deficiencies %}

A reviewer found these problems with the previous report. Address each one:
{% for deficiency in deficiencies %}
- {{ deficiency }}
{% endfor %}
{% endif %}",
);

pub const WRITER_SYSTEM: PromptTemplate = PromptTemplate::new(
    "writer.system",
    r"You are a senior equity research analyst at a top-tier investment bank.

Write a professional investment research report. The first three lines MUST be:

RECOMMENDATION: BUY, HOLD, or SELL
RATIONALE: one paragraph justifying the recommendation
SUMMARY: the investment thesis in two or three sentences

Then write these markdown sections:

## Executive Summary
## Financial Analysis
## Valuation
## Growth Prospects
## Risk Factors
## Data Limitations
## Conclusion

Rules:
- Use the currency {{ currency }} for every amount
- The current date is {{ current_date }}
- Include specific metrics from the analysis
- Disclose every unavailable data source in Data Limitations
- Use professional language suitable for institutional investors",
);

pub const WRITER_USER: PromptTemplate = PromptTemplate::new(
    "writer.user",
    r"Write the research report for {{ company }}.

CURRENT DATE: {{ current_date }}
MARKET: {{ market }}
CURRENCY: {{ currency }}

RESEARCH PLAN:
{% for task in plan %}
- {{ task }}
{% endfor %}

ANALYSIS SUMMARY:
{{ analysis_summary }}

{% for finding in findings %}
## {{ finding.heading }}
{{ finding.body }}

{% endfor %}
{% if missing %}
UNAVAILABLE DATA SOURCES:
{% for key in missing %}
- {{ key }}
{% endfor %}
{% endif %}
{% if deficiencies %}

A reviewer rejected the previous draft for these reasons. Fix each one:
{% for deficiency in deficiencies %}
- {{ deficiency }}
{% endfor %}
{% endif %}",
);

pub const CHECKER_SYSTEM: PromptTemplate = PromptTemplate::new(
    "checker.system",
    r"You are a financial expert reviewing investment research reports.

Assess whether the report:
1. Contains essential financial information and key metrics
2. Gives a clear recommendation with a justified rationale
3. Covers valuation and risks
4. Is logically structured and discloses missing data

Be practical: only report problems that matter to an investor.

Respond with exactly these lines:
QUALITY_SCORE: a number from 0 to 10 ({{ threshold }} or more means the report is acceptable)
DEFICIENCY: [section] (category) what is wrong and how to fix it

Write one DEFICIENCY line per problem, or none if there are no problems.
category must be one of: missing_data, analysis, recommendation, presentation.",
);

pub const CHECKER_USER: PromptTemplate = PromptTemplate::new(
    "checker.user",
    r"Review this investment research report for {{ company }}.

REPORT:
{{ report }}

RESEARCH PLAN:
{% for task in plan %}
- {{ task }}
{% endfor %}",
);

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn test_analyst_user_lists_sources() {
        let text = ANALYST_USER
            .render(context! {
                company => "ABC",
                current_date => "January 02, 2025",
                market => "US market",
                currency => "USD",
                sources => vec![context! { key => "price_history/yahoo", summary => "close 10" }],
                missing => Vec::<minijinja::Value>::new(),
                coverage => "fair (68/100): Missing market cap",
                deficiencies => Vec::<String>::new(),
            })
            .unwrap();

        assert!(text.contains("- [price_history/yahoo] close 10"));
        assert!(text.contains("DATA COVERAGE: fair (68/100): Missing market cap"));
        assert!(text.contains("UNAVAILABLE DATA:\n- none"));
        assert!(!text.contains("reviewer"));
    }

    #[test]
    fn test_revision_prompts_include_deficiencies() {
        let text = WRITER_USER
            .render(context! {
                company => "ABC",
                current_date => "January 02, 2025",
                market => "US market",
                currency => "USD",
                plan => vec!["Get prices"],
                analysis_summary => "steady",
                findings => Vec::<minijinja::Value>::new(),
                missing => vec!["news/finnhub"],
                deficiencies => vec!["[Valuation] (analysis) no multiples"],
            })
            .unwrap();

        assert!(text.contains("- news/finnhub"));
        assert!(text.contains("- [Valuation] (analysis) no multiples"));
    }

    #[test]
    fn test_system_prompts_render() {
        let ctx = context! { currency => "INR", current_date => "today", threshold => 7.0 };
        for template in [PLANNER_SYSTEM, ANALYST_SYSTEM, WRITER_SYSTEM, CHECKER_SYSTEM] {
            assert!(template.render(&ctx).is_ok(), "{} failed", template.name);
        }
        assert!(PLANNER_SYSTEM.render(()).unwrap().contains(r#""task_type": "stock_data""#));
    }
}
