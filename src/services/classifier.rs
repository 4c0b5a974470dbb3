use crate::models::news::ImpactLabel;

/// 一条分类规则：标题（小写）包含任一关键词即命中
#[derive(Debug, Clone)]
pub struct ImpactRule {
    pub label: ImpactLabel,
    pub keywords: &'static [&'static str],
}

/// 规则按顺序匹配，先命中者生效；都不命中时为 FYI
pub const IMPACT_RULES: &[ImpactRule] = &[
    ImpactRule {
        label: ImpactLabel::HighImpact,
        keywords: &[
            "earnings",
            "profit",
            "loss",
            "merger",
            "acquisition",
            "lawsuit",
            "plunge",
            "surge",
            "recall",
            "investigation",
            "downgrade",
            "upgrade",
            "guidance",
            "dividend",
            "bankruptcy",
        ],
    },
    ImpactRule {
        label: ImpactLabel::Neutral,
        keywords: &[
            "report",
            "analysis",
            "forecast",
            "outlook",
            "price target",
            "coverage",
        ],
    },
];

impl ImpactRule {
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k))
    }
}

pub fn classify(headline: &str) -> ImpactLabel {
    classify_with(IMPACT_RULES, headline)
}

pub fn classify_with(rules: &[ImpactRule], headline: &str) -> ImpactLabel {
    let lowered = headline.to_lowercase();
    rules
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map(|rule| rule.label)
        .unwrap_or(ImpactLabel::Fyi)
}
