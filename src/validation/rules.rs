/// A single constraint on a field
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Required,
    Nullable,
    String,
    Integer,
    Boolean,
    Email,
    Min(u64),
    Max(u64),
    /// `{field}_confirmation` must carry the same value
    Confirmed,
    In(Vec<String>),
}

impl Rule {
    /// Translation keys this rule may produce a message from
    pub fn message_keys(&self) -> Vec<&'static str> {
        match self {
            Rule::Required => vec!["validation.required"],
            Rule::Nullable => vec![],
            Rule::String => vec!["validation.string"],
            Rule::Integer => vec!["validation.integer"],
            Rule::Boolean => vec!["validation.boolean"],
            Rule::Email => vec!["validation.email"],
            Rule::Min(_) => vec!["validation.min.string", "validation.min.numeric"],
            Rule::Max(_) => vec!["validation.max.string", "validation.max.numeric"],
            Rule::Confirmed => vec!["validation.confirmed"],
            Rule::In(_) => vec!["validation.in"],
        }
    }
}

/// Ordered rule list for one field, built fluently:
/// `Rules::new().required().string().max(255)`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rules(Vec<Rule>);

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        if !self.0.contains(&rule) {
            self.0.push(rule);
        }
        self
    }

    pub fn required(self) -> Self {
        self.rule(Rule::Required)
    }

    pub fn nullable(self) -> Self {
        self.rule(Rule::Nullable)
    }

    pub fn string(self) -> Self {
        self.rule(Rule::String)
    }

    pub fn integer(self) -> Self {
        self.rule(Rule::Integer)
    }

    pub fn boolean(self) -> Self {
        self.rule(Rule::Boolean)
    }

    pub fn email(self) -> Self {
        self.rule(Rule::Email)
    }

    pub fn min(self, n: u64) -> Self {
        self.rule(Rule::Min(n))
    }

    pub fn max(self, n: u64) -> Self {
        self.rule(Rule::Max(n))
    }

    pub fn confirmed(self) -> Self {
        self.rule(Rule::Confirmed)
    }

    pub fn one_of<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule(Rule::In(values.into_iter().map(Into::into).collect()))
    }

    pub fn has(&self, rule: &Rule) -> bool {
        self.0.contains(rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_order_and_skips_duplicates() {
        let rules = Rules::new().required().string().required().max(255);
        let collected: Vec<&Rule> = rules.iter().collect();
        assert_eq!(collected, vec![&Rule::Required, &Rule::String, &Rule::Max(255)]);
        assert!(rules.has(&Rule::Required));
        assert!(!rules.has(&Rule::Nullable));
    }

    #[test]
    fn size_rules_need_both_message_variants() {
        assert_eq!(Rule::Min(1).message_keys().len(), 2);
        assert!(Rule::Nullable.message_keys().is_empty());
    }
}
