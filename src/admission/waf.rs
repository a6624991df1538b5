use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WafAction {
    Log,
    Challenge,
    Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WafRule {
    pub id: String,
    pub pattern: String,
    #[serde(default)]
    pub literal: bool,
    pub action: WafAction,
}

struct BuiltinFamily {
    id: &'static str,
    regex: Regex,
}

static SQL_INJECTION: Lazy<Vec<BuiltinFamily>> = Lazy::new(|| {
    vec![
        BuiltinFamily {
            id: "sql-injection-union",
            regex: Regex::new(r"(?i)\bunion\b.{0,40}\bselect\b").unwrap(),
        },
        BuiltinFamily {
            id: "sql-injection-boolean",
            regex: Regex::new(r"(?i)(\bor\b|\band\b)\s+['\"]?\s*\d+\s*['\"]?\s*=\s*['\"]?\s*\d+").unwrap(),
        },
        BuiltinFamily {
            id: "sql-injection-comment",
            regex: Regex::new(r"(--|#|/\*).{0,20}$").unwrap(),
        },
        BuiltinFamily {
            id: "sql-injection-quote",
            regex: Regex::new(r#"['"]\s*(or|and)\s*['"]?\s*=\s*['"]?"#).unwrap(),
        },
    ]
});

static XSS: Lazy<Vec<BuiltinFamily>> = Lazy::new(|| {
    vec![
        BuiltinFamily {
            id: "xss-script-tag",
            regex: Regex::new(r"(?i)<\s*script").unwrap(),
        },
        BuiltinFamily {
            id: "xss-event-handler",
            regex: Regex::new(r"(?i)on(error|load|click|mouseover)\s*=").unwrap(),
        },
        BuiltinFamily {
            id: "xss-javascript-uri",
            regex: Regex::new(r"(?i)javascript\s*:").unwrap(),
        },
    ]
});

static PATH_TRAVERSAL: Lazy<Vec<BuiltinFamily>> = Lazy::new(|| {
    vec![BuiltinFamily {
        id: "path-traversal-dotdot",
        regex: Regex::new(r"(\.\./|\.\.\\|%2e%2e%2f)").unwrap(),
    }]
});

static COMMAND_INJECTION: Lazy<Vec<BuiltinFamily>> = Lazy::new(|| {
    vec![
        BuiltinFamily {
            id: "command-injection-shell-metachar",
            regex: Regex::new(r"[;&|`$]\s*(rm|cat|ls|wget|curl|nc|bash|sh)\b").unwrap(),
        },
        BuiltinFamily {
            id: "command-injection-backtick",
            regex: Regex::new(r"`[^`]+`").unwrap(),
        },
    ]
});

#[derive(Debug, Clone)]
pub struct WafMatch {
    pub rule_id: String,
    pub action: WafAction,
}

/// Fixed pattern families plus user rules. Analyzes path, each query value,
/// each header value, and a serialized body. The result carries every
/// matched rule and the most restrictive action (block dominates).
pub struct Waf {
    user_rules: Vec<(WafRule, Option<Regex>)>,
}

impl Waf {
    pub fn build(user_rules: Vec<WafRule>) -> Self {
        let compiled = user_rules
            .into_iter()
            .map(|rule| {
                let regex = if rule.literal {
                    None
                } else {
                    Regex::new(&rule.pattern).ok()
                };
                (rule, regex)
            })
            .collect();
        Waf { user_rules: compiled }
    }

    fn scan_builtin(families: &[&Lazy<Vec<BuiltinFamily>>], input: &str, matches: &mut Vec<WafMatch>) {
        for family in families {
            for entry in family.iter() {
                if entry.regex.is_match(input) {
                    matches.push(WafMatch {
                        rule_id: entry.id.to_string(),
                        action: WafAction::Block,
                    });
                }
            }
        }
    }

    fn scan_user_rules(&self, input: &str, matches: &mut Vec<WafMatch>) {
        for (rule, regex) in &self.user_rules {
            let hit = match regex {
                Some(re) => re.is_match(input),
                None => input.contains(&rule.pattern),
            };
            if hit {
                matches.push(WafMatch {
                    rule_id: rule.id.clone(),
                    action: rule.action,
                });
            }
        }
    }

    /// Analyzes every surface named by the spec and returns the matched
    /// rules plus the most restrictive action observed.
    pub fn analyze(&self, path: &str, query_values: &[&str], header_values: &[&str], body: &str) -> (Vec<WafMatch>, Option<WafAction>) {
        let families: [&Lazy<Vec<BuiltinFamily>>; 4] =
            [&SQL_INJECTION, &XSS, &PATH_TRAVERSAL, &COMMAND_INJECTION];

        let mut matches = Vec::new();
        let mut surfaces: Vec<&str> = vec![path];
        surfaces.extend(query_values);
        surfaces.extend(header_values);
        surfaces.push(body);

        for input in &surfaces {
            Self::scan_builtin(&families, input, &mut matches);
            self.scan_user_rules(input, &mut matches);
        }

        let worst = matches.iter().map(|m| m.action).max();
        (matches, worst)
    }
}
