//! SQL statement validator.
//!
//! Classifies a statement as allowed or rejected and attaches advisory warnings.
//! All matching is textual on the lower-cased statement. This is a fast pre-filter,
//! not a parser: it over-rejects some legitimate statements (an IN-subquery counts
//! as a second table) and can be evaded by obfuscated identifiers.

use crate::config::ProtectionConfig;
use crate::database::QueryParam;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const MAX_JOINS: usize = 5;
const MAX_SUBQUERIES: usize = 3;
const MAX_UNIONS: usize = 2;

static JOIN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bjoin\b").expect("Invalid regex: join pattern"));

static SUBQUERY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*select\b").expect("Invalid regex: subquery pattern"));

static UNION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bunion\b").expect("Invalid regex: union pattern"));

static DISTINCT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bdistinct\b").expect("Invalid regex: distinct pattern"));

static ORDER_BY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\border\s+by\b").expect("Invalid regex: order by pattern"));

static GROUP_BY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bgroup\s+by\b").expect("Invalid regex: group by pattern"));

static HAVING_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bhaving\b").expect("Invalid regex: having pattern"));

static LIMIT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\blimit\b").expect("Invalid regex: limit pattern"));

static WHERE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bwhere\b").expect("Invalid regex: where pattern"));

static FROM_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bfrom\b").expect("Invalid regex: from pattern"));

static LEADING_WILDCARD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bi?like\s+'%").expect("Invalid regex: leading wildcard pattern")
});

static WHERE_FUNCTION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(lower|upper|trim|substring|date_trunc|extract)\s*\(")
        .expect("Invalid regex: where function pattern")
});

static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\d+)").expect("Invalid regex: placeholder pattern"));

/// Innermost parenthesized group.
static PAREN_GROUP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^()]*\)").expect("Invalid regex: paren group pattern"));

/// Where a FROM list stops.
static FROM_LIST_END_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:where|group|order|limit|offset|fetch|having|window|union|intersect|except|join|inner|left|right|full|cross|natural|on|using|for|returning)\b|[();]",
    )
    .expect("Invalid regex: from list end pattern")
});

/// Clauses that close a WHERE predicate.
static WHERE_END_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:group\s+by|order\s+by|having|limit|offset|fetch|window|union|intersect|except|for\s+(?:update|share|no\s+key|key))\b|;",
    )
    .expect("Invalid regex: where end pattern")
});

static SET_OPERATOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:union|intersect|except)(?:\s+(?:all|distinct))?\b")
        .expect("Invalid regex: set operator pattern")
});

static JOIN_CONDITION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\bjoin\b.*?\b(?:on|using)\b").expect("Invalid regex: join condition pattern")
});

/// `a.x = b.y`; qualifiers are compared in code since the regex crate has no backreferences.
static QUALIFIED_EQUALITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b([a-z_][a-z0-9_]*)\.[a-z_"][a-z0-9_"]*\s*=\s*([a-z_][a-z0-9_]*)\.[a-z_"]"#)
        .expect("Invalid regex: qualified equality pattern")
});

/// Verdict for a single statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub allowed: bool,
    /// Present only when `allowed` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            warnings: vec![],
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            warnings: vec![],
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}

/// Validate a statement against the protection rules.
///
/// Pure and deterministic: no I/O, no logging, same inputs give the same result.
/// Checks run in order (length, complexity, protected tables, cartesian product) and
/// the first rejection wins; warnings collected before it are kept.
pub fn validate(sql: &str, params: &[QueryParam], config: &ProtectionConfig) -> ValidationResult {
    // Length
    let length = sql.chars().count();
    if length > config.max_query_length {
        return ValidationResult::reject(format!(
            "Query length {} exceeds maximum of {} characters",
            length, config.max_query_length
        ));
    }

    let scrubbed = Scrubbed::new(&sql.trim().to_lowercase());
    if scrubbed.structural.trim().is_empty() {
        return ValidationResult::reject("Query is empty");
    }

    let mut warnings = Vec::new();

    if config.enable_complexity_check {
        check_complexity(&scrubbed, params, &mut warnings);
    }

    if let Some(reason) = check_protected_tables(&scrubbed.structural, config, &mut warnings) {
        return ValidationResult::reject(reason).with_warnings(warnings);
    }

    if let Some(reason) = check_cartesian_product(&scrubbed.structural) {
        return ValidationResult::reject(reason).with_warnings(warnings);
    }

    ValidationResult::allow().with_warnings(warnings)
}

fn check_complexity(scrubbed: &Scrubbed, params: &[QueryParam], warnings: &mut Vec<String>) {
    let text = scrubbed.structural.as_str();
    let has_limit = LIMIT_REGEX.is_match(text);

    let joins = JOIN_REGEX.find_iter(text).count();
    if joins > MAX_JOINS {
        warnings.push(format!(
            "Query has {} JOINs (more than {}); consider simplifying",
            joins, MAX_JOINS
        ));
    }

    let subqueries = SUBQUERY_REGEX.find_iter(text).count();
    if subqueries > MAX_SUBQUERIES {
        warnings.push(format!(
            "Query has {} nested subqueries (more than {}); consider flattening",
            subqueries, MAX_SUBQUERIES
        ));
    }

    let unions = UNION_REGEX.find_iter(text).count();
    if unions > MAX_UNIONS {
        warnings.push(format!(
            "Query has {} UNIONs (more than {})",
            unions, MAX_UNIONS
        ));
    }

    if DISTINCT_REGEX.is_match(text) && !has_limit {
        warnings.push("DISTINCT without LIMIT may deduplicate the full result set".into());
    }

    if ORDER_BY_REGEX.is_match(text) && !has_limit {
        warnings.push("ORDER BY without LIMIT sorts the full result set".into());
    }

    if GROUP_BY_REGEX.is_match(text) && !HAVING_REGEX.is_match(text) && !has_limit {
        warnings.push("GROUP BY without HAVING or LIMIT may return many groups".into());
    }

    // Literals are needed here, so match on the text that still has them.
    if LEADING_WILDCARD_REGEX.is_match(&scrubbed.text) {
        warnings.push("LIKE pattern with a leading wildcard cannot use an index".into());
    }

    if let Some(predicate) = where_clause(text) {
        let mut functions: Vec<&str> = Vec::new();
        for name in WHERE_FUNCTION_REGEX
            .captures_iter(predicate)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        {
            if !functions.contains(&name) {
                functions.push(name);
            }
        }
        if !functions.is_empty() {
            warnings.push(format!(
                "Function {} applied to a WHERE column prevents index usage",
                functions.join(", ")
            ));
        }
    }

    let highest = PLACEHOLDER_REGEX
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<usize>().ok())
        .max();
    if let Some(highest) = highest.filter(|highest| *highest > params.len()) {
        warnings.push(format!(
            "Statement references ${} but only {} parameters were supplied",
            highest,
            params.len()
        ));
    }
}

fn check_protected_tables(
    text: &str,
    config: &ProtectionConfig,
    warnings: &mut Vec<String>,
) -> Option<String> {
    let tables = config.protected_tables.matches(text);
    if tables.is_empty() || WHERE_REGEX.is_match(text) {
        return None;
    }

    if LIMIT_REGEX.is_match(text) {
        for table in tables {
            warnings.push(format!(
                "Query on large table '{}' has no WHERE clause - verify LIMIT is safe",
                table
            ));
        }
        return None;
    }

    Some(format!(
        "Query on large table '{}' has no WHERE clause: add a filtering predicate, \
         an unfiltered scan can return an unbounded number of rows",
        tables.join("', '")
    ))
}

/// Each top-level branch of a set operation is checked on its own.
fn check_cartesian_product(text: &str) -> Option<String> {
    top_level_branches(text)
        .into_iter()
        .find_map(check_branch_cartesian_product)
}

fn check_branch_cartesian_product(text: &str) -> Option<String> {
    let stripped = strip_non_query_groups(text);

    let total_tables = JOIN_REGEX.find_iter(&stripped).count() + from_list_entries(&stripped);
    if total_tables <= 1 {
        return None;
    }

    if JOIN_CONDITION_REGEX.is_match(&stripped) {
        return None;
    }

    let has_equijoin = where_clause(text).is_some_and(|predicate| {
        QUALIFIED_EQUALITY_REGEX
            .captures_iter(predicate)
            .any(|caps| caps.get(1).map(|m| m.as_str()) != caps.get(2).map(|m| m.as_str()))
    });
    if has_equijoin {
        return None;
    }

    Some(format!(
        "Possible cartesian product: {} tables referenced without a JOIN ... ON condition \
         or a join predicate in WHERE",
        total_tables
    ))
}

/// The predicate after the first WHERE, up to the next top-level clause.
fn where_clause(text: &str) -> Option<&str> {
    WHERE_REGEX.find(text).map(|m| {
        let rest = &text[m.end()..];
        let end = WHERE_END_REGEX
            .find_iter(rest)
            .find(|e| paren_depth(&rest[..e.start()]) == 0)
            .map(|e| e.start())
            .unwrap_or(rest.len());
        &rest[..end]
    })
}

/// Splits on UNION / INTERSECT / EXCEPT outside parentheses.
fn top_level_branches(text: &str) -> Vec<&str> {
    let mut branches = Vec::new();
    let mut start = 0;
    for m in SET_OPERATOR_REGEX.find_iter(text) {
        if paren_depth(&text[..m.start()]) == 0 {
            branches.push(&text[start..m.start()]);
            start = m.end();
        }
    }
    branches.push(&text[start..]);
    branches
}

/// Open parentheses minus closed ones; literals must already be blanked.
fn paren_depth(text: &str) -> i64 {
    text.chars().fold(0, |depth, c| match c {
        '(' => depth + 1,
        ')' => depth - 1,
        _ => depth,
    })
}

/// Collapses parenthesized groups that contain no SELECT (function arguments, IN lists)
/// so that `extract(year from ts)` does not look like a FROM clause.
fn strip_non_query_groups(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = PAREN_GROUP_REGEX
            .replace_all(&current, |caps: &regex::Captures<'_>| {
                let group = &caps[0];
                if group.contains("select") {
                    // Keep subqueries but hide their parens from the next pass.
                    format!("[{}]", &group[1..group.len() - 1])
                } else {
                    "<>".to_string()
                }
            })
            .into_owned();
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Sum of comma-separated entries across every FROM list.
fn from_list_entries(text: &str) -> usize {
    FROM_REGEX
        .find_iter(text)
        .map(|m| {
            let rest = &text[m.end()..];
            let end = FROM_LIST_END_REGEX
                .find(rest)
                .map(|e| e.start())
                .unwrap_or(rest.len());
            let rest = &rest[..end];
            // A subquery in brackets ends the list too.
            let rest = rest.split(['[', ']']).next().unwrap_or_default();
            rest.split(',')
                .filter(|entry| !entry.trim().is_empty())
                .count()
                .max(1)
        })
        .sum()
}

/// Statement text with comments removed, in two flavours.
struct Scrubbed {
    /// Literals intact.
    text: String,
    /// Every string literal replaced by `''`.
    structural: String,
}

impl Scrubbed {
    fn new(lowered: &str) -> Self {
        let mut text = String::with_capacity(lowered.len());
        let mut structural = String::with_capacity(lowered.len());
        let mut chars = lowered.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\'' => {
                    text.push('\'');
                    structural.push_str("''");
                    while let Some(ch) = chars.next() {
                        text.push(ch);
                        if ch == '\'' {
                            // '' is an escaped quote inside the literal
                            if chars.peek() == Some(&'\'') {
                                chars.next();
                                text.push('\'');
                                continue;
                            }
                            break;
                        }
                    }
                }
                '-' if chars.peek() == Some(&'-') => {
                    while chars.next_if(|ch| *ch != '\n').is_some() {}
                    text.push(' ');
                    structural.push(' ');
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    let mut prev = '\0';
                    for ch in chars.by_ref() {
                        if prev == '*' && ch == '/' {
                            break;
                        }
                        prev = ch;
                    }
                    text.push(' ');
                    structural.push(' ');
                }
                _ => {
                    text.push(c);
                    structural.push(c);
                }
            }
        }

        Self { text, structural }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtectedTableSet;

    fn check(sql: &str) -> ValidationResult {
        validate(sql, &[], &ProtectionConfig::default())
    }

    fn has_warning(result: &ValidationResult, needle: &str) -> bool {
        result.warnings.iter().any(|w| w.contains(needle))
    }

    #[test]
    fn test_simple_filtered_select() {
        let result = check("SELECT id, name FROM venues WHERE city = 'Austin' LIMIT 20");
        assert!(result.allowed);
        assert!(result.reason.is_none());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_length_limit_ignores_content() {
        let config = ProtectionConfig::builder()
            .max_query_length(40)
            .enable_complexity_check(false)
            .build()
            .unwrap();

        for sql in [
            "SELECT id FROM venues WHERE id = 1 AND name = 'x'",
            "                                                  ",
            "SELECT * FROM master_ticketing_groups, a, b, c, d, e",
        ] {
            let result = validate(sql, &[], &config);
            assert!(!result.allowed, "{sql}");
            assert!(result.reason.unwrap().contains("exceeds maximum of 40"));
            assert!(result.warnings.is_empty());
        }
    }

    #[test]
    fn test_length_counts_characters() {
        let config = ProtectionConfig::builder().max_query_length(20).build().unwrap();
        // 18 characters but 27 bytes
        let sql = "SELECT 'ééééééééé'";
        assert_eq!(sql.chars().count(), 18);
        assert!(validate(sql, &[], &config).allowed);
    }

    #[test]
    fn test_empty_rejected() {
        assert!(!check("   ").allowed);
        assert!(!check("-- just a comment").allowed);
    }

    #[test]
    fn test_protected_table_without_where_rejected() {
        let result = check("SELECT * FROM master_ticketing_groups");
        assert!(!result.allowed);
        let reason = result.reason.unwrap();
        assert!(reason.contains("master_ticketing_groups"));
        assert!(reason.contains("no WHERE clause"));
        assert!(reason.contains("filtering predicate"));
    }

    #[test]
    fn test_protected_table_with_limit_allowed_with_warning() {
        let result = check("SELECT * FROM master_ticketing_groups LIMIT 100");
        assert!(result.allowed);
        assert!(has_warning(&result, "verify LIMIT is safe"));
    }

    #[test]
    fn test_protected_table_with_where_allowed() {
        let result = check("SELECT * FROM master_ticketing_groups WHERE group_id = 42");
        assert!(result.allowed);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_comment_does_not_count_as_where() {
        let result = check("SELECT * FROM master_ticketing_groups -- where id = 1");
        assert!(!result.allowed);

        let result = check("SELECT * FROM master_events /* where */");
        assert!(!result.allowed);
    }

    #[test]
    fn test_literal_does_not_count_as_where() {
        let result = check("SELECT 'where' AS w FROM master_events");
        assert!(!result.allowed);
    }

    #[test]
    fn test_custom_protected_tables() {
        let config = ProtectionConfig::builder()
            .protected_tables(ProtectedTableSet::new(["orders"]))
            .build()
            .unwrap();

        assert!(!validate("SELECT * FROM orders", &[], &config).allowed);
        assert!(validate("SELECT * FROM master_ticketing_groups", &[], &config).allowed);
    }

    #[test]
    fn test_cartesian_product_rejected() {
        let result = check("SELECT * FROM a, b");
        assert!(!result.allowed);
        assert!(result.reason.unwrap().contains("cartesian product"));
    }

    #[test]
    fn test_join_with_on_allowed() {
        let result = check("SELECT * FROM a JOIN b ON a.id = b.id");
        assert!(result.allowed);
        assert!(result.reason.is_none());
        assert!(!has_warning(&result, "cartesian"));
    }

    #[test]
    fn test_join_using_allowed() {
        assert!(check("SELECT * FROM events JOIN venues USING (venue_id)").allowed);
    }

    #[test]
    fn test_join_without_condition_rejected() {
        let result = check("SELECT * FROM events CROSS JOIN venues");
        assert!(!result.allowed);
    }

    #[test]
    fn test_implicit_join_with_where_equality_allowed() {
        let result = check("SELECT * FROM events e, venues v WHERE e.venue_id = v.id");
        assert!(result.allowed);
    }

    #[test]
    fn test_single_table_equality_is_not_a_join() {
        let result = check("SELECT * FROM events e, venues v WHERE e.venue_id = e.parent_id");
        assert!(!result.allowed);
    }

    #[test]
    fn test_function_from_is_not_a_table() {
        let result = check("SELECT extract(year FROM starts_at) FROM events WHERE id = 1");
        assert!(result.allowed, "{:?}", result.reason);

        let result = check("SELECT substring(name FROM 1 FOR 3) FROM venues WHERE id = 1");
        assert!(result.allowed, "{:?}", result.reason);
    }

    #[test]
    fn test_subquery_counts_as_table() {
        // Known over-rejection of the textual heuristic.
        let result = check("SELECT * FROM events WHERE venue_id IN (SELECT id FROM venues)");
        assert!(!result.allowed);
    }

    #[test]
    fn test_protected_check_runs_before_cartesian() {
        let result = check("SELECT * FROM master_events, venues");
        assert!(result.reason.unwrap().contains("master_events"));
    }

    #[test]
    fn test_too_many_joins() {
        let sql = "SELECT * FROM a \
            JOIN b ON a.id = b.a_id JOIN c ON b.id = c.b_id JOIN d ON c.id = d.c_id \
            JOIN e ON d.id = e.d_id JOIN f ON e.id = f.e_id JOIN g ON f.id = g.f_id \
            WHERE a.id = 1";
        let result = check(sql);
        assert!(result.allowed);
        assert!(has_warning(&result, "6 JOINs"));
    }

    #[test]
    fn test_nested_subqueries() {
        let sql = "SELECT * FROM a WHERE a.id IN (SELECT b.id FROM b WHERE b.x IN \
            (SELECT c.x FROM c WHERE c.y IN (SELECT d.y FROM d WHERE d.z IN \
            (SELECT e.z FROM e WHERE e.id = a.id))))";
        let result = check(sql);
        assert!(has_warning(&result, "nested subqueries"));
    }

    #[test]
    fn test_too_many_unions() {
        let sql = "SELECT id FROM a WHERE id = 1 UNION SELECT id FROM b WHERE id = 1 \
            UNION SELECT id FROM c WHERE id = 1 UNION SELECT id FROM d WHERE id = 1";
        let result = check(sql);
        assert!(result.allowed, "{:?}", result.reason);
        assert!(has_warning(&result, "3 UNIONs"));
    }

    #[test]
    fn test_union_branches_checked_separately() {
        let result = check(
            "SELECT id FROM venues WHERE id = 1 UNION SELECT id FROM events WHERE id = 2",
        );
        assert!(result.allowed, "{:?}", result.reason);

        let result = check("SELECT id FROM venues WHERE id = 1 UNION ALL SELECT id FROM a, b");
        assert!(!result.allowed);
        assert!(result.reason.unwrap().contains("cartesian product"));
    }

    #[test]
    fn test_top_level_branches() {
        assert_eq!(
            top_level_branches("select 1 from a union all select 2 from b"),
            vec!["select 1 from a ", " select 2 from b"]
        );
        assert_eq!(
            top_level_branches("select x from a where x in (select y from b union select z from c)")
                .len(),
            1
        );
    }

    #[test]
    fn test_sort_and_aggregate_without_limit() {
        let result = check("SELECT DISTINCT city FROM venues WHERE state = 'TX' ORDER BY city");
        assert!(has_warning(&result, "DISTINCT without LIMIT"));
        assert!(has_warning(&result, "ORDER BY without LIMIT"));

        let result =
            check("SELECT DISTINCT city FROM venues WHERE state = 'TX' ORDER BY city LIMIT 5");
        assert!(result.warnings.is_empty());

        let result = check("SELECT city, count(*) FROM venues WHERE state = 'TX' GROUP BY city");
        assert!(has_warning(&result, "GROUP BY without HAVING"));

        let result = check(
            "SELECT city, count(*) FROM venues WHERE state = 'TX' \
             GROUP BY city HAVING count(*) > 2",
        );
        assert!(!has_warning(&result, "GROUP BY"));
    }

    #[test]
    fn test_leading_wildcard_like() {
        let result = check("SELECT * FROM events WHERE name ILIKE '%eras%' LIMIT 10");
        assert!(result.allowed);
        assert!(has_warning(&result, "leading wildcard"));

        let result = check("SELECT * FROM events WHERE name LIKE 'eras%' LIMIT 10");
        assert!(!has_warning(&result, "leading wildcard"));
    }

    #[test]
    fn test_function_on_where_column() {
        let result = check("SELECT * FROM events WHERE lower(name) = 'eras' LIMIT 10");
        assert!(has_warning(&result, "Function lower"));

        let result = check("SELECT lower(name) FROM events WHERE id = 3");
        assert!(!has_warning(&result, "prevents index usage"));
    }

    #[test]
    fn test_function_outside_where_predicate() {
        let result = check("SELECT * FROM events WHERE id = 1 ORDER BY lower(name) LIMIT 5");
        assert!(result.allowed);
        assert!(!has_warning(&result, "prevents index usage"));

        let result = check(
            "SELECT upper(city), count(*) FROM venues WHERE state = 'TX' \
             GROUP BY upper(city) HAVING count(*) > 1",
        );
        assert!(!has_warning(&result, "prevents index usage"));
    }

    #[test]
    fn test_where_clause_bounds() {
        assert_eq!(
            where_clause("select * from t where a = 1 order by lower(b) limit 5"),
            Some(" a = 1 ")
        );
        let nested = "select * from t where a in (select b from u order by b limit 1) and c = 2";
        assert_eq!(
            where_clause(nested),
            Some(" a in (select b from u order by b limit 1) and c = 2")
        );
        assert_eq!(where_clause("select 1"), None);
    }

    #[test]
    fn test_placeholder_count() {
        let config = ProtectionConfig::default();
        let sql = "SELECT * FROM events WHERE id = $1 AND venue_id = $2";

        let result = validate(sql, &[QueryParam::Int(1)], &config);
        assert!(has_warning(&result, "references $2"));

        let result = validate(sql, &[QueryParam::Int(1), QueryParam::Int(2)], &config);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_complexity_check_disabled() {
        let config = ProtectionConfig::builder()
            .enable_complexity_check(false)
            .build()
            .unwrap();
        let result = validate(
            "SELECT DISTINCT name FROM events WHERE name LIKE '%x' ORDER BY name",
            &[],
            &config,
        );
        assert!(result.allowed);
        assert!(result.warnings.is_empty());

        // Hard rejections still apply.
        assert!(!validate("SELECT * FROM a, b", &[], &config).allowed);
    }

    #[test]
    fn test_warnings_kept_on_rejection() {
        let result = check("SELECT DISTINCT * FROM master_events ORDER BY id");
        assert!(!result.allowed);
        assert!(has_warning(&result, "DISTINCT without LIMIT"));
        assert!(has_warning(&result, "ORDER BY without LIMIT"));
    }

    #[test]
    fn test_warning_order_follows_checks() {
        let result = check("SELECT DISTINCT * FROM master_events ORDER BY id LIMIT 10 ");
        // DISTINCT/ORDER BY are satisfied by LIMIT; only the protected-table warning remains
        assert_eq!(result.warnings.len(), 1);

        let result = check("SELECT * FROM master_events WHERE name LIKE '%a' LIMIT 5");
        assert_eq!(
            result.warnings,
            vec!["LIKE pattern with a leading wildcard cannot use an index".to_string()]
        );
    }

    #[test]
    fn test_idempotent() {
        let config = ProtectionConfig::default();
        for sql in [
            "SELECT * FROM master_ticketing_groups",
            "SELECT * FROM master_ticketing_groups LIMIT 100",
            "SELECT * FROM a, b",
            "SELECT DISTINCT name FROM events WHERE lower(name) LIKE '%x'",
        ] {
            assert_eq!(validate(sql, &[], &config), validate(sql, &[], &config));
        }
    }

    #[test]
    fn test_scrubbed_literals() {
        let scrubbed = Scrubbed::new("select 'it''s -- fine' from t -- trailing\nwhere x = 1");
        assert_eq!(scrubbed.structural, "select '' from t  \nwhere x = 1");
        assert!(scrubbed.text.contains("'it''s -- fine'"));
    }

    #[test]
    fn test_from_list_entries() {
        assert_eq!(from_list_entries("select * from a, b, c where x = 1"), 3);
        assert_eq!(from_list_entries("select * from a join b on a.id = b.id"), 1);
        assert_eq!(
            from_list_entries(&strip_non_query_groups("select extract(year from d) from t")),
            1
        );
    }
}
