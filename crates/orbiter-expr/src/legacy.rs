use crate::ast::{BinOp, Expr};

/// The permissive fallback front-end (spec.md §9 open question, resolved in
/// DESIGN.md): before giving up and treating an unparsable `when` clause as
/// always-true, try the narrow legacy shape it replaces — `X == "literal"`
/// or `X != null` with no boolean connectives. Anything else is left to the
/// caller's permissive-true behavior.
///
/// Deliberately not a real grammar: this exists only to keep predicates
/// written against the older string-matching convention working, not to
/// grow into a second parser.
pub fn parse_legacy(src: &str) -> Option<Expr> {
    let src = src.trim();
    if let Some((lhs, rhs)) = split_once_token(src, "==") {
        let var = parse_var(lhs.trim())?;
        let lit = parse_quoted(rhs.trim())?;
        return Some(Expr::BinOp(BinOp::Eq, Box::new(var), Box::new(Expr::Str(lit))));
    }
    if let Some((lhs, rhs)) = split_once_token(src, "!=") {
        let var = parse_var(lhs.trim())?;
        if rhs.trim() == "null" {
            return Some(Expr::BinOp(BinOp::Ne, Box::new(var), Box::new(Expr::Null)));
        }
        let lit = parse_quoted(rhs.trim())?;
        return Some(Expr::BinOp(BinOp::Ne, Box::new(var), Box::new(Expr::Str(lit))));
    }
    None
}

fn split_once_token<'a>(src: &'a str, token: &str) -> Option<(&'a str, &'a str)> {
    let idx = src.find(token)?;
    Some((&src[..idx], &src[idx + token.len()..]))
}

fn parse_var(s: &str) -> Option<Expr> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_') {
        return None;
    }
    let parts: Vec<String> = s.split('.').map(|p| p.to_string()).collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    Some(Expr::Var(parts))
}

fn parse_quoted(s: &str) -> Option<String> {
    let inner = s.strip_prefix('"')?.strip_suffix('"')?;
    if inner.contains('"') {
        return None;
    }
    Some(inner.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_equality_on_dotted_path() {
        let e = parse_legacy(r#"node.inputs.type == "postgres""#).unwrap();
        assert_eq!(
            e,
            Expr::BinOp(
                BinOp::Eq,
                Box::new(Expr::Var(vec!["node".into(), "inputs".into(), "type".into()])),
                Box::new(Expr::Str("postgres".into())),
            )
        );
    }

    #[test]
    fn parses_not_null_check() {
        let e = parse_legacy("variable.region != null").unwrap();
        assert_eq!(
            e,
            Expr::BinOp(
                BinOp::Ne,
                Box::new(Expr::Var(vec!["variable".into(), "region".into()])),
                Box::new(Expr::Null),
            )
        );
    }

    #[test]
    fn refuses_boolean_connectives() {
        assert!(parse_legacy(r#"a == "x" && b == "y""#).is_none());
    }
}
