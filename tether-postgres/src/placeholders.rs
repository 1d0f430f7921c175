use std::fmt::Write;
use tether_core::{Error, Params, Result, Value};

/// Turn `%(name)s` references into positional `$n` ones, numbered by first appearance.
///
/// Returns the rewritten statement and the values in positional order. `%%` stands for a
/// literal `%`, any other `%` is kept.
pub fn rewrite_placeholders<'p>(sql: &str, params: &'p Params) -> Result<(String, Vec<&'p Value>)> {
    let mut out = String::with_capacity(sql.len());
    let mut names = Vec::<&str>::new();
    let mut values = Vec::new();
    let mut rest = sql;
    while let Some(i) = rest.find('%') {
        out.push_str(&rest[..i]);
        let tail = &rest[i..];
        if let Some(after) = tail.strip_prefix("%%") {
            out.push('%');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("%(")
            && let Some(end) = after.find(")s")
        {
            let name = &after[..end];
            let position = match names.iter().position(|v| *v == name) {
                Some(position) => position,
                None => {
                    let Some(value) = params.get(name) else {
                        return Err(Error::msg(format!("Parameter `{}` has no value", name)));
                    };
                    names.push(name);
                    values.push(value);
                    names.len() - 1
                }
            };
            let _ = write!(out, "${}", position + 1);
            rest = &after[end + 2..];
        } else {
            out.push('%');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    Ok((out, values))
}
