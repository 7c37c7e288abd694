// INSERT statement parser for SQLite dump lines.
// Kept deliberately small: table name, optional column list and the value
// groups after VALUES. No full SQL grammar.

use crate::logger;

/// One parsed `INSERT INTO t (cols) VALUES (...), (...);` statement.
/// Values keep their SQL spelling (quotes included, `NULL` as-is).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl InsertStatement {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Raw value of `column` in every row that has it.
    pub fn column_values<'a>(&'a self, column: &str) -> impl Iterator<Item = &'a str> + 'a {
        let idx = self.column_index(column);
        self.rows
            .iter()
            .filter_map(move |row| idx.and_then(|i| row.get(i)).map(String::as_str))
    }
}

/// Parse a single INSERT statement. Returns a reason string on shapes the
/// parser does not understand.
pub fn parse_insert(stmt: &str) -> Result<InsertStatement, String> {
    let rest = strip_keyword(stmt.trim(), "INSERT INTO")
        .ok_or("not INSERT")?
        .trim_start();

    let (table, rest) = split_table_name(rest)?;

    let mut columns = Vec::new();
    let mut rest = rest.trim_start();
    if rest.starts_with('(') {
        let end = rest.find(')').ok_or("invalid column list")?;
        for col in rest[1..end].split(',') {
            let col = col.trim().trim_matches(['`', '\'', '"', '[', ']'].as_ref());
            if !col.is_empty() {
                columns.push(col.to_string());
            }
        }
        rest = rest[end + 1..].trim_start();
    }

    let mut values_part = strip_keyword(rest, "VALUES").ok_or("no VALUES clause")?.trim();
    if let Some(stripped) = values_part.strip_suffix(';') {
        values_part = stripped.trim_end();
    }

    let mut rows = Vec::new();
    for group in split_value_groups(values_part) {
        let group = group.trim();
        let inner = group
            .strip_prefix('(')
            .and_then(|g| g.strip_suffix(')'))
            .unwrap_or(group);
        let values = split_values(inner);
        if !columns.is_empty() && values.len() != columns.len() {
            logger::debug(&format!(
                "parse_insert: skip row in {} (expected {} values, got {})",
                table,
                columns.len(),
                values.len()
            ));
            continue;
        }
        rows.push(values);
    }

    Ok(InsertStatement {
        table,
        columns,
        rows,
    })
}

/// Turn a SQL literal back into text: `'O''Brien'` -> `O'Brien`.
/// Unquoted values (numbers, NULL) come back unchanged.
pub fn unquote(value: &str) -> String {
    let value = value.trim();
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        value[1..value.len() - 1].replace("''", "'")
    } else {
        value.to_string()
    }
}

// Case-insensitive keyword prefix.
fn strip_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    s.get(..keyword.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(keyword))
        .map(|_| &s[keyword.len()..])
}

fn split_table_name(rest: &str) -> Result<(String, &str), String> {
    if let Some(quote) = rest.chars().next().filter(|c| matches!(*c, '`' | '"' | '[')) {
        let close = if quote == '[' { ']' } else { quote };
        let end = rest[1..].find(close).ok_or("invalid table name")? + 1;
        return Ok((rest[1..end].to_string(), &rest[end + 1..]));
    }
    let end = rest
        .find(|c: char| c == '(' || c.is_whitespace())
        .unwrap_or(rest.len());
    if end == 0 {
        return Err("invalid table name".to_string());
    }
    Ok((rest[..end].to_string(), &rest[end..]))
}

// Split `(...), (...)` into groups while respecting quoted strings.
// SQLite escapes quotes by doubling them, which the toggle handles on its own.
fn split_value_groups(values_part: &str) -> Vec<String> {
    let mut groups = Vec::new();
    let mut buf = String::new();
    let mut in_single = false;
    let mut depth = 0i32;

    for c in values_part.chars() {
        if c == '\'' {
            in_single = !in_single;
        } else if !in_single {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        buf.push(c);
                        groups.push(std::mem::take(&mut buf));
                        continue;
                    }
                }
                ',' if depth == 0 => continue,
                _ => {}
            }
        }
        if depth == 0 && !in_single && c.is_whitespace() && buf.is_empty() {
            continue;
        }
        buf.push(c);
    }

    if !buf.trim().is_empty() {
        groups.push(buf.trim().to_string());
    }
    groups
}

// Split the comma-separated values of one group. Quotes are kept.
fn split_values(group: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut buf = String::new();
    let mut in_single = false;
    let mut depth = 0i32;

    for c in group.chars() {
        if c == '\'' {
            in_single = !in_single;
        } else if !in_single {
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                ',' if depth == 0 => {
                    values.push(buf.trim().to_string());
                    buf.clear();
                    continue;
                }
                _ => {}
            }
        }
        buf.push(c);
    }
    values.push(buf.trim().to_string());
    values
}
