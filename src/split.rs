/// Splits a T-SQL batch into statements on top-level `;`.
///
/// Separators inside `'...'`, `"..."`, `[...]`, `-- ...` and `/* ... */` are
/// ignored. Statements are trimmed and empty ones dropped, so a trailing
/// `;` does not produce an extra statement. Separators never reach the
/// gateway: `CREATE DATABASE x;` is sent as `CREATE DATABASE x`.
pub(crate) fn split_statements(sql: &str) -> Vec<String> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mode {
        Code,
        Quoted(char),
        LineComment,
        BlockComment,
    }

    let mut statements = Vec::new();
    let mut current = String::new();
    let mut mode = Mode::Code;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match mode {
            Mode::Code => match c {
                ';' => {
                    push_trimmed(&mut statements, &current);
                    current.clear();
                    continue;
                }
                '\'' | '"' => mode = Mode::Quoted(c),
                '[' => mode = Mode::Quoted(']'),
                '-' if chars.peek() == Some(&'-') => mode = Mode::LineComment,
                '/' if chars.peek() == Some(&'*') => {
                    current.push(c);
                    current.extend(chars.next());
                    mode = Mode::BlockComment;
                    continue;
                }
                _ => {}
            },
            Mode::Quoted(close) => {
                if c == close {
                    // Doubled closing character is an escape, not the end.
                    if chars.peek() == Some(&close) {
                        current.push(c);
                        current.extend(chars.next());
                        continue;
                    }
                    mode = Mode::Code;
                }
            }
            Mode::LineComment => {
                if c == '\n' {
                    mode = Mode::Code;
                }
            }
            Mode::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    current.push(c);
                    current.extend(chars.next());
                    mode = Mode::Code;
                    continue;
                }
            }
        }
        current.push(c);
    }

    push_trimmed(&mut statements, &current);
    statements
}

fn push_trimmed(statements: &mut Vec<String>, statement: &str) {
    let trimmed = statement.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_owned());
    }
}
