//! Lexical masking for script source
//!
//! Splits a unit of source into lines and separates each line into its
//! code text (comments removed, literal contents blanked), its comment text
//! and the contents of the string literals it closes. Brace depth is tracked
//! across lines so rules can judge whether a statement sits at the unit's
//! outermost scope.
//!
//! This is a token-level pass, not a parser: malformed input (unterminated
//! strings or comments) simply runs to the end of the text.

/// One line of source after masking
#[derive(Debug, Clone, Default)]
pub struct MaskedLine<'a> {
    /// 1-based line number
    pub number: u32,
    /// The untouched line text
    pub raw: &'a str,
    /// Code with comments stripped and literal contents removed
    /// (quotes are kept so `x = ""` still reads as an assignment)
    pub code: String,
    /// Concatenated comment text found on this line
    pub comment: String,
    /// Contents of string/template literals that end on this line
    pub literals: Vec<String>,
    /// Brace depth at the start of the line
    pub depth: usize,
}

impl MaskedLine<'_> {
    /// Brace depth at a byte offset into `code`
    pub fn depth_at(&self, offset: usize) -> usize {
        let mut depth = self.depth;
        for ch in self.code[..offset.min(self.code.len())].chars() {
            match ch {
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        depth
    }

    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }
}

/// A whole unit of source after masking
#[derive(Debug, Clone, Default)]
pub struct MaskedSource<'a> {
    pub lines: Vec<MaskedLine<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    BlockComment,
    Str(char),
    Template,
}

/// Mask a unit of source text.
pub fn mask_source(source: &str) -> MaskedSource<'_> {
    let mut lines = Vec::new();
    let mut mode = Mode::Code;
    let mut depth = 0usize;
    // Open `${` interpolations, each with its own inner brace count
    let mut interpolations: Vec<usize> = Vec::new();
    let mut literal = String::new();

    if source.is_empty() {
        return MaskedSource { lines };
    }

    // A trailing newline terminates the last line rather than opening a new one
    let body = source.strip_suffix('\n').unwrap_or(source);
    for (idx, raw) in body.split('\n').enumerate() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        let mut line = MaskedLine {
            number: (idx + 1) as u32,
            raw,
            depth,
            ..Default::default()
        };

        let chars: Vec<char> = raw.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let ch = chars[i];
            let next = chars.get(i + 1).copied();
            match mode {
                Mode::Code => match ch {
                    '/' if next == Some('/') => {
                        line.comment.push_str(&chars[i + 2..].iter().collect::<String>());
                        break;
                    }
                    '/' if next == Some('*') => {
                        mode = Mode::BlockComment;
                        i += 1;
                    }
                    '/' if starts_regex(&line.code) => {
                        i = skip_regex(&chars, i);
                        line.code.push_str("/./");
                    }
                    '\'' | '"' => {
                        mode = Mode::Str(ch);
                        line.code.push(ch);
                    }
                    '`' => {
                        mode = Mode::Template;
                        line.code.push(ch);
                    }
                    '{' => {
                        if let Some(inner) = interpolations.last_mut() {
                            *inner += 1;
                        } else {
                            depth += 1;
                        }
                        line.code.push(ch);
                    }
                    '}' => {
                        match interpolations.last_mut() {
                            Some(0) => {
                                // closes a `${`, back inside the template
                                interpolations.pop();
                                mode = Mode::Template;
                                line.code.push(' ');
                            }
                            Some(inner) => {
                                *inner -= 1;
                                line.code.push(ch);
                            }
                            None => {
                                depth = depth.saturating_sub(1);
                                line.code.push(ch);
                            }
                        }
                    }
                    _ => line.code.push(ch),
                },
                Mode::BlockComment => {
                    if ch == '*' && next == Some('/') {
                        mode = Mode::Code;
                        line.code.push(' ');
                        i += 1;
                    } else {
                        line.comment.push(ch);
                    }
                }
                Mode::Str(quote) => {
                    if ch == '\\' {
                        if let Some(escaped) = next {
                            literal.push(escaped);
                        }
                        i += 1;
                    } else if ch == quote {
                        mode = Mode::Code;
                        line.code.push(ch);
                        line.literals.push(std::mem::take(&mut literal));
                    } else {
                        literal.push(ch);
                    }
                }
                Mode::Template => {
                    if ch == '\\' {
                        if let Some(escaped) = next {
                            literal.push(escaped);
                        }
                        i += 1;
                    } else if ch == '`' {
                        mode = Mode::Code;
                        line.code.push(ch);
                        line.literals.push(std::mem::take(&mut literal));
                    } else if ch == '$' && next == Some('{') {
                        interpolations.push(0);
                        mode = Mode::Code;
                        line.code.push(' ');
                        i += 1;
                    } else {
                        literal.push(ch);
                    }
                }
            }
            i += 1;
        }

        match mode {
            // Plain quotes cannot span lines; recover at the line end
            Mode::Str(_) => {
                mode = Mode::Code;
                line.literals.push(std::mem::take(&mut literal));
            }
            Mode::Template => literal.push('\n'),
            Mode::BlockComment => line.comment.push('\n'),
            Mode::Code => {}
        }

        lines.push(line);
    }

    MaskedSource { lines }
}

/// Whether a `/` at this point opens a regex literal rather than dividing
fn starts_regex(code_so_far: &str) -> bool {
    match code_so_far.trim_end().chars().last() {
        None => true,
        Some(prev) => matches!(
            prev,
            '(' | ',' | '=' | ':' | '[' | '!' | '&' | '|' | '?' | '{' | '}' | ';' | '+' | '-'
                | '*' | '%' | '<' | '>' | '~' | '^'
        ) || code_so_far.trim_end().ends_with("return"),
    }
}

/// Skip past a regex literal starting at `start`, returning the index of its
/// closing slash (or the last index of the line when unterminated)
fn skip_regex(chars: &[char], start: usize) -> usize {
    let mut i = start + 1;
    let mut in_class = false;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => return i,
            _ => {}
        }
        i += 1;
    }
    chars.len().saturating_sub(1)
}
