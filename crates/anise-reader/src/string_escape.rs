use crate::error::ReaderError;

/// Decode the escapes of a raw string body (the text between the quotes,
/// backslashes still in place).
pub fn unescape_string(raw: &str) -> Result<String, ReaderError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let esc = chars
            .next()
            .ok_or_else(|| ReaderError::parse("Unsupported escape character: \\"))?;
        match esc {
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'n' => out.push('\n'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'u' => {
                let mut code = 0u32;
                for _ in 0..4 {
                    let digit = chars
                        .next()
                        .and_then(|c| c.to_digit(16))
                        .ok_or_else(|| {
                            ReaderError::parse("Invalid unicode escape: \\u requires 4 hex digits")
                        })?;
                    code = code * 16 + digit;
                }
                out.push(scalar_from_code(code)?);
            }
            '0'..='7' => {
                let mut code = esc.to_digit(8).unwrap_or(0);
                let mut count = 1;
                while count < 3 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            chars.next();
                            code = code * 8 + digit;
                            count += 1;
                        }
                        None => break,
                    }
                }
                if code > 0o377 {
                    return Err(ReaderError::parse(
                        "Octal escape sequence must be in range [0, 377]",
                    ));
                }
                out.push(scalar_from_code(code)?);
            }
            other => {
                return Err(ReaderError::parse(format!(
                    "Unsupported escape character: \\{other}"
                )))
            }
        }
    }
    Ok(out)
}

/// Interpret a character-literal token (everything after the backslash).
pub fn char_from_token(token: &str) -> Result<char, ReaderError> {
    let mut chars = token.chars();
    if let (Some(ch), None) = (chars.next(), chars.clone().next()) {
        return Ok(ch);
    }
    match token {
        "newline" => return Ok('\n'),
        "space" => return Ok(' '),
        "tab" => return Ok('\t'),
        "backspace" => return Ok('\u{8}'),
        "formfeed" => return Ok('\u{c}'),
        "return" => return Ok('\r'),
        _ => {}
    }
    if let Some(hex) = token.strip_prefix('u') {
        if hex.chars().count() != 4 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ReaderError::parse(format!(
                "Invalid unicode character: \\{token}"
            )));
        }
        let code = u32::from_str_radix(hex, 16)
            .map_err(|_| ReaderError::parse(format!("Invalid unicode character: \\{token}")))?;
        if (0xD800..=0xDFFF).contains(&code) {
            return Err(ReaderError::parse(format!(
                "Invalid character constant: \\{token}"
            )));
        }
        return scalar_from_code(code);
    }
    if let Some(digits) = token.strip_prefix('o') {
        let len = digits.chars().count();
        if len == 0 || len > 3 {
            return Err(ReaderError::parse("Invalid octal escape sequence length"));
        }
        let code = u32::from_str_radix(digits, 8)
            .map_err(|_| ReaderError::parse(format!("Invalid digit in octal escape: \\{token}")))?;
        if code > 0o377 {
            return Err(ReaderError::parse(
                "Octal escape sequence must be in range [0, 377]",
            ));
        }
        return scalar_from_code(code);
    }
    Err(ReaderError::parse(format!(
        "Unsupported character: \\{token}"
    )))
}

fn scalar_from_code(code: u32) -> Result<char, ReaderError> {
    char::from_u32(code)
        .ok_or_else(|| ReaderError::parse(format!("Invalid character code: {code:#x}")))
}
