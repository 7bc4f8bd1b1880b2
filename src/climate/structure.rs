use crate::climate::ParseError;

/// Проверяет парность фигурных скобок и кавычек до построения дерева
///
/// `jomini` закрывает оборванный в конце файла блок сам, и модель из такого
/// текста получилась бы неполной. Скобки внутри строк и комментариев не считаются.
pub(crate) fn check_structure(data: &[u8]) -> Result<(), ParseError> {
    let mut open_blocks: Vec<usize> = Vec::new();
    let mut quote_start: Option<usize> = None;
    let mut in_comment = false;
    let mut escaped = false;
    let mut line = 1;

    for &byte in data {
        if quote_start.is_some() {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => quote_start = None,
                _ => {}
            }
        } else if in_comment {
            in_comment = byte != b'\n';
        } else {
            match byte {
                b'#' => in_comment = true,
                b'"' => quote_start = Some(line),
                b'{' => open_blocks.push(line),
                b'}' => {
                    if open_blocks.pop().is_none() {
                        return Err(ParseError::UnexpectedClose { line });
                    }
                }
                _ => {}
            }
        }

        if byte == b'\n' {
            line += 1;
        }
    }

    if let Some(line) = quote_start {
        return Err(ParseError::UnterminatedQuote { line });
    }
    match open_blocks.last() {
        Some(&line) => Err(ParseError::UnclosedBlock { line }),
        None => Ok(()),
    }
}
