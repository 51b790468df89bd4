use crate::errors::ErrorCode;

/// Checks `path` against the service's naming rules.
///
/// Sequential creates may end in `/`, the counter supplies the last name.
pub(super) fn validate_path(
    path: &str,
    sequential: bool,
) -> Result<(), ErrorCode> {
    if sequential {
        return validate(&format!("{path}1"));
    }
    validate(path)
}

fn validate(path: &str) -> Result<(), ErrorCode> {
    if !path.starts_with('/') {
        return Err(ErrorCode::BadArguments);
    }
    if path.len() == 1 {
        return Ok(());
    }
    if path.ends_with('/') {
        return Err(ErrorCode::BadArguments);
    }
    if path.chars().any(invalid_char) {
        return Err(ErrorCode::BadArguments);
    }
    for name in path[1..].split('/') {
        if name.is_empty() || name == "." || name == ".." {
            return Err(ErrorCode::BadArguments);
        }
    }
    Ok(())
}

fn invalid_char(c: char) -> bool {
    matches!(c,
        '\u{0000}'..='\u{001f}'
        | '\u{007f}'..='\u{009f}'
        | '\u{e000}'..='\u{f8ff}'
        | '\u{fff0}'..='\u{ffff}')
}

/// Parent of a validated, non-root path
pub(super) fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

/// Last component of a validated, non-root path
pub(super) fn name_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}
