const MIN_KEY_LENGTH: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    // 长度不够
    #[error("API key length must be at least {MIN_KEY_LENGTH} characters")]
    LengthTooShort,
    // 包含非法字符
    #[error("API key contains illegal characters, must be alphanumeric, '+', '/', '=', '-' or '_'")]
    IllegalCharacters,
}

pub fn check_key(key: &str) -> Result<(), KeyError> {
    if key.len() < MIN_KEY_LENGTH {
        return Err(KeyError::LengthTooShort);
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=' | '-' | '_'))
    {
        return Err(KeyError::IllegalCharacters);
    }

    Ok(())
}
