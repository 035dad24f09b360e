use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The field `{0}` must not be blank")]
pub struct BlankFieldError(pub &'static str);

/// Rejects `value` if it is empty or only whitespace. Otherwise it is kept
/// exactly as supplied.
pub fn non_blank(field: &'static str, value: &str) -> Result<String, BlankFieldError> {
    if value.trim().is_empty() {
        Err(BlankFieldError(field))
    } else {
        Ok(value.to_owned())
    }
}
