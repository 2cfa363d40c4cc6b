use crate::database::models::Contact;

/// Trimmed, lowercased needle. `None` for a blank query, which matches nothing.
pub fn normalize_query(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Case-insensitive substring match on name, surname or email.
/// `needle` must already be normalized.
pub fn contact_matches(contact: &Contact, needle: &str) -> bool {
    [&contact.name, &contact.surname, &contact.email]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}
