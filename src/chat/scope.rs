/// True when any keyword occurs in the lower-cased text.
pub fn is_in_scope<S: AsRef<str>>(text: &str, keywords: &[S]) -> bool {
    if text.is_empty() {
        return false;
    }
    let lowered = text.to_lowercase();
    keywords
        .iter()
        .any(|kw| lowered.contains(&kw.as_ref().to_lowercase()))
}
