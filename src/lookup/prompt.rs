// Prompt template loaded at compile time
const COMPANY_LINKS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/company_links.md"
));

/// Build the search prompt for one company.
pub fn build_lookup_prompt(name: &str, description: &str) -> String {
    let description = description.trim();
    let description = if description.is_empty() {
        "no description provided"
    } else {
        description
    };
    COMPANY_LINKS
        .replace("{name}", name.trim())
        .replace("{description}", description)
}
