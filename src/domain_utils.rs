/// Sender address helpers
pub struct DomainUtils;

impl DomainUtils {
    /// Normalize a sender address for use as a lookup key
    pub fn normalize_sender(sender: &str) -> String {
        sender.trim().to_lowercase()
    }

    /// Extract domain from an email address, using the part after the last '@'
    pub fn extract_domain(email: &str) -> Option<String> {
        let trimmed = email.trim().trim_end_matches('>');
        trimmed
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_lowercase())
            .filter(|domain| !domain.is_empty())
    }

    /// Check if domain matches any in list (with subdomain support)
    pub fn matches_domain_list(domain: &str, domain_list: &[String]) -> bool {
        let domain_lower = domain.to_lowercase();

        domain_list.iter().any(|pattern| {
            let pattern_lower = pattern.to_lowercase();
            domain_lower == pattern_lower || domain_lower.ends_with(&format!(".{}", pattern_lower))
        })
    }

    /// True when the sender's domain is one of the known domains
    pub fn is_known_sender(sender: &str, known_domains: &[String]) -> bool {
        Self::extract_domain(sender)
            .map(|domain| Self::matches_domain_list(&domain, known_domains))
            .unwrap_or(false)
    }
}
