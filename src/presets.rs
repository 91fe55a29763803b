//! Canned indicator report plans.
//!
//! An entity is classified as an IP address, a domain or a file hash, and
//! each kind has a fixed set of lookups. Analysis documents keep only the
//! engines that flagged the entity; file collections additionally drop the
//! bulky `pe_info` attribute.

use std::fmt;
use std::net::IpAddr;

use vantage_fetch::fanout::reduce::{flagged_verdicts, flagged_verdicts_without};
use vantage_fetch::{Operation, ReportPlan, SubOperation};

/// Attributes blanked on file collections.
const BULKY_FILE_ATTRIBUTES: &[&str] = &["pe_info"];

/// What kind of indicator an entity string denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Ip,
    Domain,
    File,
}

impl EntityKind {
    /// Classify `entity`: IP literal, then domain name, otherwise file hash.
    pub fn classify(entity: &str) -> Self {
        let entity = entity.trim();
        if entity.parse::<IpAddr>().is_ok() {
            Self::Ip
        } else if looks_like_domain(entity) {
            Self::Domain
        } else {
            Self::File
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Domain => "domain",
            Self::File => "file",
        }
    }

    /// Collection path segment under the API base.
    fn collection(&self) -> &'static str {
        match self {
            Self::Ip => "ip_addresses",
            Self::Domain => "domains",
            Self::File => "files",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dotted name whose labels are alphanumeric or hyphenated and whose last
/// label is alphabetic.
fn looks_like_domain(entity: &str) -> bool {
    let entity = entity.trim_end_matches('.');
    let labels: Vec<&str> = entity.split('.').collect();
    if labels.len() < 2 || entity.len() > 253 {
        return false;
    }
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    let tld_ok = labels
        .last()
        .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));
    labels_ok && tld_ok
}

/// The report plan for `kind` against `api_base`.
pub fn indicator_plan(kind: EntityKind, api_base: &str) -> ReportPlan {
    let root = format!("{}/{}/{{id}}", api_base.trim_end_matches('/'), kind.collection());
    let at = |suffix: &str| Operation::get(format!("{root}{suffix}"));
    let files = |name: &str, suffix: &str| {
        SubOperation::new(
            name,
            vec![at(suffix)],
            flagged_verdicts_without(BULKY_FILE_ATTRIBUTES),
        )
    };

    let plan = ReportPlan::new(kind.name());
    match kind {
        EntityKind::Domain => plan
            .with(SubOperation::new("analyse", vec![at("")], flagged_verdicts))
            .with(SubOperation::json("resolutions", at("/resolutions")))
            .with(files("referrer_files", "/referrer_files"))
            .with(files("communicating_files", "/communicating_files"))
            .with(SubOperation::new(
                "subdomains",
                vec![at("/subdomains").with_query("relationships", "resolutions")],
                flagged_verdicts,
            )),
        EntityKind::Ip => plan
            .with(SubOperation::new("analyse", vec![at("")], flagged_verdicts))
            .with(SubOperation::json("resolutions", at("/resolutions")))
            .with(files("referrer_files", "/referrer_files"))
            .with(files("communicating_files", "/communicating_files")),
        EntityKind::File => plan
            .with(SubOperation::json("analyse", at("")))
            .with(SubOperation::json("contacted_urls", at("/contacted_urls")))
            .with(SubOperation::json("contacted_domains", at("/contacted_domains")))
            .with(SubOperation::json("contacted_ips", at("/contacted_ips"))),
    }
}

/// Classify `entity` and return its kind with the matching plan.
pub fn plan_for(entity: &str, api_base: &str) -> (EntityKind, ReportPlan) {
    let kind = EntityKind::classify(entity);
    (kind, indicator_plan(kind, api_base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_ip_addresses() {
        assert_eq!(EntityKind::classify("1.2.3.4"), EntityKind::Ip);
        assert_eq!(EntityKind::classify("2001:db8::1"), EntityKind::Ip);
        assert_eq!(EntityKind::classify(" 8.8.8.8 "), EntityKind::Ip);
    }

    #[test]
    fn classifies_domains() {
        assert_eq!(EntityKind::classify("example.com"), EntityKind::Domain);
        assert_eq!(EntityKind::classify("sub.example.co.uk"), EntityKind::Domain);
        assert_eq!(EntityKind::classify("xn--bcher-kva.example"), EntityKind::Domain);
    }

    #[test]
    fn everything_else_is_a_file() {
        assert_eq!(
            EntityKind::classify("44d88612fea8a8f36de82e1278abb02f"),
            EntityKind::File
        );
        assert_eq!(EntityKind::classify("localhost"), EntityKind::File);
        assert_eq!(EntityKind::classify("1.2.3.999"), EntityKind::File);
        assert_eq!(EntityKind::classify("-bad-.com"), EntityKind::File);
    }

    #[test]
    fn domain_plan_lookups() {
        let plan = indicator_plan(EntityKind::Domain, "https://api.test/ui/");
        assert_eq!(plan.name(), "domain");
        assert_eq!(
            plan.names().collect::<Vec<_>>(),
            vec![
                "analyse",
                "resolutions",
                "referrer_files",
                "communicating_files",
                "subdomains"
            ]
        );
        let analyse = plan.subs()[0].operations()[0].bind("example.com");
        assert_eq!(analyse.url, "https://api.test/ui/domains/example.com");
        let subdomains = &plan.subs()[4].operations()[0];
        assert_eq!(
            subdomains.query,
            vec![("relationships".to_string(), "resolutions".to_string())]
        );
    }

    #[test]
    fn ip_plan_has_no_subdomains() {
        let plan = indicator_plan(EntityKind::Ip, "https://api.test/ui");
        assert_eq!(plan.len(), 4);
        assert!(!plan.names().any(|n| n == "subdomains"));
        let url = plan.subs()[1].operations()[0].bind("1.2.3.4").url;
        assert_eq!(url, "https://api.test/ui/ip_addresses/1.2.3.4/resolutions");
    }

    #[test]
    fn file_plan_lookups() {
        let (kind, plan) = plan_for("44d88612fea8a8f36de82e1278abb02f", "https://api.test/ui");
        assert_eq!(kind, EntityKind::File);
        assert_eq!(
            plan.names().collect::<Vec<_>>(),
            vec!["analyse", "contacted_urls", "contacted_domains", "contacted_ips"]
        );
    }
}
