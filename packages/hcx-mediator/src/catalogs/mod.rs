//! Read-only catalog lookups backing the UI's pickers: active payors from
//! the registry, benefit packages from a static rate list embedded at
//! build time.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::registry::{Participant, RegistryClient};

const HBP_PACKAGES: &str = include_str!("../../data/hbp_packages.json");

/// Hard cap on package search results.
pub const MAX_PACKAGE_RESULTS: usize = 20;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PayorEntry {
    pub name: String,
    pub code: String,
}

///
/// Active payors known to the registry, optionally narrowed by a
/// case-insensitive match on name or code.
///
pub async fn list_payors(
    registry: &RegistryClient,
    query: Option<&str>,
) -> Result<Vec<PayorEntry>, Error> {
    let participants = registry.search("roles", "payor").await?;
    Ok(filter_payors(participants, query))
}

pub fn filter_payors(participants: Vec<Participant>, query: Option<&str>) -> Vec<PayorEntry> {
    let query = query.unwrap_or("").to_lowercase();
    participants
        .into_iter()
        .filter(|participant| participant.status.as_deref() == Some("Active"))
        .map(|participant| PayorEntry {
            name: participant.participant_name.unwrap_or_default(),
            code: participant.participant_code,
        })
        .filter(|entry| {
            query.is_empty()
                || entry.name.to_lowercase().contains(&query)
                || entry.code.to_lowercase().contains(&query)
        })
        .collect()
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PackageEntry {
    pub code: String,
    pub name: String,
    pub price: f64,
    pub package_name: String,
}

///
/// In-memory full-text index over the benefit-package rate list.
///
/// Tokens from code, name and package name go into an ordered posting
/// map; a query token matches by prefix over the ordered keys, and a hit
/// must satisfy every query token.
///
pub struct PackageIndex {
    entries: Vec<PackageEntry>,
    index: BTreeMap<String, Vec<usize>>,
}

impl PackageIndex {
    pub fn load() -> Result<Self, Error> {
        Self::from_json(HBP_PACKAGES)
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let entries: Vec<PackageEntry> = serde_json::from_str(json)?;

        let mut index: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, entry) in entries.iter().enumerate() {
            let text = format!("{} {} {}", entry.code, entry.name, entry.package_name);
            for token in tokens(&text) {
                let posting = index.entry(token).or_default();
                if posting.last() != Some(&i) {
                    posting.push(i);
                }
            }
        }

        Ok(PackageIndex { entries, index })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn search(&self, query: Option<&str>, limit: Option<usize>) -> Vec<PackageEntry> {
        let limit = limit
            .unwrap_or(MAX_PACKAGE_RESULTS)
            .min(MAX_PACKAGE_RESULTS);

        let query_tokens: BTreeSet<String> = tokens(query.unwrap_or("")).into_iter().collect();
        if query_tokens.is_empty() {
            return self.entries.iter().take(limit).cloned().collect();
        }

        let mut matched: Option<BTreeSet<usize>> = None;
        for token in query_tokens {
            let hits: BTreeSet<usize> = self
                .index
                .range(token.clone()..)
                .take_while(|(key, _)| key.starts_with(&token))
                .flat_map(|(_, posting)| posting.iter().copied())
                .collect();

            matched = Some(match matched {
                None => hits,
                Some(previous) => previous.intersection(&hits).copied().collect(),
            });

            if matched.as_ref().is_some_and(BTreeSet::is_empty) {
                return Vec::new();
            }
        }

        matched
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .map(|i| self.entries[i].clone())
            .collect()
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(name: &str, code: &str, status: &str) -> Participant {
        serde_json::from_value(serde_json::json!({
            "participant_code": code,
            "participant_name": name,
            "status": status,
            "encryption_cert": "https://certs.example/x.pem",
        }))
        .unwrap()
    }

    #[test]
    fn payor_filter_keeps_active_matching_entries() {
        let participants = vec![
            participant("Alpha", "1-alpha", "Active"),
            participant("Beta", "1-beta", "Inactive"),
        ];

        let payors = filter_payors(participants, Some("a"));
        assert_eq!(
            payors,
            vec![PayorEntry {
                name: "Alpha".to_string(),
                code: "1-alpha".to_string(),
            }]
        );
    }

    #[test]
    fn payor_filter_matches_code_case_insensitively() {
        let participants = vec![participant("Gamma Insurance", "1-GICOFINDIA", "Active")];

        assert_eq!(filter_payors(participants.clone(), Some("gicof")).len(), 1);
        assert_eq!(filter_payors(participants, Some("zeta")).len(), 0);
    }

    #[test]
    fn package_search_is_prefix_and_conjunctive() {
        let index = PackageIndex::from_json(
            r#"[
                {"code": "HBP-001", "name": "Total knee replacement", "price": 80000.0, "package_name": "Orthopaedics"},
                {"code": "HBP-002", "name": "Total hip replacement", "price": 90000.0, "package_name": "Orthopaedics"},
                {"code": "HBP-003", "name": "Cataract surgery", "price": 10000.0, "package_name": "Ophthalmology"}
            ]"#,
        )
        .unwrap();

        let hits = index.search(Some("knee"), None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].code, "HBP-001");

        // both tokens must match
        let hits = index.search(Some("total ortho"), None);
        assert_eq!(hits.len(), 2);

        let hits = index.search(Some("total cataract"), None);
        assert!(hits.is_empty());
    }

    #[test]
    fn package_search_caps_the_limit() {
        let entries: Vec<String> = (0..50)
            .map(|i| {
                format!(
                    r#"{{"code": "HBP-{i:03}", "name": "Package {i}", "price": 100.0, "package_name": "General"}}"#
                )
            })
            .collect();
        let index = PackageIndex::from_json(&format!("[{}]", entries.join(","))).unwrap();

        assert_eq!(index.search(None, None).len(), 20);
        assert_eq!(index.search(None, Some(100)).len(), 20);
        assert_eq!(index.search(None, Some(5)).len(), 5);
        assert_eq!(index.search(Some("package"), Some(100)).len(), 20);
    }

    #[test]
    fn embedded_rate_list_loads() {
        let index = PackageIndex::load().unwrap();
        assert!(!index.is_empty());
    }
}
