//! Pagination, search tokenizing and contact grouping shared by the list
//! pages.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::domain::models::{contact::ContactWithRelations, fold_key};
use crate::domain::validation::schemas::GroupBy;

pub const CONTACTS_PAGE_SIZE: u32 = 20;
pub const ACTIVITIES_PAGE_SIZE: u32 = 20;
pub const PIPELINE_PAGE_SIZE: u32 = 3;
pub const PIPELINE_FILTERED_PAGE_SIZE: u32 = 12;
pub const OPTIONS_LIMIT: i64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
    pub total_pages: u32,
}

impl Pagination {
    pub fn new(page: u32, page_size: u32, total: i64) -> Self {
        let page_size = page_size.max(1);
        let total = total.max(0);
        let total_pages = ((total as u64).div_ceil(page_size as u64)).max(1) as u32;
        Self { page: page.max(1), page_size, total, total_pages }
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }
}

/// Distinct ids, in ascending order.
pub fn unique_ids(ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Whitespace separated search terms, case-folded with [`fold_key`].
pub fn tokenize(query: &str) -> Vec<String> {
    query.split_whitespace().map(fold_key).collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactGroup {
    pub key: String,
    pub label: String,
    pub contacts: Vec<ContactWithRelations>,
}

/// Buckets the given contacts. With tag grouping a contact appears once per
/// tag it carries.
pub fn group_contacts(contacts: &[ContactWithRelations], group_by: GroupBy) -> Vec<ContactGroup> {
    if group_by == GroupBy::None {
        return vec![ContactGroup {
            key: "all".to_string(),
            label: format!("All ({})", contacts.len()),
            contacts: contacts.to_vec(),
        }];
    }

    let mut buckets: BTreeMap<String, Vec<ContactWithRelations>> = BTreeMap::new();
    for contact in contacts {
        for key in group_keys(contact, group_by) {
            buckets.entry(key).or_default().push(contact.clone());
        }
    }

    buckets
        .into_iter()
        .map(|(key, contacts)| ContactGroup {
            label: format!("{} ({})", key, contacts.len()),
            key,
            contacts,
        })
        .collect()
}

fn group_keys(contact: &ContactWithRelations, group_by: GroupBy) -> Vec<String> {
    match group_by {
        GroupBy::City => vec![contact
            .contact
            .city
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "No city".to_string())],
        GroupBy::Company => vec![contact
            .company
            .as_ref()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "No company".to_string())],
        GroupBy::Tag if contact.tags.is_empty() => vec!["No tags".to_string()],
        GroupBy::Tag => contact.tags.iter().map(|t| t.name.clone()).collect(),
        GroupBy::None => vec!["all".to_string()],
    }
}
