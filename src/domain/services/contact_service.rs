use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::domain::models::{
    action::ActionState,
    activity::ActivitySummary,
    company::Company,
    contact::{Contact, ContactSummary, ContactWithRelations},
    opportunity::OpportunitySummary,
    tag::Tag,
    team_member::TeamMember,
};
use crate::domain::ports::{Page, PageInvalidator, Repositories};
use crate::domain::services::invalidate;
use crate::domain::services::listing::{group_contacts, tokenize, unique_ids, ContactGroup, Pagination, OPTIONS_LIMIT};
use crate::domain::validation::schemas::{ContactPayload, ContactSearch, GroupBy};
use crate::domain::validation::{parse_identifier, FormData};
use crate::error::AppError;

const RECENT_ACTIVITIES_PER_CONTACT: i64 = 3;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactList {
    pub contacts: Vec<ContactWithRelations>,
    pub groups: Vec<ContactGroup>,
    pub group_by: GroupBy,
    pub query: String,
    pub pagination: Pagination,
}

pub struct ContactService {
    repos: Repositories,
    invalidator: Arc<dyn PageInvalidator>,
}

impl ContactService {
    pub fn new(repos: Repositories, invalidator: Arc<dyn PageInvalidator>) -> Self {
        Self { repos, invalidator }
    }

    pub async fn list_contacts(&self, search: &ContactSearch, page_size: u32) -> Result<ContactList, AppError> {
        let tokens = tokenize(&search.query);
        let total = self.repos.contacts.count_matching(&tokens).await?;
        let pagination = Pagination::new(search.page, page_size, total);

        let rows = self
            .repos
            .contacts
            .search(&tokens, pagination.limit(), pagination.offset())
            .await?;
        let contacts = self.hydrate(rows).await?;
        let groups = group_contacts(&contacts, search.group_by);

        Ok(ContactList {
            contacts,
            groups,
            group_by: search.group_by,
            query: search.query.clone(),
            pagination,
        })
    }

    pub async fn get_contact(&self, id: i64) -> Result<Option<ContactWithRelations>, AppError> {
        let Some(contact) = self.repos.contacts.find_by_id(id).await? else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![contact]).await?.pop())
    }

    pub async fn options(&self) -> Result<Vec<ContactSummary>, AppError> {
        self.repos.contacts.options(OPTIONS_LIMIT).await
    }

    pub async fn save_contact(&self, form: &FormData) -> ActionState {
        let payload = match ContactPayload::parse(form) {
            Ok(payload) => payload,
            Err(errors) => return ActionState::invalid("Check the form fields", errors),
        };

        match self.repos.contacts.save(&payload).await {
            Ok(contact) => {
                info!(contact_id = contact.id, tags = payload.tags.len(), "contact saved");
                invalidate(
                    self.invalidator.as_ref(),
                    &[Page::Contacts, Page::Opportunities, Page::Activities, Page::Dashboard],
                )
                .await;
                ActionState::success(if payload.id.is_some() { "Contact updated" } else { "Contact created" })
            }
            Err(AppError::NotFound(_)) => ActionState::error("Contact not found"),
            Err(e) => {
                error!("save contact failed: {:?}", e);
                ActionState::error("Could not save the contact")
            }
        }
    }

    pub async fn delete_contact(&self, form: &FormData) -> ActionState {
        let Some(id) = parse_identifier(form.get("id")) else {
            return ActionState::error("Invalid identifier");
        };

        match self.repos.contacts.delete(id).await {
            Ok(()) => {
                info!(contact_id = id, "contact deleted");
                invalidate(
                    self.invalidator.as_ref(),
                    &[Page::Contacts, Page::Opportunities, Page::Activities, Page::Dashboard],
                )
                .await;
                ActionState::success("Contact deleted")
            }
            Err(AppError::NotFound(_)) => ActionState::error("Contact not found"),
            Err(e) => {
                error!("delete contact failed: {:?}", e);
                ActionState::error("Could not delete the contact")
            }
        }
    }

    async fn hydrate(&self, contacts: Vec<Contact>) -> Result<Vec<ContactWithRelations>, AppError> {
        if contacts.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = contacts.iter().map(|c| c.id).collect();
        let company_ids = unique_ids(contacts.iter().filter_map(|c| c.company_id));
        let owner_ids = unique_ids(contacts.iter().filter_map(|c| c.owner_id));

        let (companies, owners, tag_rows, activities, opportunities) = tokio::try_join!(
            self.repos.companies.find_by_ids(&company_ids),
            self.repos.team_members.find_by_ids(&owner_ids),
            self.repos.tags.tags_for_contacts(&ids),
            self.repos.activities.recent_for_contacts(&ids, RECENT_ACTIVITIES_PER_CONTACT),
            self.repos.opportunities.summaries_for_contacts(&ids),
        )?;

        let companies: HashMap<i64, Company> = companies.into_iter().map(|c| (c.id, c)).collect();
        let owners: HashMap<i64, TeamMember> = owners.into_iter().map(|m| (m.id, m)).collect();

        let mut tags: HashMap<i64, Vec<Tag>> = HashMap::new();
        for row in tag_rows {
            tags.entry(row.contact_id).or_default().push(row.tag);
        }
        let mut recent: HashMap<i64, Vec<ActivitySummary>> = HashMap::new();
        for activity in activities {
            if let Some(contact_id) = activity.contact_id {
                recent.entry(contact_id).or_default().push(activity);
            }
        }
        let mut deals: HashMap<i64, Vec<OpportunitySummary>> = HashMap::new();
        for opportunity in opportunities {
            if let Some(contact_id) = opportunity.contact_id {
                deals.entry(contact_id).or_default().push(opportunity);
            }
        }

        Ok(contacts
            .into_iter()
            .map(|contact| ContactWithRelations {
                company: contact.company_id.and_then(|id| companies.get(&id).cloned()),
                owner: contact.owner_id.and_then(|id| owners.get(&id).cloned()),
                tags: tags.remove(&contact.id).unwrap_or_default(),
                activities: recent.remove(&contact.id).unwrap_or_default(),
                opportunities: deals.remove(&contact.id).unwrap_or_default(),
                contact,
            })
            .collect())
    }
}
