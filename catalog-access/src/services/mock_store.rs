//! In-memory [`DataStore`] with call counting, for tests and local runs.

use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use super::{DataStore, ServiceError};
use crate::models::{FileId, Group, GroupId, IdentityId, KeywordId, RecordId, Role, TagId};

#[derive(Default)]
struct MockData {
    api_keys: HashMap<String, IdentityId>,
    secrets: HashMap<IdentityId, String>,
    roles: HashMap<IdentityId, Role>,
    identity_groups: HashMap<IdentityId, Vec<GroupId>>,
    record_groups: HashMap<RecordId, Vec<GroupId>>,
    // (link id, tag, keyword name)
    keywords: Vec<(KeywordId, TagId, String)>,
    keyword_records: HashMap<KeywordId, Vec<RecordId>>,
    ip_allow: HashMap<IdentityId, Vec<String>>,
    file_records: HashMap<FileId, Vec<RecordId>>,
    groups: Vec<Group>,
    login_attempts: Vec<(IdentityId, String, bool)>,
}

pub struct MockDataStore {
    data: Mutex<MockData>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failure: Mutex<Option<String>>,
}

impl Default for MockDataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDataStore {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(MockData::default()),
            calls: Mutex::new(HashMap::new()),
            failure: Mutex::new(None),
        }
    }

    fn data_mut(&mut self) -> &mut MockData {
        self.data
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_identity(
        mut self,
        id: IdentityId,
        api_key: &str,
        secret: &str,
        role: Role,
    ) -> Self {
        let data = self.data_mut();
        data.api_keys.insert(api_key.to_string(), id);
        data.secrets.insert(id, secret.to_string());
        data.roles.insert(id, role);
        self
    }

    pub fn with_identity_groups(mut self, id: IdentityId, groups: &[GroupId]) -> Self {
        self.data_mut().identity_groups.insert(id, groups.to_vec());
        self
    }

    pub fn with_record_groups(mut self, record: RecordId, groups: &[GroupId]) -> Self {
        self.data_mut().record_groups.insert(record, groups.to_vec());
        self
    }

    /// Index `name` under `tag` and link it to `records`.
    pub fn with_keyword(mut self, tag: TagId, name: &str, records: &[RecordId]) -> Self {
        let data = self.data_mut();
        let link_id = data.keywords.len() as KeywordId + 1;
        data.keywords.push((link_id, tag, name.to_string()));
        data.keyword_records.insert(link_id, records.to_vec());
        self
    }

    pub fn with_ip_allow(mut self, id: IdentityId, entries: &[&str]) -> Self {
        self.data_mut()
            .ip_allow
            .insert(id, entries.iter().map(|e| e.to_string()).collect());
        self
    }

    pub fn with_file(mut self, file: FileId, records: &[RecordId]) -> Self {
        self.data_mut().file_records.insert(file, records.to_vec());
        self
    }

    pub fn with_group(mut self, id: GroupId, name: &str, color: &str) -> Self {
        self.data_mut().groups.push(Group {
            id,
            name: name.to_string(),
            color: color.to_string(),
        });
        self
    }

    /// Replace a record's groups on a live store.
    pub fn set_record_groups(&self, record: RecordId, groups: &[GroupId]) {
        self.lock_data().record_groups.insert(record, groups.to_vec());
    }

    /// Make every subsequent call fail with a store error, or clear the
    /// failure with `None`.
    pub fn fail_with(&self, message: Option<&str>) {
        *self
            .failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = message.map(str::to_string);
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .sum()
    }

    pub fn reset_calls(&self) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    pub fn login_attempts(&self) -> Vec<(IdentityId, String, bool)> {
        self.lock_data().login_attempts.clone()
    }

    fn lock_data(&self) -> std::sync::MutexGuard<'_, MockData> {
        self.data
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self, method: &'static str) -> Result<std::sync::MutexGuard<'_, MockData>, ServiceError> {
        *self
            .calls
            .lock()
            .map_err(|e| ServiceError::Store(format!("Mock call counter mutex poisoned: {}", e)))?
            .entry(method)
            .or_insert(0) += 1;

        if let Some(message) = self
            .failure
            .lock()
            .map_err(|e| ServiceError::Store(format!("Mock failure mutex poisoned: {}", e)))?
            .clone()
        {
            return Err(ServiceError::Store(message));
        }

        self.data
            .lock()
            .map_err(|e| ServiceError::Store(format!("Mock data mutex poisoned: {}", e)))
    }
}

#[async_trait]
impl DataStore for MockDataStore {
    async fn lookup_identity_by_api_key(
        &self,
        api_key: &str,
    ) -> Result<Option<IdentityId>, ServiceError> {
        let data = self.enter("lookup_identity_by_api_key")?;
        Ok(data.api_keys.get(api_key).copied())
    }

    async fn lookup_shared_secret(
        &self,
        identity_id: IdentityId,
    ) -> Result<Option<SecretString>, ServiceError> {
        let data = self.enter("lookup_shared_secret")?;
        Ok(data
            .secrets
            .get(&identity_id)
            .map(|s| SecretString::new(s.clone())))
    }

    async fn lookup_role(&self, identity_id: IdentityId) -> Result<Role, ServiceError> {
        let data = self.enter("lookup_role")?;
        Ok(data.roles.get(&identity_id).copied().unwrap_or(Role::Normal))
    }

    async fn lookup_groups_of_identity(
        &self,
        identity_id: IdentityId,
    ) -> Result<Vec<GroupId>, ServiceError> {
        let data = self.enter("lookup_groups_of_identity")?;
        Ok(data
            .identity_groups
            .get(&identity_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn lookup_groups_of_record(
        &self,
        record_id: RecordId,
    ) -> Result<Vec<GroupId>, ServiceError> {
        let data = self.enter("lookup_groups_of_record")?;
        Ok(data.record_groups.get(&record_id).cloned().unwrap_or_default())
    }

    async fn lookup_keyword_matches(
        &self,
        tag_id: TagId,
        pattern: &str,
        exact: bool,
    ) -> Result<Vec<KeywordId>, ServiceError> {
        let data = self.enter("lookup_keyword_matches")?;
        let wanted = pattern.to_lowercase();
        Ok(data
            .keywords
            .iter()
            .filter(|(_, tag, name)| {
                *tag == tag_id
                    && if exact {
                        name.to_lowercase() == wanted
                    } else {
                        name.starts_with(pattern)
                    }
            })
            .map(|(id, _, _)| *id)
            .collect())
    }

    async fn lookup_records_by_keyword_ids(
        &self,
        keyword_ids: &[KeywordId],
    ) -> Result<Vec<RecordId>, ServiceError> {
        let data = self.enter("lookup_records_by_keyword_ids")?;
        let records: BTreeSet<RecordId> = keyword_ids
            .iter()
            .filter_map(|id| data.keyword_records.get(id))
            .flatten()
            .copied()
            .collect();
        Ok(records.into_iter().collect())
    }

    async fn lookup_records_by_tag(
        &self,
        tag_id: TagId,
        limit: Option<i64>,
    ) -> Result<Vec<RecordId>, ServiceError> {
        let data = self.enter("lookup_records_by_tag")?;
        let records: BTreeSet<RecordId> = data
            .keywords
            .iter()
            .filter(|(_, tag, _)| *tag == tag_id)
            .filter_map(|(id, _, _)| data.keyword_records.get(id))
            .flatten()
            .copied()
            .collect();

        let limit = limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(records.into_iter().take(limit).collect())
    }

    async fn lookup_ip_allow_list(
        &self,
        identity_id: IdentityId,
    ) -> Result<Vec<String>, ServiceError> {
        let data = self.enter("lookup_ip_allow_list")?;
        Ok(data.ip_allow.get(&identity_id).cloned().unwrap_or_default())
    }

    async fn lookup_records_of_file(&self, file_id: FileId) -> Result<Vec<RecordId>, ServiceError> {
        let data = self.enter("lookup_records_of_file")?;
        Ok(data.file_records.get(&file_id).cloned().unwrap_or_default())
    }

    async fn lookup_groups(&self, ids: Option<&[GroupId]>) -> Result<Vec<Group>, ServiceError> {
        let data = self.enter("lookup_groups")?;
        let mut groups: Vec<Group> = data
            .groups
            .iter()
            .filter(|g| ids.map_or(true, |ids| ids.contains(&g.id)))
            .cloned()
            .collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    async fn record_login_attempt(
        &self,
        identity_id: IdentityId,
        remote_ip: &str,
        success: bool,
    ) -> Result<(), ServiceError> {
        let mut data = self.enter("record_login_attempt")?;
        data.login_attempts
            .push((identity_id, remote_ip.to_string(), success));
        Ok(())
    }
}
