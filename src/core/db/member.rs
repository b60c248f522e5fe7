use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::core::db::model::MemberId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub full_name: String,
}

pub trait MemberRepository {
    fn get_members(&self) -> impl Future<Output = anyhow::Result<Vec<Member>>>;
    fn get_member_by_id(&self, id: MemberId) -> impl Future<Output = anyhow::Result<Option<Member>>>;
    fn add_member(&self, full_name: &str) -> impl Future<Output = anyhow::Result<Member>>;
    fn rename_member(&self, id: MemberId, full_name: &str) -> impl Future<Output = anyhow::Result<Member>>;
    /// Removes the member and returns how many role assignments were cleared.
    fn delete_member(&self, id: MemberId) -> impl Future<Output = anyhow::Result<usize>>;
}
