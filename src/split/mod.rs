//! Expense splitting: groups of contacts, a cent-exact partition of an amount
//! among them, and the orchestration that sends or requests each share.

mod endpoints;
mod group;
mod orchestrator;
mod partition;

pub use endpoints::{
    add_member_endpoint, create_group_endpoint, delete_group_endpoint, get_groups_endpoint,
    remove_member_endpoint, split_group_endpoint,
};
pub use group::{
    Group, GroupId, GroupName, Member, MemberId, add_member, create_group,
    create_group_member_table, create_group_table, delete_group, get_group, list_groups,
    remove_member,
};
pub use orchestrator::{ShareOutcome, ShareStatus, SplitMode, SplitRequest, split_group};
pub use partition::partition;

#[cfg(test)]
pub use group::get_members;
